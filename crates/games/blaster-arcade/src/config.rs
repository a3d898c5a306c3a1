use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use blaster_core::geometry::Bounds;
use blaster_core::level_config::{ConfigError, DiveOverride};
use blaster_core::run_machine::RunTimings;

/// Default play field width in pixels.
pub const FIELD_WIDTH: f32 = 800.0;
/// Default play field height in pixels.
pub const FIELD_HEIGHT: f32 = 600.0;
/// Margin around the projectile bounds before a shot is recycled.
pub const PROJECTILE_BOUNDS_MARGIN: f32 = 32.0;
/// Default window after a hit during which further hits are ignored.
pub const DAMAGE_LOCKOUT_MS: f32 = 50.0;
/// Default vertical offset from an enemy to where its shots spawn.
pub const ENEMY_MUZZLE_OFFSET_Y: f32 = 12.0;
/// Distance above the player ship where its shots spawn.
pub const PLAYER_MUZZLE_OFFSET_Y: f32 = 20.0;
/// Enemies below `play_bounds.max_y - BREACH_MARGIN` have breached the line.
pub const BREACH_MARGIN: f32 = 12.0;

/// Attack-tick tuning for the dive scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiveConfig {
    pub attack_tick_ms: f32,
    pub dive_chance_per_tick: f32,
    pub max_concurrent_divers: u32,
}

impl Default for DiveConfig {
    fn default() -> Self {
        Self {
            attack_tick_ms: 1200.0,
            dive_chance_per_tick: 0.35,
            max_concurrent_divers: 2,
        }
    }
}

impl From<DiveOverride> for DiveConfig {
    fn from(o: DiveOverride) -> Self {
        Self {
            attack_tick_ms: o.attack_tick_ms,
            dive_chance_per_tick: o.dive_chance_per_tick,
            max_concurrent_divers: o.max_concurrent_divers,
        }
    }
}

/// Fire rate and projectile pool for one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub fire_cooldown_ms: f32,
    /// Projectile speed in px/s.
    pub projectile_speed: f32,
    pub pool_size: usize,
    pub bounds_margin: f32,
    pub projectile_half_width: f32,
    pub projectile_half_height: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            fire_cooldown_ms: 250.0,
            projectile_speed: 520.0,
            pool_size: 16,
            bounds_margin: PROJECTILE_BOUNDS_MARGIN,
            projectile_half_width: 3.0,
            projectile_half_height: 8.0,
        }
    }
}

impl WeaponConfig {
    /// Slower, deeper-pooled defaults used by the shared enemy weapon.
    pub fn enemy_default() -> Self {
        Self {
            fire_cooldown_ms: 400.0,
            projectile_speed: 260.0,
            pool_size: 24,
            ..Self::default()
        }
    }
}

/// Lives and post-hit protection windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeConfig {
    pub initial_lives: u32,
    pub respawn_invulnerability_ms: f32,
    pub damage_lockout_ms: f32,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            initial_lives: 3,
            respawn_invulnerability_ms: 1500.0,
            damage_lockout_ms: DAMAGE_LOCKOUT_MS,
        }
    }
}

/// Player ship movement and hitbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub max_speed_px_per_sec: f32,
    pub half_width: f32,
    pub half_height: f32,
    /// Distance of the ship from the bottom of the play field.
    pub floor_offset: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_speed_px_per_sec: 260.0,
            half_width: 16.0,
            half_height: 12.0,
            floor_offset: 60.0,
        }
    }
}

/// Grid geometry of the reference formation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    pub columns: u32,
    pub spacing_x: f32,
    pub spacing_y: f32,
    pub top_margin: f32,
    pub enemy_half_width: f32,
    pub enemy_half_height: f32,
    /// Sideways march speed of the whole formation.
    pub march_speed_px_per_sec: f32,
    /// How far the formation drops each time it reverses at a wall.
    pub descend_step_px: f32,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            spacing_x: 48.0,
            spacing_y: 36.0,
            top_margin: 60.0,
            enemy_half_width: 14.0,
            enemy_half_height: 10.0,
            march_speed_px_per_sec: 48.0,
            descend_step_px: 36.0,
        }
    }
}

/// Path an enemy follows while diving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivePattern {
    #[default]
    Straight,
    Sine,
    /// Steer toward the player, turning at most `turn_rate_deg_per_sec`.
    Track,
}

/// Per-enemy dive and return motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub dive_speed_px_per_sec: f32,
    pub return_speed_px_per_sec: f32,
    pub max_dive_duration_ms: f32,
    pub return_trigger_y: Option<f32>,
    pub arrival_threshold_px: f32,
    pub pattern: DivePattern,
    pub sine_amplitude_px: f32,
    pub sine_frequency_hz: f32,
    pub turn_rate_deg_per_sec: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            dive_speed_px_per_sec: 220.0,
            return_speed_px_per_sec: 180.0,
            max_dive_duration_ms: 1800.0,
            return_trigger_y: None,
            arrival_threshold_px: 4.0,
            pattern: DivePattern::Straight,
            sine_amplitude_px: 40.0,
            sine_frequency_hz: 0.8,
            turn_rate_deg_per_sec: 90.0,
        }
    }
}

/// Tuning for one enemy type, keyed by the wave's `enemy_id`.
///
/// Unset motion fields fall back to the shared [`EnemyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyProfile {
    pub can_dive: bool,
    /// Kill score used when the score table has no entry for this type.
    pub base_score: Option<u32>,
    pub dive_speed_px_per_sec: Option<f32>,
    pub max_dive_duration_ms: Option<f32>,
    pub return_trigger_y: Option<f32>,
    pub pattern: Option<DivePattern>,
    pub sine_amplitude_px: Option<f32>,
    pub sine_frequency_hz: Option<f32>,
    pub turn_rate_deg_per_sec: Option<f32>,
}

impl Default for EnemyProfile {
    fn default() -> Self {
        Self {
            can_dive: true,
            base_score: None,
            dive_speed_px_per_sec: None,
            max_dive_duration_ms: None,
            return_trigger_y: None,
            pattern: None,
            sine_amplitude_px: None,
            sine_frequency_hz: None,
            turn_rate_deg_per_sec: None,
        }
    }
}

impl EnemyProfile {
    /// `base` with this profile's overrides applied.
    pub fn motion(&self, base: EnemyConfig) -> EnemyConfig {
        EnemyConfig {
            dive_speed_px_per_sec: self.dive_speed_px_per_sec.unwrap_or(base.dive_speed_px_per_sec),
            max_dive_duration_ms: self.max_dive_duration_ms.unwrap_or(base.max_dive_duration_ms),
            return_trigger_y: self.return_trigger_y.or(base.return_trigger_y),
            pattern: self.pattern.unwrap_or(base.pattern),
            sine_amplitude_px: self.sine_amplitude_px.unwrap_or(base.sine_amplitude_px),
            sine_frequency_hz: self.sine_frequency_hz.unwrap_or(base.sine_frequency_hz),
            turn_rate_deg_per_sec: self
                .turn_rate_deg_per_sec
                .unwrap_or(base.turn_rate_deg_per_sec),
            ..base
        }
    }
}

/// Return fire from eligible shooters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyFireConfig {
    pub fire_chance_per_second: f32,
    pub muzzle_offset_y: f32,
}

impl Default for EnemyFireConfig {
    fn default() -> Self {
        Self {
            fire_chance_per_second: 0.6,
            muzzle_offset_y: ENEMY_MUZZLE_OFFSET_Y,
        }
    }
}

/// One rung of the combo ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboTier {
    pub name: String,
    /// Combo count at which the tier starts.
    pub min_count: u32,
    /// Applied to a kill's base points.
    pub multiplier: f32,
    /// Awarded once each time the combo climbs into this tier.
    #[serde(default)]
    pub tier_bonus: u32,
}

impl ComboTier {
    pub fn new(name: &str, min_count: u32, multiplier: f32, tier_bonus: u32) -> Self {
        Self {
            name: name.to_string(),
            min_count,
            multiplier,
            tier_bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    pub enabled: bool,
    /// A kill within this long of the previous one extends the combo.
    pub window_ms: f32,
    pub reset_on_player_hit: bool,
    pub tiers: Vec<ComboTier>,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 1500.0,
            reset_on_player_hit: true,
            tiers: vec![
                ComboTier::new("double", 2, 1.25, 50),
                ComboTier::new("chain", 5, 1.5, 150),
                ComboTier::new("frenzy", 10, 2.0, 500),
            ],
        }
    }
}

/// `base + per_level * (level - 1)`, clamped to `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMultiplierConfig {
    pub base: f32,
    pub per_level: f32,
    pub max: f32,
}

impl Default for LevelMultiplierConfig {
    fn default() -> Self {
        Self {
            base: 1.0,
            per_level: 0.25,
            max: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveClearBonusConfig {
    pub base: u32,
    /// Paid again for every life left when the wave is cleared.
    pub per_life_bonus: u32,
}

impl Default for WaveClearBonusConfig {
    fn default() -> Self {
        Self {
            base: 100,
            per_life_bonus: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyThreshold {
    /// Hits over shots, in `[0, 1]`.
    pub min_accuracy: f32,
    pub bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyBonusConfig {
    pub scale_by_level_multiplier: bool,
    pub thresholds: Vec<AccuracyThreshold>,
}

impl Default for AccuracyBonusConfig {
    fn default() -> Self {
        Self {
            scale_by_level_multiplier: false,
            thresholds: vec![
                AccuracyThreshold {
                    min_accuracy: 0.5,
                    bonus: 250,
                },
                AccuracyThreshold {
                    min_accuracy: 0.8,
                    bonus: 1000,
                },
            ],
        }
    }
}

/// Kill values, combo ladder and end-of-wave and end-of-run bonuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Kill score per enemy type.
    pub base_enemy_scores: BTreeMap<String, u32>,
    /// Kill score for types found neither here nor in the enemy profiles.
    pub default_enemy_score: u32,
    pub combo: ComboConfig,
    pub level_multiplier: LevelMultiplierConfig,
    pub wave_clear_bonus: WaveClearBonusConfig,
    pub accuracy_bonus: AccuracyBonusConfig,
    /// Most recent score events kept for inspection.
    pub event_log_size: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            base_enemy_scores: BTreeMap::new(),
            default_enemy_score: 100,
            combo: ComboConfig::default(),
            level_multiplier: LevelMultiplierConfig::default(),
            wave_clear_bonus: WaveClearBonusConfig::default(),
            accuracy_bonus: AccuracyBonusConfig::default(),
            event_log_size: 50,
        }
    }
}

/// Top-level tuning for an arcade session, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub dive: DiveConfig,
    pub weapon: WeaponConfig,
    pub enemy_weapon: WeaponConfig,
    pub life: LifeConfig,
    pub motion: MotionConfig,
    pub formation: FormationConfig,
    pub enemy: EnemyConfig,
    /// Per-type overrides, keyed by `enemy_id`.
    pub enemies: BTreeMap<String, EnemyProfile>,
    pub enemy_fire: EnemyFireConfig,
    pub score: ScoreConfig,
    pub run: RunTimings,
    /// Area the player ship moves in.
    pub play_bounds: Bounds,
    /// Area projectiles live in before the recycle margin applies.
    pub projectile_bounds: Bounds,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        let field = Bounds::new(0.0, FIELD_WIDTH, 0.0, FIELD_HEIGHT);
        Self {
            dive: DiveConfig::default(),
            weapon: WeaponConfig::default(),
            enemy_weapon: WeaponConfig::enemy_default(),
            life: LifeConfig::default(),
            motion: MotionConfig::default(),
            formation: FormationConfig::default(),
            enemy: EnemyConfig::default(),
            enemies: BTreeMap::new(),
            enemy_fire: EnemyFireConfig::default(),
            score: ScoreConfig::default(),
            run: RunTimings::default(),
            play_bounds: field,
            projectile_bounds: field,
        }
    }
}

impl ArcadeConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is
    /// missing or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("BLASTER_ARCADE_CONFIG")
            .unwrap_or_else(|_| "config/arcade.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Y coordinate past which an enemy counts as having breached the line.
    pub fn breach_y(&self) -> f32 {
        self.play_bounds.max_y - BREACH_MARGIN
    }

    /// Y coordinate of the player ship.
    pub fn player_y(&self) -> f32 {
        self.play_bounds.max_y - self.motion.floor_offset
    }
}
