use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::{ComboTier, LevelMultiplierConfig, ScoreConfig};

/// Event log size used when the configured one is zero.
pub const DEFAULT_EVENT_LOG_SIZE: usize = 50;

/// Score multiplier for a 1-based level number. Level 0 counts as level 1.
pub fn compute_level_multiplier(level_number: usize, config: &LevelMultiplierConfig) -> f32 {
    let level = level_number.max(1);
    let raw = config.base + config.per_level * (level - 1) as f32;
    raw.clamp(0.0, config.max.max(0.0))
}

/// Index of the highest tier `combo_count` has reached. `tiers` must be
/// sorted by `min_count`.
pub fn combo_tier_index(tiers: &[ComboTier], combo_count: u32) -> Option<usize> {
    if combo_count == 0 {
        return None;
    }
    tiers
        .iter()
        .take_while(|tier| combo_count >= tier.min_count)
        .count()
        .checked_sub(1)
}

/// Hits over shots, 0 when nothing was fired.
pub fn compute_accuracy(shots_fired: u32, shots_hit: u32) -> f32 {
    if shots_fired == 0 {
        return 0.0;
    }
    (shots_hit as f32 / shots_fired as f32).min(1.0)
}

fn scaled(points: u32, multiplier: f32) -> u32 {
    (points as f32 * multiplier).round().max(0.0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComboResetReason {
    Expired,
    PlayerHit,
}

/// Something that changed the score or the combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreEvent {
    ShotFired {
        at_ms: f32,
    },
    Kill {
        at_ms: f32,
        enemy_id: String,
        base_points: u32,
        combo_extra: u32,
        tier_bonus: u32,
        combo_count: u32,
        tier_index: Option<usize>,
        level_multiplier: f32,
    },
    TierEnter {
        at_ms: f32,
        tier_index: usize,
        min_count: u32,
        tier_bonus: u32,
    },
    ComboReset {
        at_ms: f32,
        reason: ComboResetReason,
    },
    WaveClear {
        at_ms: f32,
        level_number: usize,
        wave_index: usize,
        bonus: u32,
    },
    AccuracyBonus {
        at_ms: f32,
        accuracy: f32,
        bonus: u32,
    },
}

/// Where the points came from. The point fields always add up to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub kills: u32,
    pub kill_points: u32,
    pub combo_extra: u32,
    pub tier_bonuses: u32,
    pub wave_clear_bonuses: u32,
    pub accuracy_bonus: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.kill_points
            + self.combo_extra
            + self.tier_bonuses
            + self.wave_clear_bonuses
            + self.accuracy_bonus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnemyScore {
    pub kills: u32,
    pub points: u32,
}

/// Score state reported with a run summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub combo_count: u32,
    pub best_combo: u32,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub breakdown: ScoreBreakdown,
    pub finalized: bool,
}

/// Run score with a combo ladder.
///
/// Kills landing within `combo.window_ms` of the previous one extend the
/// combo. The combo count picks a tier whose multiplier applies to the
/// kill's base points, and climbing into a higher tier pays its bonus once.
/// Times are simulated run milliseconds.
#[derive(Debug, Clone)]
pub struct ScoreSystem {
    config: ScoreConfig,
    /// Kill values for types missing from `config.base_enemy_scores`.
    fallback_scores: BTreeMap<String, u32>,
    score: u32,
    finalized: bool,
    combo_count: u32,
    best_combo: u32,
    combo_expires_at_ms: Option<f32>,
    current_tier: Option<usize>,
    shots_fired: u32,
    shots_hit: u32,
    breakdown: ScoreBreakdown,
    per_enemy: BTreeMap<String, EnemyScore>,
    cleared_waves: BTreeSet<(usize, usize)>,
    events: VecDeque<ScoreEvent>,
}

impl ScoreSystem {
    pub fn new(mut config: ScoreConfig, fallback_scores: BTreeMap<String, u32>) -> Self {
        config.combo.tiers.sort_by_key(|tier| tier.min_count);
        if config.event_log_size == 0 {
            config.event_log_size = DEFAULT_EVENT_LOG_SIZE;
        }
        Self {
            config,
            fallback_scores,
            score: 0,
            finalized: false,
            combo_count: 0,
            best_combo: 0,
            combo_expires_at_ms: None,
            current_tier: None,
            shots_fired: 0,
            shots_hit: 0,
            breakdown: ScoreBreakdown::default(),
            per_enemy: BTreeMap::new(),
            cleared_waves: BTreeSet::new(),
            events: VecDeque::new(),
        }
    }

    pub fn reset_for_new_run(&mut self) {
        *self = Self::new(
            self.config.clone(),
            std::mem::take(&mut self.fallback_scores),
        );
    }

    /// Drop the combo once its window has passed.
    pub fn update(&mut self, now_ms: f32) {
        self.expire_combo(now_ms);
    }

    pub fn on_shot_fired(&mut self, now_ms: f32) {
        self.shots_fired += 1;
        self.push_event(ScoreEvent::ShotFired { at_ms: now_ms });
    }

    pub fn on_shot_hit(&mut self) {
        self.shots_hit += 1;
    }

    /// Score a kill of an `enemy_id` enemy on level `level_number`.
    /// Returns the points awarded.
    pub fn on_enemy_killed(&mut self, enemy_id: &str, level_number: usize, now_ms: f32) -> u32 {
        self.expire_combo(now_ms);

        let level_multiplier =
            compute_level_multiplier(level_number, &self.config.level_multiplier);
        let base_points = scaled(self.base_enemy_score(enemy_id), level_multiplier);

        let combo_count = self.next_combo_count();
        self.combo_count = combo_count;
        self.best_combo = self.best_combo.max(combo_count);
        let tier_index = if self.combo_active() {
            self.combo_expires_at_ms = Some(now_ms + self.config.combo.window_ms);
            combo_tier_index(&self.config.combo.tiers, combo_count)
        } else {
            self.combo_expires_at_ms = None;
            None
        };

        let multiplier = tier_index.map_or(1.0, |i| self.config.combo.tiers[i].multiplier);
        let combo_extra = scaled(base_points, multiplier).saturating_sub(base_points);
        let entered_tier = self.enter_tier(tier_index);
        let tier_bonus = entered_tier.map_or(0, |i| self.config.combo.tiers[i].tier_bonus);

        let awarded = base_points + combo_extra + tier_bonus;
        self.score += awarded;
        self.breakdown.kills += 1;
        self.breakdown.kill_points += base_points;
        self.breakdown.combo_extra += combo_extra;
        self.breakdown.tier_bonuses += tier_bonus;
        let entry = self.per_enemy.entry(enemy_id.to_string()).or_default();
        entry.kills += 1;
        entry.points += awarded;

        self.push_event(ScoreEvent::Kill {
            at_ms: now_ms,
            enemy_id: enemy_id.to_string(),
            base_points,
            combo_extra,
            tier_bonus,
            combo_count,
            tier_index,
            level_multiplier,
        });
        if let Some(index) = entered_tier {
            let tier = &self.config.combo.tiers[index];
            let min_count = tier.min_count;
            tracing::debug!(tier = %tier.name, combo_count, "Combo tier reached");
            self.push_event(ScoreEvent::TierEnter {
                at_ms: now_ms,
                tier_index: index,
                min_count,
                tier_bonus,
            });
        }
        debug_assert_eq!(self.breakdown.total(), self.score);
        awarded
    }

    /// Break the combo if hits are configured to do so.
    pub fn on_player_hit(&mut self, now_ms: f32) {
        if self.config.combo.reset_on_player_hit {
            self.reset_combo(ComboResetReason::PlayerHit, now_ms);
        }
    }

    /// Pay the wave-clear bonus, at most once per wave. Returns the bonus.
    pub fn on_wave_cleared(
        &mut self,
        level_number: usize,
        wave_index: usize,
        lives_remaining: u32,
        now_ms: f32,
    ) -> u32 {
        if !self.cleared_waves.insert((level_number, wave_index)) {
            return 0;
        }
        let multiplier = compute_level_multiplier(level_number, &self.config.level_multiplier);
        let config = self.config.wave_clear_bonus;
        let bonus = scaled(config.base, multiplier)
            + scaled(config.per_life_bonus.saturating_mul(lives_remaining), multiplier);
        self.score += bonus;
        self.breakdown.wave_clear_bonuses += bonus;
        self.push_event(ScoreEvent::WaveClear {
            at_ms: now_ms,
            level_number,
            wave_index,
            bonus,
        });
        bonus
    }

    /// Apply the end-of-run accuracy bonus. Only the first call counts.
    /// Returns the bonus.
    pub fn finalize_run(&mut self, level_number: usize, now_ms: f32) -> u32 {
        if self.finalized {
            return 0;
        }
        self.finalized = true;

        let accuracy = self.accuracy();
        let accuracy_config = &self.config.accuracy_bonus;
        let Some(threshold) = accuracy_config
            .thresholds
            .iter()
            .filter(|t| accuracy >= t.min_accuracy)
            .max_by(|a, b| a.min_accuracy.total_cmp(&b.min_accuracy))
        else {
            return 0;
        };
        let bonus = if accuracy_config.scale_by_level_multiplier {
            let multiplier =
                compute_level_multiplier(level_number, &self.config.level_multiplier);
            scaled(threshold.bonus, multiplier)
        } else {
            threshold.bonus
        };

        self.score += bonus;
        self.breakdown.accuracy_bonus += bonus;
        self.push_event(ScoreEvent::AccuracyBonus {
            at_ms: now_ms,
            accuracy,
            bonus,
        });
        tracing::info!(score = self.score, accuracy, bonus, "Score finalized");
        bonus
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo_count(&self) -> u32 {
        self.combo_count
    }

    pub fn current_tier(&self) -> Option<&ComboTier> {
        self.current_tier.and_then(|i| self.config.combo.tiers.get(i))
    }

    pub fn accuracy(&self) -> f32 {
        compute_accuracy(self.shots_fired, self.shots_hit)
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn per_enemy(&self) -> &BTreeMap<String, EnemyScore> {
        &self.per_enemy
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Most recent events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &ScoreEvent> + '_ {
        self.events.iter()
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            score: self.score,
            combo_count: self.combo_count,
            best_combo: self.best_combo,
            shots_fired: self.shots_fired,
            shots_hit: self.shots_hit,
            breakdown: self.breakdown,
            finalized: self.finalized,
        }
    }

    fn base_enemy_score(&self, enemy_id: &str) -> u32 {
        self.config
            .base_enemy_scores
            .get(enemy_id)
            .or_else(|| self.fallback_scores.get(enemy_id))
            .copied()
            .unwrap_or(self.config.default_enemy_score)
    }

    fn combo_active(&self) -> bool {
        self.config.combo.enabled && self.config.combo.window_ms > 0.0
    }

    fn next_combo_count(&self) -> u32 {
        if !self.combo_active() {
            0
        } else if self.combo_count > 0 && self.combo_expires_at_ms.is_some() {
            self.combo_count + 1
        } else {
            1
        }
    }

    /// Record the tier for this kill. Returns it if the combo just climbed
    /// into it.
    fn enter_tier(&mut self, tier_index: Option<usize>) -> Option<usize> {
        let Some(index) = tier_index else {
            self.current_tier = None;
            return None;
        };
        let entered = self.current_tier.is_none_or(|current| index > current);
        self.current_tier = Some(index);
        entered.then_some(index)
    }

    fn expire_combo(&mut self, now_ms: f32) {
        if !self.combo_active() || self.combo_count == 0 {
            return;
        }
        if self.combo_expires_at_ms.is_some_and(|expires| now_ms > expires) {
            self.reset_combo(ComboResetReason::Expired, now_ms);
        }
    }

    fn reset_combo(&mut self, reason: ComboResetReason, now_ms: f32) {
        let had_combo = self.combo_count > 0;
        self.combo_count = 0;
        self.combo_expires_at_ms = None;
        self.current_tier = None;
        if had_combo {
            self.push_event(ScoreEvent::ComboReset {
                at_ms: now_ms,
                reason,
            });
        }
    }

    fn push_event(&mut self, event: ScoreEvent) {
        self.events.push_back(event);
        while self.events.len() > self.config.event_log_size {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccuracyThreshold, ComboConfig};

    fn flat_config() -> ScoreConfig {
        ScoreConfig {
            default_enemy_score: 100,
            combo: ComboConfig {
                enabled: false,
                ..ComboConfig::default()
            },
            level_multiplier: LevelMultiplierConfig {
                base: 1.0,
                per_level: 0.0,
                max: 1.0,
            },
            ..ScoreConfig::default()
        }
    }

    fn combo_config(window_ms: f32) -> ScoreConfig {
        let mut config = flat_config();
        config.combo = ComboConfig {
            enabled: true,
            window_ms,
            reset_on_player_hit: true,
            tiers: vec![
                ComboTier::new("triple", 3, 1.5, 300),
                ComboTier::new("double", 2, 2.0, 50),
            ],
        };
        config
    }

    fn system(config: ScoreConfig) -> ScoreSystem {
        ScoreSystem::new(config, BTreeMap::new())
    }

    #[test]
    fn level_multiplier_starts_at_level_one_and_clamps() {
        let config = LevelMultiplierConfig {
            base: 1.0,
            per_level: 0.25,
            max: 1.5,
        };
        assert_eq!(compute_level_multiplier(0, &config), 1.0);
        assert_eq!(compute_level_multiplier(1, &config), 1.0);
        assert_eq!(compute_level_multiplier(2, &config), 1.25);
        assert_eq!(compute_level_multiplier(3, &config), 1.5);
        assert_eq!(compute_level_multiplier(10, &config), 1.5);
    }

    #[test]
    fn tier_selection_picks_highest_reached() {
        let tiers = vec![
            ComboTier::new("a", 2, 1.0, 0),
            ComboTier::new("b", 5, 1.0, 0),
            ComboTier::new("c", 10, 1.0, 0),
        ];
        assert_eq!(combo_tier_index(&tiers, 0), None);
        assert_eq!(combo_tier_index(&tiers, 1), None);
        assert_eq!(combo_tier_index(&tiers, 2), Some(0));
        assert_eq!(combo_tier_index(&tiers, 4), Some(0));
        assert_eq!(combo_tier_index(&tiers, 5), Some(1));
        assert_eq!(combo_tier_index(&tiers, 12), Some(2));
        assert_eq!(combo_tier_index(&[], 12), None);
    }

    #[test]
    fn kill_points_round_base_times_level_multiplier() {
        let mut config = flat_config();
        config.level_multiplier = LevelMultiplierConfig {
            base: 1.0,
            per_level: 0.333,
            max: 5.0,
        };
        config.base_enemy_scores.insert("drone".to_string(), 50);
        let mut score = system(config);
        assert_eq!(score.on_enemy_killed("drone", 2, 0.0), 67);
        assert_eq!(score.on_enemy_killed("other", 1, 10.0), 100);
        assert_eq!(score.combo_count(), 0, "disabled combo never counts");
        assert_eq!(score.score(), 167);
        assert_eq!(score.per_enemy()["drone"], EnemyScore { kills: 1, points: 67 });
    }

    #[test]
    fn score_table_beats_profile_fallback() {
        let mut config = flat_config();
        config.base_enemy_scores.insert("boss".to_string(), 1000);
        let fallback = BTreeMap::from([("boss".to_string(), 1), ("scout".to_string(), 40)]);
        let mut score = ScoreSystem::new(config, fallback);
        assert_eq!(score.on_enemy_killed("boss", 1, 0.0), 1000);
        assert_eq!(score.on_enemy_killed("scout", 1, 0.0), 40);
        assert_eq!(score.on_enemy_killed("unknown", 1, 0.0), 100);
    }

    #[test]
    fn combo_grows_within_window_and_expires_after() {
        let mut score = system(combo_config(500.0));
        score.on_enemy_killed("drone", 1, 0.0);
        score.on_enemy_killed("drone", 1, 400.0);
        assert_eq!(score.combo_count(), 2);

        // 400 + 500 = 900 is the deadline; exactly on it still counts.
        score.on_enemy_killed("drone", 1, 900.0);
        assert_eq!(score.combo_count(), 3);

        score.on_enemy_killed("drone", 1, 1_401.0);
        assert_eq!(score.combo_count(), 1, "expired chain restarts at one");
        assert!(score.events().any(|e| matches!(
            e,
            ScoreEvent::ComboReset {
                reason: ComboResetReason::Expired,
                ..
            }
        )));
    }

    #[test]
    fn update_drops_an_expired_combo() {
        let mut score = system(combo_config(500.0));
        score.on_enemy_killed("drone", 1, 0.0);
        score.on_enemy_killed("drone", 1, 100.0);
        score.update(600.0);
        assert_eq!(score.combo_count(), 2);
        score.update(601.0);
        assert_eq!(score.combo_count(), 0);
        assert!(score.current_tier().is_none());
    }

    #[test]
    fn tier_bonus_paid_once_per_entry() {
        let mut score = system(combo_config(1_000.0));
        assert_eq!(score.on_enemy_killed("drone", 1, 0.0), 100);
        // double: 100 * 2.0 plus the 50 entry bonus
        assert_eq!(score.on_enemy_killed("drone", 1, 100.0), 250);
        assert_eq!(score.current_tier().map(|t| t.name.as_str()), Some("double"));
        // triple: 100 * 1.5, entry bonus 300
        assert_eq!(score.on_enemy_killed("drone", 1, 200.0), 450);
        assert_eq!(score.on_enemy_killed("drone", 1, 300.0), 150);

        let breakdown = score.breakdown();
        assert_eq!(breakdown.kills, 4);
        assert_eq!(breakdown.kill_points, 400);
        assert_eq!(breakdown.combo_extra, 200);
        assert_eq!(breakdown.tier_bonuses, 350);
        assert_eq!(breakdown.total(), score.score());
    }

    #[test]
    fn player_hit_breaks_combo_and_tiers_can_be_earned_again() {
        let mut score = system(combo_config(1_000.0));
        score.on_enemy_killed("drone", 1, 0.0);
        score.on_enemy_killed("drone", 1, 100.0);
        score.on_player_hit(150.0);
        assert_eq!(score.combo_count(), 0);

        score.on_enemy_killed("drone", 1, 200.0);
        assert_eq!(score.on_enemy_killed("drone", 1, 300.0), 250);
        assert_eq!(score.breakdown().tier_bonuses, 100);
    }

    #[test]
    fn player_hit_keeps_combo_when_configured() {
        let mut config = combo_config(1_000.0);
        config.combo.reset_on_player_hit = false;
        let mut score = system(config);
        score.on_enemy_killed("drone", 1, 0.0);
        score.on_player_hit(10.0);
        assert_eq!(score.combo_count(), 1);
    }

    #[test]
    fn wave_clear_bonus_counts_lives_once_per_wave() {
        let mut config = flat_config();
        config.level_multiplier = LevelMultiplierConfig {
            base: 1.5,
            per_level: 0.0,
            max: 1.5,
        };
        let mut score = system(config);
        // round(100 * 1.5) + round(25 * 2 * 1.5)
        assert_eq!(score.on_wave_cleared(1, 0, 2, 1_000.0), 225);
        assert_eq!(score.on_wave_cleared(1, 0, 2, 1_001.0), 0);
        assert_eq!(score.on_wave_cleared(1, 1, 0, 2_000.0), 150);
        assert_eq!(score.breakdown().wave_clear_bonuses, 375);
        assert_eq!(score.score(), 375);
    }

    #[test]
    fn accuracy_bonus_applies_highest_threshold_once() {
        let mut config = flat_config();
        config.accuracy_bonus.thresholds = vec![
            AccuracyThreshold {
                min_accuracy: 0.5,
                bonus: 100,
            },
            AccuracyThreshold {
                min_accuracy: 0.8,
                bonus: 300,
            },
        ];
        let mut score = system(config);
        for i in 0..10 {
            score.on_shot_fired(i as f32);
        }
        for _ in 0..8 {
            score.on_shot_hit();
        }
        assert_eq!(score.finalize_run(1, 2_000.0), 300);
        assert_eq!(score.finalize_run(1, 2_001.0), 0);
        assert!(score.is_finalized());
        assert_eq!(score.score(), 300);
        assert_eq!(score.breakdown().accuracy_bonus, 300);
    }

    #[test]
    fn no_shots_means_no_accuracy_bonus() {
        assert_eq!(compute_accuracy(0, 0), 0.0);
        let mut score = system(ScoreConfig::default());
        assert_eq!(score.finalize_run(3, 0.0), 0);
        assert!(score.is_finalized());
    }

    #[test]
    fn event_log_keeps_most_recent() {
        let mut config = flat_config();
        config.event_log_size = 3;
        let mut score = system(config);
        for i in 0..5 {
            score.on_shot_fired(i as f32);
        }
        let times: Vec<f32> = score
            .events()
            .map(|e| match e {
                ScoreEvent::ShotFired { at_ms } => *at_ms,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn reset_for_new_run_starts_from_zero() {
        let fallback = BTreeMap::from([("scout".to_string(), 40)]);
        let mut score = ScoreSystem::new(combo_config(1_000.0), fallback);
        score.on_shot_fired(0.0);
        score.on_enemy_killed("scout", 1, 0.0);
        score.on_wave_cleared(1, 0, 3, 10.0);
        score.finalize_run(1, 20.0);

        score.reset_for_new_run();
        assert_eq!(score.summary(), ScoreSummary::default());
        assert_eq!(score.events().count(), 0);
        assert_eq!(score.on_enemy_killed("scout", 1, 0.0), 40, "fallback survives reset");
        assert!(score.on_wave_cleared(1, 0, 3, 10.0) > 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn score_never_decreases_and_matches_breakdown(
                ops in proptest::collection::vec((0u8..4, 0.0f32..800.0, 1usize..6), 1..60)
            ) {
                let mut score = system(combo_config(300.0));
                let mut now = 0.0;
                let mut last = 0;
                for &(op, gap, level) in &ops {
                    now += gap;
                    match op {
                        0 => score.on_shot_fired(now),
                        1 => score.on_player_hit(now),
                        2 => score.update(now),
                        _ => {
                            score.on_enemy_killed("drone", level, now);
                        },
                    }
                    prop_assert!(score.score() >= last);
                    prop_assert_eq!(score.breakdown().total(), score.score());
                    last = score.score();
                }
            }
        }
    }
}
