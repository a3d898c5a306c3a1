use blaster_core::geometry::Point;
use blaster_core::ports::EnemyId;
use blaster_core::random::{RandomSource, pick_index};

use crate::config::EnemyFireConfig;
use crate::eligibility::ShooterEligibility;
use crate::weapon::WeaponSystem;

/// Random return fire from the front-line shooters.
pub struct EnemyFireSystem {
    fire_chance_per_second: f32,
    muzzle_offset_y: f32,
    random: Box<dyn RandomSource>,
}

impl std::fmt::Debug for EnemyFireSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnemyFireSystem")
            .field("fire_chance_per_second", &self.fire_chance_per_second)
            .field("muzzle_offset_y", &self.muzzle_offset_y)
            .finish_non_exhaustive()
    }
}

impl EnemyFireSystem {
    pub fn new(config: EnemyFireConfig, random: Box<dyn RandomSource>) -> Self {
        Self {
            fire_chance_per_second: config.fire_chance_per_second,
            muzzle_offset_y: config.muzzle_offset_y,
            random,
        }
    }

    /// Change the per-second fire chance, e.g. when a level overrides it.
    pub fn set_fire_chance_per_second(&mut self, rate: f32) {
        self.fire_chance_per_second = rate.max(0.0);
    }

    pub fn fire_chance_per_second(&self) -> f32 {
        self.fire_chance_per_second
    }

    /// Roll for one shot this frame. On success a random eligible shooter
    /// fires `weapon` straight down. Returns whether a projectile left.
    pub fn update(
        &mut self,
        sim_dt_ms: f32,
        eligibility: &ShooterEligibility,
        position_of: impl Fn(EnemyId) -> Option<Point>,
        weapon: &mut WeaponSystem,
    ) -> bool {
        if sim_dt_ms <= 0.0 || self.fire_chance_per_second <= 0.0 {
            return false;
        }

        let probability = (self.fire_chance_per_second * sim_dt_ms / 1000.0).min(1.0);
        if self.random.next_f32() >= probability {
            return false;
        }
        if eligibility.is_empty() {
            return false;
        }

        let index = pick_index(self.random.next_f32(), eligibility.len());
        let Some(shooter) = eligibility.all_eligible().nth(index) else {
            return false;
        };
        let Some(origin) = position_of(shooter) else {
            return false;
        };
        weapon.try_fire(origin.x, origin.y + self.muzzle_offset_y, 1.0)
    }
}
