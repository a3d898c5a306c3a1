use blaster_core::ports::EnemyId;
use blaster_core::random::{RandomSource, pick_index};

use crate::config::DiveConfig;
use crate::enemy::EnemyLocalState;

/// Per-tick view of one enemy that might be sent on a dive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiveCandidate {
    pub enemy: EnemyId,
    pub active: bool,
    pub can_dive: bool,
    pub state: EnemyLocalState,
}

/// Whatever owns the enemies the scheduler picks from.
pub trait DiveCandidateSource {
    /// Fresh snapshot of every enemy. Called once per attack tick.
    fn dive_candidates(&self) -> Vec<DiveCandidate>;

    /// Send `enemy` on a dive. Returns false if it could not start.
    fn start_dive(&mut self, enemy: EnemyId) -> bool;
}

/// Fixed-tick attack scheduler.
///
/// Simulated time accumulates and every full `attack_tick_ms` runs one
/// attack tick, so a long frame runs several ticks. Each tick is a single
/// Bernoulli trial; on success one random in-formation candidate dives,
/// unless `max_concurrent_divers` are already diving.
pub struct DiveScheduler {
    config: DiveConfig,
    accumulator_ms: f32,
    random: Box<dyn RandomSource>,
}

impl std::fmt::Debug for DiveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiveScheduler")
            .field("config", &self.config)
            .field("accumulator_ms", &self.accumulator_ms)
            .finish_non_exhaustive()
    }
}

impl DiveScheduler {
    pub fn new(config: DiveConfig, random: Box<dyn RandomSource>) -> Self {
        Self {
            config,
            accumulator_ms: 0.0,
            random,
        }
    }

    /// Whether `config` can ever start a dive.
    pub fn is_enabled(config: &DiveConfig) -> bool {
        config.attack_tick_ms > 0.0
            && config.dive_chance_per_tick > 0.0
            && config.max_concurrent_divers > 0
    }

    pub fn config(&self) -> &DiveConfig {
        &self.config
    }

    /// Run every attack tick that `sim_dt_ms` completes. Returns the enemies
    /// that started diving, in order.
    pub fn update(&mut self, sim_dt_ms: f32, source: &mut dyn DiveCandidateSource) -> Vec<EnemyId> {
        let mut started = Vec::new();
        if sim_dt_ms <= 0.0 || self.config.attack_tick_ms <= 0.0 {
            return started;
        }

        self.accumulator_ms += sim_dt_ms;
        while self.accumulator_ms >= self.config.attack_tick_ms {
            self.accumulator_ms -= self.config.attack_tick_ms;
            if let Some(enemy) = self.attack_tick(source) {
                started.push(enemy);
            }
        }
        started
    }

    fn attack_tick(&mut self, source: &mut dyn DiveCandidateSource) -> Option<EnemyId> {
        let candidates: Vec<DiveCandidate> = source
            .dive_candidates()
            .into_iter()
            .filter(|c| c.active)
            .collect();

        let diving = candidates
            .iter()
            .filter(|c| c.state == EnemyLocalState::Diving)
            .count();
        if diving >= self.config.max_concurrent_divers as usize {
            return None;
        }

        let chance = self.config.dive_chance_per_tick.clamp(0.0, 1.0);
        if chance <= 0.0 || self.random.next_f32() >= chance {
            return None;
        }

        let eligible: Vec<EnemyId> = candidates
            .iter()
            .filter(|c| c.can_dive && c.state == EnemyLocalState::Formation)
            .map(|c| c.enemy)
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let enemy = eligible[pick_index(self.random.next_f32(), eligible.len())];
        if !source.start_dive(enemy) {
            return None;
        }
        tracing::debug!(enemy, diving = diving + 1, "Enemy started dive");
        Some(enemy)
    }
}
