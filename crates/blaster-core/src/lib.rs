pub mod disposable;
pub mod events;
pub mod geometry;
pub mod level_config;
pub mod ports;
pub mod random;
pub mod run_machine;
pub mod run_state;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::events::EndRunReason;
    use crate::level_config::{ResolvedLevelConfig, ResolvedRunConfig, ResolvedWave};
    use crate::ports::{EnemyId, FormationPort, FormationSlot, RunStatePort};
    use crate::random::RandomSource;

    /// Replays a fixed sequence of draws, repeating the last one forever.
    #[derive(Debug, Clone)]
    pub struct ScriptedRandom {
        values: Vec<f32>,
        index: usize,
    }

    impl ScriptedRandom {
        pub fn new(values: impl Into<Vec<f32>>) -> Self {
            Self {
                values: values.into(),
                index: 0,
            }
        }

        /// Number of draws taken so far.
        pub fn draws(&self) -> usize {
            self.index
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_f32(&mut self) -> f32 {
            let value = self
                .values
                .get(self.index.min(self.values.len().saturating_sub(1)))
                .copied()
                .unwrap_or(0.0);
            self.index += 1;
            value
        }
    }

    /// A request captured by [`RecordingRunPort`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RunRequest {
        WaveClear,
        LevelComplete,
        EndRun(EndRunReason),
    }

    /// Run-state port that records every request in order.
    #[derive(Debug, Default)]
    pub struct RecordingRunPort {
        pub requests: Vec<RunRequest>,
    }

    impl RunStatePort for RecordingRunPort {
        fn request_wave_clear(&mut self) {
            self.requests.push(RunRequest::WaveClear);
        }

        fn request_level_complete(&mut self) {
            self.requests.push(RunRequest::LevelComplete);
        }

        fn request_end_run(&mut self, reason: EndRunReason) {
            self.requests.push(RunRequest::EndRun(reason));
        }
    }

    /// Formation double whose slots and enemy count are set by the test.
    #[derive(Debug, Default)]
    pub struct StubFormation {
        pub slots: Vec<FormationSlot>,
        pub active_enemies: usize,
        pub spawned: Vec<ResolvedWave>,
        pub level_indices: Vec<usize>,
    }

    impl StubFormation {
        pub fn push_slot(&mut self, enemy: EnemyId, row: u32, column: u32) {
            self.slots.push(FormationSlot {
                enemy,
                row,
                column,
                alive: true,
                in_formation: true,
            });
        }

        pub fn slot_mut(&mut self, enemy: EnemyId) -> Option<&mut FormationSlot> {
            self.slots.iter_mut().find(|s| s.enemy == enemy)
        }
    }

    impl FormationPort for StubFormation {
        fn spawn_formation(&mut self, wave: &ResolvedWave) {
            self.spawned.push(wave.clone());
            self.active_enemies = wave.count.max(1) as usize;
        }

        fn slots(&self) -> &[FormationSlot] {
            &self.slots
        }

        fn active_enemy_count(&self) -> usize {
            self.active_enemies
        }

        fn set_level_index(&mut self, level_index: usize) {
            self.level_indices.push(level_index);
        }
    }

    /// A wave of `count` enemies of type `enemy_id`.
    pub fn wave(enemy_id: &str, count: u32) -> ResolvedWave {
        ResolvedWave {
            enemy_id: enemy_id.to_string(),
            count,
            spawn_delay_ms: None,
        }
    }

    /// A run config with one level per entry, each entry giving the enemy
    /// counts of that level's waves.
    pub fn run_config(levels: &[&[u32]]) -> ResolvedRunConfig {
        ResolvedRunConfig {
            levels: levels
                .iter()
                .enumerate()
                .map(|(level_index, counts)| ResolvedLevelConfig {
                    level_id: Some(format!("level-{}", level_index + 1)),
                    layout_id: "grid".to_string(),
                    waves: counts
                        .iter()
                        .enumerate()
                        .map(|(i, &count)| wave(&format!("enemy-{i}"), count))
                        .collect(),
                    dive: None,
                    shooting: None,
                })
                .collect(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn scripted_random_repeats_last_value() {
            let mut rng = ScriptedRandom::new([0.1, 0.9]);
            assert_eq!(rng.next_f32(), 0.1);
            assert_eq!(rng.next_f32(), 0.9);
            assert_eq!(rng.next_f32(), 0.9);
            assert_eq!(rng.draws(), 3);
        }

        #[test]
        fn empty_script_draws_zero() {
            let mut rng = ScriptedRandom::new(Vec::<f32>::new());
            assert_eq!(rng.next_f32(), 0.0);
        }

        #[test]
        fn run_config_builder_shapes_levels() {
            let cfg = run_config(&[&[3, 4], &[5]]);
            assert_eq!(cfg.levels.len(), 2);
            assert_eq!(cfg.levels[0].waves[1].count, 4);
            assert_eq!(cfg.levels[1].waves.len(), 1);
        }
    }
}
