use blaster_core::events::ProgressionReason;
use blaster_core::level_config::{ResolvedLevelConfig, ResolvedRunConfig, ResolvedWave};
use blaster_core::ports::{FormationPort, RunStatePort};
use blaster_core::run_state::RunState;

/// Details of a wave that was just spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveStarted {
    pub level_index: usize,
    pub wave_index: usize,
    pub wave: ResolvedWave,
    pub level: ResolvedLevelConfig,
}

/// Walks the run through its levels and waves.
///
/// Follows run-state transitions reported through
/// [`on_enter_run_state`](Self::on_enter_run_state) and asks for the next
/// transition through a [`RunStatePort`] once a wave is cleared.
#[derive(Debug, Clone)]
pub struct LevelSystem {
    run: ResolvedRunConfig,
    level_index: usize,
    wave_index: usize,
    progression_requested: bool,
}

impl LevelSystem {
    pub fn new(run: ResolvedRunConfig) -> Self {
        Self {
            run,
            level_index: 0,
            wave_index: 0,
            progression_requested: false,
        }
    }

    /// Restart at the first wave of `level_index` (clamped into range).
    pub fn start_level(&mut self, level_index: usize) {
        self.level_index = level_index.min(self.run.level_count().saturating_sub(1));
        self.wave_index = 0;
        self.progression_requested = false;
    }

    /// React to the run entering `state` from `from`. Returns the wave that
    /// was spawned, if any.
    pub fn on_enter_run_state(
        &mut self,
        state: RunState,
        from: RunState,
        formation: &mut dyn FormationPort,
        run_port: &mut dyn RunStatePort,
    ) -> Option<WaveStarted> {
        match state {
            RunState::Countdown => {
                match from {
                    RunState::Ready | RunState::Results => self.start_level(self.level_index),
                    RunState::WaveClear => self.advance_to_next_wave(),
                    _ => {},
                }
                None
            },
            RunState::Playing => self.start_wave(self.wave_index, formation),
            RunState::LevelComplete => {
                if self.has_next_level() {
                    self.level_index += 1;
                    self.wave_index = 0;
                    self.progression_requested = false;
                    tracing::info!(level_number = self.level_number(), "Advancing to next level");
                } else {
                    let reason = ProgressionReason::EnemiesDepleted.end_run_reason();
                    tracing::info!(%reason, "No levels left, ending run");
                    run_port.request_end_run(reason);
                }
                None
            },
            RunState::WaveClear if !self.has_next_wave() && !self.has_next_level() => {
                let reason = ProgressionReason::EnemiesDepleted.end_run_reason();
                tracing::info!(%reason, "Final wave cleared, ending run");
                run_port.request_end_run(reason);
                None
            },
            _ => None,
        }
    }

    /// Request progression once the formation is empty. Ignores
    /// non-positive `sim_dt_ms`.
    pub fn update(
        &mut self,
        sim_dt_ms: f32,
        formation: &dyn FormationPort,
        run_port: &mut dyn RunStatePort,
    ) {
        if sim_dt_ms <= 0.0 || self.progression_requested {
            return;
        }
        if formation.active_enemy_count() > 0 {
            return;
        }
        self.request_progression(ProgressionReason::EnemiesDepleted, run_port);
    }

    /// Move on from the current wave regardless of enemies left. At most
    /// one request is sent per wave.
    pub fn force_wave_clear(&mut self, reason: ProgressionReason, run_port: &mut dyn RunStatePort) {
        self.request_progression(reason, run_port);
    }

    pub fn has_next_wave(&self) -> bool {
        self.active_level()
            .is_some_and(|level| self.wave_index + 1 < level.waves.len())
    }

    pub fn has_next_level(&self) -> bool {
        self.level_index + 1 < self.run.level_count()
    }

    pub fn active_level(&self) -> Option<&ResolvedLevelConfig> {
        self.run.level(self.level_index)
    }

    pub fn active_wave(&self) -> Option<&ResolvedWave> {
        self.active_level()?.waves.get(self.wave_index)
    }

    /// 1-based level number for display.
    pub fn level_number(&self) -> usize {
        self.level_index + 1
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn wave_index(&self) -> usize {
        self.wave_index
    }

    pub fn progression_requested(&self) -> bool {
        self.progression_requested
    }

    fn start_wave(
        &mut self,
        wave_index: usize,
        formation: &mut dyn FormationPort,
    ) -> Option<WaveStarted> {
        let level = self.run.level(self.level_index)?;
        if level.waves.is_empty() {
            tracing::warn!(level_index = self.level_index, "Level has no waves, nothing to spawn");
            return None;
        }
        let wave_index = wave_index.min(level.waves.len() - 1);
        let wave = level.waves[wave_index].clone();
        let level = level.clone();

        self.wave_index = wave_index;
        self.progression_requested = false;
        formation.set_level_index(self.level_index);
        formation.spawn_formation(&wave);
        tracing::info!(
            level_index = self.level_index,
            wave_index,
            enemy_id = %wave.enemy_id,
            count = wave.count,
            "Wave started"
        );

        Some(WaveStarted {
            level_index: self.level_index,
            wave_index,
            wave,
            level,
        })
    }

    fn advance_to_next_wave(&mut self) {
        if self.has_next_wave() {
            self.wave_index += 1;
        }
        self.progression_requested = false;
    }

    fn request_progression(&mut self, reason: ProgressionReason, run_port: &mut dyn RunStatePort) {
        if self.progression_requested {
            return;
        }
        self.progression_requested = true;

        if self.has_next_wave() {
            tracing::info!(?reason, wave_index = self.wave_index, "Requesting wave clear");
            run_port.request_wave_clear();
        } else if self.has_next_level() {
            tracing::info!(?reason, level_index = self.level_index, "Requesting level complete");
            run_port.request_level_complete();
        } else {
            let end_reason = reason.end_run_reason();
            tracing::info!(?reason, %end_reason, "Requesting end of run");
            run_port.request_end_run(end_reason);
        }
    }
}
