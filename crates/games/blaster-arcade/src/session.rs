use serde::{Deserialize, Serialize};

use blaster_core::disposable::DisposableBag;
use blaster_core::events::{EndRunReason, ProgressionReason, RunEvent};
use blaster_core::geometry::{Point, boxes_overlap};
use blaster_core::level_config::ResolvedRunConfig;
use blaster_core::ports::{FormationPort, RunStatePort};
use blaster_core::random::{RandomSource, SeededRandom};
use blaster_core::run_machine::{RunError, RunStateMachine};
use blaster_core::run_state::{
    RunState, can_player_fire, is_run_start_transition, is_simulation_running,
};

use crate::config::{ArcadeConfig, DiveConfig, PLAYER_MUZZLE_OFFSET_Y};
use crate::dive::DiveScheduler;
use crate::eligibility::ShooterEligibility;
use crate::enemy_fire::EnemyFireSystem;
use crate::formation::GridFormation;
use crate::level::{LevelSystem, WaveStarted};
use crate::life::{HitOutcome, PlayerLifeSystem};
use crate::motion::{MotionParams, MotionState, integrate_horizontal};
use crate::scoring::{ScoreSummary, ScoreSystem};
use crate::weapon::WeaponSystem;

/// Builds a fresh random source each time a system needs one.
pub type RandomFactory = Box<dyn FnMut() -> Box<dyn RandomSource>>;

/// Player input sampled for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameInput {
    /// Horizontal axis; only its sign matters.
    pub axis: f32,
    pub fire: bool,
    /// Start (or restart) a run from READY or RESULTS.
    pub start: bool,
    /// A menu or dialog is covering gameplay.
    pub overlay_blocking: bool,
}

/// Tallies for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunCounters {
    pub kills: u32,
    pub shots_fired: u32,
    pub enemy_shots_fired: u32,
    pub hits_taken: u32,
    pub waves_started: u32,
    pub dives_started: u32,
}

/// Snapshot of where the run stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: RunState,
    pub level_number: usize,
    pub wave_index: usize,
    pub lives: u32,
    pub counters: RunCounters,
    pub score: ScoreSummary,
    pub end_reason: Option<EndRunReason>,
    pub sim_time_ms: f32,
}

/// One arcade run: owns every system and drives them frame by frame.
///
/// [`step`](Self::step) is the only place subsystem updates happen, always
/// in this order:
///
/// 1. run-state machine (no time passes while an overlay blocks), with each
///    transition dispatched to the level system and then to the session
/// 2. stop unless the simulation is running
/// 3. player motion
/// 4. life timers and combo expiry
/// 5. player fire
/// 6. formation march and enemy controllers
/// 7. dive scheduler
/// 8. shooter eligibility refresh
/// 9. enemy fire
/// 10. both weapons move and recycle projectiles
/// 11. collisions: player shots against enemies, then enemy shots and
///     enemy bodies against the player
/// 12. breach check
/// 13. level system, last, so it sees this frame's kills; a wave emptied
///     this frame pays its clear bonus
pub struct ArcadeSession {
    config: ArcadeConfig,
    machine: RunStateMachine,
    level: LevelSystem,
    formation: GridFormation,
    eligibility: ShooterEligibility,
    dive: Option<DiveScheduler>,
    enemy_fire: EnemyFireSystem,
    player_weapon: WeaponSystem,
    enemy_weapon: WeaponSystem,
    life: PlayerLifeSystem,
    score: ScoreSystem,
    motion: MotionState,
    motion_params: MotionParams,
    random_factory: RandomFactory,
    counters: RunCounters,
    sim_time_ms: f32,
    end_requested: bool,
    disposables: DisposableBag,
}

impl std::fmt::Debug for ArcadeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArcadeSession")
            .field("state", &self.machine.state())
            .field("level_number", &self.level.level_number())
            .field("wave_index", &self.level.wave_index())
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl ArcadeSession {
    /// Session whose random decisions all derive from `seed`.
    pub fn new(config: ArcadeConfig, run: ResolvedRunConfig, seed: u64) -> Self {
        let mut stream = 0u64;
        Self::with_random_factory(
            config,
            run,
            Box::new(move || {
                stream += 1;
                Box::new(SeededRandom::from_seed(seed.wrapping_add(stream)))
            }),
        )
    }

    pub fn with_random_factory(
        config: ArcadeConfig,
        run: ResolvedRunConfig,
        mut random_factory: RandomFactory,
    ) -> Self {
        let motion_params = MotionParams {
            min_x: config.play_bounds.min_x,
            max_x: config.play_bounds.max_x,
            half_width: config.motion.half_width,
            max_speed_px_per_sec: config.motion.max_speed_px_per_sec,
        };
        let mut machine = RunStateMachine::new(config.run);
        machine.request_boot_complete();
        let fallback_scores = config
            .enemies
            .iter()
            .filter_map(|(id, profile)| Some((id.clone(), profile.base_score?)))
            .collect();

        Self {
            machine,
            level: LevelSystem::new(run),
            formation: GridFormation::new(config.formation, config.enemy, config.play_bounds)
                .with_profiles(config.enemies.clone()),
            eligibility: ShooterEligibility::new(),
            dive: None,
            enemy_fire: EnemyFireSystem::new(config.enemy_fire, random_factory()),
            player_weapon: WeaponSystem::new(config.weapon, config.projectile_bounds),
            enemy_weapon: WeaponSystem::new(config.enemy_weapon, config.projectile_bounds),
            life: PlayerLifeSystem::new(config.life),
            score: ScoreSystem::new(config.score.clone(), fallback_scores),
            motion: MotionState {
                x: config.play_bounds.center_x(),
                velocity_x: 0.0,
            },
            motion_params,
            random_factory,
            counters: RunCounters::default(),
            sim_time_ms: 0.0,
            end_requested: false,
            disposables: DisposableBag::new(),
            config,
        }
    }

    /// Advance one frame by `dt_ms`. Returns the run events the frame
    /// produced.
    pub fn step(&mut self, dt_ms: f32, input: &FrameInput) -> Result<Vec<RunEvent>, RunError> {
        if input.start && matches!(self.machine.state(), RunState::Ready | RunState::Results) {
            self.machine.request_start();
        }

        // 1. run state
        let machine_dt = if input.overlay_blocking { 0.0 } else { dt_ms };
        let events = self.machine.update(machine_dt)?;
        for event in &events {
            if let Some((from, to)) = event.transition() {
                self.on_enter_run_state(to, from);
            }
        }

        // 2. gate
        let state = self.machine.state();
        if !is_simulation_running(state, input.overlay_blocking) || dt_ms <= 0.0 {
            return Ok(events);
        }
        self.sim_time_ms += dt_ms;

        // 3. motion
        self.motion = integrate_horizontal(self.motion, input.axis, dt_ms, &self.motion_params);

        // 4. life timers and combo window
        self.life.update(dt_ms);
        self.score.update(self.sim_time_ms);

        // 5. player fire
        if input.fire
            && can_player_fire(state, self.life.is_invulnerable())
            && self.player_weapon.try_fire(
                self.motion.x,
                self.config.player_y() - PLAYER_MUZZLE_OFFSET_Y,
                -1.0,
            )
        {
            self.counters.shots_fired += 1;
            self.score.on_shot_fired(self.sim_time_ms);
        }

        // 6. formation and enemy controllers
        let player = self.player_position();
        self.formation.update(dt_ms, Some(player));

        // 7. dives
        if let Some(dive) = self.dive.as_mut() {
            let started = dive.update(dt_ms, &mut self.formation);
            self.counters.dives_started += started.len() as u32;
        }

        // 8. eligibility
        if self.formation.take_roster_changed() {
            self.eligibility.rebuild_from_formation(self.formation.slots());
        }

        // 9. enemy fire
        let formation = &self.formation;
        if self.enemy_fire.update(
            dt_ms,
            &self.eligibility,
            |enemy| formation.enemy_position(enemy),
            &mut self.enemy_weapon,
        ) {
            self.counters.enemy_shots_fired += 1;
        }

        // 10. weapons
        self.player_weapon.update(dt_ms);
        self.enemy_weapon.update(dt_ms);

        // 11. collisions
        self.resolve_player_shots();
        self.resolve_player_hits();

        // 12. breach
        if !self.end_requested && self.formation.breached(self.config.breach_y()) {
            tracing::info!(level_number = self.level.level_number(), "Enemy breached the line");
            self.request_end_run(EndRunReason::EnemyBreach);
        }

        // 13. level progression
        let already_requested = self.level.progression_requested();
        self.level.update(dt_ms, &self.formation, &mut self.machine);
        if !already_requested && self.level.progression_requested() {
            let bonus = self.score.on_wave_cleared(
                self.level.level_number(),
                self.level.wave_index(),
                self.life.lives(),
                self.sim_time_ms,
            );
            tracing::debug!(bonus, wave_index = self.level.wave_index(), "Wave cleared");
        }

        Ok(events)
    }

    fn resolve_player_shots(&mut self) {
        let shot_half = (
            self.config.weapon.projectile_half_width,
            self.config.weapon.projectile_half_height,
        );
        let hits: Vec<_> = self
            .player_weapon
            .projectiles()
            .filter_map(|(handle, shot)| {
                self.formation
                    .enemy_at(shot.position(), shot_half)
                    .map(|enemy| (handle, enemy))
            })
            .collect();

        let enemy_id = self
            .level
            .active_wave()
            .map(|wave| wave.enemy_id.clone())
            .unwrap_or_default();
        let level_number = self.level.level_number();
        let mut killed = false;
        for (handle, enemy) in hits {
            if self.formation.kill(enemy) {
                self.player_weapon.release_projectile(handle);
                self.counters.kills += 1;
                self.score.on_shot_hit();
                self.score.on_enemy_killed(&enemy_id, level_number, self.sim_time_ms);
                killed = true;
            }
        }
        if killed {
            self.formation.take_roster_changed();
            self.eligibility.on_enemy_died(self.formation.slots());
        }
    }

    fn resolve_player_hits(&mut self) {
        let player = self.player_position();
        let player_half = (self.config.motion.half_width, self.config.motion.half_height);
        let shot_half = (
            self.config.enemy_weapon.projectile_half_width,
            self.config.enemy_weapon.projectile_half_height,
        );

        let hit_by: Vec<_> = self
            .enemy_weapon
            .projectiles()
            .filter(|(_, shot)| boxes_overlap(shot.position(), shot_half, player, player_half))
            .map(|(handle, _)| handle)
            .collect();
        for handle in hit_by {
            self.enemy_weapon.release_projectile(handle);
            self.on_player_hit();
        }

        if self.formation.enemy_at(player, player_half).is_some() {
            self.on_player_hit();
        }
    }

    fn on_player_hit(&mut self) {
        if self.machine.state() != RunState::Playing {
            return;
        }
        match self.life.on_player_hit() {
            HitOutcome::Ignored => {},
            HitOutcome::Respawn { lives_remaining } => {
                self.counters.hits_taken += 1;
                self.score.on_player_hit(self.sim_time_ms);
                tracing::info!(lives_remaining, "Player hit, respawning");
                self.machine.request_respawn();
            },
            HitOutcome::EndRun { .. } => {
                self.counters.hits_taken += 1;
                self.score.on_player_hit(self.sim_time_ms);
                tracing::info!("Player hit with no lives left");
                self.request_end_run(EndRunReason::LivesExhausted);
            },
        }
    }

    fn request_end_run(&mut self, reason: EndRunReason) {
        if self.end_requested {
            return;
        }
        self.end_requested = true;
        self.machine.request_end_run(reason);
    }

    fn on_enter_run_state(&mut self, to: RunState, from: RunState) {
        if let Some(started) =
            self.level
                .on_enter_run_state(to, from, &mut self.formation, &mut self.machine)
        {
            self.on_wave_started(started);
        }

        match to {
            RunState::Ready => {
                self.reset_entities();
                self.begin_new_run();
            },
            RunState::Countdown => {
                self.reset_entities();
                if is_run_start_transition(from, to) {
                    self.begin_new_run();
                }
                if from == RunState::PlayerRespawn {
                    self.life.start_respawn_invulnerability();
                }
            },
            RunState::PlayerRespawn | RunState::WaveClear | RunState::LevelComplete => {
                self.reset_entities();
            },
            RunState::RunEnding => {
                self.score.finalize_run(self.level.level_number(), self.sim_time_ms);
                tracing::info!(
                    reason = ?self.machine.end_reason(),
                    kills = self.counters.kills,
                    score = self.score.score(),
                    level_number = self.level.level_number(),
                    "Run ending"
                );
            },
            RunState::Results => {
                self.score.finalize_run(self.level.level_number(), self.sim_time_ms);
                tracing::info!(summary = ?self.summary(), "Run finished");
            },
            RunState::Error => {
                tracing::error!(%from, "Run state machine entered ERROR");
            },
            RunState::Boot | RunState::Playing => {},
        }
    }

    fn on_wave_started(&mut self, started: WaveStarted) {
        self.counters.waves_started += 1;
        self.formation.take_roster_changed();
        self.eligibility.rebuild_from_formation(self.formation.slots());

        let dive_config = started
            .level
            .dive
            .map(DiveConfig::from)
            .unwrap_or(self.config.dive);
        self.dive = if DiveScheduler::is_enabled(&dive_config) {
            Some(DiveScheduler::new(dive_config, (self.random_factory)()))
        } else {
            tracing::debug!(?dive_config, "Dive scheduler disabled for this wave");
            None
        };

        let fire_rate = match started.level.shooting {
            Some(percent) if percent > 0.0 => percent / 100.0,
            _ => self.config.enemy_fire.fire_chance_per_second,
        };
        self.enemy_fire.set_fire_chance_per_second(fire_rate);
    }

    fn reset_entities(&mut self) {
        self.formation.clear();
        self.formation.take_roster_changed();
        self.eligibility.clear();
        self.dive = None;
        self.player_weapon.clear();
        self.enemy_weapon.clear();
        self.motion = MotionState {
            x: self.config.play_bounds.center_x(),
            velocity_x: 0.0,
        };
    }

    fn begin_new_run(&mut self) {
        self.life.reset();
        self.level.start_level(0);
        self.counters = RunCounters::default();
        self.score.reset_for_new_run();
        self.sim_time_ms = 0.0;
        self.end_requested = false;
    }

    /// Skip the rest of the current wave, e.g. when its last enemies stall.
    pub fn force_wave_clear(&mut self, reason: ProgressionReason) {
        self.level.force_wave_clear(reason, &mut self.machine);
    }

    /// Register a teardown action for [`shutdown`](Self::shutdown).
    pub fn on_shutdown(&mut self, action: impl FnOnce() + 'static) {
        self.disposables.add(action);
    }

    /// Release every entity and run the registered teardown actions, most
    /// recent first. Returns how many of them failed.
    pub fn shutdown(&mut self) -> usize {
        self.reset_entities();
        let failures = self.disposables.dispose_all();
        tracing::debug!(failures, "Arcade session shut down");
        failures
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.machine.state(),
            level_number: self.level.level_number(),
            wave_index: self.level.wave_index(),
            lives: self.life.lives(),
            counters: self.counters,
            score: self.score.summary(),
            end_reason: self.machine.end_reason(),
            sim_time_ms: self.sim_time_ms,
        }
    }

    pub fn state(&self) -> RunState {
        self.machine.state()
    }

    pub fn player_position(&self) -> Point {
        Point::new(self.motion.x, self.config.player_y())
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn config(&self) -> &ArcadeConfig {
        &self.config
    }

    pub fn level(&self) -> &LevelSystem {
        &self.level
    }

    pub fn formation(&self) -> &GridFormation {
        &self.formation
    }

    pub fn eligibility(&self) -> &ShooterEligibility {
        &self.eligibility
    }

    pub fn life(&self) -> &PlayerLifeSystem {
        &self.life
    }

    pub fn score(&self) -> &ScoreSystem {
        &self.score
    }

    pub fn player_weapon(&self) -> &WeaponSystem {
        &self.player_weapon
    }

    pub fn enemy_weapon(&self) -> &WeaponSystem {
        &self.enemy_weapon
    }

    pub fn enemy_fire(&self) -> &EnemyFireSystem {
        &self.enemy_fire
    }

    pub fn dive_scheduler(&self) -> Option<&DiveScheduler> {
        self.dive.as_ref()
    }

    pub fn pending_teardown(&self) -> usize {
        self.disposables.len()
    }
}
