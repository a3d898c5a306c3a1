use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::events::{EndRunReason, RunEvent, TransitionReason};
use crate::ports::RunStatePort;
use crate::run_state::RunState;

/// How long the timed states last before advancing on their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTimings {
    pub countdown_ms: f32,
    pub respawn_delay_ms: f32,
    pub wave_clear_delay_ms: f32,
    pub level_complete_delay_ms: f32,
    pub run_ending_delay_ms: f32,
}

impl Default for RunTimings {
    fn default() -> Self {
        Self {
            countdown_ms: 3000.0,
            respawn_delay_ms: 1200.0,
            wave_clear_delay_ms: 1000.0,
            level_complete_delay_ms: 1500.0,
            run_ending_delay_ms: 1500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunIntent {
    BootComplete,
    Start,
    Respawn,
    WaveClear,
    LevelComplete,
    EndRun(EndRunReason),
}

/// Errors raised while advancing the run-state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    NegativeDelta(f32),
    IllegalTransition { from: RunState, to: RunState },
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeDelta(dt) => write!(f, "run state machine requires dt >= 0, got {dt}"),
            Self::IllegalTransition { from, to } => {
                write!(f, "illegal run state transition: {from} -> {to}")
            },
        }
    }
}

impl std::error::Error for RunError {}

/// Owner of the [`RunState`].
///
/// Requests are queued and applied at the start of the next [`update`];
/// timed states advance once enough time has been spent in them.
///
/// [`update`]: RunStateMachine::update
#[derive(Debug)]
pub struct RunStateMachine {
    state: RunState,
    elapsed_in_state_ms: f32,
    intents: VecDeque<RunIntent>,
    timings: RunTimings,
    end_reason: Option<EndRunReason>,
}

impl RunStateMachine {
    pub fn new(timings: RunTimings) -> Self {
        Self {
            state: RunState::Boot,
            elapsed_in_state_ms: 0.0,
            intents: VecDeque::new(),
            timings,
            end_reason: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn time_in_state_ms(&self) -> f32 {
        self.elapsed_in_state_ms
    }

    /// Reason given by the request that moved the run into RUN_ENDING.
    pub fn end_reason(&self) -> Option<EndRunReason> {
        self.end_reason
    }

    pub fn request_boot_complete(&mut self) {
        self.intents.push_back(RunIntent::BootComplete);
    }

    pub fn request_start(&mut self) {
        self.intents.push_back(RunIntent::Start);
    }

    pub fn request_respawn(&mut self) {
        self.intents.push_back(RunIntent::Respawn);
    }

    /// Advance by `dt_ms`, applying queued requests first.
    pub fn update(&mut self, dt_ms: f32) -> Result<Vec<RunEvent>, RunError> {
        if dt_ms < 0.0 {
            return Err(RunError::NegativeDelta(dt_ms));
        }

        let mut events = Vec::new();
        self.elapsed_in_state_ms += dt_ms;
        self.process_intents(&mut events)?;

        let elapsed = self.elapsed_in_state_ms;
        match self.state {
            RunState::Countdown => {
                let remaining_ms = (self.timings.countdown_ms - elapsed).max(0.0);
                events.push(RunEvent::CountdownTick { remaining_ms });
                if elapsed >= self.timings.countdown_ms {
                    self.transition(
                        RunState::Playing,
                        TransitionReason::CountdownComplete,
                        &mut events,
                    )?;
                }
            },
            RunState::PlayerRespawn if elapsed >= self.timings.respawn_delay_ms => {
                self.transition(
                    RunState::Countdown,
                    TransitionReason::RespawnComplete,
                    &mut events,
                )?;
            },
            RunState::WaveClear if elapsed >= self.timings.wave_clear_delay_ms => {
                self.transition(
                    RunState::Countdown,
                    TransitionReason::WaveClearComplete,
                    &mut events,
                )?;
            },
            RunState::LevelComplete if elapsed >= self.timings.level_complete_delay_ms => {
                self.transition(
                    RunState::Countdown,
                    TransitionReason::LevelCompleteDone,
                    &mut events,
                )?;
            },
            RunState::RunEnding if elapsed >= self.timings.run_ending_delay_ms => {
                self.transition(
                    RunState::Results,
                    TransitionReason::RunEndComplete,
                    &mut events,
                )?;
            },
            _ => {},
        }

        Ok(events)
    }

    fn process_intents(&mut self, events: &mut Vec<RunEvent>) -> Result<(), RunError> {
        while let Some(intent) = self.intents.pop_front() {
            let (next, reason) = match (intent, self.state) {
                (RunIntent::BootComplete, RunState::Boot) => {
                    (RunState::Ready, TransitionReason::BootComplete)
                },
                (RunIntent::Start, RunState::Ready | RunState::Results) => {
                    (RunState::Countdown, TransitionReason::StartRequested)
                },
                (RunIntent::Respawn, RunState::Playing) => {
                    (RunState::PlayerRespawn, TransitionReason::PlayerDied)
                },
                (RunIntent::WaveClear, RunState::Playing) => {
                    (RunState::WaveClear, TransitionReason::WaveClear)
                },
                (RunIntent::LevelComplete, RunState::Playing) => {
                    (RunState::LevelComplete, TransitionReason::LevelComplete)
                },
                (
                    RunIntent::EndRun(end_reason),
                    RunState::Countdown
                    | RunState::Playing
                    | RunState::PlayerRespawn
                    | RunState::WaveClear
                    | RunState::LevelComplete,
                ) => {
                    self.end_reason = Some(end_reason);
                    (RunState::RunEnding, TransitionReason::RunEndRequested)
                },
                (intent, state) => {
                    tracing::debug!(
                        ?intent,
                        %state,
                        "Dropped run intent not valid in current state"
                    );
                    continue;
                },
            };
            self.transition(next, reason, events)?;
        }
        Ok(())
    }

    fn transition(
        &mut self,
        next: RunState,
        reason: TransitionReason,
        events: &mut Vec<RunEvent>,
    ) -> Result<(), RunError> {
        let from = self.state;
        if !from.can_transition_to(next) {
            let err = RunError::IllegalTransition { from, to: next };
            events.push(RunEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }

        if from == RunState::Results || from == RunState::Ready {
            self.end_reason = None;
        }
        self.state = next;
        self.elapsed_in_state_ms = 0.0;
        tracing::debug!(%from, to = %next, ?reason, "Run state transition");
        events.push(RunEvent::StateChanged {
            from,
            to: next,
            reason,
        });
        Ok(())
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new(RunTimings::default())
    }
}

impl RunStatePort for RunStateMachine {
    fn request_wave_clear(&mut self) {
        self.intents.push_back(RunIntent::WaveClear);
    }

    fn request_level_complete(&mut self) {
        self.intents.push_back(RunIntent::LevelComplete);
    }

    fn request_end_run(&mut self, reason: EndRunReason) {
        self.intents.push_back(RunIntent::EndRun(reason));
    }
}
