use serde::{Deserialize, Serialize};

use crate::run_state::RunState;

/// Why the run-state machine moved between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    BootComplete,
    StartRequested,
    CountdownComplete,
    PlayerDied,
    RespawnComplete,
    WaveClear,
    WaveClearComplete,
    LevelComplete,
    LevelCompleteDone,
    RunEndRequested,
    RunEndComplete,
}

/// Why a run was asked to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndRunReason {
    AllWavesCleared,
    AllWavesClearedEnrageTimeout,
    LivesExhausted,
    EnemyBreach,
    Requested,
}

impl EndRunReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllWavesCleared => "all_waves_cleared",
            Self::AllWavesClearedEnrageTimeout => "all_waves_cleared_enrage_timeout",
            Self::LivesExhausted => "lives_exhausted",
            Self::EnemyBreach => "enemy_breach",
            Self::Requested => "run_end_requested",
        }
    }
}

impl std::fmt::Display for EndRunReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the current wave is being cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionReason {
    /// The formation has no enemies left.
    EnemiesDepleted,
    /// The last enemies stayed alive past the enrage window.
    EnrageTimeout,
}

impl ProgressionReason {
    /// End-of-run reason used when this progression exhausts the run.
    pub fn end_run_reason(self) -> EndRunReason {
        match self {
            Self::EnemiesDepleted => EndRunReason::AllWavesCleared,
            Self::EnrageTimeout => EndRunReason::AllWavesClearedEnrageTimeout,
        }
    }
}

/// Events emitted by [`crate::run_machine::RunStateMachine::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    StateChanged {
        from: RunState,
        to: RunState,
        reason: TransitionReason,
    },
    CountdownTick {
        remaining_ms: f32,
    },
    Error {
        message: String,
    },
}

impl RunEvent {
    /// The `(from, to)` pair if this event is a state change.
    pub fn transition(&self) -> Option<(RunState, RunState)> {
        match self {
            Self::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrage_timeout_maps_to_its_own_end_reason() {
        assert_eq!(
            ProgressionReason::EnrageTimeout.end_run_reason().as_str(),
            "all_waves_cleared_enrage_timeout"
        );
        assert_eq!(
            ProgressionReason::EnemiesDepleted.end_run_reason(),
            EndRunReason::AllWavesCleared
        );
    }

    #[test]
    fn transition_extracts_state_pair() {
        let event = RunEvent::StateChanged {
            from: RunState::Ready,
            to: RunState::Countdown,
            reason: TransitionReason::StartRequested,
        };
        assert_eq!(
            event.transition(),
            Some((RunState::Ready, RunState::Countdown))
        );
        assert_eq!(RunEvent::CountdownTick { remaining_ms: 10.0 }.transition(), None);
    }
}
