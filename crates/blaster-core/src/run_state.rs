use serde::{Deserialize, Serialize};

/// Phases of a single run, owned by the run-state machine.
///
/// Systems never set the state directly; they observe transitions and issue
/// requests through [`crate::ports::RunStatePort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Boot,
    Ready,
    Countdown,
    Playing,
    PlayerRespawn,
    WaveClear,
    LevelComplete,
    RunEnding,
    Results,
    Error,
}

impl RunState {
    pub const ALL: [RunState; 10] = [
        RunState::Boot,
        RunState::Ready,
        RunState::Countdown,
        RunState::Playing,
        RunState::PlayerRespawn,
        RunState::WaveClear,
        RunState::LevelComplete,
        RunState::RunEnding,
        RunState::Results,
        RunState::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::Ready => "READY",
            Self::Countdown => "COUNTDOWN",
            Self::Playing => "PLAYING",
            Self::PlayerRespawn => "PLAYER_RESPAWN",
            Self::WaveClear => "WAVE_CLEAR",
            Self::LevelComplete => "LEVEL_COMPLETE",
            Self::RunEnding => "RUN_ENDING",
            Self::Results => "RESULTS",
            Self::Error => "ERROR",
        }
    }

    /// States reachable from `self` in a single transition.
    pub fn allowed_next(self) -> &'static [RunState] {
        use RunState::*;
        match self {
            Boot => &[Ready, Error],
            Ready => &[Countdown, Error],
            Countdown => &[Playing, RunEnding, Error],
            Playing => &[PlayerRespawn, WaveClear, LevelComplete, RunEnding, Error],
            PlayerRespawn => &[Countdown, RunEnding, Error],
            WaveClear => &[Countdown, RunEnding, Error],
            LevelComplete => &[Countdown, RunEnding, Error],
            RunEnding => &[Results, Error],
            Results => &[Countdown, Error],
            Error => &[],
        }
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `from -> to` starts a fresh run.
///
/// Only READY→COUNTDOWN and RESULTS→COUNTDOWN qualify. Other transitions into
/// COUNTDOWN (after a respawn, wave clear, or level clear) continue the
/// current run, so run-scoped counters such as score must not be reset there.
pub fn is_run_start_transition(from: RunState, to: RunState) -> bool {
    to == RunState::Countdown && matches!(from, RunState::Ready | RunState::Results)
}

/// Whether gameplay systems should advance this frame.
pub fn is_simulation_running(state: RunState, overlay_blocking_gameplay: bool) -> bool {
    state == RunState::Playing && !overlay_blocking_gameplay
}

/// Whether the player's weapon may be triggered.
pub fn can_player_fire(state: RunState, invulnerable: bool) -> bool {
    is_simulation_running(state, false) && !invulnerable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_and_results_into_countdown_start_a_run() {
        assert!(is_run_start_transition(RunState::Ready, RunState::Countdown));
        assert!(is_run_start_transition(
            RunState::Results,
            RunState::Countdown
        ));
    }

    #[test]
    fn other_countdown_entries_continue_the_run() {
        for from in [
            RunState::PlayerRespawn,
            RunState::WaveClear,
            RunState::LevelComplete,
            RunState::Countdown,
            RunState::Boot,
        ] {
            assert!(
                !is_run_start_transition(from, RunState::Countdown),
                "{from} -> COUNTDOWN must not start a run"
            );
        }
    }

    #[test]
    fn only_countdown_destination_can_start_a_run() {
        for from in RunState::ALL {
            for to in RunState::ALL {
                if to != RunState::Countdown {
                    assert!(!is_run_start_transition(from, to));
                }
            }
        }
    }

    #[test]
    fn error_is_terminal() {
        assert!(RunState::Error.allowed_next().is_empty());
        for state in RunState::ALL {
            if state != RunState::Error {
                assert!(state.can_transition_to(RunState::Error));
            }
        }
    }

    #[test]
    fn playing_can_reach_every_progression_state() {
        assert!(RunState::Playing.can_transition_to(RunState::WaveClear));
        assert!(RunState::Playing.can_transition_to(RunState::LevelComplete));
        assert!(RunState::Playing.can_transition_to(RunState::PlayerRespawn));
        assert!(!RunState::Playing.can_transition_to(RunState::Results));
    }

    #[test]
    fn simulation_gate_requires_playing_without_overlay() {
        assert!(is_simulation_running(RunState::Playing, false));
        assert!(!is_simulation_running(RunState::Playing, true));
        assert!(!is_simulation_running(RunState::Countdown, false));
    }

    #[test]
    fn invulnerable_player_cannot_fire() {
        assert!(can_player_fire(RunState::Playing, false));
        assert!(!can_player_fire(RunState::Playing, true));
        assert!(!can_player_fire(RunState::PlayerRespawn, false));
    }

    #[test]
    fn serde_uses_screaming_names() {
        let json = serde_json::to_string(&RunState::PlayerRespawn).unwrap();
        assert_eq!(json, "\"PLAYER_RESPAWN\"");
    }
}
