use serde::Serialize;

use blaster_arcade::{ArcadeConfig, ArcadeSession, FrameInput, RunSummary};
use blaster_core::level_config::{
    DiveOverride, ResolvedLevelConfig, ResolvedRunConfig, ResolvedWave,
};
use blaster_core::run_state::RunState;

/// Horizontal slack before the autopilot steers.
const AIM_TOLERANCE_PX: f32 = 4.0;

/// Result of one headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlessReport {
    pub seed: u64,
    pub frames: u32,
    pub frame_ms: f32,
    pub summary: RunSummary,
    pub teardown_failures: usize,
}

/// Two short levels used when no run config is given.
pub fn demo_run() -> ResolvedRunConfig {
    let wave = |enemy_id: &str, count| ResolvedWave {
        enemy_id: enemy_id.to_string(),
        count,
        spawn_delay_ms: None,
    };
    ResolvedRunConfig {
        levels: vec![
            ResolvedLevelConfig {
                level_id: Some("level-1".to_string()),
                layout_id: "grid".to_string(),
                waves: vec![wave("drone", 8), wave("drone", 12)],
                dive: None,
                shooting: None,
            },
            ResolvedLevelConfig {
                level_id: Some("level-2".to_string()),
                layout_id: "grid".to_string(),
                waves: vec![wave("scout", 16)],
                dive: Some(DiveOverride {
                    attack_tick_ms: 900.0,
                    dive_chance_per_tick: 0.5,
                    max_concurrent_divers: 3,
                }),
                shooting: Some(20.0),
            },
        ],
    }
}

/// Steer under the nearest front-line enemy and keep firing.
pub fn autopilot_input(session: &ArcadeSession) -> FrameInput {
    let state = session.state();
    let player_x = session.player_position().x;
    let target_x = session
        .eligibility()
        .all_eligible()
        .filter_map(|enemy| session.formation().enemy_position(enemy))
        .map(|pos| pos.x)
        .min_by(|a, b| (a - player_x).abs().total_cmp(&(b - player_x).abs()));

    let axis = match target_x {
        Some(x) if x - player_x > AIM_TOLERANCE_PX => 1.0,
        Some(x) if player_x - x > AIM_TOLERANCE_PX => -1.0,
        _ => 0.0,
    };

    FrameInput {
        axis,
        fire: state == RunState::Playing,
        start: state == RunState::Ready,
        overlay_blocking: false,
    }
}

/// Play one run to RESULTS, or until `max_frames` have elapsed.
pub fn play(
    config: ArcadeConfig,
    run: ResolvedRunConfig,
    seed: u64,
    frame_ms: f32,
    max_frames: u32,
) -> HeadlessReport {
    let mut session = ArcadeSession::new(config, run, seed);
    session.on_shutdown(move || tracing::debug!(seed, "Headless session released"));

    let mut frames = 0;
    let mut started = false;
    while frames < max_frames {
        let input = autopilot_input(&session);
        started |= input.start;
        if let Err(e) = session.step(frame_ms, &input) {
            tracing::error!(error = %e, frame = frames, "Run aborted");
            break;
        }
        frames += 1;
        if started && session.state() == RunState::Results {
            break;
        }
    }
    if frames >= max_frames {
        tracing::warn!(max_frames, state = %session.state(), "Frame limit reached before results");
    }

    let summary = session.summary();
    let teardown_failures = session.shutdown();
    HeadlessReport {
        seed,
        frames,
        frame_ms,
        summary,
        teardown_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_replays_identically() {
        let a = play(ArcadeConfig::default(), demo_run(), 11, 16.0, 4_000);
        let b = play(ArcadeConfig::default(), demo_run(), 11, 16.0, 4_000);
        assert_eq!(a, b);
        assert!(a.summary.counters.waves_started >= 1);
        assert!(a.summary.counters.shots_fired > 0);
        assert_eq!(a.summary.score.score, a.summary.score.breakdown.total());
        assert_eq!(a.summary.score.shots_fired, a.summary.counters.shots_fired);
    }

    #[test]
    fn autopilot_presses_start_when_ready() {
        let mut session = ArcadeSession::new(ArcadeConfig::default(), demo_run(), 3);
        session.step(16.0, &FrameInput::default()).unwrap();
        assert_eq!(session.state(), RunState::Ready);
        assert!(autopilot_input(&session).start);
    }

    #[test]
    fn demo_run_has_two_levels() {
        let run = demo_run();
        assert_eq!(run.level_count(), 2);
        assert!(run.level(1).and_then(|l| l.dive).is_some());
    }
}
