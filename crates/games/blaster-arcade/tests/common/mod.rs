use blaster_arcade::{ArcadeConfig, ArcadeSession, FrameInput};
use blaster_core::run_state::RunState;

/// No dives, no return fire, a static formation, one column centred over
/// the player's spawn point.
pub fn quiet_config() -> ArcadeConfig {
    let mut config = ArcadeConfig::default();
    config.dive.dive_chance_per_tick = 0.0;
    config.enemy_fire.fire_chance_per_second = 0.0;
    config.formation.march_speed_px_per_sec = 0.0;
    config.formation.columns = 1;
    config
}

pub fn idle() -> FrameInput {
    FrameInput::default()
}

pub fn start() -> FrameInput {
    FrameInput {
        start: true,
        ..FrameInput::default()
    }
}

pub fn hold_fire() -> FrameInput {
    FrameInput {
        fire: true,
        ..FrameInput::default()
    }
}

/// Boot the session and press start once.
pub fn start_run(session: &mut ArcadeSession) {
    session.step(16.0, &idle()).unwrap();
    assert_eq!(session.state(), RunState::Ready);
    session.step(16.0, &start()).unwrap();
    assert_eq!(session.state(), RunState::Countdown);
}

/// Step with `input` until `state` is reached. Returns the number of frames
/// taken, or panics after `max_frames`.
pub fn step_until(
    session: &mut ArcadeSession,
    dt_ms: f32,
    input: FrameInput,
    state: RunState,
    max_frames: u32,
) -> u32 {
    for frame in 0..max_frames {
        if session.state() == state {
            return frame;
        }
        session.step(dt_ms, &input).unwrap();
    }
    panic!(
        "never reached {state} in {max_frames} frames, stuck in {}",
        session.state()
    );
}
