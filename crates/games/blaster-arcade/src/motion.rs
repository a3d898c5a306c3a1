use serde::{Deserialize, Serialize};

/// Horizontal state of the player ship, recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionState {
    pub x: f32,
    pub velocity_x: f32,
}

/// Movement limits for [`integrate_horizontal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    pub min_x: f32,
    pub max_x: f32,
    pub half_width: f32,
    pub max_speed_px_per_sec: f32,
}

impl MotionParams {
    pub fn min_bound(&self) -> f32 {
        self.min_x + self.half_width
    }

    pub fn max_bound(&self) -> f32 {
        self.max_x - self.half_width
    }
}

/// Snap an analog axis to -1, 0 or 1.
fn clamp_axis(axis: f32) -> f32 {
    if axis < 0.0 {
        -1.0
    } else if axis > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Advance the ship by `dt_ms` under `input_axis`.
///
/// Displacement depends only on elapsed time, so the same wall-clock span
/// integrated in different step counts lands on the same x. The result is
/// clamped to `[min_x + half_width, max_x - half_width]`; pushing into a wall
/// zeroes velocity.
pub fn integrate_horizontal(
    state: MotionState,
    input_axis: f32,
    dt_ms: f32,
    params: &MotionParams,
) -> MotionState {
    let dt_secs = dt_ms.max(0.0) / 1000.0;
    let axis = clamp_axis(input_axis);
    let raw_velocity = axis * params.max_speed_px_per_sec;
    let min_bound = params.min_bound();
    let max_bound = params.max_bound();

    let mut x = state.x + raw_velocity * dt_secs;
    let mut velocity_x = raw_velocity;

    if x <= min_bound {
        x = min_bound;
        if axis < 0.0 {
            velocity_x = 0.0;
        }
    } else if x >= max_bound {
        x = max_bound;
        if axis > 0.0 {
            velocity_x = 0.0;
        }
    }

    MotionState { x, velocity_x }
}
