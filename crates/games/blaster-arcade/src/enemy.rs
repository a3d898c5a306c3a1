use std::f32::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use blaster_core::geometry::Point;

use crate::config::{DivePattern, EnemyConfig};

/// Where an enemy is in its attack cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnemyLocalState {
    #[default]
    Formation,
    Diving,
    Returning,
    Dead,
}

/// Straight-down dive step.
pub fn compute_dive_step(position: Point, speed_px_per_sec: f32, dt_ms: f32) -> Point {
    Point::new(position.x, position.y + speed_px_per_sec * dt_ms / 1000.0)
}

/// Dive step that sways around `base_x` while descending.
///
/// `elapsed_ms` is the dive time before this step.
pub fn compute_sine_dive_step(
    position: Point,
    base_x: f32,
    speed_px_per_sec: f32,
    dt_ms: f32,
    elapsed_ms: f32,
    amplitude_px: f32,
    frequency_hz: f32,
) -> Point {
    let t_secs = (elapsed_ms + dt_ms) / 1000.0;
    let sway = amplitude_px * (TAU * frequency_hz * t_secs).sin();
    Point::new(
        base_x + sway,
        position.y + speed_px_per_sec * dt_ms / 1000.0,
    )
}

/// Result of one tracking dive step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackStep {
    pub position: Point,
    /// Heading after the turn, in radians. `PI / 2` points straight down.
    pub angle_rad: f32,
    pub applied_delta_rad: f32,
}

/// Wrap an angle into `[-PI, PI)`.
fn wrap_angle(rad: f32) -> f32 {
    (rad + PI).rem_euclid(TAU) - PI
}

/// Turn from `current_angle_rad` toward `target` by at most
/// `turn_rate_deg_per_sec` worth of rotation, then move along the new
/// heading.
pub fn compute_track_dive_step(
    position: Point,
    target: Point,
    current_angle_rad: f32,
    speed_px_per_sec: f32,
    turn_rate_deg_per_sec: f32,
    dt_ms: f32,
) -> TrackStep {
    let desired = (target.y - position.y).atan2(target.x - position.x);
    let max_delta = turn_rate_deg_per_sec.max(0.0).to_radians() * dt_ms / 1000.0;
    let delta = wrap_angle(desired - current_angle_rad).clamp(-max_delta, max_delta);
    let angle_rad = current_angle_rad + delta;
    let distance = speed_px_per_sec * dt_ms / 1000.0;
    TrackStep {
        position: Point::new(
            position.x + angle_rad.cos() * distance,
            position.y + angle_rad.sin() * distance,
        ),
        angle_rad,
        applied_delta_rad: delta,
    }
}

/// Result of one step back toward the reserved slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStep {
    pub position: Point,
    pub arrived: bool,
}

/// Move toward `target` at `speed_px_per_sec`, snapping onto it when within
/// `arrival_threshold_px` or when the step would overshoot.
pub fn compute_return_step(
    position: Point,
    target: Point,
    speed_px_per_sec: f32,
    dt_ms: f32,
    arrival_threshold_px: f32,
) -> ReturnStep {
    let distance = position.distance(target);
    if distance <= arrival_threshold_px {
        return ReturnStep {
            position: target,
            arrived: true,
        };
    }

    let max_step = speed_px_per_sec * dt_ms / 1000.0;
    if max_step >= distance {
        return ReturnStep {
            position: target,
            arrived: true,
        };
    }

    let nx = (target.x - position.x) / distance;
    let ny = (target.y - position.y) / distance;
    ReturnStep {
        position: Point::new(position.x + nx * max_step, position.y + ny * max_step),
        arrived: false,
    }
}

/// Drives one enemy through dive, return and death.
#[derive(Debug, Clone)]
pub struct EnemyController {
    config: EnemyConfig,
    state: EnemyLocalState,
    dive_elapsed_ms: f32,
    dive_base_x: f32,
    track_angle_rad: f32,
}

impl EnemyController {
    pub fn new(config: EnemyConfig) -> Self {
        Self {
            config,
            state: EnemyLocalState::Formation,
            dive_elapsed_ms: 0.0,
            dive_base_x: 0.0,
            track_angle_rad: FRAC_PI_2,
        }
    }

    pub fn state(&self) -> EnemyLocalState {
        self.state
    }

    /// Leave the formation from `position`. Only acts while in formation.
    pub fn start_dive(&mut self, position: Point) -> bool {
        if self.state != EnemyLocalState::Formation {
            return false;
        }
        self.state = EnemyLocalState::Diving;
        self.dive_elapsed_ms = 0.0;
        self.dive_base_x = position.x;
        self.track_angle_rad = FRAC_PI_2;
        true
    }

    pub fn set_dead(&mut self) {
        self.state = EnemyLocalState::Dead;
    }

    /// Advance one frame. `home` is the reserved slot position, if the slot
    /// still exists; `player` is what a tracking dive steers toward.
    /// Returns the new state when it changed.
    pub fn update(
        &mut self,
        dt_ms: f32,
        position: &mut Point,
        home: Option<Point>,
        player: Option<Point>,
    ) -> Option<EnemyLocalState> {
        let dt_ms = dt_ms.max(0.0);
        match self.state {
            EnemyLocalState::Formation | EnemyLocalState::Dead => None,
            EnemyLocalState::Diving => {
                *position = self.dive_step(*position, dt_ms, player);
                self.dive_elapsed_ms += dt_ms;

                let timed_out = self.config.max_dive_duration_ms > 0.0
                    && self.dive_elapsed_ms >= self.config.max_dive_duration_ms;
                let below_trigger = self
                    .config
                    .return_trigger_y
                    .is_some_and(|trigger| position.y >= trigger);
                if timed_out || below_trigger {
                    self.state = EnemyLocalState::Returning;
                    return Some(self.state);
                }
                None
            },
            EnemyLocalState::Returning => {
                let Some(target) = home else {
                    self.state = EnemyLocalState::Dead;
                    return Some(self.state);
                };
                let step = compute_return_step(
                    *position,
                    target,
                    self.config.return_speed_px_per_sec,
                    dt_ms,
                    self.config.arrival_threshold_px,
                );
                *position = step.position;
                if step.arrived {
                    self.state = EnemyLocalState::Formation;
                    return Some(self.state);
                }
                None
            },
        }
    }

    fn dive_step(&mut self, position: Point, dt_ms: f32, player: Option<Point>) -> Point {
        let speed = self.config.dive_speed_px_per_sec;
        match (self.config.pattern, player) {
            (DivePattern::Sine, _) => compute_sine_dive_step(
                position,
                self.dive_base_x,
                speed,
                dt_ms,
                self.dive_elapsed_ms,
                self.config.sine_amplitude_px,
                self.config.sine_frequency_hz,
            ),
            (DivePattern::Track, Some(target)) => {
                let step = compute_track_dive_step(
                    position,
                    target,
                    self.track_angle_rad,
                    speed,
                    self.config.turn_rate_deg_per_sec,
                    dt_ms,
                );
                self.track_angle_rad = step.angle_rad;
                step.position
            },
            // no target to track: fall straight down
            (DivePattern::Straight | DivePattern::Track, _) => {
                compute_dive_step(position, speed, dt_ms)
            },
        }
    }
}
