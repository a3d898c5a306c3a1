/// Minimum time between two shots.
///
/// Measures time since the last accepted shot only; a long frame never
/// banks extra shots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCooldown {
    cooldown_ms: f32,
    remaining_ms: f32,
}

impl FireCooldown {
    pub fn new(cooldown_ms: f32) -> Self {
        Self {
            cooldown_ms,
            remaining_ms: 0.0,
        }
    }

    pub fn update(&mut self, dt_ms: f32) {
        self.remaining_ms = (self.remaining_ms - dt_ms.max(0.0)).max(0.0);
    }

    pub fn can_fire(&self) -> bool {
        self.remaining_ms <= 0.0
    }

    /// Start a new cooldown if ready. Returns whether the shot is allowed.
    pub fn consume(&mut self) -> bool {
        if !self.can_fire() {
            return false;
        }
        self.remaining_ms = self.cooldown_ms;
        true
    }

    /// Undo a [`consume`](Self::consume) whose shot never left the weapon.
    pub(crate) fn refund(&mut self) {
        self.remaining_ms = 0.0;
    }

    pub fn remaining_ms(&self) -> f32 {
        self.remaining_ms
    }
}
