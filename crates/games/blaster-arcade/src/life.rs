use serde::{Deserialize, Serialize};

use crate::config::LifeConfig;

/// What a hit on the player resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitOutcome {
    /// Invulnerability or damage lockout absorbed the hit.
    Ignored,
    /// A life was lost; the player comes back.
    Respawn { lives_remaining: u32 },
    /// No lives left.
    EndRun { lives_remaining: u32 },
}

/// Lives, respawn invulnerability and the damage lockout.
#[derive(Debug, Clone)]
pub struct PlayerLifeSystem {
    config: LifeConfig,
    lives_remaining: u32,
    invulnerability_remaining_ms: f32,
    damage_lockout_remaining_ms: f32,
}

impl PlayerLifeSystem {
    pub fn new(config: LifeConfig) -> Self {
        Self {
            lives_remaining: config.initial_lives,
            invulnerability_remaining_ms: 0.0,
            damage_lockout_remaining_ms: 0.0,
            config,
        }
    }

    /// Count both timers down. Only simulated time moves them.
    pub fn update(&mut self, dt_ms: f32) {
        let dt = dt_ms.max(0.0);
        self.invulnerability_remaining_ms = (self.invulnerability_remaining_ms - dt).max(0.0);
        self.damage_lockout_remaining_ms = (self.damage_lockout_remaining_ms - dt).max(0.0);
    }

    pub fn on_player_hit(&mut self) -> HitOutcome {
        if self.is_invulnerable() || self.damage_lockout_remaining_ms > 0.0 {
            return HitOutcome::Ignored;
        }

        self.damage_lockout_remaining_ms = self.config.damage_lockout_ms;
        if self.lives_remaining == 0 {
            return HitOutcome::EndRun { lives_remaining: 0 };
        }

        self.lives_remaining -= 1;
        if self.lives_remaining == 0 {
            return HitOutcome::EndRun { lives_remaining: 0 };
        }

        self.start_respawn_invulnerability();
        HitOutcome::Respawn {
            lives_remaining: self.lives_remaining,
        }
    }

    /// Open the full dodge window, e.g. when play resumes after a respawn.
    pub fn start_respawn_invulnerability(&mut self) {
        self.invulnerability_remaining_ms = self.config.respawn_invulnerability_ms;
        self.damage_lockout_remaining_ms = self
            .damage_lockout_remaining_ms
            .max(self.config.damage_lockout_ms);
    }

    /// Back to a fresh run.
    pub fn reset(&mut self) {
        self.lives_remaining = self.config.initial_lives;
        self.invulnerability_remaining_ms = 0.0;
        self.damage_lockout_remaining_ms = 0.0;
    }

    pub fn lives(&self) -> u32 {
        self.lives_remaining
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability_remaining_ms > 0.0
    }

    pub fn invulnerability_remaining_ms(&self) -> f32 {
        self.invulnerability_remaining_ms
    }

    pub fn damage_lockout_remaining_ms(&self) -> f32 {
        self.damage_lockout_remaining_ms
    }
}
