use serde::{Deserialize, Serialize};

use crate::events::EndRunReason;
use crate::level_config::ResolvedWave;

/// Stable identifier for an enemy spawned by a formation.
pub type EnemyId = u32;

/// Read view of one occupied formation slot.
///
/// Owned by the formation; consumers re-query the slot list whenever they
/// recompute and never keep a slot across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationSlot {
    pub enemy: EnemyId,
    pub row: u32,
    pub column: u32,
    pub alive: bool,
    pub in_formation: bool,
}

/// The externally owned enemy formation, as seen by the level and
/// eligibility systems.
pub trait FormationPort {
    /// Replace the current formation with the enemies of `wave`.
    fn spawn_formation(&mut self, wave: &ResolvedWave);

    /// Snapshot of every slot in the current formation.
    fn slots(&self) -> &[FormationSlot];

    /// Enemies still alive in the current wave.
    fn active_enemy_count(&self) -> usize;

    /// Called before each spawn with the level the wave belongs to.
    fn set_level_index(&mut self, _level_index: usize) {}
}

/// Requests the simulation may send back to the run-state machine.
///
/// Requests are advisory: the machine decides whether the current state
/// allows them.
pub trait RunStatePort {
    fn request_wave_clear(&mut self);

    fn request_level_complete(&mut self);

    fn request_end_run(&mut self, reason: EndRunReason);
}
