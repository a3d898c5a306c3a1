use std::collections::BTreeMap;

use blaster_core::geometry::{Bounds, Point, boxes_overlap};
use blaster_core::level_config::ResolvedWave;
use blaster_core::ports::{EnemyId, FormationPort, FormationSlot};

use crate::config::{EnemyConfig, EnemyProfile, FormationConfig};
use crate::dive::{DiveCandidate, DiveCandidateSource};
use crate::enemy::{EnemyController, EnemyLocalState};

#[derive(Debug, Clone)]
struct FormationEnemy {
    id: EnemyId,
    row: u32,
    column: u32,
    /// Offset of the reserved slot from the formation origin.
    local: Point,
    position: Point,
    alive: bool,
    can_dive: bool,
    controller: EnemyController,
}

impl FormationEnemy {
    fn in_formation(&self) -> bool {
        self.controller.state() == EnemyLocalState::Formation
    }
}

/// Grid of enemies that marches side to side and steps down at each wall.
///
/// Row 0 is the top row. Enemies leave their slot to dive and come back to
/// it; the slot moves with the formation while they are away.
#[derive(Debug, Clone)]
pub struct GridFormation {
    config: FormationConfig,
    enemy_config: EnemyConfig,
    profiles: BTreeMap<String, EnemyProfile>,
    bounds: Bounds,
    enemies: Vec<FormationEnemy>,
    slots: Vec<FormationSlot>,
    origin: Point,
    direction: f32,
    next_id: EnemyId,
    level_index: usize,
    roster_changed: bool,
}

impl GridFormation {
    pub fn new(config: FormationConfig, enemy_config: EnemyConfig, bounds: Bounds) -> Self {
        Self {
            config,
            enemy_config,
            profiles: BTreeMap::new(),
            bounds,
            enemies: Vec::new(),
            slots: Vec::new(),
            origin: Point::new(bounds.center_x(), bounds.min_y + config.top_margin),
            direction: 1.0,
            next_id: 1,
            level_index: 0,
            roster_changed: false,
        }
    }

    /// Per-type profiles applied to enemies spawned from then on.
    pub fn with_profiles(mut self, profiles: BTreeMap<String, EnemyProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Profile for `enemy_id`, or the default one when it has none.
    pub fn profile(&self, enemy_id: &str) -> EnemyProfile {
        self.profiles.get(enemy_id).copied().unwrap_or_default()
    }

    /// Remove every enemy.
    pub fn clear(&mut self) {
        if !self.enemies.is_empty() {
            self.roster_changed = true;
        }
        self.enemies.clear();
        self.slots.clear();
        self.origin = self.start_origin();
        self.direction = 1.0;
    }

    fn start_origin(&self) -> Point {
        Point::new(self.bounds.center_x(), self.bounds.min_y + self.config.top_margin)
    }

    /// March the formation, then advance every enemy controller. Tracking
    /// divers steer toward `player`.
    pub fn update(&mut self, dt_ms: f32, player: Option<Point>) {
        let dt_ms = dt_ms.max(0.0);
        if self.alive_count() == 0 {
            return;
        }
        self.march(dt_ms);

        let origin = self.origin;
        let mut changed = false;
        for enemy in self.enemies.iter_mut().filter(|e| e.alive) {
            let home = Point::new(origin.x + enemy.local.x, origin.y + enemy.local.y);
            if enemy.in_formation() {
                enemy.position = home;
                continue;
            }
            match enemy.controller.update(dt_ms, &mut enemy.position, Some(home), player) {
                Some(EnemyLocalState::Formation) => changed = true,
                Some(EnemyLocalState::Dead) => {
                    enemy.alive = false;
                    changed = true;
                },
                _ => {},
            }
        }
        if changed {
            self.roster_changed = true;
            self.sync_slots();
        }
    }

    fn march(&mut self, dt_ms: f32) {
        let (min_local, max_local) = self
            .enemies
            .iter()
            .filter(|e| e.alive)
            .fold((f32::MAX, f32::MIN), |(lo, hi), e| {
                (lo.min(e.local.x), hi.max(e.local.x))
            });
        let half = self.config.enemy_half_width;
        let proposed_x =
            self.origin.x + self.direction * self.config.march_speed_px_per_sec * dt_ms / 1000.0;
        let left_contact = self.bounds.min_x - min_local + half;
        let right_contact = self.bounds.max_x - max_local - half;

        if proposed_x + max_local + half > self.bounds.max_x {
            self.origin.x = left_contact.max(right_contact);
            self.origin.y += self.config.descend_step_px;
            self.direction = -1.0;
        } else if proposed_x + min_local - half < self.bounds.min_x {
            self.origin.x = right_contact.min(left_contact);
            self.origin.y += self.config.descend_step_px;
            self.direction = 1.0;
        } else {
            self.origin.x = proposed_x;
        }
    }

    fn sync_slots(&mut self) {
        self.slots.clear();
        self.slots.extend(self.enemies.iter().map(|e| FormationSlot {
            enemy: e.id,
            row: e.row,
            column: e.column,
            alive: e.alive,
            in_formation: e.alive && e.in_formation(),
        }));
    }

    /// Kill `enemy`. Returns false if it was not alive.
    pub fn kill(&mut self, enemy: EnemyId) -> bool {
        let Some(target) = self.enemies.iter_mut().find(|e| e.id == enemy && e.alive) else {
            return false;
        };
        target.alive = false;
        target.controller.set_dead();
        self.roster_changed = true;
        self.sync_slots();
        true
    }

    /// Whether detach, reattach or death changed the roster since the last
    /// call. Clears the flag.
    pub fn take_roster_changed(&mut self) -> bool {
        std::mem::take(&mut self.roster_changed)
    }

    pub fn enemy_position(&self, enemy: EnemyId) -> Option<Point> {
        self.enemies
            .iter()
            .find(|e| e.id == enemy && e.alive)
            .map(|e| e.position)
    }

    pub fn enemy_state(&self, enemy: EnemyId) -> Option<EnemyLocalState> {
        self.enemies
            .iter()
            .find(|e| e.id == enemy)
            .map(|e| e.controller.state())
    }

    /// Reserved slot position of `enemy`, wherever the enemy itself is.
    pub fn home_position(&self, enemy: EnemyId) -> Option<Point> {
        self.enemies
            .iter()
            .find(|e| e.id == enemy && e.alive)
            .map(|e| Point::new(self.origin.x + e.local.x, self.origin.y + e.local.y))
    }

    /// First alive enemy whose box overlaps the given box.
    pub fn enemy_at(&self, center: Point, half_extents: (f32, f32)) -> Option<EnemyId> {
        let enemy_half = (self.config.enemy_half_width, self.config.enemy_half_height);
        self.enemies
            .iter()
            .filter(|e| e.alive)
            .find(|e| boxes_overlap(e.position, enemy_half, center, half_extents))
            .map(|e| e.id)
    }

    /// Whether any alive enemy has moved past `breach_y`.
    pub fn breached(&self, breach_y: f32) -> bool {
        self.enemies.iter().any(|e| e.alive && e.position.y > breach_y)
    }

    pub fn alive_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }

    pub fn diving_count(&self) -> usize {
        self.enemies
            .iter()
            .filter(|e| e.alive && e.controller.state() == EnemyLocalState::Diving)
            .count()
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn origin(&self) -> Point {
        self.origin
    }
}

impl FormationPort for GridFormation {
    fn spawn_formation(&mut self, wave: &ResolvedWave) {
        self.clear();
        let count = wave.count.max(1);
        let columns = self.config.columns.max(1);
        let center_offset = (columns - 1) as f32 * self.config.spacing_x / 2.0;
        let profile = self.profile(&wave.enemy_id);
        let motion = profile.motion(self.enemy_config);

        for index in 0..count {
            let row = index / columns;
            let column = index % columns;
            let local = Point::new(
                column as f32 * self.config.spacing_x - center_offset,
                row as f32 * self.config.spacing_y,
            );
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            self.enemies.push(FormationEnemy {
                id,
                row,
                column,
                local,
                position: Point::new(self.origin.x + local.x, self.origin.y + local.y),
                alive: true,
                can_dive: profile.can_dive,
                controller: EnemyController::new(motion),
            });
        }
        self.roster_changed = true;
        self.sync_slots();
        tracing::debug!(
            level_index = self.level_index,
            enemy_id = %wave.enemy_id,
            count,
            can_dive = profile.can_dive,
            pattern = ?motion.pattern,
            "Formation spawned"
        );
    }

    fn slots(&self) -> &[FormationSlot] {
        &self.slots
    }

    fn active_enemy_count(&self) -> usize {
        self.alive_count()
    }

    fn set_level_index(&mut self, level_index: usize) {
        self.level_index = level_index;
    }
}

impl DiveCandidateSource for GridFormation {
    fn dive_candidates(&self) -> Vec<DiveCandidate> {
        self.enemies
            .iter()
            .map(|e| DiveCandidate {
                enemy: e.id,
                active: e.alive,
                can_dive: e.alive && e.can_dive,
                state: e.controller.state(),
            })
            .collect()
    }

    fn start_dive(&mut self, enemy: EnemyId) -> bool {
        let Some(target) = self.enemies.iter_mut().find(|e| e.id == enemy && e.alive) else {
            return false;
        };
        if !target.controller.start_dive(target.position) {
            return false;
        }
        self.roster_changed = true;
        self.sync_slots();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaster_core::test_helpers::{ScriptedRandom, wave};

    use crate::config::{DiveConfig, DivePattern};
    use crate::dive::DiveScheduler;

    const FIELD: Bounds = Bounds::new(0.0, 800.0, 0.0, 600.0);

    fn formation() -> GridFormation {
        GridFormation::new(
            FormationConfig::default(),
            EnemyConfig {
                dive_speed_px_per_sec: 200.0,
                return_speed_px_per_sec: 400.0,
                max_dive_duration_ms: 500.0,
                ..EnemyConfig::default()
            },
            FIELD,
        )
    }

    #[test]
    fn spawns_rows_top_down() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 10));
        assert_eq!(formation.active_enemy_count(), 10);
        assert!(formation.take_roster_changed());
        assert!(!formation.take_roster_changed());

        let slots = formation.slots();
        assert_eq!(slots.len(), 10);
        assert_eq!((slots[0].row, slots[0].column), (0, 0));
        assert_eq!((slots[9].row, slots[9].column), (1, 1));

        let top = formation.enemy_position(slots[0].enemy).unwrap();
        let second_row = formation.enemy_position(slots[8].enemy).unwrap();
        assert!(second_row.y > top.y, "row 0 is the top row");
    }

    #[test]
    fn zero_count_wave_spawns_one_enemy() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 0));
        assert_eq!(formation.active_enemy_count(), 1);
    }

    #[test]
    fn ids_stay_unique_across_waves() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 2));
        let first: Vec<_> = formation.slots().iter().map(|s| s.enemy).collect();
        formation.spawn_formation(&wave("drone", 2));
        assert!(formation.slots().iter().all(|s| !first.contains(&s.enemy)));
    }

    #[test]
    fn kill_updates_slots_and_count() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 3));
        formation.take_roster_changed();
        let victim = formation.slots()[1].enemy;
        assert!(formation.kill(victim));
        assert!(!formation.kill(victim));
        assert!(formation.take_roster_changed());
        assert_eq!(formation.active_enemy_count(), 2);
        assert!(!formation.slots()[1].alive);
        assert_eq!(formation.enemy_position(victim), None);
    }

    #[test]
    fn dive_detaches_then_rejoins() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 1));
        let enemy = formation.slots()[0].enemy;
        formation.take_roster_changed();

        assert!(formation.start_dive(enemy));
        assert!(!formation.slots()[0].in_formation);
        assert!(formation.take_roster_changed());
        assert_eq!(formation.diving_count(), 1);

        formation.update(500.0, None);
        assert_eq!(formation.enemy_state(enemy), Some(EnemyLocalState::Returning));
        assert!(!formation.take_roster_changed(), "returning is still detached");

        for _ in 0..20 {
            formation.update(50.0, None);
        }
        assert_eq!(formation.enemy_state(enemy), Some(EnemyLocalState::Formation));
        assert!(formation.slots()[0].in_formation);
        assert!(formation.take_roster_changed());
        assert_eq!(formation.enemy_position(enemy), formation.home_position(enemy));
    }

    #[test]
    fn march_reverses_and_descends_at_wall() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 8));
        let start = formation.origin();
        formation.update(1000.0, None);
        assert!(formation.origin().x > start.x);
        assert_eq!(formation.origin().y, start.y);

        for _ in 0..20 {
            formation.update(1000.0, None);
        }
        assert!(formation.origin().y > start.y, "reversal steps the formation down");
        for slot in formation.slots() {
            let pos = formation.enemy_position(slot.enemy).unwrap();
            assert!(pos.x - 14.0 >= FIELD.min_x - 1e-3 && pos.x + 14.0 <= FIELD.max_x + 1e-3);
        }
    }

    #[test]
    fn hit_lookup_and_breach() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 1));
        let enemy = formation.slots()[0].enemy;
        let pos = formation.enemy_position(enemy).unwrap();
        assert_eq!(formation.enemy_at(pos, (3.0, 8.0)), Some(enemy));
        assert_eq!(formation.enemy_at(Point::new(pos.x + 100.0, pos.y), (3.0, 8.0)), None);

        assert!(!formation.breached(588.0));
        assert!(formation.breached(pos.y - 1.0));
    }

    #[test]
    fn dead_enemies_are_not_dive_candidates() {
        let mut formation = formation();
        formation.spawn_formation(&wave("drone", 2));
        let victim = formation.slots()[0].enemy;
        formation.kill(victim);
        let candidates = formation.dive_candidates();
        assert!(!candidates[0].active);
        assert!(!formation.start_dive(victim));
    }

    #[test]
    fn profile_without_dives_is_never_scheduled() {
        let profiles = BTreeMap::from([(
            "turret".to_string(),
            EnemyProfile {
                can_dive: false,
                ..EnemyProfile::default()
            },
        )]);
        let mut formation = formation().with_profiles(profiles);
        formation.spawn_formation(&wave("turret", 4));
        assert!(formation.dive_candidates().iter().all(|c| c.active && !c.can_dive));

        let mut dive = DiveScheduler::new(
            DiveConfig {
                attack_tick_ms: 100.0,
                dive_chance_per_tick: 1.0,
                max_concurrent_divers: 4,
            },
            Box::new(ScriptedRandom::new(vec![0.0])),
        );
        assert!(dive.update(5_000.0, &mut formation).is_empty());
        assert_eq!(formation.diving_count(), 0);

        formation.spawn_formation(&wave("drone", 4));
        assert!(formation.dive_candidates().iter().all(|c| c.can_dive));
        assert_eq!(dive.update(100.0, &mut formation).len(), 1);
    }

    #[test]
    fn profile_motion_reaches_the_controller() {
        let profiles = BTreeMap::from([(
            "hunter".to_string(),
            EnemyProfile {
                pattern: Some(DivePattern::Track),
                turn_rate_deg_per_sec: Some(180.0),
                ..EnemyProfile::default()
            },
        )]);
        let mut formation = formation().with_profiles(profiles);
        formation.spawn_formation(&wave("hunter", 1));
        let enemy = formation.slots()[0].enemy;
        let start = formation.enemy_position(enemy).unwrap();
        assert!(formation.start_dive(enemy));

        let player = Point::new(start.x - 300.0, 540.0);
        for _ in 0..10 {
            formation.update(16.0, Some(player));
        }
        let pos = formation.enemy_position(enemy).unwrap();
        assert!(pos.x < start.x - 1.0, "hunter veers toward the player, at {pos:?}");
        assert_eq!(formation.enemy_state(enemy), Some(EnemyLocalState::Diving));
    }
}
