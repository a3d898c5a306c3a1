use std::collections::BTreeMap;

use blaster_core::ports::{EnemyId, FormationSlot};

/// Which enemy in each formation column may shoot.
///
/// The front-most (highest row) alive enemy that is still in formation owns
/// its column. Every notification recomputes from the full slot snapshot;
/// nothing is tracked incrementally.
#[derive(Debug, Clone, Default)]
pub struct ShooterEligibility {
    by_column: BTreeMap<u32, FormationSlot>,
}

impl ShooterEligibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild_from_formation(&mut self, slots: &[FormationSlot]) {
        self.by_column.clear();
        for slot in slots.iter().filter(|s| s.alive && s.in_formation) {
            match self.by_column.get(&slot.column) {
                Some(current) if current.row >= slot.row => {},
                _ => {
                    self.by_column.insert(slot.column, *slot);
                },
            }
        }
    }

    pub fn on_enemy_died(&mut self, slots: &[FormationSlot]) {
        self.rebuild_from_formation(slots);
    }

    pub fn on_enemy_detached(&mut self, slots: &[FormationSlot]) {
        self.rebuild_from_formation(slots);
    }

    pub fn on_enemy_reattached(&mut self, slots: &[FormationSlot]) {
        self.rebuild_from_formation(slots);
    }

    pub fn clear(&mut self) {
        self.by_column.clear();
    }

    pub fn is_eligible(&self, enemy: EnemyId) -> bool {
        self.by_column.values().any(|s| s.enemy == enemy)
    }

    pub fn eligible_in_column(&self, column: u32) -> Option<EnemyId> {
        self.by_column.get(&column).map(|s| s.enemy)
    }

    /// Eligible shooters ordered by column.
    pub fn all_eligible(&self) -> impl ExactSizeIterator<Item = EnemyId> + '_ {
        self.by_column.values().map(|s| s.enemy)
    }

    pub fn len(&self) -> usize {
        self.by_column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaster_core::test_helpers::StubFormation;

    #[test]
    fn front_row_owns_the_column() {
        let mut formation = StubFormation::default();
        formation.push_slot(10, 1, 0);
        formation.push_slot(20, 2, 0);

        let mut eligibility = ShooterEligibility::new();
        eligibility.rebuild_from_formation(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(0), Some(20));
        assert!(eligibility.is_eligible(20));
        assert!(!eligibility.is_eligible(10));

        if let Some(slot) = formation.slot_mut(20) {
            slot.alive = false;
        }
        eligibility.on_enemy_died(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(0), Some(10));
    }

    #[test]
    fn detached_enemy_loses_and_regains_eligibility() {
        let mut formation = StubFormation::default();
        formation.push_slot(10, 1, 0);
        formation.push_slot(20, 2, 0);
        let mut eligibility = ShooterEligibility::new();
        eligibility.rebuild_from_formation(&formation.slots);

        if let Some(slot) = formation.slot_mut(20) {
            slot.in_formation = false;
        }
        eligibility.on_enemy_detached(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(0), Some(10));

        if let Some(slot) = formation.slot_mut(20) {
            slot.in_formation = true;
        }
        eligibility.on_enemy_reattached(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(0), Some(20));
    }

    #[test]
    fn empty_column_has_no_shooter() {
        let mut formation = StubFormation::default();
        formation.push_slot(1, 0, 0);
        formation.push_slot(2, 0, 2);
        let mut eligibility = ShooterEligibility::new();
        eligibility.rebuild_from_formation(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(1), None);
        assert_eq!(eligibility.all_eligible().collect::<Vec<_>>(), vec![1, 2]);

        eligibility.clear();
        assert!(eligibility.is_empty());
    }

    #[test]
    fn slot_order_does_not_matter() {
        let mut formation = StubFormation::default();
        formation.push_slot(30, 3, 1);
        formation.push_slot(10, 1, 1);
        formation.push_slot(20, 2, 1);
        let mut eligibility = ShooterEligibility::new();
        eligibility.rebuild_from_formation(&formation.slots);
        assert_eq!(eligibility.eligible_in_column(1), Some(30));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn one_front_most_shooter_per_column(
                flags in proptest::collection::vec((0u32..4, any::<bool>(), any::<bool>()), 0..24)
            ) {
                // Rows are unique per column: row = index within the column.
                let mut rows_per_column = [0u32; 4];
                let slots: Vec<FormationSlot> = flags
                    .iter()
                    .enumerate()
                    .map(|(i, &(column, alive, in_formation))| {
                        let row = rows_per_column[column as usize];
                        rows_per_column[column as usize] += 1;
                        FormationSlot { enemy: i as EnemyId, row, column, alive, in_formation }
                    })
                    .collect();

                let mut eligibility = ShooterEligibility::new();
                eligibility.rebuild_from_formation(&slots);

                for column in 0..4u32 {
                    let expected = slots
                        .iter()
                        .filter(|s| s.column == column && s.alive && s.in_formation)
                        .max_by_key(|s| s.row)
                        .map(|s| s.enemy);
                    prop_assert_eq!(eligibility.eligible_in_column(column), expected);
                }
            }
        }
    }
}
