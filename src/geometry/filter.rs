//! Collision filtering: category/mask bitsets plus an override group id.
//!
//! Per design note §9: "Filters (collision masks) as a small interface." Two
//! fixtures may collide iff their category/mask bitsets agree in both
//! directions, *or* they share a non-zero group id which overrides the
//! bitset test entirely (positive group forces collision, negative group
//! forces non-collision).

/// A fixture's collision filter.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InteractionGroups {
    /// The categories this fixture belongs to.
    pub memberships: u32,
    /// The categories this fixture will collide with.
    pub filter: u32,
    /// Optional override group. `0` means "no group" (bitset test applies).
    /// A shared positive group always collides; a shared negative group
    /// never does.
    pub group: i32,
}

impl Default for InteractionGroups {
    fn default() -> Self {
        InteractionGroups {
            memberships: u32::MAX,
            filter: u32::MAX,
            group: 0,
        }
    }
}

impl InteractionGroups {
    /// Builds a filter from an explicit membership/filter bitset pair, with
    /// no group override.
    pub fn new(memberships: u32, filter: u32) -> Self {
        InteractionGroups {
            memberships,
            filter,
            group: 0,
        }
    }

    /// Sets the override group id.
    #[must_use]
    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    /// Whether `self` and `other` should be tested for collision.
    pub fn test(&self, other: &InteractionGroups) -> bool {
        if self.group != 0 && self.group == other.group {
            return self.group > 0;
        }
        (self.memberships & other.filter) != 0 && (other.memberships & self.filter) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_groups_always_collide() {
        let a = InteractionGroups::default();
        let b = InteractionGroups::default();
        assert!(a.test(&b));
    }

    #[test]
    fn disjoint_bitsets_never_collide() {
        let a = InteractionGroups::new(0b0001, 0b0001);
        let b = InteractionGroups::new(0b0010, 0b0010);
        assert!(!a.test(&b));
    }

    #[test]
    fn positive_shared_group_forces_collision() {
        let a = InteractionGroups::new(0, 0).with_group(5);
        let b = InteractionGroups::new(0, 0).with_group(5);
        assert!(a.test(&b));
    }

    #[test]
    fn negative_shared_group_forces_non_collision() {
        let a = InteractionGroups::default().with_group(-3);
        let b = InteractionGroups::default().with_group(-3);
        assert!(!a.test(&b));
    }
}
