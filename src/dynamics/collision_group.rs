use std::cell::Cell;
use std::rc::Rc;

/// Sleep bookkeeping shared by every body of one contact cluster.
///
/// Bodies touching each other point at the same group, so the cluster falls
/// asleep and wakes up as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionGroup {
    /// Consecutive steps spent below the sleep thresholds
    pub time_without_movement: u32,
    /// Cleared when the group has been still for long enough
    pub non_sleep: bool,
}

impl Default for CollisionGroup {
    fn default() -> Self {
        Self {
            time_without_movement: 0,
            non_sleep: true,
        }
    }
}

/// A collision group shared between bodies.
///
/// The step is single threaded and never holds a borrow across mutations, so
/// a `Cell` over a `Copy` record is enough.
pub type SharedCollisionGroup = Rc<Cell<CollisionGroup>>;

/// Allocates a fresh, awake group.
pub fn new_shared_group() -> SharedCollisionGroup {
    Rc::new(Cell::new(CollisionGroup::default()))
}

/// Applies `f` to the group stored behind `group`.
#[inline]
pub(crate) fn modify_group(group: &SharedCollisionGroup, f: impl FnOnce(&mut CollisionGroup)) {
    let mut value = group.get();
    f(&mut value);
    group.set(value);
}
