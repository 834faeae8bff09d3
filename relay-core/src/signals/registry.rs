//! Slot Registry
//!
//! The registry is the only shared mutable state in a signal: an ordered list
//! of slots guarded by a reader/writer lock. Emits take the read lock just
//! long enough to clone the list; connect and disconnect take the write lock.
//!
//! # Snapshot Discipline
//!
//! `snapshot` clones the slot list (each slot is two `Arc`s and a channel
//! handle) and releases the lock before any callback runs. Consequences:
//!
//! - Concurrent emits proceed in parallel.
//! - A callback may reenter connect/disconnect/emit on the same signal
//!   without deadlocking.
//! - Mutations made while an emit is iterating are invisible to that emit.

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::slot::Slot;

/// Inline slot capacity; typical fan-out is a handful of receivers.
const INLINE_SLOTS: usize = 3;

pub(crate) type SlotList<T> = SmallVec<[Slot<T>; INLINE_SLOTS]>;

/// Ordered collection of slots for one signal.
pub(crate) struct SlotRegistry<T> {
    slots: RwLock<SlotList<T>>,
}

impl<T> SlotRegistry<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(SmallVec::new()),
        }
    }

    /// Append a slot. Insertion order is delivery order.
    pub(crate) fn append(&self, slot: Slot<T>) {
        self.slots.write().push(slot);
    }

    /// Remove every slot.
    pub(crate) fn clear(&self) {
        self.slots.write().clear();
    }

    /// Clone the current slot list out from under the read lock.
    pub(crate) fn snapshot(&self) -> SlotList<T> {
        self.slots.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }
}
