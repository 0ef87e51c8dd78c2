use crate::invariants::{debug_assert_occupied, debug_assert_vacant};
use std::cell::UnsafeCell;

/// Fixed-capacity slot storage with plain (unordered) access.
///
/// A slot holds either one element or `None`, the empty sentinel. No slot
/// access carries any cross-thread ordering of its own; all inter-thread
/// visibility comes from the release-store / acquire-load of the position
/// that surrounds the access. That protocol is also what makes the
/// `UnsafeCell` accesses below sound:
///
/// - a slot is written only by the producer, between reserving its index and
///   release-publishing the advanced write position;
/// - from that publication until the consumer clears it back to the
///   sentinel, the slot is read and written only by the consumer.
pub(crate) struct SlotArray<T> {
    slots: Box<[UnsafeCell<Option<T>>]>,
}

impl<T> SlotArray<T> {
    /// Allocates `capacity` slots, all holding the sentinel.
    pub(crate) fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || UnsafeCell::new(None));
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// Plain-stores an element into a cleared slot.
    ///
    /// # Safety
    ///
    /// The caller must be the sole producer, `index` must be the reserved
    /// write position, and the consumer must have already cleared the slot.
    pub(crate) unsafe fn write(&self, index: usize, element: T) {
        let slot = &mut *self.slots[index].get();
        debug_assert_vacant!(slot, index);
        *slot = Some(element);
    }

    /// Moves the element out of a slot, leaving the sentinel.
    ///
    /// # Safety
    ///
    /// The caller must be the sole consumer and the slot must hold a
    /// published element.
    pub(crate) unsafe fn take(&self, index: usize) -> T {
        let slot = &mut *self.slots[index].get();
        debug_assert_occupied!(slot, index);
        // SAFETY: occupancy is guaranteed by the index protocol and checked
        // above in debug builds.
        slot.take().unwrap_unchecked()
    }

    /// Drops any element in the slot, leaving the sentinel. Idempotent.
    ///
    /// # Safety
    ///
    /// The caller must be the sole consumer and own the slot per the index
    /// protocol.
    pub(crate) unsafe fn clear(&self, index: usize) {
        *self.slots[index].get() = None;
    }

    /// Single plain load of a slot for observer traversal.
    ///
    /// Returns `None` when the sentinel was observed.
    ///
    /// # Safety
    ///
    /// The caller must hold the slot read-stable for the borrow's lifetime:
    /// in practice, observer traversal runs on the consumer side so no clear
    /// can race the load.
    pub(crate) unsafe fn get(&self, index: usize) -> Option<&T> {
        (*self.slots[index].get()).as_ref()
    }
}
