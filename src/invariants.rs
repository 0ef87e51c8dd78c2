//! Debug assertion macros for the queue's index and slot-ownership protocol.
//!
//! These are only active in debug builds (`debug_assert!`), so there is zero
//! overhead in release builds. Violations indicate either an internal bug or
//! a broken single-producer/single-consumer contract on the caller's side.

/// Assert that a position is within the slot array.
///
/// Positions always stay in `[0, capacity)` because they advance by
/// decrement-with-wrap only.
macro_rules! debug_assert_position {
    ($name:literal, $position:expr, $capacity:expr) => {
        debug_assert!(
            $position < $capacity,
            "{} position {} outside capacity {}",
            $name,
            $position,
            $capacity
        )
    };
}

/// Assert that occupancy never reaches capacity.
///
/// One slot is always reserved to disambiguate empty from full, so
/// `len <= capacity - 1`.
macro_rules! debug_assert_bounded_len {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len < $capacity,
            "occupancy {} reached capacity {}; the reserved slot was consumed",
            $len,
            $capacity
        )
    };
}

/// Assert that the producer is storing into a cleared slot.
///
/// A slot becomes writable only after the consumer has taken its element and
/// left the sentinel behind.
macro_rules! debug_assert_vacant {
    ($slot:expr, $index:expr) => {
        debug_assert!(
            $slot.is_none(),
            "slot {} still occupied on write; producer overtook the consumer",
            $index
        )
    };
}

/// Assert that the consumer is taking from an occupied slot.
///
/// Fires when `take_plain` is called on an empty queue or when the element
/// was lost to a second consumer.
macro_rules! debug_assert_occupied {
    ($slot:expr, $index:expr) => {
        debug_assert!(
            $slot.is_some(),
            "slot {} holds the sentinel on take",
            $index
        )
    };
}

/// Assert that a requested batch can ever be satisfied.
///
/// A batch of `capacity` or more would block forever: at most
/// `capacity - 1` elements fit in the queue.
macro_rules! debug_assert_batch_fits {
    ($n:expr, $capacity:expr) => {
        debug_assert!(
            $n < $capacity,
            "batch of {} can never arrive in a queue of capacity {}",
            $n,
            $capacity
        )
    };
}

pub(crate) use debug_assert_batch_fits;
pub(crate) use debug_assert_bounded_len;
pub(crate) use debug_assert_occupied;
pub(crate) use debug_assert_position;
pub(crate) use debug_assert_vacant;
