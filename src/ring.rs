use crate::invariants::{
    debug_assert_batch_fits, debug_assert_bounded_len, debug_assert_position,
};
use crate::slots::SlotArray;
use crate::wait::{Backoff, WaitStrategy};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This blocking SPSC queue uses a classic producer-consumer protocol with the
// following synchronization guarantees:
//
// ## Positions (decrement orientation)
//
// `read` and `write` are bounded indices in [0, capacity) that advance
// BACKWARDS: `next(p) = (p == 0) ? capacity - 1 : p - 1`. Both start at
// `capacity - 1`. The queue is empty iff `write == read`; it is full iff
// `next(write) == read`, so one slot is always reserved and occupancy never
// exceeds `capacity - 1`. `write` points at the next slot to be written;
// the occupied slots run from `read` down to `write + 1`, splitting across
// the wrap boundary when `write > read`.
//
// ## Memory Ordering Protocol
//
// **Producer (put path):**
// 1. Load `write` with Relaxed (only the producer stores it)
// 2. Load `cached_read` with no ordering (UnsafeCell, single-writer)
// 3. On collision only: load `read` with Acquire (synchronizes with consumer)
// 4. Plain-store the element into the slot at the current `write`
// 5. Store `write` with Release (publishes the slot write to the consumer)
//
// **Consumer (take path):**
// 1. Load `read` with Relaxed (only the consumer stores it)
// 2. Load `cached_write` with no ordering (UnsafeCell, single-writer)
// 3. On collision only: load `write` with Acquire (synchronizes with producer)
// 4. Store the decremented `read` with Release
// 5. Plain-load the element from the slot at the OLD `read`, leave the
//    sentinel behind
//
// Publishing `read` before touching the slot (steps 4-5) is safe because of
// the reserved slot: the producer writes the slot at position `p` only when
// `next(p) != read`, so the slot just vacated at the old `read` stays
// consumer-owned until a LATER take publishes. The clear in step 5 is
// sequenced before that later Release store, which is what the producer's
// Acquire refresh of `cached_read` synchronizes with before reusing the slot.
//
// ## Single-Writer Invariants
//
// The following fields are accessed via UnsafeCell without atomics because
// they have exactly one writer:
// - `cached_read`, `write_wait`: only touched by the producer
// - `cached_write`, `read_wait`: only touched by the consumer
// - `slots[i]`: written by the producer between index reservation and the
//   Release store of `write`; read and cleared by the consumer between the
//   Acquire load of `write` and the Release store of a later `read`
//
// These invariants hold only under the single-producer single-consumer
// contract; see the type-level docs.
//
// =============================================================================

/// Error type for queue construction and for family-contract operations this
/// variant opts out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Capacity must be a power of two and at least 2.
    #[error("capacity must be a power of two >= 2 (got {got})")]
    InvalidCapacity {
        /// The rejected capacity.
        got: usize,
    },
    /// The operation exists in the queue family's uniform contract but is
    /// not supported by this variant.
    #[error("`{op}` is not supported by this queue variant")]
    Unsupported {
        /// Name of the unsupported operation.
        op: &'static str,
    },
}

/// Configures and assembles a [`BlockingRing`].
///
/// The builder owns capacity validation and storage allocation; the queue
/// itself assumes a well-formed configuration.
///
/// # Example
///
/// ```
/// use ringspsc_rs::{Builder, Sleep, Spin};
///
/// let queue = Builder::new(1024)
///     .unwrap()
///     .read_wait(Spin)
///     .write_wait(Sleep::default())
///     .build::<u64>();
/// assert_eq!(queue.capacity(), 1024);
/// ```
pub struct Builder {
    capacity: usize,
    read_wait: Box<dyn WaitStrategy>,
    write_wait: Box<dyn WaitStrategy>,
}

impl Builder {
    /// Starts a builder for a queue of `capacity` slots.
    ///
    /// Capacity must be a power of two and at least 2; one slot is always
    /// reserved, so at most `capacity - 1` elements are ever queued. Both
    /// wait strategies default to [`Backoff`].
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(RingError::InvalidCapacity { got: capacity });
        }
        Ok(Self {
            capacity,
            read_wait: Box::new(Backoff::new()),
            write_wait: Box::new(Backoff::new()),
        })
    }

    /// Installs the strategy the consumer idles with while the queue is empty.
    pub fn read_wait(mut self, strategy: impl WaitStrategy + 'static) -> Self {
        self.read_wait = Box::new(strategy);
        self
    }

    /// Installs the strategy the producer idles with while the queue is full.
    pub fn write_wait(mut self, strategy: impl WaitStrategy + 'static) -> Self {
        self.write_wait = Box::new(strategy);
        self
    }

    /// Allocates the slot storage (all sentinels) and assembles the queue.
    pub fn build<T>(self) -> BlockingRing<T> {
        let capacity_minus_one = self.capacity - 1;
        BlockingRing {
            write: CachePadded::new(AtomicUsize::new(capacity_minus_one)),
            cached_read: CachePadded::new(UnsafeCell::new(capacity_minus_one)),
            write_wait: UnsafeCell::new(self.write_wait),
            read: CachePadded::new(AtomicUsize::new(capacity_minus_one)),
            cached_write: CachePadded::new(UnsafeCell::new(capacity_minus_one)),
            read_wait: UnsafeCell::new(self.read_wait),
            capacity: self.capacity,
            capacity_minus_one,
            slots: SlotArray::new(self.capacity),
        }
    }
}

/// Blocking single-producer single-consumer ring queue.
///
/// Back-pressure is blocking: `put` waits for a free slot, `take` waits for
/// an element, both idling through the installed [`WaitStrategy`]. The hot
/// path is lock-free; each side reads the opposite position through a
/// private cached mirror and refreshes it with an Acquire load only when the
/// fast-path test suggests the queue may be full/empty.
///
/// Taken slots are cleared back to the empty sentinel, so an element's
/// destructor runs when the value leaves the queue (or when the caller drops
/// the returned value), never as late as the slot's eventual reuse.
///
/// # Contract
///
/// Exactly one thread may call the producer operation (`put`) and exactly
/// one thread may call the consumer operations (`take`, `take_plain`,
/// `take_batch`, `take_last`, and the slot-walking observers `contains`,
/// `for_each`, `Debug`). Concurrent producers or consumers are a data race.
/// The index observers `len` / `is_empty` / `capacity` are safe from any
/// thread.
pub struct BlockingRing<T> {
    // === PRODUCER HOT ===
    /// Write position (stored by the producer, read by the consumer).
    write: CachePadded<AtomicUsize>,
    /// Producer's cached view of `read` (avoids cross-core reads).
    cached_read: CachePadded<UnsafeCell<usize>>,
    /// Strategy the producer idles with while full. Producer-private.
    write_wait: UnsafeCell<Box<dyn WaitStrategy>>,

    // === CONSUMER HOT ===
    /// Read position (stored by the consumer, read by the producer).
    read: CachePadded<AtomicUsize>,
    /// Consumer's cached view of `write` (avoids cross-core reads).
    cached_write: CachePadded<UnsafeCell<usize>>,
    /// Strategy the consumer idles with while empty. Consumer-private.
    read_wait: UnsafeCell<Box<dyn WaitStrategy>>,

    // === COLD STATE ===
    capacity: usize,
    capacity_minus_one: usize,
    slots: SlotArray<T>,
}

// SAFETY: the atomic positions carry all inter-thread publication; the
// UnsafeCell fields are single-writer per the SPSC contract documented on
// the type.
unsafe impl<T: Send> Send for BlockingRing<T> {}
unsafe impl<T: Send> Sync for BlockingRing<T> {}

impl<T> BlockingRing<T> {
    /// Builds a queue with the given capacity and default [`Backoff`]
    /// strategies on both sides.
    pub fn with_capacity(capacity: usize) -> Result<Self, RingError> {
        Ok(Builder::new(capacity)?.build())
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & GEOMETRY
    // ---------------------------------------------------------------------

    /// Returns the immutable capacity (one slot of which stays reserved).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Decrement-with-wrap: the direction both positions advance.
    #[inline]
    fn next_position(&self, position: usize) -> usize {
        if position == 0 {
            self.capacity_minus_one
        } else {
            position - 1
        }
    }

    /// One step against the decrement direction: from the write position,
    /// this is the slot most recently written.
    #[inline]
    fn newest_slot(&self, write: usize) -> usize {
        if write == self.capacity_minus_one {
            0
        } else {
            write + 1
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Blocks until one slot is free, then publishes `element`.
    ///
    /// Producer-only.
    pub fn put(&self, element: T) {
        let write = self.write.load(Ordering::Relaxed);
        let next = self.next_position(write);
        debug_assert_position!("write", write, self.capacity);

        // SAFETY: write_wait is touched only by the producer.
        let wait = unsafe { &mut *self.write_wait.get() };
        wait.reset();
        while self.is_full_from(next) {
            wait.tick();
        }

        // SAFETY: the full test above proved `next != read`, so the slot at
        // the current write position was cleared by the consumer before its
        // read position moved past it; only this producer touches it until
        // the Release store below publishes it.
        unsafe { self.slots.write(write, element) };
        self.write.store(next, Ordering::Release);
    }

    /// Fast-path full test against the producer's cached mirror; refreshes
    /// the mirror with an Acquire load only on collision.
    #[inline]
    fn is_full_from(&self, next: usize) -> bool {
        // SAFETY: cached_read is producer-private.
        let cached = unsafe { *self.cached_read.get() };
        if next == cached {
            let read = self.read.load(Ordering::Acquire);
            // SAFETY: as above; the Acquire load synchronizes with the
            // consumer's Release store.
            unsafe { *self.cached_read.get() = read };
            return next == read;
        }
        false
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Blocks until one element is available, then returns it, leaving the
    /// sentinel in its slot.
    ///
    /// Consumer-only.
    pub fn take(&self) -> T {
        let read = self.read.load(Ordering::Relaxed);
        debug_assert_position!("read", read, self.capacity);

        // SAFETY: read_wait is touched only by the consumer.
        let wait = unsafe { &mut *self.read_wait.get() };
        wait.reset();
        while self.is_empty_from(read) {
            wait.tick();
        }

        self.read.store(self.next_position(read), Ordering::Release);
        // SAFETY: the slot at the old read position stays consumer-owned
        // even after the store above; the producer cannot target it until a
        // later take advances `read` again (one slot is always reserved).
        unsafe { self.slots.take(read) }
    }

    /// Non-blocking take with no emptiness check and no cache refresh.
    ///
    /// Consumer-only. Undefined unless the caller already knows the queue is
    /// non-empty, e.g. after [`take_batch`](Self::take_batch); debug builds
    /// assert the slot is occupied.
    pub fn take_plain(&self) -> T {
        let read = self.read.load(Ordering::Relaxed);
        self.read.store(self.next_position(read), Ordering::Release);
        // SAFETY: same ownership argument as `take`; occupancy is the
        // caller's obligation.
        unsafe { self.slots.take(read) }
    }

    /// Blocks until at least `n` elements are queued. Consumes nothing.
    ///
    /// Consumer-only. Amortizes the wait cost before a burst of
    /// [`take_plain`](Self::take_plain) calls: once this returns, `n`
    /// consecutive `take_plain` calls succeed without blocking.
    pub fn take_batch(&self, n: usize) {
        debug_assert_batch_fits!(n, self.capacity);

        // SAFETY: read_wait is touched only by the consumer.
        let wait = unsafe { &mut *self.read_wait.get() };
        wait.reset();
        while self.len() < n {
            wait.tick();
        }
    }

    /// Blocks until at least one element exists, then discards everything
    /// except the most recently written element and returns it. The queue is
    /// empty afterwards.
    ///
    /// Consumer-only. The new read position is published with a plain store
    /// only; the producer's view of the freed slots stays stale until the
    /// next `take` publishes with Release. TODO: revisit whether this store
    /// should be a Release like `take`'s.
    pub fn take_last(&self) -> T {
        let read = self.read.load(Ordering::Relaxed);

        // SAFETY: read_wait is touched only by the consumer.
        let wait = unsafe { &mut *self.read_wait.get() };
        wait.reset();
        let mut write = self.write.load(Ordering::Acquire);
        while write == read {
            wait.tick();
            write = self.write.load(Ordering::Acquire);
        }
        // SAFETY: cached_write is consumer-private. Refreshing it here keeps
        // the fast-path empty test sound: the read position is about to jump
        // to `write`, and a stale mirror would let the next `take` mistake
        // the empty queue for non-empty.
        unsafe { *self.cached_write.get() = write };

        let newest = self.newest_slot(write);
        // SAFETY: every slot from `read` down to `newest` is published and
        // consumer-owned; the producer is confined to the other side of
        // `write`.
        let element = unsafe { self.slots.take(newest) };
        if newest <= read {
            // Contiguous range, no wrap.
            unsafe { self.clear_span(newest, read) };
        } else {
            unsafe {
                self.clear_span(0, read);
                self.clear_span(newest, self.capacity_minus_one);
            }
        }
        self.read.store(write, Ordering::Relaxed);
        element
    }

    /// Drops every element in slots `lo..=hi`, leaving sentinels.
    ///
    /// # Safety
    ///
    /// The consumer must own every slot in the span.
    unsafe fn clear_span(&self, lo: usize, hi: usize) {
        for index in lo..=hi {
            self.slots.clear(index);
        }
    }

    /// Fast-path empty test against the consumer's cached mirror; refreshes
    /// the mirror with an Acquire load only on collision.
    #[inline]
    fn is_empty_from(&self, read: usize) -> bool {
        // SAFETY: cached_write is consumer-private.
        let cached = unsafe { *self.cached_write.get() };
        if read == cached {
            let write = self.write.load(Ordering::Acquire);
            // SAFETY: as above; the Acquire load synchronizes with the
            // producer's Release store.
            unsafe { *self.cached_write.get() = write };
            return read == write;
        }
        false
    }

    // ---------------------------------------------------------------------
    // OBSERVERS
    // ---------------------------------------------------------------------
    //
    // `len` and `is_empty` read only the positions and are safe from any
    // thread; their results may be stale by the time the caller acts on
    // them. The slot-walking observers (`contains`, `for_each`, `Debug`)
    // snapshot both positions and then read slots with plain loads, so they
    // run on the consumer side, where no clear can race the walk; each slot
    // is still loaded once and sentinel-checked before the callback.
    // ---------------------------------------------------------------------

    /// Current occupancy. Wait-free; never exceeds `capacity - 1`.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        let len = if write <= read {
            read - write
        } else {
            self.capacity - (write - read)
        };
        debug_assert_bounded_len!(len, self.capacity);
        len
    }

    /// Wait-free equivalent of `len() == 0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// Whether any queued element equals `element`. Oldest-first traversal.
    pub fn contains(&self, element: &T) -> bool
    where
        T: PartialEq,
    {
        let mut found = false;
        self.scan(|candidate| {
            if candidate == element {
                found = true;
                false
            } else {
                true
            }
        });
        found
    }

    /// Applies `f` to each queued element, oldest (read side) first.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        self.scan(|element| {
            f(element);
            true
        });
    }

    /// Walks the occupied range from the read position down toward the
    /// write position, splitting across the wrap boundary when needed.
    /// `visit` returns `false` to stop early. Slots observed holding the
    /// sentinel are skipped.
    fn scan<F>(&self, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        if read == write {
            return;
        }

        let newest = self.newest_slot(write);
        if newest <= read {
            for index in (newest..=read).rev() {
                if !self.visit_slot(index, &mut visit) {
                    return;
                }
            }
        } else {
            for index in (0..=read).rev() {
                if !self.visit_slot(index, &mut visit) {
                    return;
                }
            }
            for index in (newest..=self.capacity_minus_one).rev() {
                if !self.visit_slot(index, &mut visit) {
                    return;
                }
            }
        }
    }

    #[inline]
    fn visit_slot<F>(&self, index: usize, visit: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        // Single load; skip the slot if the sentinel was observed.
        match unsafe { self.slots.get(index) } {
            Some(element) => visit(element),
            None => true,
        }
    }

    // ---------------------------------------------------------------------
    // FAMILY CONTRACT: UNSUPPORTED IN THIS VARIANT
    // ---------------------------------------------------------------------

    /// Monitor-based consumption is reserved for the locking variants of the
    /// queue family; this lock-free variant opts out.
    pub fn read_monitor(&self) -> Result<&Mutex<()>, RingError> {
        Err(RingError::Unsupported { op: "read_monitor" })
    }

    /// Per-call wait strategies are reserved for other variants of the queue
    /// family; this variant always uses the strategies installed at build
    /// time.
    pub fn take_with(&self, _strategy: &mut dyn WaitStrategy) -> Result<T, RingError> {
        Err(RingError::Unsupported { op: "take_with" })
    }
}

/// Dumps the logical content in `for_each` order, `[e1, e2, ...]`.
impl<T: fmt::Debug> fmt::Debug for BlockingRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        self.scan(|element| {
            list.entry(element);
            true
        });
        list.finish()
    }
}
