//! RingSPSC - Blocking Single-Producer Single-Consumer Ring Queue
//!
//! A bounded lock-free ring queue with blocking back-pressure: `put` waits
//! for a free slot and `take` waits for an element, each idling through a
//! pluggable [`WaitStrategy`]. Taken slots are cleared back to an empty
//! sentinel so element destructors run as soon as values leave the queue.
//!
//! # Key Features
//!
//! - Cache-padded positions and cached mirrors (false sharing elimination)
//! - Acquire/Release publication via the positions; plain slot access
//! - Busy-wait strategies: spin, yield, sleep, park, adaptive back-off
//! - Drain-to-latest (`take_last`) and batch-amortized waiting (`take_batch`)
//!
//! # Example
//!
//! ```
//! use ringspsc_rs::BlockingRing;
//! use std::thread;
//!
//! let queue = BlockingRing::<u64>::with_capacity(8).unwrap();
//!
//! thread::scope(|s| {
//!     // Exactly one producer thread and one consumer thread.
//!     s.spawn(|| {
//!         for i in 0..1_000 {
//!             queue.put(i);
//!         }
//!     });
//!     s.spawn(|| {
//!         for i in 0..1_000 {
//!             assert_eq!(queue.take(), i);
//!         }
//!     });
//! });
//! ```

mod invariants;
mod ring;
mod slots;
mod wait;

pub use ring::{BlockingRing, Builder, RingError};
pub use wait::{Backoff, Park, Sleep, Spin, WaitStrategy, Yield};
