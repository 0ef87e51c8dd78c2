//! Property-based tests checking the queue against a `VecDeque` model.
//!
//! Single-threaded: operations that would block are guarded by the model's
//! state, so every `put` has room and every `take` has an element. The
//! interleaving-sensitive behavior is covered by the loom and integration
//! tests; these pin down the sequential semantics of every operation.

use proptest::prelude::*;
use ringspsc_rs::BlockingRing;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Put(u64),
    Take,
    TakeLast,
    Contains(u64),
    Observe,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..50).prop_map(Op::Put),
        Just(Op::Take),
        Just(Op::TakeLast),
        (0u64..50).prop_map(Op::Contains),
        Just(Op::Observe),
    ]
}

proptest! {
    /// Every operation agrees with the reference model, and occupancy stays
    /// within [0, capacity - 1] throughout.
    #[test]
    fn prop_model_equivalence(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let queue = BlockingRing::<u64>::with_capacity(8).unwrap();
        let mut model: VecDeque<u64> = VecDeque::new();
        let usable = queue.capacity() - 1;

        for op in ops {
            match op {
                Op::Put(v) => {
                    if model.len() < usable {
                        queue.put(v);
                        model.push_back(v);
                    }
                }
                Op::Take => {
                    if let Some(expected) = model.pop_front() {
                        prop_assert_eq!(queue.take(), expected);
                    }
                }
                Op::TakeLast => {
                    if let Some(expected) = model.pop_back() {
                        model.clear();
                        prop_assert_eq!(queue.take_last(), expected);
                    }
                }
                Op::Contains(v) => {
                    prop_assert_eq!(queue.contains(&v), model.contains(&v));
                }
                Op::Observe => {
                    let mut seen = Vec::new();
                    queue.for_each(|e| seen.push(*e));
                    let expected: Vec<u64> = model.iter().copied().collect();
                    prop_assert_eq!(seen, expected);
                }
            }

            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.len() < queue.capacity());
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }
    }

    /// The multiset taken equals the multiset put, in FIFO order.
    #[test]
    fn prop_fifo_conservation(items in prop::collection::vec(any::<u64>(), 0..7)) {
        let queue = BlockingRing::<u64>::with_capacity(8).unwrap();
        for &v in &items {
            queue.put(v);
        }

        let drained: Vec<u64> = (0..items.len()).map(|_| queue.take()).collect();
        prop_assert_eq!(drained, items);
        prop_assert!(queue.is_empty());
    }

    /// `take_last` returns the newest element and leaves nothing behind.
    #[test]
    fn prop_take_last_empties(items in prop::collection::vec(any::<u64>(), 1..7)) {
        let queue = BlockingRing::<u64>::with_capacity(8).unwrap();
        for &v in &items {
            queue.put(v);
        }

        prop_assert_eq!(queue.take_last(), *items.last().unwrap());
        prop_assert_eq!(queue.len(), 0);
        prop_assert!(queue.is_empty());
    }

    /// The Debug dump renders the logical content like a Vec, oldest first.
    #[test]
    fn prop_debug_matches_content(items in prop::collection::vec(0u64..100, 0..7)) {
        let queue = BlockingRing::<u64>::with_capacity(8).unwrap();
        for &v in &items {
            queue.put(v);
        }
        prop_assert_eq!(format!("{queue:?}"), format!("{items:?}"));
    }

    /// Fill/drain cycles wrap the positions around the array without
    /// disturbing FIFO order.
    #[test]
    fn prop_wrap_preserves_order(rounds in prop::collection::vec(1usize..=3, 1..30)) {
        let queue = BlockingRing::<u64>::with_capacity(4).unwrap();
        let mut counter = 0u64;

        for burst in rounds {
            for _ in 0..burst {
                queue.put(counter);
                counter += 1;
            }
            for i in (counter - burst as u64)..counter {
                prop_assert_eq!(queue.take(), i);
            }
            prop_assert!(queue.is_empty());
        }
    }
}
