//! Time-ordered pending purge queue

use crate::entry::PendingPurge;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Heap slot
///
/// `seq` is the insertion counter. It breaks ties between equal
/// `observed_at` values so that equal timestamps pop in FIFO order.
#[derive(Debug)]
struct Slot {
    entry: PendingPurge,
    seq: u64,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .observed_at
            .cmp(&other.entry.observed_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-queue of pending purges keyed by `observed_at`
///
/// No path index is kept: the same path may be queued any number of times.
#[derive(Debug, Default)]
pub struct DelayQueue {
    heap: BinaryHeap<Reverse<Slot>>,
    next_seq: u64,
}

impl DelayQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, O(log n)
    pub fn push(&mut self, entry: PendingPurge) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Slot { entry, seq }));
    }

    /// Earliest entry without removing it, O(1)
    pub fn peek_min(&self) -> Option<&PendingPurge> {
        self.heap.peek().map(|Reverse(slot)| &slot.entry)
    }

    /// Remove and return the earliest entry, O(log n)
    pub fn pop_min(&mut self) -> Option<PendingPurge> {
        self.heap.pop().map(|Reverse(slot)| slot.entry)
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Copy of all queued entries, earliest first
    pub fn snapshot(&self) -> Vec<PendingPurge> {
        let mut slots: Vec<&Slot> = self.heap.iter().map(|Reverse(slot)| slot).collect();
        slots.sort();
        slots.into_iter().map(|slot| slot.entry.clone()).collect()
    }
}

impl Extend<PendingPurge> for DelayQueue {
    fn extend<I: IntoIterator<Item = PendingPurge>>(&mut self, iter: I) {
        for entry in iter {
            self.push(entry);
        }
    }
}
