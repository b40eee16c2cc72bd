//! Event queue: a stable min-heap of (time, process) entries
//!
//! Entries are ordered by time; a monotone sequence number breaks ties so
//! that same-time events pop in scheduling order. `pop_batch` drains one
//! delta cycle: every event at the given time, deduplicated by process
//! key so each distinct process activates at most once per batch.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use crate::process::{ProcessInfo, ProcessKey};
use crate::timing::Time;

/// A scheduled activation.
#[derive(Clone, Debug)]
pub struct Event {
    pub time: Time,
    seq: u64,
    pub process: ProcessInfo,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Min-heap of pending events.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    seq: u64,
    peak_depth: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: Time, process: ProcessInfo) {
        self.seq += 1;
        self.heap.push(Reverse(Event {
            time,
            seq: self.seq,
            process,
        }));
        if self.heap.len() > self.peak_depth {
            self.peak_depth = self.heap.len();
        }
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<Time> {
        self.heap.peek().map(|entry| entry.0.time)
    }

    /// Pop the earliest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// Pop every event scheduled at `now`, one entry per distinct process.
    ///
    /// The first-encountered activation wins; activations carry no
    /// payload, so dropping duplicates is lossless. Without this a gate
    /// fed by two inputs changing at the same time would fire twice.
    pub fn pop_batch(&mut self, now: Time) -> Vec<ProcessInfo> {
        let mut batch: IndexMap<ProcessKey, ProcessInfo> = IndexMap::new();
        loop {
            match self.heap.peek() {
                Some(entry) if entry.0.time == now => {}
                _ => break,
            }
            if let Some(Reverse(event)) = self.heap.pop() {
                batch.entry(event.process.key()).or_insert(event.process);
            }
        }
        batch.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Highest number of simultaneously queued events seen so far.
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessFn, ProcessKey};
    use proptest::prelude::*;
    use std::rc::Rc;

    fn proc(owner: usize) -> ProcessInfo {
        let body: ProcessFn = Rc::new(|_sim| Ok(()));
        ProcessInfo::new(ProcessKey::new(owner, "evaluate"), "test", "evaluate", body)
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.push(300, proc(1));
        queue.push(100, proc(2));
        queue.push(200, proc(3));

        assert_eq!(queue.peek_time(), Some(100));
        assert_eq!(queue.pop().map(|e| e.time), Some(100));
        assert_eq!(queue.pop().map(|e| e.time), Some(200));
        assert_eq!(queue.pop().map(|e| e.time), Some(300));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut queue = EventQueue::new();
        queue.push(50, proc(1));
        queue.push(50, proc(2));
        queue.push(50, proc(3));

        let batch = queue.pop_batch(50);
        let owners: Vec<ProcessKey> = batch.iter().map(|p| p.key()).collect();
        assert_eq!(owners, vec![proc(1).key(), proc(2).key(), proc(3).key()]);
    }

    #[test]
    fn test_pop_batch_dedups_by_key() {
        let mut queue = EventQueue::new();
        queue.push(10, proc(1));
        queue.push(10, proc(2));
        queue.push(10, proc(1));
        queue.push(10, proc(1));

        let batch = queue.pop_batch(10);
        assert_eq!(batch.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_batch_leaves_later_events() {
        let mut queue = EventQueue::new();
        queue.push(10, proc(1));
        queue.push(10, proc(2));
        queue.push(20, proc(1));

        let batch = queue.pop_batch(10);
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_time(), Some(20));
    }

    #[test]
    fn test_peak_depth() {
        let mut queue = EventQueue::new();
        for t in 0..5 {
            queue.push(t, proc(t as usize + 1));
        }
        queue.pop_batch(0);
        queue.push(9, proc(9));
        assert_eq!(queue.peak_depth(), 5);
    }

    proptest! {
        #[test]
        fn prop_pop_times_nondecreasing(times in prop::collection::vec(0u64..1000, 1..64)) {
            let mut queue = EventQueue::new();
            for (i, &t) in times.iter().enumerate() {
                queue.push(t, proc(i + 1));
            }
            let mut last = 0;
            while let Some(event) = queue.pop() {
                prop_assert!(event.time >= last);
                last = event.time;
            }
        }

        #[test]
        fn prop_batch_has_unique_keys(owners in prop::collection::vec(1usize..8, 1..64)) {
            let mut queue = EventQueue::new();
            for &owner in &owners {
                queue.push(42, proc(owner));
            }
            let batch = queue.pop_batch(42);
            let mut keys: Vec<ProcessKey> = batch.iter().map(|p| p.key()).collect();
            keys.sort_by_key(|k| format!("{k:?}"));
            keys.dedup();
            prop_assert_eq!(keys.len(), batch.len());
        }
    }
}
