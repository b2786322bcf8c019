//! Deferred continuations for the single-threaded session.
//!
//! Nothing here blocks or spawns: continuations are queued with a due time and the
//! owner pops the ones that are due whenever it is ticked. Each entry remembers the
//! epoch it was scheduled in so the owner can drop continuations that outlived the
//! game they belonged to.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A continuation that is due.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scheduled<T> {
    pub due: Duration,
    pub epoch: u64,
    pub task: T,
}

#[derive(Debug)]
struct Entry<T> {
    due: Duration,
    seq: u64,
    epoch: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap yields the earliest due, then first scheduled.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A queue of fire-and-forget continuations ordered by due time.
///
/// Entries with the same due time fire in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to become due `delay` after `now`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, epoch: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            due: now + delay,
            seq,
            epoch,
            task,
        });
    }

    /// Removes and returns the earliest continuation due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Scheduled<T>> {
        if self.queue.peek()?.due > now {
            return None;
        }
        self.queue.pop().map(|e| Scheduled {
            due: e.due,
            epoch: e.epoch,
            task: e.task,
        })
    }

    /// Due time of the next continuation, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.peek().map(|e| e.due)
    }

    /// Drops every pending continuation.
    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T: PartialEq> Scheduler<T> {
    /// Whether an equal task is still pending.
    pub fn contains(&self, task: &T) -> bool {
        self.queue.iter().any(|e| &e.task == task)
    }
}
