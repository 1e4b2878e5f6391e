//! Virtual-clock timer queue.
//!
//! Timers fire strictly in (due time, scheduling order). Firing is pull-based:
//! the owner pops one due timer at a time and runs it to completion before
//! asking for the next, which gives cooperative single-threaded semantics
//! without any async runtime.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Duration;

/// Handle to a scheduled timer, usable for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// A timer that came due.
#[derive(Clone, Debug, PartialEq)]
pub struct Fired<T> {
    pub id: TimerId,
    pub at: Duration,
    pub payload: T,
}

/// Min-heap of pending timers over a virtual clock that starts at zero.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BinaryHeap<Reverse<(Duration, TimerId)>>,
    pending: BTreeMap<TimerId, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BinaryHeap::new(),
            pending: BTreeMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of live (not cancelled, not yet fired) timers.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Schedule `payload` to fire `delay` after the current time.
    pub fn schedule_after(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay);
        self.queue.push(Reverse((due, id)));
        self.pending.insert(id, payload);
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Due time of the next live timer.
    pub fn next_due(&mut self) -> Option<Duration> {
        self.drop_cancelled_head();
        self.queue.peek().map(|Reverse((due, _))| *due)
    }

    /// Pop the earliest live timer due at or before `until`, moving the
    /// clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        self.drop_cancelled_head();
        let Reverse((due, id)) = *self.queue.peek()?;
        if due > until {
            return None;
        }
        self.queue.pop();
        let payload = self.pending.remove(&id)?;
        self.now = self.now.max(due);
        Some(Fired {
            id,
            at: due,
            payload,
        })
    }

    /// Move the clock forward to `to` once every due timer has been popped.
    pub fn settle(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    fn drop_cancelled_head(&mut self) {
        while let Some(Reverse((_, id))) = self.queue.peek() {
            if self.pending.contains_key(id) {
                break;
            }
            self.queue.pop();
        }
    }
}
