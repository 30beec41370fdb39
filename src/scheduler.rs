//! Single-threaded timer queue
//!
//! Owns a virtual "now" that only ever moves forward. The daemon maps real
//! elapsed time onto `advance_to`; tests inject time directly, so debounce
//! and settle ordering is exercised without waiting on wall-clock timers.
//! Cancellation removes the entry outright, so a superseded timer can never
//! fire late.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Entry<E> {
    deadline: Duration,
    token: TimerToken,
    event: E,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    now: Duration,
    next_token: u64,
    entries: Vec<Entry<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self { now: Duration::ZERO, next_token: 0, entries: Vec::new() }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_after(&mut self, delay: Duration, event: E) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.entries.push(Entry { deadline: self.now + delay, token, event });
        token
    }

    /// Returns whether the timer was still pending
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        before != self.entries.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Move time forward and return every due event, earliest deadline
    /// first (schedule order breaks ties). Time never moves backward.
    pub fn advance_to(&mut self, now: Duration) -> Vec<E> {
        if now > self.now {
            self.now = now;
        }
        let now = self.now;
        let mut due: Vec<Entry<E>> = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.deadline <= now {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;
        due.sort_by_key(|e| (e.deadline, e.token.0));
        due.into_iter().map(|e| e.event).collect()
    }
}
