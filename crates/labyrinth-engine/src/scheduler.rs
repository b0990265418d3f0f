//! Deferred work counted in fixed ticks.
//!
//! Scene startup defers some calls by a few ticks, e.g. auto-play waits
//! until every component has pushed its first transform and effect chains
//! are attached shortly after playback starts.

use std::collections::VecDeque;

/// A task waiting for its tick.
#[derive(Debug, Clone, PartialEq)]
struct Pending<T> {
    due: u64,
    task: T,
}

/// Queue of tasks released after a number of fixed ticks.
///
/// Tasks due on the same tick come out in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct TickScheduler<T> {
    tick: u64,
    pending: VecDeque<Pending<T>>,
}

impl<T> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TickScheduler<T> {
    /// Create an empty scheduler at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick: 0,
            pending: VecDeque::new(),
        }
    }

    /// Run `task` once `after_ticks` more ticks have elapsed.
    ///
    /// `after_ticks == 0` releases it on the next [`Self::tick`].
    pub fn schedule(&mut self, after_ticks: u64, task: T) {
        let due = self.tick + after_ticks.max(1);
        // Keep sorted by due tick, stable for equal ticks
        let at = self.pending.partition_point(|p| p.due <= due);
        self.pending.insert(at, Pending { due, task });
    }

    /// Advance one tick and return every task that became due.
    pub fn tick(&mut self) -> Vec<T> {
        self.tick += 1;
        let ready = self.pending.partition_point(|p| p.due <= self.tick);
        self.pending.drain(..ready).map(|p| p.task).collect()
    }

    /// Ticks elapsed so far.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Tasks not yet released.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every waiting task.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
