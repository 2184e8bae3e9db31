//! Cooperative time slicing for the combination search.
//!
//! The host drives a [`Scheduler`] by calling [`Scheduler::step`]
//! repeatedly, yielding to its own event loop in between. Each step runs
//! the search for one slice and reports any improvement, so a UI stays
//! responsive and can show the best routes found so far.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::board::RevenueOracle;

use super::route::BestRoutes;
use super::search::RouteSearch;

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every branch was explored or pruned.
    Exhausted,
    /// The route deadline passed first.
    TimedOut,
    /// The running flag was cleared.
    Cancelled,
}

/// Result of one scheduling step.
#[derive(Debug, Clone)]
pub enum Step {
    /// More work remains. `progress` holds the incumbent if it improved
    /// during this step.
    Pending { progress: Option<BestRoutes> },
    Done(StopReason),
}

/// Drives a [`RouteSearch`] in bounded slices.
pub struct Scheduler<'a, O: ?Sized> {
    search: RouteSearch<'a, O>,
    started: Instant,
    deadline: Duration,
    slice: Duration,
    running: Arc<AtomicBool>,
    slices: u64,
}

impl<'a, O: RevenueOracle + ?Sized> Scheduler<'a, O> {
    pub fn new(
        search: RouteSearch<'a, O>,
        deadline: Duration,
        slice: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            search,
            started: Instant::now(),
            deadline,
            slice,
            running,
            slices: 0,
        }
    }

    pub fn search(&self) -> &RouteSearch<'a, O> {
        &self.search
    }

    pub fn into_search(self) -> RouteSearch<'a, O> {
        self.search
    }

    /// Slices run so far.
    pub fn slices(&self) -> u64 {
        self.slices
    }

    /// Runs one slice of search.
    ///
    /// Cancellation and the deadline are checked before the slice starts, so
    /// a zero deadline stops without searching at all.
    pub fn step(&mut self) -> Step {
        if !self.running.load(Ordering::Relaxed) {
            debug!(slices = self.slices, "route search cancelled");
            return Step::Done(StopReason::Cancelled);
        }
        if self.started.elapsed() >= self.deadline {
            debug!(
                slices = self.slices,
                deadline_ms = self.deadline.as_millis() as u64,
                "route search timed out"
            );
            return Step::Done(StopReason::TimedOut);
        }

        self.slices += 1;
        if self.search.run_slice(self.slice) {
            return Step::Done(StopReason::Exhausted);
        }
        Step::Pending {
            progress: self.search.take_progress(),
        }
    }
}
