//! Branch and bound over per-train candidate lists.
//!
//! Trains are decided one at a time, most expensive first. At each train
//! the search either leaves it idle or gives it one of its candidates, and
//! keeps per-group conflict metadata for the routes chosen so far: the
//! union of their bits, the sum of their standalone revenues, and whether
//! any two of them overlap.
//!
//! The sum is an optimistic estimate of the exact revenue. A branch is only
//! explored while that estimate, plus the best each remaining train could
//! add on its own, still beats the incumbent. Every time a route is added
//! the partial combination is itself a complete answer (the remaining
//! trains simply stay idle), so it is evaluated exactly whenever its
//! estimate could improve on the incumbent. A combination only replaces
//! the incumbent once it also passes the oracle's final validation, so a
//! rejected combination never raises the bar for the rest of the search.
//!
//! The recursion is an explicit stack so the search can stop after any
//! step and resume later.

use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::bitfield::Bitfield;
use crate::board::{Revenue, RevenueOracle, RouteError, Train};

use super::candidates::{CandidateId, CandidatePool, CandidateRoute};
use super::route::BestRoutes;
use super::stats::SearchStats;

/// How many steps run between clock reads.
const CLOCK_CHECK_INTERVAL: u32 = 32;

/// One train's decision point.
#[derive(Debug, Clone)]
pub struct Frame {
    pub train: usize,
    pub group: usize,
    pub candidates: Vec<CandidateId>,
    /// Pinned trains must run their route.
    pub optional: bool,
}

/// Routes chosen so far within one conflict group.
#[derive(Debug, Clone, Default)]
struct ConflictMetadata {
    bits: Bitfield,
    estimate: Revenue,
    overlap: bool,
}

impl ConflictMetadata {
    fn with(&self, route: &CandidateRoute) -> Self {
        Self {
            bits: self.bits.merge(&route.bitfield),
            estimate: self.estimate + route.revenue,
            overlap: self.overlap || self.bits.conflicts(&route.bitfield),
        }
    }
}

#[derive(Debug, Clone)]
struct Level {
    frame: usize,
    cursor: usize,
    selected: usize,
    metadata: Vec<ConflictMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Idle,
    Route(CandidateId),
}

/// A would-be best combination that failed final validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub revenue: Revenue,
    pub error: RouteError,
}

/// Options the search honours.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub overlap_pruning: bool,
    pub bound_pruning: bool,
    pub skip_first: bool,
}

/// Resumable branch and bound state.
pub struct RouteSearch<'a, O: ?Sized> {
    oracle: &'a O,
    trains: Vec<Train>,
    pool: CandidatePool,
    frames: Vec<Frame>,
    /// Best standalone revenue reachable from each frame onwards.
    suffix_bounds: Vec<Revenue>,
    /// Leading frames that are mandatory.
    mandatory: usize,
    options: SearchOptions,
    stack: Vec<Level>,
    selected: Vec<CandidateId>,
    best: BestRoutes,
    rejections: Vec<Rejection>,
    improved: bool,
    stats: SearchStats,
}

impl<'a, O: RevenueOracle + ?Sized> RouteSearch<'a, O> {
    /// Builds the search. Mandatory frames must come first.
    pub fn new(
        oracle: &'a O,
        trains: Vec<Train>,
        pool: CandidatePool,
        frames: Vec<Frame>,
        groups: usize,
        options: SearchOptions,
    ) -> Self {
        let mandatory = frames.iter().take_while(|frame| !frame.optional).count();
        debug_assert!(frames[mandatory..].iter().all(|frame| frame.optional));

        let mut suffix_bounds = vec![0; frames.len() + 1];
        for (index, frame) in frames.iter().enumerate().rev() {
            let best = frame
                .candidates
                .iter()
                .map(|&id| pool.get(id).revenue)
                .max()
                .unwrap_or(0);
            let contribution = if frame.optional { best.max(0) } else { best };
            suffix_bounds[index] = suffix_bounds[index + 1] + contribution;
        }

        let mut stack = Vec::new();
        if !frames.is_empty() {
            stack.push(Level {
                frame: 0,
                cursor: 0,
                selected: 0,
                metadata: vec![ConflictMetadata::default(); groups.max(1)],
            });
        }

        Self {
            oracle,
            trains,
            pool,
            frames,
            suffix_bounds,
            mandatory,
            options,
            stack,
            selected: Vec::new(),
            best: BestRoutes::default(),
            rejections: Vec::new(),
            improved: false,
            stats: SearchStats::default(),
        }
    }

    pub fn best(&self) -> &BestRoutes {
        &self.best
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn is_exhausted(&self) -> bool {
        self.stack.is_empty()
    }

    /// Runs until the search space is exhausted or `slice` has elapsed.
    ///
    /// Returns `true` once exhausted.
    pub fn run_slice(&mut self, slice: Duration) -> bool {
        let started = Instant::now();
        let mut steps: u32 = 0;
        loop {
            if !self.advance() {
                return true;
            }
            steps = steps.wrapping_add(1);
            if steps % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() >= slice {
                return false;
            }
        }
    }

    /// The incumbent, if it improved since the last call.
    pub fn take_progress(&mut self) -> Option<BestRoutes> {
        if std::mem::take(&mut self.improved) {
            Some(self.best.clone())
        } else {
            None
        }
    }

    /// The incumbent, the rejected would-be incumbents and the counters.
    pub fn finish(self) -> (BestRoutes, Vec<Rejection>, SearchStats) {
        (self.best, self.rejections, self.stats)
    }

    /// Applies the next choice on the stack. Returns `false` when there is
    /// nothing left to try.
    fn advance(&mut self) -> bool {
        loop {
            let Some(level) = self.stack.last_mut() else {
                return false;
            };
            let (frame, cursor) = (level.frame, level.cursor);
            level.cursor += 1;
            match self.choice(frame, cursor) {
                Some(choice) => {
                    self.apply(choice);
                    return true;
                }
                None => {
                    self.stack.pop();
                    self.stats.on_backtrack();
                }
            }
        }
    }

    fn choice(&self, frame: usize, cursor: usize) -> Option<Choice> {
        let frame = &self.frames[frame];
        let route = |index: usize| frame.candidates.get(index).map(|&id| Choice::Route(id));
        if !frame.optional {
            return route(cursor);
        }
        let count = frame.candidates.len();
        if self.options.skip_first {
            match cursor {
                0 => Some(Choice::Idle),
                _ => route(cursor - 1),
            }
        } else if cursor < count {
            route(cursor)
        } else if cursor == count {
            Some(Choice::Idle)
        } else {
            None
        }
    }

    fn apply(&mut self, choice: Choice) {
        let top = self.stack.len() - 1;
        let (frame, selected) = (self.stack[top].frame, self.stack[top].selected);
        self.selected.truncate(selected);
        let next = frame + 1;
        let has_next = next < self.frames.len();

        let id = match choice {
            Choice::Idle => {
                if has_next {
                    let metadata = self.stack[top].metadata.clone();
                    self.stack.push(Level {
                        frame: next,
                        cursor: 0,
                        selected,
                        metadata,
                    });
                }
                return;
            }
            Choice::Route(id) => id,
        };

        self.stats.on_node();
        let group = self.frames[frame].group;
        let mut metadata = self.stack[top].metadata.clone();
        metadata[group] = metadata[group].with(self.pool.get(id));
        self.selected.push(id);

        let overlap = metadata.iter().any(|group| group.overlap);
        let estimate: Revenue = metadata.iter().map(|group| group.estimate).sum();
        if overlap {
            self.stats.on_overlap();
        }

        let exhaustive = !self.options.bound_pruning;
        // An overlapping combination is worthless unless the title says otherwise.
        let bound = if overlap && self.options.overlap_pruning {
            None
        } else {
            Some(estimate)
        };

        // The first complete mandatory prefix seeds the incumbent whatever it
        // earns, so pinned routes are never lost.
        let seed = next == self.mandatory && self.mandatory > 0 && self.best.is_empty();
        if next >= self.mandatory
            && (seed || exhaustive || bound.is_some_and(|bound| bound > self.best.revenue))
        {
            self.evaluate(estimate, overlap, seed);
        }

        if has_next {
            let promising = bound
                .is_some_and(|bound| bound + self.suffix_bounds[next] > self.best.revenue);
            if exhaustive || promising {
                self.stack.push(Level {
                    frame: next,
                    cursor: 0,
                    selected: self.selected.len(),
                    metadata,
                });
            } else {
                self.stats.on_prune_bound();
            }
        }
    }

    fn evaluate(&mut self, estimate: Revenue, overlap: bool, seed: bool) {
        self.stats.on_real_revenue_call();
        let refs: Vec<_> = self
            .selected
            .iter()
            .map(|&id| self.pool.route_ref(id, &self.trains))
            .collect();
        let result = self.oracle.combined_revenue(&refs);

        let revenue = match result {
            Ok(revenue) => revenue,
            Err(error) => {
                self.stats.on_failed_evaluation();
                trace!(error = %error, routes = self.selected.len(), "combination rejected");
                return;
            }
        };

        if revenue > estimate {
            self.stats.estimate_exceeded = true;
        }
        if overlap {
            self.stats.overlap_accepted = true;
        }
        if revenue <= self.best.revenue && !seed {
            return;
        }

        if let Err(error) = self.oracle.validate_combination(&refs) {
            warn!(
                revenue,
                error = %error,
                incumbent = self.best.revenue,
                "combination failed validation"
            );
            self.stats.on_validation_rejection();
            self.rejections.push(Rejection { revenue, error });
            return;
        }

        let routes = self
            .selected
            .iter()
            .map(|&id| self.pool.snapshot(id, &self.trains))
            .collect();
        self.best = BestRoutes::new(revenue, routes);
        self.improved = true;
        self.stats.on_improvement();
        trace!(revenue, routes = self.selected.len(), "new best combination");
    }
}
