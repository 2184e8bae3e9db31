//! Counters and the summary record of a computation.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::board::Revenue;

/// Counters collected while walking paths and searching combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub anchors_walked: u64,
    pub connections: u64,
    pub candidates: u64,
    pub nodes_explored: u64,
    pub backtracks: u64,
    pub prunings_bound: u64,
    pub overlaps: u64,
    pub real_revenue_calls: u64,
    pub failed_evaluations: u64,
    pub improvements: u64,
    pub validation_rejections: u64,
    /// An exact revenue exceeded its estimate, so bound pruning may have
    /// discarded a better combination.
    pub estimate_exceeded: bool,
    /// A combination with overlapping track was accepted by the oracle.
    pub overlap_accepted: bool,
}

impl SearchStats {
    #[inline]
    pub fn on_node(&mut self) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
    }

    #[inline]
    pub fn on_backtrack(&mut self) {
        self.backtracks = self.backtracks.saturating_add(1);
    }

    #[inline]
    pub fn on_prune_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    #[inline]
    pub fn on_overlap(&mut self) {
        self.overlaps = self.overlaps.saturating_add(1);
    }

    #[inline]
    pub fn on_real_revenue_call(&mut self) {
        self.real_revenue_calls = self.real_revenue_calls.saturating_add(1);
    }

    #[inline]
    pub fn on_failed_evaluation(&mut self) {
        self.failed_evaluations = self.failed_evaluations.saturating_add(1);
    }

    #[inline]
    pub fn on_improvement(&mut self) {
        self.improvements = self.improvements.saturating_add(1);
    }

    #[inline]
    pub fn on_validation_rejection(&mut self) {
        self.validation_rejections = self.validation_rejections.saturating_add(1);
    }
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Router Statistics:")?;
        writeln!(f, "  Anchors walked: {}", self.anchors_walked)?;
        writeln!(f, "  Connections: {}", self.connections)?;
        writeln!(f, "  Candidate routes: {}", self.candidates)?;
        writeln!(f, "  Nodes explored: {}", self.nodes_explored)?;
        writeln!(f, "  Backtracks: {}", self.backtracks)?;
        writeln!(f, "  Bound prunings: {}", self.prunings_bound)?;
        writeln!(f, "  Overlaps: {}", self.overlaps)?;
        writeln!(f, "  Exact revenue calls: {}", self.real_revenue_calls)?;
        writeln!(f, "  Failed evaluations: {}", self.failed_evaluations)?;
        writeln!(f, "  Improvements: {}", self.improvements)?;
        write!(f, "  Validation rejections: {}", self.validation_rejections)?;
        if self.estimate_exceeded {
            write!(f, "\n  WARNING: exact revenue exceeded an estimate")?;
        }
        if self.overlap_accepted {
            write!(f, "\n  WARNING: an overlapping combination was accepted")?;
        }
        Ok(())
    }
}

/// Machine-readable outcome of one computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterSummary {
    pub revenue: Revenue,
    pub hexside_bit_count: usize,
    pub time_seconds: f64,
    pub real_revenue_call_count: u64,
    pub path_timed_out: bool,
    pub route_timed_out: bool,
    pub estimate_exceeded: bool,
    pub overlap_accepted: bool,
}

impl RouterSummary {
    pub fn new(
        revenue: Revenue,
        hexside_bit_count: usize,
        elapsed: Duration,
        stats: &SearchStats,
    ) -> Self {
        Self {
            revenue,
            hexside_bit_count,
            time_seconds: elapsed.as_secs_f64(),
            real_revenue_call_count: stats.real_revenue_calls,
            path_timed_out: false,
            route_timed_out: false,
            estimate_exceeded: stats.estimate_exceeded,
            overlap_accepted: stats.overlap_accepted,
        }
    }

    /// One-line JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
