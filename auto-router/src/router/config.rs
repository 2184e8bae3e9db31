//! Router configuration.

use std::time::Duration;

/// Titles whose revenue rules can make overlapping routes legal, so an
/// overlap must not rule a combination out before it is evaluated.
const OVERLAP_TOLERANT_TITLES: &[&str] = &["1822", "1860", "1862", "18 Los Angeles 2"];

/// Configuration parameters for a route computation.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Wall-clock budget for path enumeration (milliseconds).
    /// Anchors not started within it are skipped.
    pub path_timeout_ms: u64,

    /// Wall-clock budget for the combination search (milliseconds).
    pub route_timeout_ms: u64,

    /// Maximum candidate routes kept per train, best first.
    pub route_limit: usize,

    /// How long the search runs before yielding (milliseconds).
    pub slice_ms: u64,

    /// Treat a combination with overlapping track as worthless without
    /// asking the revenue oracle.
    pub overlap_pruning: bool,

    /// Prune branches whose revenue bound cannot beat the best found.
    /// Disabling it turns the search into a full enumeration.
    pub bound_pruning: bool,

    /// Try "this train runs no route" before the train's candidates.
    pub skip_first: bool,
}

impl RouterConfig {
    /// Create a new configuration with the given budgets and both pruning
    /// rules enabled.
    pub fn new(
        path_timeout_ms: u64,
        route_timeout_ms: u64,
        route_limit: usize,
        slice_ms: u64,
    ) -> Self {
        Self {
            path_timeout_ms,
            route_timeout_ms,
            route_limit,
            slice_ms,
            overlap_pruning: true,
            bound_pruning: true,
            skip_first: true,
        }
    }

    /// The default configuration adjusted for a game title.
    pub fn for_title(title: &str) -> Self {
        Self {
            overlap_pruning: !OVERLAP_TOLERANT_TITLES.contains(&title),
            ..Self::default()
        }
    }

    /// Returns the path timeout as a Duration.
    pub fn path_timeout(&self) -> Duration {
        Duration::from_millis(self.path_timeout_ms)
    }

    /// Returns the route timeout as a Duration.
    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }

    /// Returns the yield interval as a Duration.
    pub fn slice(&self) -> Duration {
        Duration::from_millis(self.slice_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(30_000, 10_000, 10_000, 30)
    }
}
