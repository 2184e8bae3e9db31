//! The auto-router: path walk, candidate building and combination search.
//!
//! A computation runs in two phases. The path phase walks the board from
//! every anchor (a node the entity has tokened) and scores each connection
//! for each train, producing per-train candidate lists. The route phase
//! searches those lists for the best combination, in time slices so the
//! caller can yield between them.

mod candidates;
mod config;
mod error;
mod route;
mod scheduler;
mod search;
mod stats;


pub use candidates::{CandidateId, CandidatePool, CandidateRoute};
pub use config::RouterConfig;
pub use error::RouterError;
pub use route::{BestRoutes, Route};
pub use scheduler::{Scheduler, Step, StopReason};
pub use search::{Frame, Rejection, RouteSearch, SearchOptions};
pub use stats::{RouterSummary, SearchStats};

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::bitfield::HexsideBits;
use crate::board::{Board, EntityId, NodeId, Revenue, RevenueOracle, RouteError, Train, conflict_group};
use crate::walk::Walker;

use candidates::CandidateBuilder;

/// Something the caller should tell the player about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Path enumeration ran out of time; some anchors were not walked.
    PathTimeout,
    /// The combination search ran out of time.
    RouteTimeout,
    /// The best combination failed final validation.
    CombinationRejected { revenue: Revenue, error: RouteError },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PathTimeout => {
                f.write_str("Auto route path walk failed to complete (PATH TIMEOUT)")
            }
            Notice::RouteTimeout => {
                f.write_str("Auto route selection failed to complete (ROUTE TIMEOUT)")
            }
            Notice::CombinationRejected { revenue, error } => {
                write!(f, "Auto route combination worth {revenue} rejected: {error}")
            }
        }
    }
}

type Callback<'c, T> = Box<dyn FnMut(&T) + 'c>;

/// Per-call settings for a computation.
#[derive(Default)]
pub struct ComputeOptions<'c> {
    /// Routes that must be kept as they are.
    pub pinned: Vec<Route>,
    pub path_timeout: Option<Duration>,
    pub route_timeout: Option<Duration>,
    pub route_limit: Option<usize>,
    /// Cleared by the caller to stop the search early.
    pub running: Option<Arc<AtomicBool>>,
    on_progress: Option<Callback<'c, BestRoutes>>,
    on_done: Option<Callback<'c, Outcome>>,
    on_notice: Option<Callback<'c, Notice>>,
}

impl<'c> ComputeOptions<'c> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(mut self, routes: Vec<Route>) -> Self {
        self.pinned = routes;
        self
    }

    pub fn path_timeout(mut self, timeout: Duration) -> Self {
        self.path_timeout = Some(timeout);
        self
    }

    pub fn route_timeout(mut self, timeout: Duration) -> Self {
        self.route_timeout = Some(timeout);
        self
    }

    pub fn route_limit(mut self, limit: usize) -> Self {
        self.route_limit = Some(limit);
        self
    }

    pub fn running(mut self, flag: Arc<AtomicBool>) -> Self {
        self.running = Some(flag);
        self
    }

    /// Called with each improved incumbent between slices.
    pub fn on_progress(mut self, callback: impl FnMut(&BestRoutes) + 'c) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Called once with the final outcome.
    pub fn on_done(mut self, callback: impl FnMut(&Outcome) + 'c) -> Self {
        self.on_done = Some(Box::new(callback));
        self
    }

    pub fn on_notice(mut self, callback: impl FnMut(&Notice) + 'c) -> Self {
        self.on_notice = Some(Box::new(callback));
        self
    }

    fn notify(&mut self, notice: &Notice) {
        if let Some(callback) = self.on_notice.as_mut() {
            callback(notice);
        }
    }

    fn progress(&mut self, best: &BestRoutes) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(best);
        }
    }

    fn done(&mut self, outcome: &Outcome) {
        if let Some(callback) = self.on_done.as_mut() {
            callback(outcome);
        }
    }
}

/// Final result of a computation.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub best: BestRoutes,
    pub path_timed_out: bool,
    pub route_timed_out: bool,
    pub cancelled: bool,
    pub rejections: Vec<Rejection>,
    pub stats: SearchStats,
    pub hexside_bits: usize,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn revenue(&self) -> Revenue {
        self.best.revenue
    }

    pub fn routes(&self) -> &[Route] {
        &self.best.routes
    }

    pub fn summary(&self) -> RouterSummary {
        RouterSummary {
            path_timed_out: self.path_timed_out,
            route_timed_out: self.route_timed_out,
            ..RouterSummary::new(self.best.revenue, self.hexside_bits, self.elapsed, &self.stats)
        }
    }
}

/// Everything the path phase produced, ready to be searched.
pub struct Prepared<'g, G: ?Sized> {
    pub scheduler: Scheduler<'g, G>,
    pub path_timed_out: bool,
    pub hexside_bits: usize,
    pub walk_stats: SearchStats,
}

/// Computes the best routes for an entity.
pub struct AutoRouter<'g, G: ?Sized> {
    game: &'g G,
    config: RouterConfig,
}

impl<'g, G: Board + RevenueOracle + ?Sized> AutoRouter<'g, G> {
    /// A router configured for the game's title.
    pub fn new(game: &'g G) -> Self {
        Self::with_config(game, RouterConfig::for_title(game.title()))
    }

    pub fn with_config(game: &'g G, config: RouterConfig) -> Self {
        Self { game, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Runs the path phase and sets up the route phase.
    pub fn prepare(
        &self,
        entity: EntityId,
        options: &ComputeOptions<'_>,
    ) -> Result<Prepared<'g, G>, RouterError> {
        let game = self.game;
        let mut trains = game.route_trains(entity);
        // Most expensive first; the search decides trains in this order.
        trains.sort_by_key(|train| Reverse(train.price));

        let pinned = self.pinned_trains(&trains, &options.pinned)?;
        let walk_trains: Vec<usize> = (0..trains.len())
            .filter(|index| !pinned.iter().any(|(train, _)| train == index))
            .collect();

        let mut walker = Walker::new(game);
        let pinned_routes: Vec<_> = pinned
            .iter()
            .map(|&(train, route)| {
                let connection = route.connection.reencoded(walker.table_mut());
                let bitfield = connection.bitfield(walker.table_mut());
                (train, connection, bitfield)
            })
            .collect();
        for (_, _, bitfield) in &pinned_routes {
            walker.skip(bitfield);
        }

        let anchors = ordered_anchors(game, entity, &trains);
        let path_timeout = options.path_timeout.unwrap_or(self.config.path_timeout());
        let started = Instant::now();
        let mut walk_stats = SearchStats::default();
        let mut path_timed_out = false;

        let mut builder = CandidateBuilder::new(game, entity, &trains);
        if !walk_trains.is_empty() {
            for (index, &anchor) in anchors.iter().enumerate() {
                if started.elapsed() >= path_timeout {
                    warn!(
                        walked = index,
                        anchors = anchors.len(),
                        "path walk timed out"
                    );
                    path_timed_out = true;
                    break;
                }
                trace!(anchor = %anchor, index, "walking anchor");
                walker.walk(anchor, &walk_trains, &mut builder)?;
                walk_stats.anchors_walked += 1;
            }
        }
        walk_stats.connections = walker.connections() as u64;

        let mut pool = builder.into_pool();
        for (train, connection, bitfield) in pinned_routes {
            let revenue = game
                .single_route_revenue(&trains[train], &connection)
                .unwrap_or_else(|error| {
                    debug!(train, error = %error, "pinned route does not score on its own");
                    0
                });
            pool.force(CandidateRoute {
                train,
                connection,
                bitfield,
                revenue,
            });
        }
        pool.rank(options.route_limit.unwrap_or(self.config.route_limit));
        walk_stats.candidates = pool.len() as u64;

        let table: HexsideBits = walker.into_table();
        debug!(
            anchors = walk_stats.anchors_walked,
            connections = walk_stats.connections,
            candidates = walk_stats.candidates,
            hexside_bits = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "path walk complete"
        );

        let groups = game.train_groups();
        let mut frames: Vec<Frame> = (0..trains.len())
            .filter(|&train| !pool.for_train(train).is_empty())
            .map(|train| Frame {
                train,
                group: conflict_group(&groups, &trains[train]),
                candidates: pool.for_train(train).to_vec(),
                optional: !pinned.iter().any(|&(fixed, _)| fixed == train),
            })
            .collect();
        // Mandatory frames lead so every evaluated prefix contains them.
        frames.sort_by_key(|frame| frame.optional);

        let options_for_search = SearchOptions {
            overlap_pruning: self.config.overlap_pruning,
            bound_pruning: self.config.bound_pruning,
            skip_first: self.config.skip_first,
        };
        let search = RouteSearch::new(
            game,
            trains,
            pool,
            frames,
            groups.len() + 1,
            options_for_search,
        );
        let scheduler = Scheduler::new(
            search,
            options.route_timeout.unwrap_or(self.config.route_timeout()),
            self.config.slice(),
            options
                .running
                .clone()
                .unwrap_or_else(|| Arc::new(AtomicBool::new(true))),
        );

        Ok(Prepared {
            scheduler,
            path_timed_out,
            hexside_bits: table.len(),
            walk_stats,
        })
    }

    /// Computes the best routes, blocking until done.
    pub fn compute(
        &self,
        entity: EntityId,
        mut options: ComputeOptions<'_>,
    ) -> Result<Outcome, RouterError> {
        let started = Instant::now();
        let mut prepared = self.prepare(entity, &options)?;
        if prepared.path_timed_out {
            options.notify(&Notice::PathTimeout);
        }
        let reason = loop {
            match prepared.scheduler.step() {
                Step::Pending { progress } => {
                    if let Some(best) = progress {
                        options.progress(&best);
                    }
                }
                Step::Done(reason) => break reason,
            }
        };
        Ok(self.finish(prepared, reason, started, &mut options))
    }

    /// Computes the best routes, yielding to the tokio scheduler between
    /// slices.
    pub async fn compute_async(
        &self,
        entity: EntityId,
        mut options: ComputeOptions<'_>,
    ) -> Result<Outcome, RouterError> {
        let started = Instant::now();
        let mut prepared = self.prepare(entity, &options)?;
        if prepared.path_timed_out {
            options.notify(&Notice::PathTimeout);
        }
        let reason = loop {
            match prepared.scheduler.step() {
                Step::Pending { progress } => {
                    if let Some(best) = progress {
                        options.progress(&best);
                    }
                }
                Step::Done(reason) => break reason,
            }
            tokio::task::yield_now().await;
        };
        Ok(self.finish(prepared, reason, started, &mut options))
    }

    fn finish(
        &self,
        prepared: Prepared<'g, G>,
        reason: StopReason,
        started: Instant,
        options: &mut ComputeOptions<'_>,
    ) -> Outcome {
        let slices = prepared.scheduler.slices();
        let (best, rejections, search_stats) = prepared.scheduler.into_search().finish();

        if reason == StopReason::TimedOut {
            options.notify(&Notice::RouteTimeout);
        }
        for rejection in &rejections {
            options.notify(&Notice::CombinationRejected {
                revenue: rejection.revenue,
                error: rejection.error.clone(),
            });
        }

        let stats = SearchStats {
            anchors_walked: prepared.walk_stats.anchors_walked,
            connections: prepared.walk_stats.connections,
            candidates: prepared.walk_stats.candidates,
            ..search_stats
        };
        let outcome = Outcome {
            best,
            path_timed_out: prepared.path_timed_out,
            route_timed_out: reason == StopReason::TimedOut,
            cancelled: reason == StopReason::Cancelled,
            rejections,
            stats,
            hexside_bits: prepared.hexside_bits,
            elapsed: started.elapsed(),
        };
        debug!(
            revenue = outcome.best.revenue,
            routes = outcome.best.routes.len(),
            slices,
            reason = ?reason,
            real_revenue_calls = outcome.stats.real_revenue_calls,
            "route search complete"
        );
        options.done(&outcome);
        outcome
    }

    /// Maps pinned routes to train indices, rejecting unknown or repeated
    /// trains.
    fn pinned_trains<'r>(
        &self,
        trains: &[Train],
        pinned: &'r [Route],
    ) -> Result<Vec<(usize, &'r Route)>, RouterError> {
        let mut seen = HashSet::new();
        pinned
            .iter()
            .map(|route| {
                let id = route.train.id;
                let index = trains
                    .iter()
                    .position(|train| train.id == id)
                    .ok_or(RouterError::UnknownTrain(id))?;
                if !seen.insert(id) {
                    return Err(RouterError::DuplicatePinnedTrain(id));
                }
                Ok((index, route))
            })
            .collect()
    }
}

/// Tokened nodes in walk order: offboards first, then by the best revenue
/// any train earns there.
fn ordered_anchors<G: Board + RevenueOracle + ?Sized>(
    game: &G,
    entity: EntityId,
    trains: &[Train],
) -> Vec<NodeId> {
    let mut anchors: Vec<(NodeId, bool, Revenue)> = game
        .connected_nodes(entity)
        .into_iter()
        .filter(|&node| game.is_tokened_by(node, entity))
        .map(|node| {
            let revenue = trains
                .iter()
                .map(|train| game.stop_revenue(node, train))
                .max()
                .unwrap_or(0);
            (node, game.is_offboard(node), revenue)
        })
        .collect();
    anchors.sort_by_key(|&(node, offboard, revenue)| (!offboard, Reverse(revenue), node));
    anchors.dedup_by_key(|&mut (node, _, _)| node);
    anchors.into_iter().map(|(node, _, _)| node).collect()
}
