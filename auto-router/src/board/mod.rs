//! The game-side collaborators the router consumes.
//!
//! The router never owns game state. Track layout, tokens, trains and
//! revenue all come through [`Board`] and [`RevenueOracle`], which the host
//! game implements. [`MockGame`] is an in-memory implementation used by the
//! tests.

mod error;
mod ids;
pub mod mock;

pub use error::RouteError;
pub use ids::{EdgeId, EntityId, HexId, NodeId, PathId, TrainId};
pub use mock::MockGame;

use crate::walk::Connection;

/// Revenue in game currency.
pub type Revenue = i64;

/// One end of a track path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathEnd {
    /// The path ends at a revenue node.
    Node(NodeId),
    /// The path leaves its hex through a hexside.
    Edge(EdgeId),
}

/// A track segment as the board describes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackPath {
    /// The hex the path is laid on.
    pub hex: HexId,
    /// Both ends of the path. Order is not significant.
    pub ends: [PathEnd; 2],
}

impl TrackPath {
    /// Returns the end opposite `from`, or `None` if `from` is not an end.
    pub fn other_end(&self, from: PathEnd) -> Option<PathEnd> {
        if self.ends[0] == from {
            Some(self.ends[1])
        } else if self.ends[1] == from {
            Some(self.ends[0])
        } else {
            None
        }
    }
}

/// A train the entity may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Train {
    pub id: TrainId,
    /// Train type name, used for train group membership.
    pub name: String,
    pub price: u32,
}

impl Train {
    pub fn new(id: TrainId, name: impl Into<String>, price: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
        }
    }
}

/// A borrowed view of one route within a combination.
#[derive(Debug, Clone, Copy)]
pub struct RouteRef<'a> {
    pub train: &'a Train,
    pub connection: &'a Connection,
}

/// Track topology and token state.
pub trait Board {
    /// Game title, used to select title-specific search behaviour.
    fn title(&self) -> &str;

    /// Trains the entity runs this operating round.
    fn route_trains(&self, entity: EntityId) -> Vec<Train>;

    /// Train groups whose routes may not share track with each other.
    ///
    /// Trains whose name appears in no group form one shared group.
    fn train_groups(&self) -> Vec<Vec<String>> {
        Vec::new()
    }

    /// Nodes the entity can reach.
    fn connected_nodes(&self, entity: EntityId) -> Vec<NodeId>;

    /// When true, full cities never block routes.
    fn no_blocking(&self) -> bool {
        false
    }

    fn is_tokened_by(&self, node: NodeId, entity: EntityId) -> bool;

    /// Whether `node` blocks routes of `entity` from passing through it.
    fn blocks(&self, node: NodeId, entity: EntityId) -> bool;

    /// Offboards terminate routes.
    fn is_offboard(&self, node: NodeId) -> bool;

    /// Paths that end at `node`.
    fn node_paths(&self, node: NodeId) -> &[PathId];

    fn path(&self, path: PathId) -> Option<TrackPath>;

    /// Paths that cross `edge`, on either adjacent hex.
    fn edge_paths(&self, edge: EdgeId) -> &[PathId];
}

/// Revenue and rule checks for routes.
pub trait RevenueOracle {
    /// What `train` earns by stopping at `node`.
    fn stop_revenue(&self, node: NodeId, train: &Train) -> Revenue;

    /// Revenue of a single route, checked against the train's rules.
    fn single_route_revenue(
        &self,
        train: &Train,
        connection: &Connection,
    ) -> Result<Revenue, RouteError>;

    /// Exact revenue of a whole combination.
    fn combined_revenue(&self, routes: &[RouteRef<'_>]) -> Result<Revenue, RouteError>;

    /// Final whole-combination check, run once on the winning combination.
    fn validate_combination(&self, _routes: &[RouteRef<'_>]) -> Result<(), RouteError> {
        Ok(())
    }
}

/// Index of the conflict group `train` belongs to.
///
/// Ungrouped trains all share the index one past the last group.
pub fn conflict_group(groups: &[Vec<String>], train: &Train) -> usize {
    groups
        .iter()
        .position(|group| group.iter().any(|name| *name == train.name))
        .unwrap_or(groups.len())
}
