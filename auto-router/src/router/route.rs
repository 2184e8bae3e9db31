//! Route snapshots handed back to callers.

use crate::bitfield::Bitfield;
use crate::board::{NodeId, Revenue, RouteRef, Train};
use crate::walk::Connection;

/// One train's route in a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub train: Train,
    pub connection: Connection,
    /// Revenue of the route on its own, as scored when it was built.
    pub revenue: Revenue,
    pub bitfield: Bitfield,
}

impl Route {
    /// A route to pin in a later computation.
    pub fn new(train: Train, connection: Connection) -> Self {
        Self {
            train,
            connection,
            revenue: 0,
            bitfield: Bitfield::new(),
        }
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.connection.nodes().collect()
    }

    pub fn route_ref(&self) -> RouteRef<'_> {
        RouteRef {
            train: &self.train,
            connection: &self.connection,
        }
    }
}

/// The best combination found so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestRoutes {
    /// Exact revenue of the whole combination.
    pub revenue: Revenue,
    pub routes: Vec<Route>,
}

impl BestRoutes {
    pub fn new(revenue: Revenue, routes: Vec<Route>) -> Self {
        Self { revenue, routes }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_refs(&self) -> Vec<RouteRef<'_>> {
        self.routes.iter().map(Route::route_ref).collect()
    }

    /// The route run by the train with this name, if any.
    pub fn for_train(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.train.name == name)
    }
}
