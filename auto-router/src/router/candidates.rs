//! Candidate routes: every scored (train, connection) pair from the walk.

use std::cmp::Reverse;

use tracing::trace;

use crate::bitfield::Bitfield;
use crate::board::{Board, EntityId, NodeId, Revenue, RevenueOracle, RouteError, RouteRef, Train};
use crate::walk::{Connection, Visit, Visitor};

use super::route::Route;

/// Index of a candidate in its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(u32);

impl CandidateId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A connection one train could run, with its standalone revenue.
#[derive(Debug, Clone)]
pub struct CandidateRoute {
    /// Index into the computation's train list.
    pub train: usize,
    pub connection: Connection,
    pub bitfield: Bitfield,
    pub revenue: Revenue,
}

/// Arena of candidates plus each train's list of them.
#[derive(Debug, Default)]
pub struct CandidatePool {
    routes: Vec<CandidateRoute>,
    by_train: Vec<Vec<CandidateId>>,
}

impl CandidatePool {
    pub fn new(trains: usize) -> Self {
        Self {
            routes: Vec::new(),
            by_train: vec![Vec::new(); trains],
        }
    }

    pub fn push(&mut self, route: CandidateRoute) -> CandidateId {
        let id = CandidateId(self.routes.len() as u32);
        self.by_train[route.train].push(id);
        self.routes.push(route);
        id
    }

    /// Replaces the train's list with this one route.
    pub fn force(&mut self, route: CandidateRoute) -> CandidateId {
        let train = route.train;
        let id = CandidateId(self.routes.len() as u32);
        self.routes.push(route);
        self.by_train[train] = vec![id];
        id
    }

    pub fn get(&self, id: CandidateId) -> &CandidateRoute {
        &self.routes[id.index()]
    }

    pub fn for_train(&self, train: usize) -> &[CandidateId] {
        self.by_train.get(train).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates kept across all trains.
    pub fn len(&self) -> usize {
        self.by_train.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Orders each train's list by revenue, best first, and keeps at most
    /// `limit` of them. Ties keep discovery order.
    pub fn rank(&mut self, limit: usize) {
        let routes = &self.routes;
        for list in &mut self.by_train {
            list.sort_by_key(|id| Reverse(routes[id.index()].revenue));
            list.truncate(limit);
        }
    }

    pub fn route_ref<'a>(&'a self, id: CandidateId, trains: &'a [Train]) -> RouteRef<'a> {
        let route = self.get(id);
        RouteRef {
            train: &trains[route.train],
            connection: &route.connection,
        }
    }

    pub fn snapshot(&self, id: CandidateId, trains: &[Train]) -> Route {
        let route = self.get(id);
        Route {
            train: trains[route.train].clone(),
            connection: route.connection.clone(),
            revenue: route.revenue,
            bitfield: route.bitfield.clone(),
        }
    }
}

/// Scores connections as the walker finds them.
pub struct CandidateBuilder<'g, G: ?Sized> {
    game: &'g G,
    entity: EntityId,
    trains: &'g [Train],
    pool: CandidatePool,
}

impl<'g, G: Board + RevenueOracle + ?Sized> CandidateBuilder<'g, G> {
    pub fn new(game: &'g G, entity: EntityId, trains: &'g [Train]) -> Self {
        Self {
            game,
            entity,
            trains,
            pool: CandidatePool::new(trains.len()),
        }
    }

    pub fn into_pool(self) -> CandidatePool {
        self.pool
    }
}

impl<G: Board + RevenueOracle + ?Sized> Visitor for CandidateBuilder<'_, G> {
    fn visit(&mut self, trains: &[usize], connection: &Connection, bitfield: &Bitfield) -> Visit {
        let mut viable = Vec::with_capacity(trains.len());
        for &train in trains {
            match self
                .game
                .single_route_revenue(&self.trains[train], connection)
            {
                Ok(revenue) => {
                    self.pool.push(CandidateRoute {
                        train,
                        connection: connection.clone(),
                        bitfield: bitfield.clone(),
                        revenue,
                    });
                    viable.push(train);
                }
                Err(RouteError::TooLong) => {}
                Err(RouteError::ReusesCity) => return Visit::Abort,
                // A longer route may still satisfy these.
                Err(err) => {
                    trace!(train, error = %err, "route not runnable yet");
                    viable.push(train);
                }
            }
        }

        if viable.is_empty() {
            Visit::Abort
        } else if connection.is_empty() || self.passable(connection.end()) {
            Visit::Continue(viable)
        } else {
            Visit::Stop(viable)
        }
    }

    fn passable(&self, node: NodeId) -> bool {
        if self.game.is_offboard(node) {
            return false;
        }
        self.game.no_blocking() || !self.game.blocks(node, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{MockGame, TrainId};
    use crate::walk::Walker;

    fn candidate(train: usize, revenue: Revenue) -> CandidateRoute {
        CandidateRoute {
            train,
            connection: Connection::single(NodeId(0)),
            bitfield: Bitfield::new(),
            revenue,
        }
    }

    #[test]
    fn rank_sorts_and_truncates_per_train() {
        let mut pool = CandidatePool::new(2);
        pool.push(candidate(0, 30));
        pool.push(candidate(0, 60));
        pool.push(candidate(0, 40));
        pool.push(candidate(1, 10));

        pool.rank(2);
        let revenues: Vec<_> = pool
            .for_train(0)
            .iter()
            .map(|&id| pool.get(id).revenue)
            .collect();
        assert_eq!(revenues, vec![60, 40]);
        assert_eq!(pool.for_train(1).len(), 1);
        assert_eq!(pool.len(), 3);
        assert!(pool.for_train(7).is_empty());
    }

    #[test]
    fn force_replaces_the_list() {
        let mut pool = CandidatePool::new(1);
        pool.push(candidate(0, 30));
        let pinned = pool.force(candidate(0, 5));
        assert_eq!(pool.for_train(0), &[pinned]);
    }

    fn line_game() -> (MockGame, Vec<Train>, [NodeId; 3]) {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city(20);
        let c = game.add_city(30);
        game.connect(a, b);
        game.connect(b, c);
        game.place_token(a, EntityId(0));
        game.add_train(EntityId(0), "2", 2, 80);
        game.add_train(EntityId(0), "3", 3, 180);
        let trains = game.route_trains(EntityId(0));
        (game, trains, [a, b, c])
    }

    #[test]
    fn too_long_drops_only_that_train() {
        let (game, trains, [a, _, c]) = line_game();
        let mut builder = CandidateBuilder::new(&game, EntityId(0), &trains);
        Walker::new(&game).walk(a, &[0, 1], &mut builder).unwrap();

        let pool = builder.into_pool();
        let two: Vec<_> = pool
            .for_train(0)
            .iter()
            .map(|&id| pool.get(id).connection.nodes().count())
            .collect();
        assert_eq!(two, vec![2]);

        let three_reaches_c = pool
            .for_train(1)
            .iter()
            .any(|&id| pool.get(id).connection.end() == c && pool.get(id).revenue == 60);
        assert!(three_reaches_c);
    }

    #[test]
    fn single_city_is_too_short_but_keeps_walking() {
        let (game, trains, [a, _, _]) = line_game();
        let mut builder = CandidateBuilder::new(&game, EntityId(0), &trains);
        let connection = Connection::single(a);
        let visit = builder.visit(&[0, 1], &connection, &Bitfield::new());
        assert_eq!(visit, Visit::Continue(vec![0, 1]));
        assert!(builder.into_pool().is_empty());
    }

    #[test]
    fn offboard_and_blocked_nodes_stop_the_walk() {
        let mut game = MockGame::new("test");
        let home = game.add_city(10);
        let full = game.add_city(20);
        let sea = game.add_offboard(40);
        game.place_token(home, EntityId(0));
        game.place_token(full, EntityId(1));
        game.add_train(EntityId(0), "4", 4, 300);
        let trains = game.route_trains(EntityId(0));

        let builder = CandidateBuilder::new(&game, EntityId(0), &trains);
        assert!(builder.passable(home));
        assert!(!builder.passable(full));
        assert!(!builder.passable(sea));

        game.set_no_blocking(true);
        let builder = CandidateBuilder::new(&game, EntityId(0), &trains);
        assert!(builder.passable(full));
        assert!(!builder.passable(sea));
    }

    /// Reports a city reuse for every multi-stop route.
    struct Reuses(MockGame);

    impl RevenueOracle for Reuses {
        fn stop_revenue(&self, node: NodeId, train: &Train) -> Revenue {
            self.0.stop_revenue(node, train)
        }

        fn single_route_revenue(&self, _: &Train, connection: &Connection) -> Result<Revenue, RouteError> {
            if connection.is_empty() {
                Err(RouteError::TooShort)
            } else {
                Err(RouteError::ReusesCity)
            }
        }

        fn combined_revenue(&self, routes: &[RouteRef<'_>]) -> Result<Revenue, RouteError> {
            self.0.combined_revenue(routes)
        }
    }

    impl Board for Reuses {
        fn title(&self) -> &str {
            self.0.title()
        }

        fn route_trains(&self, entity: EntityId) -> Vec<Train> {
            self.0.route_trains(entity)
        }
        fn connected_nodes(&self, entity: EntityId) -> Vec<NodeId> {
            self.0.connected_nodes(entity)
        }
        fn is_tokened_by(&self, node: NodeId, entity: EntityId) -> bool {
            self.0.is_tokened_by(node, entity)
        }
        fn blocks(&self, node: NodeId, entity: EntityId) -> bool {
            self.0.blocks(node, entity)
        }
        fn is_offboard(&self, node: NodeId) -> bool {
            self.0.is_offboard(node)
        }
        fn node_paths(&self, node: NodeId) -> &[crate::board::PathId] {
            self.0.node_paths(node)
        }
        fn path(&self, path: crate::board::PathId) -> Option<crate::board::TrackPath> {
            self.0.path(path)
        }
        fn edge_paths(&self, edge: crate::board::EdgeId) -> &[crate::board::PathId] {
            self.0.edge_paths(edge)
        }
    }

    #[test]
    fn reused_city_abandons_the_branch() {
        let (game, _, [a, _, _]) = line_game();
        let game = Reuses(game);
        let trains = vec![Train::new(TrainId(0), "3", 180)];
        let mut builder = CandidateBuilder::new(&game, EntityId(0), &trains);
        let mut walker = Walker::new(&game);
        walker.walk(a, &[0], &mut builder).unwrap();

        assert!(builder.into_pool().is_empty());
        // Only the lone city and the first hop were ever offered.
        assert_eq!(walker.connections(), 2);
    }
}
