//! In-memory board for exercising the router without a game engine.
//!
//! Every node gets its own hex unless placed on an existing one, and
//! [`MockGame::connect`] lays a two-path track between two nodes across a
//! fresh hexside. Revenue is the sum of stop values; a route must include a
//! token of its owner, may not revisit a node, and may not pass through an
//! offboard. Routes of trains in the same group may not share a path.

use std::collections::{HashMap, HashSet};

use crate::walk::Connection;

use super::{
    Board, EdgeId, EntityId, HexId, NodeId, PathEnd, PathId, Revenue, RevenueOracle, RouteError,
    RouteRef, TrackPath, Train, TrainId, conflict_group,
};

#[derive(Debug, Clone)]
struct MockNode {
    hex: HexId,
    revenue: Revenue,
    offboard: bool,
    slots: usize,
    tokens: Vec<EntityId>,
}

#[derive(Debug, Clone)]
struct MockTrain {
    owner: EntityId,
    train: Train,
    distance: usize,
}

/// A hand-built board.
#[derive(Debug, Clone)]
pub struct MockGame {
    title: String,
    nodes: Vec<MockNode>,
    paths: Vec<TrackPath>,
    node_paths: HashMap<NodeId, Vec<PathId>>,
    edge_paths: HashMap<EdgeId, Vec<PathId>>,
    hexes: u32,
    edges: u32,
    trains: Vec<MockTrain>,
    groups: Vec<Vec<String>>,
    no_blocking: bool,
    destinations: HashMap<TrainId, NodeId>,
}

impl MockGame {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            nodes: Vec::new(),
            paths: Vec::new(),
            node_paths: HashMap::new(),
            edge_paths: HashMap::new(),
            hexes: 0,
            edges: 0,
            trains: Vec::new(),
            groups: Vec::new(),
            no_blocking: false,
            destinations: HashMap::new(),
        }
    }

    pub fn add_hex(&mut self) -> HexId {
        let hex = HexId(self.hexes);
        self.hexes += 1;
        hex
    }

    pub fn add_edge(&mut self) -> EdgeId {
        let edge = EdgeId(self.edges);
        self.edges += 1;
        edge
    }

    /// A one-slot city on its own hex.
    pub fn add_city(&mut self, revenue: Revenue) -> NodeId {
        let hex = self.add_hex();
        self.add_city_on(hex, revenue)
    }

    pub fn add_city_on(&mut self, hex: HexId, revenue: Revenue) -> NodeId {
        self.add_node(hex, revenue, false, 1)
    }

    pub fn add_offboard(&mut self, revenue: Revenue) -> NodeId {
        let hex = self.add_hex();
        self.add_node(hex, revenue, true, 0)
    }

    fn add_node(&mut self, hex: HexId, revenue: Revenue, offboard: bool, slots: usize) -> NodeId {
        let node = NodeId(self.nodes.len() as u32);
        self.nodes.push(MockNode {
            hex,
            revenue,
            offboard,
            slots,
            tokens: Vec::new(),
        });
        node
    }

    /// The hex a node sits on.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not created by this board.
    pub fn hex_of(&self, node: NodeId) -> HexId {
        self.nodes[node.index()].hex
    }

    pub fn add_path(&mut self, hex: HexId, a: PathEnd, b: PathEnd) -> PathId {
        let path = PathId(self.paths.len() as u32);
        self.paths.push(TrackPath { hex, ends: [a, b] });
        for end in [a, b] {
            match end {
                PathEnd::Node(node) => self.node_paths.entry(node).or_default().push(path),
                PathEnd::Edge(edge) => self.edge_paths.entry(edge).or_default().push(path),
            }
        }
        path
    }

    /// Lays track from `a` to `b` across a new hexside.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> EdgeId {
        let edge = self.add_edge();
        self.add_path(self.hex_of(a), PathEnd::Node(a), PathEnd::Edge(edge));
        self.add_path(self.hex_of(b), PathEnd::Edge(edge), PathEnd::Node(b));
        edge
    }

    pub fn place_token(&mut self, node: NodeId, entity: EntityId) {
        self.nodes[node.index()].tokens.push(entity);
    }

    pub fn set_slots(&mut self, node: NodeId, slots: usize) {
        self.nodes[node.index()].slots = slots;
    }

    pub fn add_train(
        &mut self,
        owner: EntityId,
        name: impl Into<String>,
        distance: usize,
        price: u32,
    ) -> TrainId {
        let id = TrainId(self.trains.len() as u32);
        self.trains.push(MockTrain {
            owner,
            train: Train::new(id, name, price),
            distance,
        });
        id
    }

    pub fn set_train_groups(&mut self, groups: Vec<Vec<String>>) {
        self.groups = groups;
    }

    pub fn set_no_blocking(&mut self, no_blocking: bool) {
        self.no_blocking = no_blocking;
    }

    /// Requires `train`'s route to visit `node` in any accepted combination.
    pub fn require_destination(&mut self, train: TrainId, node: NodeId) {
        self.destinations.insert(train, node);
    }

    fn node(&self, node: NodeId) -> Option<&MockNode> {
        self.nodes.get(node.index())
    }

    fn mock_train(&self, train: &Train) -> Result<&MockTrain, RouteError> {
        self.trains
            .iter()
            .find(|mock| mock.train.id == train.id)
            .ok_or_else(|| RouteError::Game(format!("unknown train {}", train.id)))
    }
}

impl Board for MockGame {
    fn title(&self) -> &str {
        &self.title
    }

    fn route_trains(&self, entity: EntityId) -> Vec<Train> {
        self.trains
            .iter()
            .filter(|mock| mock.owner == entity)
            .map(|mock| mock.train.clone())
            .collect()
    }

    fn train_groups(&self) -> Vec<Vec<String>> {
        self.groups.clone()
    }

    /// Every node on the board; the router only anchors on tokened ones.
    fn connected_nodes(&self, _entity: EntityId) -> Vec<NodeId> {
        (0..self.nodes.len() as u32).map(NodeId).collect()
    }

    fn no_blocking(&self) -> bool {
        self.no_blocking
    }

    fn is_tokened_by(&self, node: NodeId, entity: EntityId) -> bool {
        self.node(node)
            .is_some_and(|node| node.tokens.contains(&entity))
    }

    fn blocks(&self, node: NodeId, entity: EntityId) -> bool {
        self.node(node).is_some_and(|node| {
            node.slots > 0 && node.tokens.len() >= node.slots && !node.tokens.contains(&entity)
        })
    }

    fn is_offboard(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|node| node.offboard)
    }

    fn node_paths(&self, node: NodeId) -> &[PathId] {
        self.node_paths.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn path(&self, path: PathId) -> Option<TrackPath> {
        self.paths.get(path.index()).copied()
    }

    fn edge_paths(&self, edge: EdgeId) -> &[PathId] {
        self.edge_paths.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RevenueOracle for MockGame {
    fn stop_revenue(&self, node: NodeId, _train: &Train) -> Revenue {
        self.node(node).map_or(0, |node| node.revenue)
    }

    fn single_route_revenue(
        &self,
        train: &Train,
        connection: &Connection,
    ) -> Result<Revenue, RouteError> {
        let mock = self.mock_train(train)?;
        let stops: Vec<NodeId> = connection.nodes().collect();

        let mut seen = HashSet::new();
        if !stops.iter().all(|node| seen.insert(*node)) {
            return Err(RouteError::ReusesCity);
        }
        if stops.len() > mock.distance {
            return Err(RouteError::TooLong);
        }
        if stops.len() < 2 && mock.distance > 1 {
            return Err(RouteError::TooShort);
        }
        if stops.len() > 2
            && stops[1..stops.len() - 1]
                .iter()
                .any(|&node| self.is_offboard(node))
        {
            return Err(RouteError::Game("route passes through an offboard".into()));
        }
        if !stops
            .iter()
            .any(|&node| self.is_tokened_by(node, mock.owner))
        {
            return Err(RouteError::NoToken);
        }

        Ok(stops.iter().map(|&node| self.stop_revenue(node, train)).sum())
    }

    fn combined_revenue(&self, routes: &[RouteRef<'_>]) -> Result<Revenue, RouteError> {
        let mut trains = HashSet::new();
        let mut used: HashMap<usize, HashSet<PathId>> = HashMap::new();
        let mut total = 0;

        for route in routes {
            if !trains.insert(route.train.id) {
                return Err(RouteError::Game(format!("train {} runs twice", route.train.id)));
            }
            total += self.single_route_revenue(route.train, route.connection)?;

            let group = used.entry(conflict_group(&self.groups, route.train)).or_default();
            for path in route.connection.paths() {
                if !group.insert(path) {
                    return Err(RouteError::Game(format!("routes overlap on {path}")));
                }
            }
        }
        Ok(total)
    }

    fn validate_combination(&self, routes: &[RouteRef<'_>]) -> Result<(), RouteError> {
        for route in routes {
            let Some(&destination) = self.destinations.get(&route.train.id) else {
                continue;
            };
            if !route.connection.nodes().any(|node| node == destination) {
                return Err(RouteError::Game(format!(
                    "train {} must visit {destination}",
                    route.train.id
                )));
            }
        }
        Ok(())
    }
}
