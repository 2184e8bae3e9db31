//! Chains: maximal runs of track between two revenue nodes.
//!
//! A chain starts at a node, follows paths across hexsides, and ends at the
//! next node it reaches. Branching track yields one chain per distinct run.
//! A path that joins two nodes on the same tile without crossing a hexside
//! is a chain of its own, encoded by its two node keys.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bitfield::{Bitfield, HexsideBits, HexsideKey};
use crate::board::{Board, EdgeId, HexId, NodeId, PathEnd, PathId};
use crate::router::RouterError;

/// A run of track between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub left: NodeId,
    pub right: NodeId,
    /// Paths in order from `left` to `right`.
    pub paths: Vec<PathId>,
    /// Hexsides crossed, in order from `left` to `right`.
    pub hexsides: Vec<EdgeId>,
    pub bitfield: Bitfield,
}

impl Chain {
    /// Builds a chain and encodes its track against `table`.
    pub fn new(
        left: NodeId,
        right: NodeId,
        paths: Vec<PathId>,
        hexsides: Vec<EdgeId>,
        table: &mut HexsideBits,
    ) -> Self {
        let mut chain = Self {
            left,
            right,
            paths,
            hexsides,
            bitfield: Bitfield::new(),
        };
        chain.bitfield = table.encode(chain.keys());
        chain
    }

    /// True for a chain that never leaves its tile.
    pub fn is_micro(&self) -> bool {
        self.hexsides.is_empty()
    }

    /// The keys this chain's bits are derived from.
    pub fn keys(&self) -> Vec<HexsideKey> {
        if self.is_micro() {
            vec![HexsideKey::Node(self.left), HexsideKey::Node(self.right)]
        } else {
            self.hexsides.iter().copied().map(HexsideKey::Edge).collect()
        }
    }

    /// A copy of this chain encoded against another table.
    pub fn reencoded(&self, table: &mut HexsideBits) -> Chain {
        Chain::new(
            self.left,
            self.right,
            self.paths.clone(),
            self.hexsides.clone(),
            table,
        )
    }
}

/// Chains leaving each node, computed on first request.
#[derive(Debug, Default)]
pub struct ChainCache {
    chains: HashMap<NodeId, Arc<[Arc<Chain>]>>,
}

impl ChainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chains with `left == node`.
    pub fn chains_from<B: Board + ?Sized>(
        &mut self,
        board: &B,
        node: NodeId,
        table: &mut HexsideBits,
    ) -> Result<Arc<[Arc<Chain>]>, RouterError> {
        if let Some(chains) = self.chains.get(&node) {
            return Ok(Arc::clone(chains));
        }

        let mut runs = Vec::new();
        for &path in board.node_paths(node) {
            let track = board
                .path(path)
                .ok_or(RouterError::InvalidPath(path, "unknown path"))?;
            let far = track
                .other_end(PathEnd::Node(node))
                .ok_or(RouterError::InvalidPath(path, "does not end at its node"))?;
            let mut run = Run {
                paths: vec![path],
                hexsides: Vec::new(),
            };
            follow(board, node, track.hex, far, &mut run, &mut runs)?;
        }

        let chains: Arc<[Arc<Chain>]> = runs
            .into_iter()
            .map(|(run, right)| Arc::new(Chain::new(node, right, run.paths, run.hexsides, table)))
            .collect();
        self.chains.insert(node, Arc::clone(&chains));
        Ok(chains)
    }

    /// Number of nodes whose chains have been computed.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Run {
    paths: Vec<PathId>,
    hexsides: Vec<EdgeId>,
}

fn follow<B: Board + ?Sized>(
    board: &B,
    origin: NodeId,
    hex: HexId,
    far: PathEnd,
    run: &mut Run,
    found: &mut Vec<(Run, NodeId)>,
) -> Result<(), RouterError> {
    match far {
        PathEnd::Node(node) => {
            if node != origin {
                found.push((run.clone(), node));
            }
        }
        PathEnd::Edge(edge) => {
            if run.hexsides.contains(&edge) {
                return Ok(());
            }
            run.hexsides.push(edge);
            for &next in board.edge_paths(edge) {
                if run.paths.contains(&next) {
                    continue;
                }
                let track = board
                    .path(next)
                    .ok_or(RouterError::InvalidPath(next, "unknown path"))?;
                // Paths on the tile we are leaving are alternatives, not continuations.
                if track.hex == hex {
                    continue;
                }
                let beyond = track
                    .other_end(PathEnd::Edge(edge))
                    .ok_or(RouterError::InvalidPath(next, "does not cross its hexside"))?;
                run.paths.push(next);
                follow(board, origin, track.hex, beyond, run, found)?;
                run.paths.pop();
            }
            run.hexsides.pop();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::MockGame;

    #[test]
    fn simple_connection_is_one_chain_each_way() {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city(20);
        let edge = game.connect(a, b);

        let mut table = HexsideBits::new();
        let mut cache = ChainCache::new();
        let from_a = cache.chains_from(&game, a, &mut table).unwrap();
        let from_b = cache.chains_from(&game, b, &mut table).unwrap();

        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].right, b);
        assert_eq!(from_a[0].hexsides, vec![edge]);
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].right, a);
        assert_eq!(from_a[0].bitfield, from_b[0].bitfield);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cached_chains_are_shared() {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city(20);
        game.connect(a, b);

        let mut table = HexsideBits::new();
        let mut cache = ChainCache::new();
        let first = cache.chains_from(&game, a, &mut table).unwrap();
        let second = cache.chains_from(&game, a, &mut table).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn junction_branches_without_reversing() {
        // A and B and C meet at a Y junction tile whose two paths share the
        // hexside towards A. B to C would need a reversal at the junction.
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city(20);
        let c = game.add_city(30);
        let junction = game.add_hex();
        let to_a = game.add_edge();
        let to_b = game.add_edge();
        let to_c = game.add_edge();
        game.add_path(game.hex_of(a), PathEnd::Node(a), PathEnd::Edge(to_a));
        game.add_path(game.hex_of(b), PathEnd::Node(b), PathEnd::Edge(to_b));
        game.add_path(game.hex_of(c), PathEnd::Node(c), PathEnd::Edge(to_c));
        game.add_path(junction, PathEnd::Edge(to_a), PathEnd::Edge(to_b));
        game.add_path(junction, PathEnd::Edge(to_a), PathEnd::Edge(to_c));

        let mut table = HexsideBits::new();
        let mut cache = ChainCache::new();
        let from_a = cache.chains_from(&game, a, &mut table).unwrap();
        let mut ends: Vec<NodeId> = from_a.iter().map(|chain| chain.right).collect();
        ends.sort();
        assert_eq!(ends, vec![b, c]);
        assert!(from_a[0].bitfield.conflicts(&from_a[1].bitfield));

        let from_b = cache.chains_from(&game, b, &mut table).unwrap();
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].right, a);
        assert_eq!(from_b[0].hexsides, vec![to_b, to_a]);
    }

    #[test]
    fn micro_chain_uses_node_keys() {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city_on(game.hex_of(a), 20);
        game.add_path(game.hex_of(a), PathEnd::Node(a), PathEnd::Node(b));

        let mut table = HexsideBits::new();
        let mut cache = ChainCache::new();
        let from_a = cache.chains_from(&game, a, &mut table).unwrap();

        assert_eq!(from_a.len(), 1);
        assert!(from_a[0].is_micro());
        assert_eq!(
            from_a[0].keys(),
            vec![HexsideKey::Node(a), HexsideKey::Node(b)]
        );
        assert_eq!(from_a[0].bitfield.count(), 2);
    }

    #[test]
    fn track_loop_back_to_origin_is_not_a_chain() {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let out = game.add_edge();
        let back = game.add_edge();
        let bend = game.add_hex();
        game.add_path(game.hex_of(a), PathEnd::Node(a), PathEnd::Edge(out));
        game.add_path(game.hex_of(a), PathEnd::Node(a), PathEnd::Edge(back));
        game.add_path(bend, PathEnd::Edge(out), PathEnd::Edge(back));

        let mut table = HexsideBits::new();
        let mut cache = ChainCache::new();
        assert!(cache.chains_from(&game, a, &mut table).unwrap().is_empty());
    }

    #[test]
    fn reencoding_follows_the_new_table() {
        let mut game = MockGame::new("test");
        let a = game.add_city(10);
        let b = game.add_city(20);
        game.connect(a, b);

        let mut first = HexsideBits::new();
        first.bit_for(HexsideKey::Node(NodeId(99)));
        let chain = ChainCache::new()
            .chains_from(&game, a, &mut first)
            .unwrap()[0]
            .clone();
        assert_eq!(chain.bitfield.iter().collect::<Vec<_>>(), vec![1]);

        let mut second = HexsideBits::new();
        let moved = chain.reencoded(&mut second);
        assert_eq!(moved.bitfield.iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(moved.paths, chain.paths);
    }
}
