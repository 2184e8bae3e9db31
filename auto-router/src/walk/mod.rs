//! Path enumeration from an anchor node.
//!
//! The walker runs a depth-first search over chains, offering every
//! distinct connection it builds to a [`Visitor`]. The visitor decides
//! which trains survive the branch and whether the walk may continue past
//! the new end node.
//!
//! Routes that pass *through* the anchor are found by joining two outward
//! branches: for every outward branch the walker restarts from the anchor
//! with that branch reversed and its nodes and bits already consumed.
//! A connection is identified by its bitfield, so the same track reached in
//! a different order is only offered once.

mod chains;
mod connection;

pub use chains::{Chain, ChainCache};
pub use connection::{Connection, Link};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::bitfield::{Bitfield, HexsideBits, HexsideKey};
use crate::board::{Board, NodeId};
use crate::router::RouterError;

/// What a visitor decided about a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// Keep walking with these trains.
    Continue(Vec<usize>),
    /// The end node is terminal or blocking. The trains may still be used
    /// for routes that join through the anchor.
    Stop(Vec<usize>),
    /// No train can use this branch.
    Abort,
}

/// Receives each distinct connection the walker builds.
pub trait Visitor {
    /// Called once per distinct connection. `trains` are indices of the
    /// trains still viable on this branch.
    fn visit(&mut self, trains: &[usize], connection: &Connection, bitfield: &Bitfield) -> Visit;

    /// Whether a walk may continue past `node`.
    fn passable(&self, node: NodeId) -> bool;
}

#[derive(Debug, Clone)]
struct Branch {
    connection: Connection,
    visited: HashSet<NodeId>,
    bits: Bitfield,
    saved: Vec<Bitfield>,
}

impl Branch {
    fn start(anchor: NodeId) -> Self {
        Self {
            connection: Connection::single(anchor),
            visited: HashSet::from([anchor]),
            bits: Bitfield::new(),
            saved: Vec::new(),
        }
    }

    fn push(&mut self, chain: Arc<Chain>) {
        self.saved.push(self.bits.clone());
        self.bits.merge_in(&chain.bitfield);
        self.visited.insert(chain.right);
        self.connection.push(chain);
    }

    fn pop(&mut self) {
        if let Some(link) = self.connection.pop() {
            self.visited.remove(&link.right);
        }
        if let Some(bits) = self.saved.pop() {
            self.bits = bits;
        }
    }

    fn reversed(&self) -> Self {
        Self {
            connection: self.connection.reversed(),
            visited: self.visited.clone(),
            bits: self.bits.clone(),
            saved: Vec::new(),
        }
    }
}

/// Walks connections from anchor nodes.
///
/// One walker serves every anchor of a computation: it owns the chain cache,
/// the hexside bit table and the set of connections already seen.
pub struct Walker<'b, B: ?Sized> {
    board: &'b B,
    chains: ChainCache,
    table: HexsideBits,
    skip: Bitfield,
    seen: HashMap<Bitfield, Option<Vec<usize>>>,
    replays: usize,
}

impl<'b, B: Board + ?Sized> Walker<'b, B> {
    pub fn new(board: &'b B) -> Self {
        Self {
            board,
            chains: ChainCache::new(),
            table: HexsideBits::new(),
            skip: Bitfield::new(),
            seen: HashMap::new(),
            replays: 0,
        }
    }

    /// Marks `bits` as unusable for every later connection.
    pub fn skip(&mut self, bits: &Bitfield) {
        self.skip.merge_in(bits);
    }

    pub fn table_mut(&mut self) -> &mut HexsideBits {
        &mut self.table
    }

    pub fn into_table(self) -> HexsideBits {
        self.table
    }

    /// Number of distinct connections offered so far.
    pub fn connections(&self) -> usize {
        self.seen.len()
    }

    /// Number of times a connection was recognised as already seen.
    pub fn replays(&self) -> usize {
        self.replays
    }

    /// Enumerates every connection through `anchor` that `trains` might run.
    ///
    /// Once the anchor is done its own node and the hexsides next to it are
    /// skipped, since any route touching them has just been enumerated.
    pub fn walk<V: Visitor>(
        &mut self,
        anchor: NodeId,
        trains: &[usize],
        visitor: &mut V,
    ) -> Result<(), RouterError> {
        let single = Connection::single(anchor);
        let bits = single.bitfield(&mut self.table);
        let viable = if bits.conflicts(&self.skip) {
            trains.to_vec()
        } else {
            match self.offer(trains, &single, &bits, visitor) {
                Visit::Abort => Vec::new(),
                // Routes may start at a node they cannot run through.
                Visit::Continue(viable) | Visit::Stop(viable) => viable,
            }
        };

        if !viable.is_empty() {
            let through = !self.board.is_offboard(anchor);
            let mut branch = Branch::start(anchor);
            self.descend(&mut branch, &viable, through, visitor)?;
        }

        self.exhaust(anchor)
    }

    fn exhaust(&mut self, anchor: NodeId) -> Result<(), RouterError> {
        let chains = self.chains.chains_from(self.board, anchor, &mut self.table)?;
        let mut bits = self.table.encode([HexsideKey::Node(anchor)]);
        for chain in chains.iter() {
            if let Some(&first) = chain.hexsides.first() {
                bits.set_bit(self.table.bit_for(HexsideKey::Edge(first)));
            }
        }
        trace!(anchor = %anchor, bits = bits.count(), "anchor exhausted");
        self.skip.merge_in(&bits);
        Ok(())
    }

    fn descend<V: Visitor>(
        &mut self,
        branch: &mut Branch,
        trains: &[usize],
        through: bool,
        visitor: &mut V,
    ) -> Result<(), RouterError> {
        let node = branch.connection.end();
        let chains = self.chains.chains_from(self.board, node, &mut self.table)?;

        for chain in chains.iter() {
            if branch.visited.contains(&chain.right) || chain.bitfield.conflicts(&self.skip) {
                continue;
            }
            // Consecutive single-tile chains share their junction node key,
            // and revisiting nodes is already excluded above.
            if !chain.is_micro() && chain.bitfield.conflicts(&branch.bits) {
                continue;
            }

            branch.push(Arc::clone(chain));
            let bits = branch.bits.clone();
            match self.offer(trains, &branch.connection, &bits, visitor) {
                Visit::Abort => {}
                Visit::Continue(viable) => {
                    if through {
                        self.join_through(branch, &viable, visitor)?;
                    }
                    self.descend(branch, &viable, through, visitor)?;
                }
                Visit::Stop(viable) => {
                    if through {
                        self.join_through(branch, &viable, visitor)?;
                    }
                }
            }
            branch.pop();
        }
        Ok(())
    }

    /// Extends `outward` backwards through the anchor.
    fn join_through<V: Visitor>(
        &mut self,
        outward: &Branch,
        trains: &[usize],
        visitor: &mut V,
    ) -> Result<(), RouterError> {
        let mut joined = outward.reversed();
        self.descend(&mut joined, trains, false, visitor)
    }

    fn offer<V: Visitor>(
        &mut self,
        trains: &[usize],
        connection: &Connection,
        bits: &Bitfield,
        visitor: &mut V,
    ) -> Visit {
        if let Some(known) = self.seen.get(bits) {
            self.replays += 1;
            let Some(known) = known else {
                return Visit::Abort;
            };
            let viable: Vec<usize> = known
                .iter()
                .copied()
                .filter(|train| trains.contains(train))
                .collect();
            return if viable.is_empty() {
                Visit::Abort
            } else if visitor.passable(connection.end()) {
                Visit::Continue(viable)
            } else {
                Visit::Stop(viable)
            };
        }

        let visit = visitor.visit(trains, connection, bits);
        let record = match &visit {
            Visit::Continue(viable) | Visit::Stop(viable) => Some(viable.clone()),
            Visit::Abort => None,
        };
        self.seen.insert(bits.clone(), record);
        visit
    }
}
