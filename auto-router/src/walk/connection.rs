//! Connections: ordered sequences of chains forming one route's track.

use std::iter;
use std::sync::Arc;

use crate::bitfield::{Bitfield, HexsideBits, HexsideKey};
use crate::board::{NodeId, PathId};
use crate::router::RouterError;

use super::chains::Chain;

/// One chain as travelled by a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub left: NodeId,
    pub right: NodeId,
    pub chain: Arc<Chain>,
}

impl Link {
    fn forward(chain: Arc<Chain>) -> Self {
        Self {
            left: chain.left,
            right: chain.right,
            chain,
        }
    }

    fn reversed(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            chain: Arc::clone(&self.chain),
        }
    }

    /// True when the link runs against the chain's own direction.
    pub fn is_reversed(&self) -> bool {
        self.left != self.chain.left
    }

    /// Paths in travel order.
    pub fn paths(&self) -> impl Iterator<Item = PathId> + '_ {
        let paths = &self.chain.paths;
        let reversed = self.is_reversed();
        (0..paths.len()).map(move |i| {
            if reversed {
                paths[paths.len() - 1 - i]
            } else {
                paths[i]
            }
        })
    }
}

/// A route's track, starting at `origin`.
///
/// A connection with no links is a route that only visits its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    origin: NodeId,
    links: Vec<Link>,
}

impl Connection {
    pub fn single(origin: NodeId) -> Self {
        Self {
            origin,
            links: Vec::new(),
        }
    }

    /// Builds a connection by appending `chains` in order, flipping any that
    /// are stored the other way round.
    pub fn from_chains(
        origin: NodeId,
        chains: impl IntoIterator<Item = Arc<Chain>>,
    ) -> Result<Self, RouterError> {
        let mut connection = Self::single(origin);
        for chain in chains {
            connection.try_push(chain)?;
        }
        Ok(connection)
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// The node the connection currently ends at.
    pub fn end(&self) -> NodeId {
        self.links.last().map_or(self.origin, |link| link.right)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of chains.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Appends a chain that starts where the connection ends.
    pub(crate) fn push(&mut self, chain: Arc<Chain>) {
        debug_assert_eq!(chain.left, self.end());
        self.links.push(Link::forward(chain));
    }

    /// Appends a chain touching the current end in either orientation.
    pub fn try_push(&mut self, chain: Arc<Chain>) -> Result<(), RouterError> {
        let end = self.end();
        let link = Link::forward(chain);
        if link.left == end {
            self.links.push(link);
        } else if link.right == end {
            self.links.push(link.reversed());
        } else {
            return Err(RouterError::Disconnected(end));
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Link> {
        self.links.pop()
    }

    /// Stops in visiting order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        iter::once(self.origin).chain(self.links.iter().map(|link| link.right))
    }

    /// Paths in travel order.
    pub fn paths(&self) -> impl Iterator<Item = PathId> + '_ {
        self.links.iter().flat_map(|link| link.paths())
    }

    /// The same track travelled from the other end.
    pub fn reversed(&self) -> Self {
        Self {
            origin: self.end(),
            links: self.links.iter().rev().map(Link::reversed).collect(),
        }
    }

    /// The bits this connection occupies.
    pub fn bitfield(&self, table: &mut HexsideBits) -> Bitfield {
        if self.links.is_empty() {
            return table.encode([HexsideKey::Node(self.origin)]);
        }
        let mut bits = Bitfield::new();
        for link in &self.links {
            bits.merge_in(&link.chain.bitfield);
        }
        bits
    }

    /// A copy with every chain encoded against `table`.
    pub fn reencoded(&self, table: &mut HexsideBits) -> Self {
        Self {
            origin: self.origin,
            links: self
                .links
                .iter()
                .map(|link| Link {
                    left: link.left,
                    right: link.right,
                    chain: Arc::new(link.chain.reencoded(table)),
                })
                .collect(),
        }
    }
}
