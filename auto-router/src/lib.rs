//! Automatic route selection for 18xx-style train games.
//!
//! Given a board, an entity's trains and a revenue oracle, the router
//! enumerates the track reachable from the entity's tokened nodes, scores
//! candidate routes per train, and runs a time-sliced branch and bound
//! search for the highest-paying combination of non-overlapping routes.

pub mod bitfield;
pub mod board;
pub mod router;
pub mod walk;
