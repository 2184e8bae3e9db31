//! Errors that stop a computation before the search starts.

use crate::board::{NodeId, PathId, TrainId};

/// Error type for router requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A pinned route names a train the entity does not run.
    #[error("pinned route uses unknown train {0}")]
    UnknownTrain(TrainId),

    /// Two pinned routes name the same train.
    #[error("train {0} has more than one pinned route")]
    DuplicatePinnedTrain(TrainId),

    /// The board describes a path inconsistently.
    #[error("invalid path {0}: {1}")]
    InvalidPath(PathId, &'static str),

    /// A chain does not touch the end of the connection it was added to.
    #[error("chain does not continue from {0}")]
    Disconnected(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        assert_eq!(
            RouterError::UnknownTrain(TrainId(4)).to_string(),
            "pinned route uses unknown train t4"
        );
        assert_eq!(
            RouterError::InvalidPath(PathId(9), "unknown path").to_string(),
            "invalid path p9: unknown path"
        );
        assert_eq!(
            RouterError::Disconnected(NodeId(2)).to_string(),
            "chain does not continue from n2"
        );
    }
}
