//! Identifier newtypes for board entities.

use std::fmt;

macro_rules! board_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the raw index, for use with dense tables.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

board_id!(
    /// A revenue location: city, town or offboard.
    NodeId,
    "n"
);
board_id!(
    /// A single track segment on one hex.
    PathId,
    "p"
);
board_id!(
    /// A hexside shared by two adjacent hexes.
    EdgeId,
    "e"
);
board_id!(
    /// A map hex.
    HexId,
    "h"
);
board_id!(
    /// The corporation or minor that runs trains.
    EntityId,
    "c"
);
board_id!(
    /// A train owned by an entity.
    TrainId,
    "t"
);
