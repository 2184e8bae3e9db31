//! Errors reported by the revenue oracle.

/// Why a route (or combination of routes) cannot be run.
///
/// The router treats these differently while building candidates:
/// `TooLong` drops the train from the branch, `ReusesCity` abandons the
/// branch entirely, and the rest are recoverable because a longer route
/// may still become valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The route visits more stops than the train may count.
    #[error("route is too long for the train")]
    TooLong,

    /// The route has fewer stops than the train requires.
    #[error("route is too short for the train")]
    TooShort,

    /// The route visits the same city twice.
    #[error("route visits a city more than once")]
    ReusesCity,

    /// The route does not include a node tokened by the running entity.
    #[error("route does not contain a token")]
    NoToken,

    /// Any other game rule violation.
    #[error("game rule violated: {0}")]
    Game(String),
}
