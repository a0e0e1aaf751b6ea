use thiserror::Error;

/// Which end of a requested route failed to snap onto the road network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Destination,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::Destination => write!(f, "destination"),
        }
    }
}

/// Routing failures exposed to boundary consumers.
///
/// The display strings are part of the contract: callers that match on
/// message text rely on the substrings "Invalid", "no nearby road found"
/// and "No route available". The enum variants are the primary contract;
/// transports map them to status codes via [`RouteError::status_code`].
#[derive(Debug, Error)]
pub enum RouteError {
    /// Malformed or out-of-range input coordinates. Never retried.
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Valid input, but no road node could be snapped for this endpoint.
    #[error("no nearby road found for {0} point")]
    NoNearbyRoad(Endpoint),

    /// The network graph is empty or could not be loaded. Retry-eligible.
    #[error("Road network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The search exhausted the graph without reaching the destination.
    /// A legitimate outcome; connectivity will not change on retry.
    #[error("No route available between the requested points")]
    NoRouteAvailable,

    /// Anything else bubbling up from collaborators.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RouteError {
    /// Whether a retry of the failed operation could plausibly succeed.
    /// Only transient network-load failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self, RouteError::NetworkUnavailable(_))
    }

    /// HTTP-style status code for boundary consumers.
    pub fn status_code(&self) -> u16 {
        match self {
            RouteError::InvalidCoordinates(_) | RouteError::NoNearbyRoad(_) => 400,
            RouteError::NoRouteAvailable => 404,
            RouteError::NetworkUnavailable(_) | RouteError::Internal(_) => 500,
        }
    }
}
