//! Tracker error types

use contracts::{ContractError, RouteId};
use thiserror::Error;

/// Tracker errors
///
/// None of these are fatal to the live view: callers log them and keep
/// their current state.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Route id not in the catalog
    #[error("unknown route '{route_id}'")]
    UnknownRoute { route_id: RouteId },

    /// Waypoints rejected; the previous overlay is left as it was
    #[error("route '{route_id}' not drawn: {source}")]
    MalformedRoute {
        route_id: RouteId,
        #[source]
        source: ContractError,
    },

    /// No handler registered for an action kind
    #[error("no handler for action '{kind}'")]
    UnhandledAction { kind: &'static str },

    /// Scene export failed
    #[error("scene export failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn unknown_route(route_id: impl Into<RouteId>) -> Self {
        Self::UnknownRoute {
            route_id: route_id.into(),
        }
    }
}

/// Tracker Result alias
pub type Result<T> = std::result::Result<T, TrackerError>;
