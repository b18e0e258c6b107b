//! Route definitions and waypoint parsing

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entity::{check_latitude, check_longitude};
use crate::{ContractError, EntityId, Position, RouteId};

/// Route stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Waypoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            name: None,
        }
    }

    pub fn named(lat: f64, lng: f64, name: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: Some(name.into()),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lng)
    }

    /// Display name, `Stop {n}` (1-based) when unnamed
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Stop {}", index + 1))
    }
}

/// Waypoints as handed to a route draw
///
/// Route records store waypoints as JSON text; callers may also pass an
/// already-parsed list.
#[derive(Debug, Clone, PartialEq)]
pub enum WaypointInput {
    Points(Vec<Waypoint>),
    Raw(String),
}

impl WaypointInput {
    /// Parse and validate into an ordered waypoint list
    ///
    /// # Errors
    /// `MalformedPayload` if the text is not a JSON list of `{lat, lng}`
    /// objects or any coordinate is non-finite / out of range. No partial
    /// list is ever returned.
    pub fn parse(self) -> Result<Vec<Waypoint>, ContractError> {
        let points = match self {
            Self::Points(points) => points,
            Self::Raw(text) => serde_json::from_str::<Vec<Waypoint>>(&text)
                .map_err(|e| ContractError::malformed("waypoints", e.to_string()))?,
        };

        for (idx, point) in points.iter().enumerate() {
            check_latitude(point.lat)
                .and_then(|_| check_longitude(point.lng))
                .map_err(|e| ContractError::malformed("waypoints", format!("waypoint {idx}: {e}")))?;
        }

        Ok(points)
    }
}

impl From<Vec<Waypoint>> for WaypointInput {
    fn from(points: Vec<Waypoint>) -> Self {
        Self::Points(points)
    }
}

impl From<&str> for WaypointInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

/// Route catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Route {
    pub id: RouteId,

    #[validate(length(min = 1, message = "route name cannot be empty"))]
    pub name: String,

    #[serde(default)]
    pub waypoints: Vec<Waypoint>,

    /// Entities currently assigned (informational only)
    #[serde(default)]
    pub assigned: Vec<EntityId>,
}

impl Route {
    pub fn new(id: impl Into<RouteId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            waypoints: Vec::new(),
            assigned: Vec::new(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = waypoints;
        self
    }
}
