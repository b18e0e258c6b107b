//! Entity - tracked vehicle state
//!
//! Snapshot records, live deltas and alerts share these definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ContractError, EntityId, RouteId};

/// Seat count shown when a record carries no capacity
pub const DEFAULT_CAPACITY: u32 = 40;

/// Operational status
///
/// The recognized set is closed. Any other wire value is preserved as
/// `Unrecognized` so it can be displayed, but it never passes a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityStatus {
    Running,
    Idle,
    Maintenance,
    Unrecognized(String),
}

impl EntityStatus {
    /// Recognized statuses, in filter order
    pub const KNOWN: [EntityStatus; 3] = [
        EntityStatus::Running,
        EntityStatus::Idle,
        EntityStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Idle => "idle",
            Self::Maintenance => "maintenance",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for EntityStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "running" => Self::Running,
            "idle" => Self::Idle,
            "maintenance" => Self::Maintenance,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for EntityStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<EntityStatus> for String {
    fn from(status: EntityStatus) -> Self {
        match status {
            EntityStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WGS84 position (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check both coordinates are finite and in range
    pub fn validate(&self) -> Result<(), ContractError> {
        check_latitude(self.lat)?;
        check_longitude(self.lng)
    }
}

pub(crate) fn check_latitude(lat: f64) -> Result<(), ContractError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(ContractError::malformed(
            "coordinate",
            format!("latitude {lat} outside [-90, 90]"),
        ))
    }
}

pub(crate) fn check_longitude(lng: f64) -> Result<(), ContractError> {
    if lng.is_finite() && (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        Err(ContractError::malformed(
            "coordinate",
            format!("longitude {lng} outside [-180, 180]"),
        ))
    }
}

/// Tracked entity
///
/// Also the snapshot wire record: keys follow the fleet API
/// (`plate_number`, `current_lat`, `current_lng`) with short aliases.
/// Every field except the id may be absent, e.g. for an entity first seen
/// through a live delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable unique id
    pub id: EntityId,

    /// Display label (plate number)
    #[serde(default, rename = "plate_number", alias = "label")]
    pub label: Option<String>,

    /// Operational status, unset until provided
    #[serde(default)]
    pub status: Option<EntityStatus>,

    /// Latitude of last fix
    #[serde(default, rename = "current_lat", alias = "lat")]
    pub lat: Option<f64>,

    /// Longitude of last fix
    #[serde(default, rename = "current_lng", alias = "lng")]
    pub lng: Option<f64>,

    /// Speed in km/h
    #[serde(default)]
    pub speed: Option<f64>,

    /// Seat capacity
    #[serde(default)]
    pub capacity: Option<u32>,

    /// Assigned route (informational)
    #[serde(default)]
    pub route_id: Option<RouteId>,
}

impl Entity {
    /// Entity with only an id
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            status: None,
            lat: None,
            lng: None,
            speed: None,
            capacity: None,
            route_id: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<EntityStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Position, present only once both coordinates are known
    pub fn position(&self) -> Option<Position> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Position { lat, lng }),
            _ => None,
        }
    }

    /// Speed with the absent-means-zero rule applied
    pub fn speed_or_default(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }

    pub fn capacity_or_default(&self) -> u32 {
        self.capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    /// Shape check for a snapshot record
    ///
    /// # Errors
    /// `MalformedPayload` for an empty id, an out-of-range or non-finite
    /// coordinate, or a negative / non-finite speed.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.id.is_empty() {
            return Err(ContractError::malformed("entity", "empty entity id"));
        }
        check_fields("entity", self.lat, self.lng, self.speed)
    }
}

/// Range checks shared by snapshot records and deltas
fn check_fields(
    context: &str,
    lat: Option<f64>,
    lng: Option<f64>,
    speed: Option<f64>,
) -> Result<(), ContractError> {
    if let Some(lat) = lat {
        check_latitude(lat)?;
    }
    if let Some(lng) = lng {
        check_longitude(lng)?;
    }
    match speed {
        Some(speed) if !speed.is_finite() || speed < 0.0 => Err(ContractError::malformed(
            context,
            format!("speed {speed} must be finite and >= 0"),
        )),
        _ => Ok(()),
    }
}

/// Partial update for one entity
///
/// Only the fields present overwrite the stored entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDelta {
    #[serde(rename = "entity_id", alias = "entityId", alias = "bus_id")]
    pub entity_id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl EntityDelta {
    pub fn new(entity_id: impl Into<EntityId>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn position(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn status(mut self, status: impl Into<EntityStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Basic shape validation
    ///
    /// # Errors
    /// `MalformedPayload` for an empty id, out-of-range or non-finite
    /// coordinates, or a negative / non-finite speed.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.entity_id.is_empty() {
            return Err(ContractError::malformed("delta", "empty entity id"));
        }
        check_fields("delta", self.lat, self.lng, self.speed)
    }

    /// True if the delta carries no fields besides the id
    pub fn is_empty(&self) -> bool {
        self.lat.is_none() && self.lng.is_none() && self.status.is_none() && self.speed.is_none()
    }
}

/// User-facing alert (emergency, delay, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(alias = "type")]
    pub category: String,

    pub message: String,

    #[serde(default, alias = "bus_id", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip_keeps_unrecognized() {
        let status: EntityStatus = serde_json::from_str("\"retired\"").unwrap();
        assert_eq!(status, EntityStatus::Unrecognized("retired".into()));
        assert!(!status.is_recognized());
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"retired\"");

        let running: EntityStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(running, EntityStatus::Running);
    }

    #[test]
    fn snapshot_record_uses_api_keys() {
        let json = r#"{"id": 3, "plate_number": "NB-1234", "status": "idle",
                       "current_lat": 6.9, "current_lng": 79.8, "capacity": 50}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.id, "3");
        assert_eq!(entity.label.as_deref(), Some("NB-1234"));
        assert_eq!(entity.position(), Some(Position::new(6.9, 79.8)));
        assert_eq!(entity.speed_or_default(), 0.0);
        assert_eq!(entity.capacity_or_default(), 50);
    }

    #[test]
    fn position_requires_both_coordinates() {
        let mut entity = Entity::new("a");
        entity.lat = Some(6.9);
        assert_eq!(entity.position(), None);
    }

    #[test]
    fn delta_accepts_bus_id_alias() {
        let json = r#"{"bus_id": 7, "lat": 6.91, "lng": 79.85, "heading": 90}"#;
        let delta: EntityDelta = serde_json::from_str(json).unwrap();
        assert_eq!(delta.entity_id, "7");
        assert_eq!(delta.lat, Some(6.91));
        assert!(delta.status.is_none());
        assert!(delta.validate().is_ok());
    }

    #[test]
    fn delta_validation_rejects_bad_shapes() {
        assert!(EntityDelta::new("a").position(91.0, 0.0).validate().is_err());
        assert!(EntityDelta::new("a").position(0.0, f64::NAN).validate().is_err());
        assert!(EntityDelta::new("a").speed(-1.0).validate().is_err());
        assert!(EntityDelta::new("").speed(1.0).validate().is_err());
    }

    #[test]
    fn entity_validation_checks_record_ranges() {
        assert!(Entity::new("1").with_position(6.93, 79.85).with_speed(20.0).validate().is_ok());
        assert!(Entity::new("1").validate().is_ok());
        assert!(Entity::new("1").with_position(120.0, 79.85).validate().is_err());
        assert!(Entity::new("1").with_position(6.93, 500.0).validate().is_err());
        assert!(Entity::new("1").with_speed(-30.0).validate().is_err());
        assert!(Entity::new("").validate().is_err());

        let mut half_fix = Entity::new("1");
        half_fix.lat = Some(f64::INFINITY);
        assert!(half_fix.validate().is_err());
    }

    #[test]
    fn alert_accepts_type_alias() {
        let alert: Alert =
            serde_json::from_str(r#"{"type": "emergency", "message": "brake failure"}"#).unwrap();
        assert_eq!(alert.category, "emergency");
        assert!(alert.entity_id.is_none());
    }
}
