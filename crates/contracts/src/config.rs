//! DashboardConfig - Config Loader output
//!
//! Describes one live view: map defaults, initial filter flags, snapshot
//! source, realtime stream, route catalog and view sinks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

use crate::{Entity, EntityStatus, Position, Route};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DashboardConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Map defaults
    #[serde(default)]
    #[validate(nested)]
    pub map: MapConfig,

    /// Initial status filter flags
    #[serde(default)]
    pub filters: FilterConfig,

    /// Snapshot source
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Realtime stream
    #[serde(default)]
    #[validate(nested)]
    pub stream: StreamConfig,

    /// Route catalog
    #[serde(default)]
    #[validate(nested)]
    pub routes: Vec<Route>,

    /// View sinks
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Map defaults
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MapConfig {
    /// Default center (Colombo)
    #[serde(default = "default_center")]
    pub default_center: Position,

    #[serde(default = "default_zoom")]
    #[validate(range(max = 22))]
    pub default_zoom: u8,

    /// Zoom used when focusing an entity
    #[serde(default = "default_focus_zoom")]
    #[validate(range(max = 22))]
    pub focus_zoom: u8,

    #[serde(default)]
    #[validate(range(max = 22))]
    pub min_zoom: u8,

    #[serde(default = "default_max_zoom")]
    #[validate(range(max = 22))]
    pub max_zoom: u8,

    /// Padding around fitted bounds, as a fraction of the span
    #[serde(default = "default_fit_padding")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub fit_padding: f64,
}

fn default_center() -> Position {
    Position::new(6.9271, 79.8612)
}

fn default_zoom() -> u8 {
    13
}

fn default_focus_zoom() -> u8 {
    16
}

fn default_max_zoom() -> u8 {
    19
}

fn default_fit_padding() -> f64 {
    0.1
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: default_center(),
            default_zoom: default_zoom(),
            focus_zoom: default_focus_zoom(),
            min_zoom: 0,
            max_zoom: default_max_zoom(),
            fit_padding: default_fit_padding(),
        }
    }
}

impl MapConfig {
    /// Clamp a zoom level into `[min_zoom, max_zoom]`
    pub fn clamp_zoom(&self, zoom: i32) -> u8 {
        let clamped = zoom.clamp(i32::from(self.min_zoom), i32::from(self.max_zoom));
        u8::try_from(clamped).unwrap_or(self.max_zoom)
    }
}

/// Initial status filter flags (all enabled by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "enabled")]
    pub running: bool,
    #[serde(default = "enabled")]
    pub idle: bool,
    #[serde(default = "enabled")]
    pub maintenance: bool,
}

fn enabled() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            running: true,
            idle: true,
            maintenance: true,
        }
    }
}

impl FilterConfig {
    /// Flag pairs in filter order
    pub fn flags(&self) -> [(EntityStatus, bool); 3] {
        [
            (EntityStatus::Running, self.running),
            (EntityStatus::Idle, self.idle),
            (EntityStatus::Maintenance, self.maintenance),
        ]
    }
}

/// Snapshot source
///
/// A JSON file of entity records, or an inline list. When both are empty
/// the view starts with an empty store and fills through upserts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Realtime stream configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamConfig {
    /// Ingestion channel capacity
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,

    /// Policy when the channel is full
    #[serde(default)]
    pub drop_policy: DropPolicy,

    /// Alerts kept in the alert log
    #[serde(default = "default_alert_history")]
    #[validate(range(min = 1))]
    pub alert_history: usize,

    /// Event source
    #[serde(default)]
    pub source: StreamSource,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_alert_history() -> usize {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
            alert_history: default_alert_history(),
            source: StreamSource::default(),
        }
    }
}

/// Realtime event source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamSource {
    /// Recorded JSON-lines stream
    Replay {
        path: PathBuf,
        /// Playback rate; `None` plays as fast as possible
        #[serde(default)]
        rate_hz: Option<f64>,
    },
    /// Random-walk simulation over the snapshot entities
    Simulated {
        rate_hz: f64,
        #[serde(default)]
        seed: Option<u64>,
        /// Max position step per tick, degrees
        #[serde(default = "default_step_deg")]
        step_deg: f64,
    },
    /// Snapshot only
    #[default]
    None,
}

fn default_step_deg() -> f64 {
    0.0005
}

/// Drop policy when backpressure is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Drop the oldest queued event
    DropOldest,
    /// Drop the incoming event
    #[default]
    DropNewest,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    pub sink_type: SinkType,

    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file output
    File,
}

impl DashboardConfig {
    /// Find a route in the catalog
    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.id == id)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            map: MapConfig::default(),
            filters: FilterConfig::default(),
            snapshot: SnapshotConfig::default(),
            stream: StreamConfig::default(),
            routes: Vec::new(),
            sinks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let config: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.map.default_zoom, 13);
        assert_eq!(config.map.focus_zoom, 16);
        assert_eq!(config.map.default_center, Position::new(6.9271, 79.8612));
        assert_eq!(config.stream.alert_history, 64);
        assert_eq!(config.stream.drop_policy, DropPolicy::DropNewest);
        assert_eq!(config.stream.source, StreamSource::None);
        assert!(config.filters.running && config.filters.idle && config.filters.maintenance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn clamp_zoom_respects_bounds() {
        let map = MapConfig::default();
        assert_eq!(map.clamp_zoom(25), 19);
        assert_eq!(map.clamp_zoom(-3), 0);
        assert_eq!(map.clamp_zoom(14), 14);
    }

    #[test]
    fn stream_source_is_tagged() {
        let json = r#"{"kind": "simulated", "rate_hz": 2.0, "seed": 7}"#;
        let source: StreamSource = serde_json::from_str(json).unwrap();
        assert_eq!(
            source,
            StreamSource::Simulated {
                rate_hz: 2.0,
                seed: Some(7),
                step_deg: 0.0005
            }
        );
    }

    #[test]
    fn derive_rules_catch_bad_values() {
        let mut config = DashboardConfig::default();
        config.map.fit_padding = 2.0;
        config.sinks.push(SinkConfig {
            name: String::new(),
            sink_type: SinkType::Log,
            queue_capacity: 0,
            params: HashMap::new(),
        });
        let errors = config.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("map"));
        assert!(fields.contains_key("sinks"));
    }
}
