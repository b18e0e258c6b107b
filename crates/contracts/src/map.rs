//! MapSurface trait - mapping collaborator interface
//!
//! The tracker never draws pixels. It drives an implementation of this
//! trait (a browser map bridge, or the in-memory scene used headless and in
//! tests) through opaque handles.

use serde::{Deserialize, Serialize};

use crate::{EntityStatus, Position};

/// Opaque marker handle issued by a map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub usize);

/// Opaque polyline handle issued by a map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineHandle(pub usize);

/// Marker style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    Running,
    Idle,
    Maintenance,
    /// Route stop
    Stop,
}

impl MarkerStyle {
    /// Style for an entity status
    ///
    /// Unset or unrecognized statuses fall back to the running style.
    pub fn for_status(status: Option<&EntityStatus>) -> Self {
        match status {
            Some(EntityStatus::Idle) => Self::Idle,
            Some(EntityStatus::Maintenance) => Self::Maintenance,
            _ => Self::Running,
        }
    }

    /// Fill color
    pub fn color(&self) -> &'static str {
        match self {
            Self::Running => "#667eea",
            Self::Idle => "#95a5a6",
            Self::Maintenance => "#f39c12",
            Self::Stop => "#2ecc71",
        }
    }
}

/// Marker creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: Position,
    pub style: MarkerStyle,
    /// Popup body (plain text)
    pub popup: String,
}

/// Polyline style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub weight: f32,
    pub opacity: f32,
    pub dash: Option<String>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: "#667eea".to_string(),
            weight: 3.0,
            opacity: 0.7,
            dash: Some("5, 10".to_string()),
        }
    }
}

/// Map viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Position,
    pub zoom: u8,
}

/// Mapping collaborator
///
/// Operations are synchronous: the host map applies them immediately on
/// the UI thread. Handles passed back are always ones this surface issued.
pub trait MapSurface {
    /// Create a positioned, styled marker
    fn create_marker(&mut self, spec: MarkerSpec) -> MarkerHandle;

    /// Move / restyle an existing marker and replace its popup
    fn update_marker(&mut self, handle: MarkerHandle, spec: MarkerSpec);

    /// Remove a marker
    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Show or hide a marker without removing it
    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool);

    /// Open a marker's popup
    fn open_popup(&mut self, handle: MarkerHandle);

    /// Current marker position
    fn marker_position(&self, handle: MarkerHandle) -> Option<Position>;

    /// Create a polyline through the points, in order
    fn create_polyline(&mut self, points: &[Position], style: &LineStyle) -> LineHandle;

    /// Remove a polyline
    fn remove_polyline(&mut self, handle: LineHandle);

    /// Set viewport center and zoom
    fn set_view(&mut self, viewport: Viewport);

    /// Current viewport
    fn view(&self) -> Viewport;

    /// Viewport that bounds all points, padded by `padding` (fraction of
    /// the span on each side). `None` for an empty point set.
    fn bounding_view(&self, points: &[Position], padding: f64) -> Option<Viewport>;
}
