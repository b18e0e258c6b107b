//! ViewFrame - Renderer output, Dispatcher input
//!
//! Projections of the dashboard state handed to view sinks. A full view is
//! emitted on activation; each applied delta produces an entity patch.

use serde::{Deserialize, Serialize};

use crate::{Alert, EntityId, EntityStatus, LinkState, Position, RouteId};

/// One rendered view update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFrame {
    /// Monotonic sequence number, per renderer
    pub seq: u64,

    pub payload: ViewPayload,
}

/// View update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewPayload {
    /// Full projection
    Full(FullView),
    /// Incremental update for one entity
    EntityPatch(EntityPatch),
    /// Info panel changed (selection / clear)
    Panel { panel: Option<InfoPanel> },
    /// Alert notification
    Alert(Alert),
    /// Link state changed
    Link { state: LinkState },
}

impl ViewPayload {
    /// Short kind name (used for logging/metrics)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Full(_) => "full",
            Self::EntityPatch(_) => "entity_patch",
            Self::Panel { .. } => "panel",
            Self::Alert(_) => "alert",
            Self::Link { .. } => "link",
        }
    }
}

/// Full projection of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullView {
    /// Grid cards for visible entities
    pub cards: Vec<EntityCard>,
    /// List items for visible entities matching the search query
    pub list: Vec<EntityListItem>,
    /// Route catalog rows
    pub routes: Vec<RouteRow>,
    /// Focused entity panel
    pub panel: Option<InfoPanel>,
    pub stats: FleetStats,
}

/// Header counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub running: usize,
    pub routes: usize,
}

/// Grid card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCard {
    pub id: EntityId,
    pub label: String,
    pub status: Option<EntityStatus>,
    pub capacity: u32,
    pub speed: f64,
    /// `"lat, lng"` rounded for display, `None` before the first fix
    pub location: Option<String>,
}

/// Side-list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityListItem {
    pub id: EntityId,
    pub label: String,
    pub status: Option<EntityStatus>,
    /// True for the focused entity
    pub active: bool,
}

/// Route catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRow {
    pub id: RouteId,
    pub name: String,
    /// Waypoint count
    pub stops: usize,
    /// Assigned entity count
    pub buses: usize,
}

/// Focused entity details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoPanel {
    pub id: EntityId,
    pub label: String,
    pub status: Option<EntityStatus>,
    pub speed: f64,
    pub position: Option<Position>,
}

/// Incremental update for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub card: EntityCard,
    pub item: EntityListItem,
    /// Whether the entity passes the status filter
    pub visible: bool,
    /// Refreshed panel, present only when the entity is focused
    pub panel: Option<InfoPanel>,
}
