//! View renderer
//!
//! Pure projections of a dashboard into view payloads. The full view is
//! produced on activation and reload; every applied delta afterwards only
//! produces a patch for the one entity it touched.

use contracts::{
    Entity, EntityCard, EntityListItem, EntityPatch, EntityStatus, FleetStats, FullView,
    MapSurface, RouteRow, ViewFrame, ViewPayload,
};

use crate::dashboard::Dashboard;
use crate::filter::display_label;

/// `"lat, lng"` rounded for display
fn location_text(entity: &Entity) -> Option<String> {
    entity
        .position()
        .map(|pos| format!("{:.2}, {:.2}", pos.lat, pos.lng))
}

pub fn entity_card(entity: &Entity) -> EntityCard {
    EntityCard {
        id: entity.id.clone(),
        label: display_label(entity).to_string(),
        status: entity.status.clone(),
        capacity: entity.capacity_or_default(),
        speed: entity.speed_or_default(),
        location: location_text(entity),
    }
}

pub fn list_item(entity: &Entity, active: bool) -> EntityListItem {
    EntityListItem {
        id: entity.id.clone(),
        label: display_label(entity).to_string(),
        status: entity.status.clone(),
        active,
    }
}

/// Full projection of the dashboard
pub fn render_full<M: MapSurface>(dashboard: &Dashboard<M>) -> FullView {
    let selection = dashboard.selection();

    let cards = dashboard
        .visible_entities()
        .into_iter()
        .map(entity_card)
        .collect();

    let list = dashboard
        .list_entities()
        .into_iter()
        .map(|entity| list_item(entity, selection.is_focused(&entity.id)))
        .collect();

    let routes: Vec<RouteRow> = dashboard
        .routes()
        .map(|route| RouteRow {
            id: route.id.clone(),
            name: route.name.clone(),
            stops: route.waypoints.len(),
            buses: route.assigned.len(),
        })
        .collect();

    let store = dashboard.store();
    let stats = FleetStats {
        total: store.len(),
        running: store
            .all()
            .filter(|entity| entity.status == Some(EntityStatus::Running))
            .count(),
        routes: routes.len(),
    };

    FullView {
        cards,
        list,
        routes,
        panel: selection.panel().cloned(),
        stats,
    }
}

/// Incremental projection for one entity; `None` if it is not stored
pub fn render_entity_patch<M: MapSurface>(dashboard: &Dashboard<M>, id: &str) -> Option<EntityPatch> {
    let entity = dashboard.store().get(id)?;
    let selection = dashboard.selection();
    let focused = selection.is_focused(id);

    Some(EntityPatch {
        card: entity_card(entity),
        item: list_item(entity, focused),
        visible: dashboard.filter().passes(entity),
        panel: if focused {
            selection.panel().cloned()
        } else {
            None
        },
    })
}

/// Stamps payloads with a monotonically increasing sequence number
#[derive(Debug, Default)]
pub struct Renderer {
    next_seq: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, payload: ViewPayload) -> ViewFrame {
        let seq = self.next_seq;
        self.next_seq += 1;
        observability::record_view_frame(payload.kind());
        ViewFrame { seq, payload }
    }

    pub fn full_frame<M: MapSurface>(&mut self, dashboard: &Dashboard<M>) -> ViewFrame {
        self.frame(ViewPayload::Full(render_full(dashboard)))
    }

    pub fn patch_frame<M: MapSurface>(&mut self, dashboard: &Dashboard<M>, id: &str) -> Option<ViewFrame> {
        render_entity_patch(dashboard, id).map(|patch| self.frame(ViewPayload::EntityPatch(patch)))
    }

    pub fn frames_emitted(&self) -> u64 {
        self.next_seq
    }
}
