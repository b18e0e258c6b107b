//! Dashboard - composed live view state
//!
//! One instance per live view. The reconciler, renderer and action table
//! all take it explicitly; several instances may coexist.

use contracts::{
    Alert, DashboardConfig, Entity, EntityDelta, EntityStatus, InfoPanel, LineStyle, MapConfig,
    MapSurface, Route, RouteId, Viewport, WaypointInput,
};
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::alerts::AlertLog;
use crate::error::{Result, TrackerError};
use crate::filter::{self, GlobalSearchResults, Selection, StatusFilter};
use crate::overlay::{MarkerSync, OverlayRegistry};
use crate::store::EntityStore;

/// Result of installing a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub installed: usize,
    pub duplicates: usize,
    /// Markers created (entities with a position)
    pub markers: usize,
    pub routes_redrawn: usize,
}

/// Result of applying one delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaOutcome {
    /// Entity created by this delta
    pub upserted: bool,
    pub marker: MarkerSync,
    /// Entity passes the status filter after the update
    pub visible: bool,
    /// Focused entity's panel was recomputed
    pub panel_refreshed: bool,
}

/// Live view state
pub struct Dashboard<M: MapSurface> {
    store: EntityStore,
    overlays: OverlayRegistry<M>,
    filter: StatusFilter,
    selection: Selection,
    search_query: String,
    routes: IndexMap<RouteId, Route>,
    alerts: AlertLog,
    map_config: MapConfig,
    line_style: LineStyle,
}

impl<M: MapSurface> Dashboard<M> {
    pub fn new(mut map: M, config: &DashboardConfig) -> Self {
        map.set_view(Viewport {
            center: config.map.default_center,
            zoom: config.map.default_zoom,
        });

        let routes = config
            .routes
            .iter()
            .map(|route| (route.id.clone(), route.clone()))
            .collect();

        Self {
            store: EntityStore::new(),
            overlays: OverlayRegistry::new(map, config.map.focus_zoom, config.map.fit_padding),
            filter: StatusFilter::new(config.filters),
            selection: Selection::default(),
            search_query: String::new(),
            routes,
            alerts: AlertLog::new(config.stream.alert_history),
            map_config: config.map.clone(),
            line_style: LineStyle::default(),
        }
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    /// Replace all entities and rebuild every overlay
    ///
    /// Routes that were drawn are redrawn; a focused entity missing from
    /// the new snapshot loses focus.
    #[instrument(name = "dashboard_load_snapshot", skip(self, entities), fields(count = entities.len()))]
    pub fn load_snapshot(&mut self, entities: Vec<Entity>) -> SnapshotOutcome {
        let summary = self.store.replace_all(entities);
        let drawn = self.overlays.clear_all();

        let mut routes_redrawn = 0;
        for route in drawn {
            match self
                .overlays
                .sync_route(&route.route_id, route.waypoints.into(), &self.line_style)
            {
                Ok(_) => routes_redrawn += 1,
                Err(e) => warn!(error = %e, "route redraw failed"),
            }
        }

        let mut markers = 0;
        for entity in self.store.all() {
            let visible = self.filter.passes(entity);
            if let MarkerSync::Created(_) = self.overlays.sync_marker(entity, visible) {
                markers += 1;
            }
        }

        if self.selection.refresh(&self.store).is_some() {
            if let Some(id) = self.selection.focused().cloned() {
                self.overlays.focus(&id);
            }
        }

        observability::record_snapshot_loaded(summary.installed, summary.duplicates);
        self.record_overlay_counts();
        info!(
            installed = summary.installed,
            duplicates = summary.duplicates,
            markers,
            "snapshot installed"
        );

        SnapshotOutcome {
            installed: summary.installed,
            duplicates: summary.duplicates,
            markers,
            routes_redrawn,
        }
    }

    /// Merge a validated delta and sync its marker and panel
    pub fn apply_delta(&mut self, delta: &EntityDelta) -> DeltaOutcome {
        let upserted = self.store.apply_update(delta);

        let (marker, visible) = match self.store.get(&delta.entity_id) {
            Some(entity) => {
                let visible = self.filter.passes(entity);
                (self.overlays.sync_marker(entity, visible), visible)
            }
            None => (MarkerSync::Skipped, false),
        };

        let panel_refreshed = self.selection.is_focused(&delta.entity_id)
            && self.selection.refresh(&self.store).is_some();

        if upserted {
            self.record_overlay_counts();
        }

        DeltaOutcome {
            upserted,
            marker,
            visible,
            panel_refreshed,
        }
    }

    /// Focus an entity and center the map on it
    ///
    /// An unknown id clears focus. Returns the new panel.
    pub fn select(&mut self, id: &str) -> Option<InfoPanel> {
        let panel = self.selection.select(&self.store, id).cloned();
        if panel.is_some() {
            self.overlays.focus(id);
        } else {
            debug!(entity_id = id, "select on unknown id, focus cleared");
        }
        panel
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Toggle a status flag and re-apply marker visibility
    ///
    /// Focus is never changed. False for an unrecognized status.
    pub fn set_filter(&mut self, status: &EntityStatus, enabled: bool) -> bool {
        if !self.filter.set_status_flag(status, enabled) {
            return false;
        }
        let store = &self.store;
        let filter = &self.filter;
        let changed = self.overlays.apply_visibility(|id| {
            store
                .get(id)
                .is_some_and(|entity| filter.passes(entity))
        });
        debug!(status = %status, enabled, changed, "status filter updated");
        true
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Entities matching the current search query (ignores status flags)
    pub fn search_results(&self) -> Vec<&Entity> {
        filter::search(&self.store, &self.search_query)
    }

    pub fn visible_entities(&self) -> Vec<&Entity> {
        filter::visible_entities(&self.store, &self.filter)
    }

    /// Side-list entries: visible entities matching the search query
    pub fn list_entities(&self) -> Vec<&Entity> {
        self.search_results()
            .into_iter()
            .filter(|entity| self.filter.passes(entity))
            .collect()
    }

    pub fn global_search(&self, query: &str) -> GlobalSearchResults {
        filter::global_search(&self.store, self.routes.values(), query)
    }

    /// Add or replace a catalog route
    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route.id.clone(), route);
    }

    /// Draw (or redraw) a route overlay
    pub fn draw_route(&mut self, route_id: &RouteId, input: impl Into<WaypointInput>) -> Result<usize> {
        let drawn = self
            .overlays
            .sync_route(route_id, input.into(), &self.line_style)?;
        self.record_overlay_counts();
        Ok(drawn)
    }

    /// Draw a catalog route and fit the map around it
    pub fn view_route(&mut self, route_id: &str) -> Result<Option<Viewport>> {
        let route = self
            .routes
            .get(route_id)
            .cloned()
            .ok_or_else(|| TrackerError::unknown_route(route_id))?;
        self.draw_route(&route.id, route.waypoints)?;
        Ok(self.overlays.fit_route(&route.id))
    }

    pub fn fit_all(&mut self) -> Option<Viewport> {
        self.overlays.fit_all()
    }

    pub fn zoom_in(&mut self) -> u8 {
        self.zoom_by(1)
    }

    pub fn zoom_out(&mut self) -> u8 {
        self.zoom_by(-1)
    }

    fn zoom_by(&mut self, step: i32) -> u8 {
        let map = self.overlays.map_mut();
        let mut view = map.view();
        view.zoom = self.map_config.clamp_zoom(i32::from(view.zoom) + step);
        map.set_view(view);
        view.zoom
    }

    /// Back to the configured default center and zoom
    pub fn recenter(&mut self) -> Viewport {
        let view = Viewport {
            center: self.map_config.default_center,
            zoom: self.map_config.default_zoom,
        };
        self.overlays.map_mut().set_view(view);
        view
    }

    pub fn record_alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    fn record_overlay_counts(&self) {
        observability::record_overlay_counts(
            self.store.len(),
            self.overlays.marker_count(),
            self.overlays.line_count(),
        );
    }

    /// Remove every overlay and hand the map surface back
    pub fn teardown(mut self) -> M {
        self.overlays.clear_all();
        self.overlays.into_map()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn overlays(&self) -> &OverlayRegistry<M> {
        &self.overlays
    }

    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn map(&self) -> &M {
        self.overlays.map()
    }

    pub fn map_config(&self) -> &MapConfig {
        &self.map_config
    }
}
