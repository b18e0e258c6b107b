//! Overlay registry - entity id / route id -> map handles
//!
//! Owns the map surface and every handle it issued. Entities never carry
//! their handle; the registry is the only place that knows which marker
//! belongs to which entity.

use std::collections::HashMap;

use contracts::{
    Entity, EntityId, LineHandle, LineStyle, MapSurface, MarkerHandle, MarkerSpec, MarkerStyle,
    Position, RouteId, Viewport, Waypoint, WaypointInput,
};
use tracing::{debug, instrument, warn};

use crate::error::{Result, TrackerError};
use crate::filter::display_label;

/// Outcome of a marker sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSync {
    /// Entity has no position yet
    Skipped,
    Created(MarkerHandle),
    Updated(MarkerHandle),
}

impl MarkerSync {
    pub fn handle(&self) -> Option<MarkerHandle> {
        match self {
            Self::Skipped => None,
            Self::Created(h) | Self::Updated(h) => Some(*h),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MarkerEntry {
    handle: MarkerHandle,
    visible: bool,
}

#[derive(Debug)]
struct RouteOverlay {
    line: LineHandle,
    stops: Vec<MarkerHandle>,
    waypoints: Vec<Waypoint>,
}

/// Route that was on the map when the registry was cleared
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnRoute {
    pub route_id: RouteId,
    pub waypoints: Vec<Waypoint>,
}

/// Popup body for an entity marker
pub fn popup_text(entity: &Entity) -> String {
    let status = entity
        .status
        .as_ref()
        .map(|s| s.as_str())
        .unwrap_or("unknown");
    let mut text = format!(
        "Bus {}\nStatus: {}\nSpeed: {} km/h",
        display_label(entity),
        status,
        entity.speed_or_default()
    );
    if let Some(pos) = entity.position() {
        text.push_str(&format!("\nLat: {:.4}\nLng: {:.4}", pos.lat, pos.lng));
    }
    text
}

/// Overlay registry
pub struct OverlayRegistry<M: MapSurface> {
    map: M,
    markers: HashMap<EntityId, MarkerEntry>,
    routes: HashMap<RouteId, RouteOverlay>,
    focus_zoom: u8,
    fit_padding: f64,
}

impl<M: MapSurface> OverlayRegistry<M> {
    pub fn new(map: M, focus_zoom: u8, fit_padding: f64) -> Self {
        Self {
            map,
            markers: HashMap::new(),
            routes: HashMap::new(),
            focus_zoom,
            fit_padding,
        }
    }

    /// Create or move the entity's marker
    ///
    /// Without a position this is a no-op: an existing marker stays at its
    /// last known place. A new marker adopts `visible`.
    pub fn sync_marker(&mut self, entity: &Entity, visible: bool) -> MarkerSync {
        let Some(position) = entity.position() else {
            return MarkerSync::Skipped;
        };

        let spec = MarkerSpec {
            position,
            style: MarkerStyle::for_status(entity.status.as_ref()),
            popup: popup_text(entity),
        };

        match self.markers.get_mut(&entity.id) {
            Some(entry) => {
                self.map.update_marker(entry.handle, spec);
                if entry.visible != visible {
                    self.map.set_marker_visible(entry.handle, visible);
                    entry.visible = visible;
                }
                MarkerSync::Updated(entry.handle)
            }
            None => {
                let handle = self.map.create_marker(spec);
                if !visible {
                    self.map.set_marker_visible(handle, false);
                }
                self.markers
                    .insert(entity.id.clone(), MarkerEntry { handle, visible });
                debug!(entity_id = %entity.id, marker = handle.0, "marker created");
                MarkerSync::Created(handle)
            }
        }
    }

    /// Show or hide markers to match a visibility predicate
    ///
    /// Returns the number of markers whose visibility changed.
    pub fn apply_visibility<F>(&mut self, is_visible: F) -> usize
    where
        F: Fn(&EntityId) -> bool,
    {
        let mut changed = 0;
        for (id, entry) in self.markers.iter_mut() {
            let visible = is_visible(id);
            if entry.visible != visible {
                self.map.set_marker_visible(entry.handle, visible);
                entry.visible = visible;
                changed += 1;
            }
        }
        changed
    }

    /// Replace a route's line and stop markers
    ///
    /// Malformed waypoints leave the current overlay untouched. An empty
    /// list removes the overlay and draws nothing. Returns the number of
    /// stops drawn.
    #[instrument(name = "overlay_sync_route", skip(self, input, style), fields(route_id = %route_id))]
    pub fn sync_route(
        &mut self,
        route_id: &RouteId,
        input: WaypointInput,
        style: &LineStyle,
    ) -> Result<usize> {
        let waypoints = input.parse().map_err(|source| {
            warn!(error = %source, "malformed waypoints, keeping previous overlay");
            TrackerError::MalformedRoute {
                route_id: route_id.clone(),
                source,
            }
        })?;

        self.remove_route(route_id);
        if waypoints.is_empty() {
            debug!("empty waypoint list, nothing drawn");
            return Ok(0);
        }

        let points: Vec<Position> = waypoints.iter().map(Waypoint::position).collect();
        let line = self.map.create_polyline(&points, style);
        let stops = waypoints
            .iter()
            .enumerate()
            .map(|(idx, waypoint)| {
                self.map.create_marker(MarkerSpec {
                    position: waypoint.position(),
                    style: MarkerStyle::Stop,
                    popup: waypoint.display_name(idx),
                })
            })
            .collect::<Vec<_>>();

        let drawn = stops.len();
        self.routes.insert(
            route_id.clone(),
            RouteOverlay {
                line,
                stops,
                waypoints,
            },
        );
        debug!(stops = drawn, "route drawn");
        Ok(drawn)
    }

    /// Remove a route overlay; false if none was drawn
    pub fn remove_route(&mut self, route_id: &str) -> bool {
        let Some(overlay) = self.routes.remove(route_id) else {
            return false;
        };
        self.map.remove_polyline(overlay.line);
        for stop in overlay.stops {
            self.map.remove_marker(stop);
        }
        true
    }

    /// Remove every marker, line and stop marker
    ///
    /// Returns the routes that were drawn so the caller can redraw them.
    pub fn clear_all(&mut self) -> Vec<DrawnRoute> {
        for (_, entry) in self.markers.drain() {
            self.map.remove_marker(entry.handle);
        }

        let mut drawn = Vec::with_capacity(self.routes.len());
        for (route_id, overlay) in self.routes.drain() {
            self.map.remove_polyline(overlay.line);
            for stop in overlay.stops {
                self.map.remove_marker(stop);
            }
            drawn.push(DrawnRoute {
                route_id,
                waypoints: overlay.waypoints,
            });
        }
        drawn.sort_by(|a, b| a.route_id.cmp(&b.route_id));
        drawn
    }

    /// Center on the entity's marker at focus zoom and open its popup
    ///
    /// False (and no map change) when the entity has no marker.
    pub fn focus(&mut self, id: &str) -> bool {
        let Some(entry) = self.markers.get(id) else {
            return false;
        };
        let Some(center) = self.map.marker_position(entry.handle) else {
            return false;
        };
        self.map.set_view(Viewport {
            center,
            zoom: self.focus_zoom,
        });
        self.map.open_popup(entry.handle);
        true
    }

    /// Fit the viewport around every entity marker
    pub fn fit_all(&mut self) -> Option<Viewport> {
        let points: Vec<Position> = self
            .markers
            .values()
            .filter_map(|entry| self.map.marker_position(entry.handle))
            .collect();
        self.fit(&points)
    }

    /// Fit the viewport around a drawn route
    pub fn fit_route(&mut self, route_id: &str) -> Option<Viewport> {
        let points: Vec<Position> = self
            .routes
            .get(route_id)?
            .waypoints
            .iter()
            .map(Waypoint::position)
            .collect();
        self.fit(&points)
    }

    fn fit(&mut self, points: &[Position]) -> Option<Viewport> {
        let view = self.map.bounding_view(points, self.fit_padding)?;
        self.map.set_view(view);
        Some(self.map.view())
    }

    pub fn handle_of(&self, id: &str) -> Option<MarkerHandle> {
        self.markers.get(id).map(|entry| entry.handle)
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.markers.get(id).map(|entry| entry.visible)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn line_count(&self) -> usize {
        self.routes.len()
    }

    pub fn stop_count(&self) -> usize {
        self.routes.values().map(|r| r.stops.len()).sum()
    }

    pub fn is_route_drawn(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn into_map(self) -> M {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneMap;
    use contracts::MapConfig;

    fn registry() -> OverlayRegistry<SceneMap> {
        let config = MapConfig::default();
        OverlayRegistry::new(SceneMap::new(&config), config.focus_zoom, config.fit_padding)
    }

    fn route_id(id: &str) -> RouteId {
        RouteId::from(id)
    }

    #[test]
    fn handle_created_once_after_position_arrives() {
        let mut overlays = registry();
        let mut entity = Entity::new("a").with_status("running");

        assert_eq!(overlays.sync_marker(&entity, true), MarkerSync::Skipped);
        assert_eq!(overlays.marker_count(), 0);

        entity.lat = Some(6.9);
        entity.lng = Some(79.8);
        let created = overlays.sync_marker(&entity, true);
        assert!(matches!(created, MarkerSync::Created(_)));

        entity.lat = Some(6.95);
        let updated = overlays.sync_marker(&entity, true);
        assert_eq!(updated, MarkerSync::Updated(created.handle().unwrap()));
        assert_eq!(overlays.marker_count(), 1);

        let marker = overlays.map().marker(created.handle().unwrap()).unwrap();
        assert_eq!(marker.position, Position::new(6.95, 79.8));
    }

    #[test]
    fn unknown_status_uses_running_style() {
        let mut overlays = registry();
        let entity = Entity::new("a")
            .with_status("retired")
            .with_position(6.9, 79.8);
        let handle = overlays.sync_marker(&entity, false).handle().unwrap();
        let marker = overlays.map().marker(handle).unwrap();
        assert_eq!(marker.style, MarkerStyle::Running);
        assert!(!marker.visible);
    }

    #[test]
    fn empty_then_real_route_draws_one_line() {
        let mut overlays = registry();
        let id = route_id("r1");
        let style = LineStyle::default();

        assert_eq!(overlays.sync_route(&id, Vec::new().into(), &style).unwrap(), 0);
        assert_eq!(overlays.line_count(), 0);

        let points = vec![Waypoint::new(6.9, 79.8), Waypoint::new(6.95, 79.85)];
        assert_eq!(overlays.sync_route(&id, points.clone().into(), &style).unwrap(), 2);
        assert_eq!(overlays.sync_route(&id, points.into(), &style).unwrap(), 2);

        assert_eq!(overlays.line_count(), 1);
        assert_eq!(overlays.map().line_count(), 1);
        assert_eq!(overlays.stop_count(), 2);
        assert_eq!(overlays.map().marker_count(), 2);
    }

    #[test]
    fn malformed_route_keeps_previous_overlay() {
        let mut overlays = registry();
        let id = route_id("r1");
        let style = LineStyle::default();
        overlays
            .sync_route(&id, vec![Waypoint::new(6.9, 79.8)].into(), &style)
            .unwrap();

        let err = overlays
            .sync_route(&id, WaypointInput::from("[{\"lat\": \"x\"}]"), &style)
            .unwrap_err();
        assert!(matches!(err, TrackerError::MalformedRoute { .. }));

        let err = overlays
            .sync_route(
                &id,
                vec![Waypoint::new(6.9, 79.8), Waypoint::new(f64::INFINITY, 79.8)].into(),
                &style,
            )
            .unwrap_err();
        assert!(matches!(err, TrackerError::MalformedRoute { .. }));

        assert!(overlays.is_route_drawn("r1"));
        assert_eq!(overlays.stop_count(), 1);
    }

    #[test]
    fn clear_all_removes_everything_and_reports_routes() {
        let mut overlays = registry();
        overlays.sync_marker(&Entity::new("a").with_position(6.9, 79.8), true);
        overlays
            .sync_route(
                &route_id("r1"),
                vec![Waypoint::new(6.9, 79.8), Waypoint::new(6.8, 79.9)].into(),
                &LineStyle::default(),
            )
            .unwrap();

        let drawn = overlays.clear_all();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].route_id, "r1");
        assert_eq!(overlays.marker_count(), 0);
        assert_eq!(overlays.line_count(), 0);
        assert_eq!(overlays.map().marker_count(), 0);
        assert_eq!(overlays.map().line_count(), 0);
    }

    #[test]
    fn focus_centers_and_opens_popup() {
        let mut overlays = registry();
        let handle = overlays
            .sync_marker(&Entity::new("a").with_position(6.9, 79.8), true)
            .handle()
            .unwrap();

        assert!(overlays.focus("a"));
        let view = overlays.map().view();
        assert_eq!(view.zoom, 16);
        assert_eq!(view.center, Position::new(6.9, 79.8));
        assert_eq!(overlays.map().popup_target(), Some(handle));

        let before = overlays.map().view();
        assert!(!overlays.focus("missing"));
        assert_eq!(overlays.map().view(), before);
    }

    #[test]
    fn visibility_follows_predicate() {
        let mut overlays = registry();
        overlays.sync_marker(&Entity::new("a").with_position(6.9, 79.8), true);
        overlays.sync_marker(&Entity::new("b").with_position(6.8, 79.9), true);

        let changed = overlays.apply_visibility(|id| id.as_str() == "a");
        assert_eq!(changed, 1);
        assert_eq!(overlays.is_visible("b"), Some(false));
        assert_eq!(overlays.map().visible_marker_count(), 1);
    }

    #[test]
    fn popup_text_lists_details() {
        let entity = Entity::new("7")
            .with_label("NB-1234")
            .with_status("idle")
            .with_speed(32.5)
            .with_position(6.92715, 79.86125);
        let text = popup_text(&entity);
        assert!(text.starts_with("Bus NB-1234\nStatus: idle\nSpeed: 32.5 km/h"));
        assert!(text.contains("Lat: 6.9272"));
    }
}
