//! SceneMap - in-memory map surface
//!
//! Implements `MapSurface` without a renderer: markers and polylines live in
//! slabs keyed by their handles, and the viewport is plain state. Used by
//! the headless runner and by tests; `export` gives a serializable picture
//! of what a browser map would show.

use contracts::{
    LineHandle, LineStyle, MapConfig, MapSurface, MarkerHandle, MarkerSpec, MarkerStyle, Position,
    Viewport,
};
use serde::Serialize;
use slab::Slab;

use crate::error::Result;

/// Span used for a single point or a degenerate line (degrees)
const MIN_SPAN_DEG: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneMarker {
    pub position: Position,
    pub style: MarkerStyle,
    pub popup: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLine {
    pub points: Vec<Position>,
    pub style: LineStyle,
}

/// Serializable scene picture
#[derive(Debug, Clone, Serialize)]
pub struct SceneExport {
    pub viewport: Viewport,
    pub open_popup: Option<MarkerHandle>,
    pub markers: Vec<(MarkerHandle, SceneMarker)>,
    pub lines: Vec<(LineHandle, SceneLine)>,
}

/// In-memory map surface
#[derive(Debug)]
pub struct SceneMap {
    markers: Slab<SceneMarker>,
    lines: Slab<SceneLine>,
    viewport: Viewport,
    open_popup: Option<MarkerHandle>,
    min_zoom: u8,
    max_zoom: u8,
}

impl SceneMap {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            markers: Slab::new(),
            lines: Slab::new(),
            viewport: Viewport {
                center: config.default_center,
                zoom: config.default_zoom,
            },
            open_popup: None,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&SceneMarker> {
        self.markers.get(handle.0)
    }

    pub fn line(&self, handle: LineHandle) -> Option<&SceneLine> {
        self.lines.get(handle.0)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn visible_marker_count(&self) -> usize {
        self.markers.iter().filter(|(_, m)| m.visible).count()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn popup_target(&self) -> Option<MarkerHandle> {
        self.open_popup
    }

    pub fn export(&self) -> SceneExport {
        SceneExport {
            viewport: self.viewport,
            open_popup: self.open_popup,
            markers: self
                .markers
                .iter()
                .map(|(key, marker)| (MarkerHandle(key), marker.clone()))
                .collect(),
            lines: self
                .lines
                .iter()
                .map(|(key, line)| (LineHandle(key), line.clone()))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Zoom at which `span` degrees of longitude fill one 256px tile width
    fn zoom_for_span(&self, lat_span: f64, lng_span: f64) -> u8 {
        let by_lng = (360.0 / lng_span.max(MIN_SPAN_DEG)).log2();
        let by_lat = (180.0 / lat_span.max(MIN_SPAN_DEG)).log2();
        let zoom = by_lng.min(by_lat).floor();
        let clamped = zoom.clamp(f64::from(self.min_zoom), f64::from(self.max_zoom));
        clamped as u8
    }
}

impl MapSurface for SceneMap {
    fn create_marker(&mut self, spec: MarkerSpec) -> MarkerHandle {
        MarkerHandle(self.markers.insert(SceneMarker {
            position: spec.position,
            style: spec.style,
            popup: spec.popup,
            visible: true,
        }))
    }

    fn update_marker(&mut self, handle: MarkerHandle, spec: MarkerSpec) {
        if let Some(marker) = self.markers.get_mut(handle.0) {
            marker.position = spec.position;
            marker.style = spec.style;
            marker.popup = spec.popup;
        }
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.try_remove(handle.0);
        if self.open_popup == Some(handle) {
            self.open_popup = None;
        }
    }

    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool) {
        if let Some(marker) = self.markers.get_mut(handle.0) {
            marker.visible = visible;
        }
    }

    fn open_popup(&mut self, handle: MarkerHandle) {
        if self.markers.contains(handle.0) {
            self.open_popup = Some(handle);
        }
    }

    fn marker_position(&self, handle: MarkerHandle) -> Option<Position> {
        self.markers.get(handle.0).map(|m| m.position)
    }

    fn create_polyline(&mut self, points: &[Position], style: &LineStyle) -> LineHandle {
        LineHandle(self.lines.insert(SceneLine {
            points: points.to_vec(),
            style: style.clone(),
        }))
    }

    fn remove_polyline(&mut self, handle: LineHandle) {
        self.lines.try_remove(handle.0);
    }

    fn set_view(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            center: viewport.center,
            zoom: viewport.zoom.clamp(self.min_zoom, self.max_zoom),
        };
    }

    fn view(&self) -> Viewport {
        self.viewport
    }

    fn bounding_view(&self, points: &[Position], padding: f64) -> Option<Viewport> {
        let first = points.first()?;
        let (mut south, mut north, mut west, mut east) = (first.lat, first.lat, first.lng, first.lng);
        for point in &points[1..] {
            south = south.min(point.lat);
            north = north.max(point.lat);
            west = west.min(point.lng);
            east = east.max(point.lng);
        }

        let pad = padding.max(0.0);
        let lat_span = (north - south) * (1.0 + 2.0 * pad);
        let lng_span = (east - west) * (1.0 + 2.0 * pad);

        Some(Viewport {
            center: Position::new((south + north) / 2.0, (west + east) / 2.0),
            zoom: self.zoom_for_span(lat_span, lng_span),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(lat: f64, lng: f64) -> MarkerSpec {
        MarkerSpec {
            position: Position::new(lat, lng),
            style: MarkerStyle::Running,
            popup: "bus".into(),
        }
    }

    #[test]
    fn handles_are_stable_until_removed() {
        let mut scene = SceneMap::new(&MapConfig::default());
        let a = scene.create_marker(spec(6.9, 79.8));
        let b = scene.create_marker(spec(6.8, 79.9));
        assert_ne!(a, b);

        scene.update_marker(a, spec(7.0, 80.0));
        assert_eq!(scene.marker_position(a), Some(Position::new(7.0, 80.0)));

        scene.remove_marker(a);
        assert_eq!(scene.marker_position(a), None);
        assert_eq!(scene.marker_count(), 1);
        // removing twice is a no-op
        scene.remove_marker(a);
        assert_eq!(scene.marker_count(), 1);
    }

    #[test]
    fn set_view_clamps_zoom() {
        let mut scene = SceneMap::new(&MapConfig::default());
        scene.set_view(Viewport {
            center: Position::new(0.0, 0.0),
            zoom: 40,
        });
        assert_eq!(scene.view().zoom, 19);
    }

    #[test]
    fn bounding_view_centers_and_pads() {
        let scene = SceneMap::new(&MapConfig::default());
        let points = [Position::new(6.8, 79.8), Position::new(7.0, 80.0)];
        let view = scene.bounding_view(&points, 0.1).unwrap();
        assert!((view.center.lat - 6.9).abs() < 1e-9);
        assert!((view.center.lng - 79.9).abs() < 1e-9);

        let tight = scene.bounding_view(&points, 0.0).unwrap();
        assert!(view.zoom <= tight.zoom);
        assert!(scene.bounding_view(&[], 0.1).is_none());
    }

    #[test]
    fn single_point_fits_at_max_zoom() {
        let scene = SceneMap::new(&MapConfig::default());
        let view = scene.bounding_view(&[Position::new(6.9, 79.8)], 0.1).unwrap();
        assert_eq!(view.zoom, 19);
    }

    #[test]
    fn export_serializes() {
        let mut scene = SceneMap::new(&MapConfig::default());
        let handle = scene.create_marker(spec(6.9, 79.8));
        scene.open_popup(handle);
        assert_eq!(scene.popup_target(), Some(handle));
        scene.create_polyline(&[Position::new(6.9, 79.8), Position::new(6.8, 79.9)], &LineStyle::default());
        let json = scene.to_json().unwrap();
        assert!(json.contains("\"open_popup\""));
        assert!(json.contains("#667eea"));
    }
}
