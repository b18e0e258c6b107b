//! # Tracker
//!
//! Live entity tracking and visualization state.
//!
//! Owns the authoritative in-memory state of every tracked vehicle and the
//! map overlays that represent it, reconciles that state against one
//! snapshot per activation plus an unbounded stream of deltas, and keeps
//! the derived views (filtered list, grid, info panel, markers) consistent.
//!
//! ## Usage
//!
//! ```ignore
//! use tracker::{Dashboard, Reconciler, Renderer, SceneMap};
//!
//! let mut dashboard = Dashboard::new(SceneMap::new(&config.map), &config);
//! dashboard.load_snapshot(entities);
//!
//! let mut renderer = Renderer::new();
//! sink.write(&renderer.full_frame(&dashboard)).await?;
//!
//! let mut reconciler = Reconciler::new();
//! while let Ok(event) = rx.recv().await {
//!     let outcome = reconciler.handle(&mut dashboard, event);
//!     // project a patch for the touched entity
//! }
//! ```

mod actions;
mod alerts;
mod dashboard;
mod error;
mod filter;
mod overlay;
mod reconciler;
mod render;
mod scene;
mod store;

pub use actions::{ActionHandler, ActionKind, ActionResult, ActionTable, UiAction};
pub use alerts::AlertLog;
pub use dashboard::{Dashboard, DeltaOutcome, SnapshotOutcome};
pub use error::{Result, TrackerError};
pub use filter::{
    display_label, global_search, info_panel, search, visible_entities, GlobalSearchResults,
    Selection, StatusFilter,
};
pub use overlay::{popup_text, DrawnRoute, MarkerSync, OverlayRegistry};
pub use reconciler::{ReconcileEffect, ReconcileOutcome, Reconciler};
pub use render::{entity_card, list_item, render_entity_patch, render_full, Renderer};
pub use scene::{SceneExport, SceneLine, SceneMap, SceneMarker};
pub use store::{EntityStore, ReplaceSummary};
