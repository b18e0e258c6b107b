//! UI action table
//!
//! Explicit dispatch from a closed set of user actions to handler
//! functions over a dashboard.

use contracts::{EntityId, EntityStatus, InfoPanel, MapSurface, RouteId, Viewport};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dashboard::Dashboard;
use crate::error::{Result, TrackerError};
use crate::filter::GlobalSearchResults;

/// User action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    ToggleFilter { status: EntityStatus, enabled: bool },
    Search { query: String },
    GlobalSearch { query: String },
    Select { id: EntityId },
    ClearSelection,
    ViewRoute { id: RouteId },
    ZoomIn,
    ZoomOut,
    Recenter,
    FitAll,
}

/// Action discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ToggleFilter,
    Search,
    GlobalSearch,
    Select,
    ClearSelection,
    ViewRoute,
    ZoomIn,
    ZoomOut,
    Recenter,
    FitAll,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::ToggleFilter,
        ActionKind::Search,
        ActionKind::GlobalSearch,
        ActionKind::Select,
        ActionKind::ClearSelection,
        ActionKind::ViewRoute,
        ActionKind::ZoomIn,
        ActionKind::ZoomOut,
        ActionKind::Recenter,
        ActionKind::FitAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToggleFilter => "toggle_filter",
            Self::Search => "search",
            Self::GlobalSearch => "global_search",
            Self::Select => "select",
            Self::ClearSelection => "clear_selection",
            Self::ViewRoute => "view_route",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::Recenter => "recenter",
            Self::FitAll => "fit_all",
        }
    }
}

impl UiAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::ToggleFilter { .. } => ActionKind::ToggleFilter,
            Self::Search { .. } => ActionKind::Search,
            Self::GlobalSearch { .. } => ActionKind::GlobalSearch,
            Self::Select { .. } => ActionKind::Select,
            Self::ClearSelection => ActionKind::ClearSelection,
            Self::ViewRoute { .. } => ActionKind::ViewRoute,
            Self::ZoomIn => ActionKind::ZoomIn,
            Self::ZoomOut => ActionKind::ZoomOut,
            Self::Recenter => ActionKind::Recenter,
            Self::FitAll => ActionKind::FitAll,
        }
    }
}

/// Handler outcome
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// `applied` is false for an unrecognized status
    FilterChanged { applied: bool },
    /// Side-list ids after the search
    Listed(Vec<EntityId>),
    Found(GlobalSearchResults),
    /// New panel; `None` when focus was cleared
    Panel(Option<InfoPanel>),
    /// Viewport after the action; `None` when there was nothing to fit
    View(Option<Viewport>),
}

impl ActionResult {
    /// Whether the full view needs re-projecting
    pub fn changes_view(&self) -> bool {
        !matches!(self, Self::Found(_) | Self::View(_))
    }
}

pub type ActionHandler<M> = fn(&mut Dashboard<M>, UiAction) -> Result<ActionResult>;

/// Action kind -> handler table
pub struct ActionTable<M: MapSurface> {
    handlers: IndexMap<ActionKind, ActionHandler<M>>,
}

impl<M: MapSurface> Default for ActionTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MapSurface> ActionTable<M> {
    /// Table with a handler for every action kind
    pub fn new() -> Self {
        let mut handlers: IndexMap<ActionKind, ActionHandler<M>> = IndexMap::new();
        handlers.insert(ActionKind::ToggleFilter, toggle_filter::<M>);
        handlers.insert(ActionKind::Search, search::<M>);
        handlers.insert(ActionKind::GlobalSearch, global_search::<M>);
        handlers.insert(ActionKind::Select, select::<M>);
        handlers.insert(ActionKind::ClearSelection, clear_selection::<M>);
        handlers.insert(ActionKind::ViewRoute, view_route::<M>);
        handlers.insert(ActionKind::ZoomIn, zoom::<M>);
        handlers.insert(ActionKind::ZoomOut, zoom::<M>);
        handlers.insert(ActionKind::Recenter, recenter::<M>);
        handlers.insert(ActionKind::FitAll, fit_all::<M>);
        Self { handlers }
    }

    pub fn kinds(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.handlers.keys().copied()
    }

    pub fn dispatch(&self, dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
        let kind = action.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or(TrackerError::UnhandledAction {
                kind: kind.as_str(),
            })?;
        debug!(action = kind.as_str(), "dispatching ui action");
        handler(dashboard, action)
    }
}

fn toggle_filter<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    let UiAction::ToggleFilter { status, enabled } = action else {
        return Err(mismatch(ActionKind::ToggleFilter));
    };
    Ok(ActionResult::FilterChanged {
        applied: dashboard.set_filter(&status, enabled),
    })
}

fn search<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    let UiAction::Search { query } = action else {
        return Err(mismatch(ActionKind::Search));
    };
    dashboard.set_search(query);
    Ok(ActionResult::Listed(
        dashboard
            .list_entities()
            .into_iter()
            .map(|entity| entity.id.clone())
            .collect(),
    ))
}

fn global_search<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    let UiAction::GlobalSearch { query } = action else {
        return Err(mismatch(ActionKind::GlobalSearch));
    };
    Ok(ActionResult::Found(dashboard.global_search(&query)))
}

fn select<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    let UiAction::Select { id } = action else {
        return Err(mismatch(ActionKind::Select));
    };
    Ok(ActionResult::Panel(dashboard.select(&id)))
}

fn clear_selection<M: MapSurface>(dashboard: &mut Dashboard<M>, _action: UiAction) -> Result<ActionResult> {
    dashboard.clear_selection();
    Ok(ActionResult::Panel(None))
}

fn view_route<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    let UiAction::ViewRoute { id } = action else {
        return Err(mismatch(ActionKind::ViewRoute));
    };
    Ok(ActionResult::View(dashboard.view_route(&id)?))
}

fn zoom<M: MapSurface>(dashboard: &mut Dashboard<M>, action: UiAction) -> Result<ActionResult> {
    match action {
        UiAction::ZoomIn => dashboard.zoom_in(),
        UiAction::ZoomOut => dashboard.zoom_out(),
        _ => return Err(mismatch(ActionKind::ZoomIn)),
    };
    Ok(ActionResult::View(Some(dashboard.map().view())))
}

fn recenter<M: MapSurface>(dashboard: &mut Dashboard<M>, _action: UiAction) -> Result<ActionResult> {
    Ok(ActionResult::View(Some(dashboard.recenter())))
}

fn fit_all<M: MapSurface>(dashboard: &mut Dashboard<M>, _action: UiAction) -> Result<ActionResult> {
    Ok(ActionResult::View(dashboard.fit_all()))
}

/// Handler registered under the wrong kind
fn mismatch(expected: ActionKind) -> TrackerError {
    TrackerError::UnhandledAction {
        kind: expected.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneMap;
    use contracts::{DashboardConfig, Entity, Route, Waypoint};

    fn dashboard() -> Dashboard<SceneMap> {
        let mut config = DashboardConfig::default();
        config.routes.push(
            Route::new("r1", "Fort - Nugegoda")
                .with_waypoints(vec![Waypoint::new(6.93, 79.84), Waypoint::new(6.87, 79.89)]),
        );
        let mut dash = Dashboard::new(SceneMap::new(&config.map), &config);
        dash.load_snapshot(vec![
            Entity::new("1")
                .with_label("NB-1234")
                .with_status("running")
                .with_position(6.92, 79.86),
            Entity::new("2")
                .with_label("NC-5678")
                .with_status("idle")
                .with_position(6.80, 79.95),
        ]);
        dash
    }

    #[test]
    fn table_covers_every_kind() {
        let table = ActionTable::<SceneMap>::new();
        let kinds: Vec<_> = table.kinds().collect();
        assert_eq!(kinds, ActionKind::ALL.to_vec());
    }

    #[test]
    fn dispatches_search_and_select() {
        let table = ActionTable::new();
        let mut dash = dashboard();

        let result = table
            .dispatch(&mut dash, UiAction::Search { query: "nc".into() })
            .unwrap();
        assert_eq!(result, ActionResult::Listed(vec!["2".into()]));

        let result = table
            .dispatch(&mut dash, UiAction::Select { id: "2".into() })
            .unwrap();
        assert!(matches!(result, ActionResult::Panel(Some(ref p)) if p.label == "NC-5678"));

        let result = table.dispatch(&mut dash, UiAction::ClearSelection).unwrap();
        assert_eq!(result, ActionResult::Panel(None));
        assert!(dash.selection().focused().is_none());
    }

    #[test]
    fn toggle_filter_reports_unrecognized_status() {
        let table = ActionTable::new();
        let mut dash = dashboard();
        let result = table
            .dispatch(
                &mut dash,
                UiAction::ToggleFilter {
                    status: EntityStatus::from("retired"),
                    enabled: true,
                },
            )
            .unwrap();
        assert_eq!(result, ActionResult::FilterChanged { applied: false });
    }

    #[test]
    fn view_actions_move_the_map() {
        let table = ActionTable::new();
        let mut dash = dashboard();

        let ActionResult::View(Some(view)) = table.dispatch(&mut dash, UiAction::ZoomIn).unwrap() else {
            panic!("expected view");
        };
        assert_eq!(view.zoom, 14);

        let result = table
            .dispatch(&mut dash, UiAction::ViewRoute { id: "r1".into() })
            .unwrap();
        assert!(matches!(result, ActionResult::View(Some(_))));
        assert_eq!(dash.overlays().line_count(), 1);

        assert!(table
            .dispatch(&mut dash, UiAction::ViewRoute { id: "r9".into() })
            .is_err());

        let ActionResult::View(Some(view)) = table.dispatch(&mut dash, UiAction::Recenter).unwrap() else {
            panic!("expected view");
        };
        assert_eq!(view.zoom, 13);

        assert!(matches!(
            table.dispatch(&mut dash, UiAction::FitAll).unwrap(),
            ActionResult::View(Some(_))
        ));
    }

    #[test]
    fn actions_deserialize_from_json() {
        let action: UiAction =
            serde_json::from_str(r#"{"action": "toggle_filter", "status": "idle", "enabled": false}"#)
                .unwrap();
        assert_eq!(
            action,
            UiAction::ToggleFilter {
                status: EntityStatus::Idle,
                enabled: false
            }
        );
        let action: UiAction = serde_json::from_str(r#"{"action": "select", "id": 4}"#).unwrap();
        assert_eq!(action.kind(), ActionKind::Select);
    }
}
