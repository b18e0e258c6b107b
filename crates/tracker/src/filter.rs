//! Filter / selection engine
//!
//! Status flags, label search and the focused entity. All queries read the
//! store and return results in store order.

use contracts::{Entity, EntityId, EntityStatus, FilterConfig, InfoPanel, Route, RouteId};

use crate::store::EntityStore;

/// Label shown for an entity, falling back to its id
pub fn display_label(entity: &Entity) -> &str {
    entity.label.as_deref().unwrap_or(entity.id.as_str())
}

/// Snapshot of the focused entity's details
pub fn info_panel(entity: &Entity) -> InfoPanel {
    InfoPanel {
        id: entity.id.clone(),
        label: display_label(entity).to_string(),
        status: entity.status.clone(),
        speed: entity.speed_or_default(),
        position: entity.position(),
    }
}

/// One flag per recognized status
///
/// An entity is visible iff its status flag is enabled; unset or
/// unrecognized statuses are never visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter {
    flags: FilterConfig,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl StatusFilter {
    pub fn new(flags: FilterConfig) -> Self {
        Self { flags }
    }

    /// Set a status flag; false for an unrecognized status
    pub fn set_status_flag(&mut self, status: &EntityStatus, enabled: bool) -> bool {
        let slot = match status {
            EntityStatus::Running => &mut self.flags.running,
            EntityStatus::Idle => &mut self.flags.idle,
            EntityStatus::Maintenance => &mut self.flags.maintenance,
            EntityStatus::Unrecognized(_) => return false,
        };
        *slot = enabled;
        true
    }

    pub fn is_enabled(&self, status: &EntityStatus) -> bool {
        match status {
            EntityStatus::Running => self.flags.running,
            EntityStatus::Idle => self.flags.idle,
            EntityStatus::Maintenance => self.flags.maintenance,
            EntityStatus::Unrecognized(_) => false,
        }
    }

    pub fn passes(&self, entity: &Entity) -> bool {
        entity
            .status
            .as_ref()
            .is_some_and(|status| self.is_enabled(status))
    }

    pub fn flags(&self) -> [(EntityStatus, bool); 3] {
        self.flags.flags()
    }
}

/// Entities passing the status filter, store order
pub fn visible_entities<'a>(store: &'a EntityStore, filter: &StatusFilter) -> Vec<&'a Entity> {
    store.all().filter(|entity| filter.passes(entity)).collect()
}

/// Case-insensitive label substring search
///
/// A blank query returns every entity. Entities without a label never
/// match a non-blank query.
pub fn search<'a>(store: &'a EntityStore, query: &str) -> Vec<&'a Entity> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return store.all().collect();
    }
    store
        .all()
        .filter(|entity| label_matches(entity, &needle))
        .collect()
}

fn label_matches(entity: &Entity, needle: &str) -> bool {
    entity
        .label
        .as_deref()
        .is_some_and(|label| label.to_lowercase().contains(needle))
}

/// Matches of a global search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalSearchResults {
    pub entities: Vec<EntityId>,
    pub routes: Vec<RouteId>,
}

impl GlobalSearchResults {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.routes.is_empty()
    }
}

/// Search entity labels and route names together
///
/// A blank query yields no results.
pub fn global_search<'a, I>(store: &EntityStore, routes: I, query: &str) -> GlobalSearchResults
where
    I: IntoIterator<Item = &'a Route>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return GlobalSearchResults::default();
    }

    GlobalSearchResults {
        entities: store
            .all()
            .filter(|entity| label_matches(entity, &needle))
            .map(|entity| entity.id.clone())
            .collect(),
        routes: routes
            .into_iter()
            .filter(|route| route.name.to_lowercase().contains(&needle))
            .map(|route| route.id.clone())
            .collect(),
    }
}

/// Focused entity and its info panel
#[derive(Debug, Clone, Default)]
pub struct Selection {
    focused: Option<EntityId>,
    panel: Option<InfoPanel>,
}

impl Selection {
    /// Focus an entity; an unknown id clears focus
    pub fn select(&mut self, store: &EntityStore, id: &str) -> Option<&InfoPanel> {
        match store.get(id) {
            Some(entity) => {
                self.focused = Some(entity.id.clone());
                self.panel = Some(info_panel(entity));
                self.panel.as_ref()
            }
            None => {
                self.clear();
                None
            }
        }
    }

    /// Recompute the panel from the store
    ///
    /// Clears focus if the focused entity is no longer stored.
    pub fn refresh(&mut self, store: &EntityStore) -> Option<&InfoPanel> {
        let id = self.focused.clone()?;
        self.select(store, &id)
    }

    pub fn clear(&mut self) {
        self.focused = None;
        self.panel = None;
    }

    pub fn focused(&self) -> Option<&EntityId> {
        self.focused.as_ref()
    }

    pub fn panel(&self) -> Option<&InfoPanel> {
        self.panel.as_ref()
    }

    pub fn is_focused(&self, id: &str) -> bool {
        self.focused.as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EntityDelta, Position};

    fn fleet() -> EntityStore {
        let mut store = EntityStore::new();
        store.replace_all(vec![
            Entity::new("1").with_label("NB-1234").with_status("running"),
            Entity::new("2").with_label("NC-5678").with_status("idle"),
            Entity::new("3").with_label("nb-9999").with_status("maintenance"),
            Entity::new("4").with_label("WP-0001").with_status("retired"),
            Entity::new("5"),
        ]);
        store
    }

    fn ids(entities: &[&Entity]) -> Vec<String> {
        entities.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn all_flags_on_shows_recognized_statuses() {
        let store = fleet();
        let visible = visible_entities(&store, &StatusFilter::default());
        assert_eq!(ids(&visible), vec!["1", "2", "3"]);
    }

    #[test]
    fn all_flags_off_shows_nothing() {
        let store = fleet();
        let mut filter = StatusFilter::default();
        for status in EntityStatus::KNOWN {
            assert!(filter.set_status_flag(&status, false));
        }
        assert!(visible_entities(&store, &filter).is_empty());
        assert!(!filter.set_status_flag(&EntityStatus::from("retired"), true));
    }

    #[test]
    fn single_flag_filters() {
        let store = fleet();
        let mut filter = StatusFilter::default();
        filter.set_status_flag(&EntityStatus::Running, false);
        filter.set_status_flag(&EntityStatus::Maintenance, false);
        assert_eq!(ids(&visible_entities(&store, &filter)), vec!["2"]);
    }

    #[test]
    fn blank_search_returns_everything() {
        let store = fleet();
        assert_eq!(search(&store, "").len(), store.len());
        assert_eq!(search(&store, "   ").len(), store.len());
    }

    #[test]
    fn search_is_case_insensitive_and_idempotent() {
        let store = fleet();
        let first = ids(&search(&store, "NB"));
        assert_eq!(first, vec!["1", "3"]);
        assert_eq!(ids(&search(&store, "NB")), first);
        assert_eq!(ids(&search(&store, "nb-9")), vec!["3"]);
    }

    #[test]
    fn global_search_covers_routes() {
        let store = fleet();
        let routes = vec![
            Route::new("r1", "Fort - Nugegoda"),
            Route::new("r2", "Kandy Express"),
        ];
        let results = global_search(&store, &routes, "ND");
        assert!(results.entities.is_empty());
        assert_eq!(results.routes, vec![RouteId::from("r2")]);

        let results = global_search(&store, &routes, "nb");
        assert_eq!(results.entities.len(), 2);

        assert!(global_search(&store, &routes, " ").is_empty());
    }

    #[test]
    fn select_unknown_clears_focus() {
        let store = fleet();
        let mut selection = Selection::default();
        assert!(selection.select(&store, "2").is_some());
        assert!(selection.is_focused("2"));

        assert!(selection.select(&store, "missing").is_none());
        assert!(selection.focused().is_none());
        assert!(selection.panel().is_none());
    }

    #[test]
    fn refresh_reflects_new_speed() {
        let mut store = fleet();
        let mut selection = Selection::default();
        selection.select(&store, "1");

        store.apply_update(&EntityDelta::new("1").speed(42.0).position(6.9, 79.8));
        let panel = selection.refresh(&store).unwrap();
        assert_eq!(panel.speed, 42.0);
        assert_eq!(panel.position, Some(Position::new(6.9, 79.8)));
    }

    #[test]
    fn label_falls_back_to_id() {
        let entity = Entity::new("9");
        assert_eq!(display_label(&entity), "9");
        assert_eq!(info_panel(&entity).speed, 0.0);
    }
}
