//! Entity store - authoritative id -> entity mapping
//!
//! Insertion ordered: snapshot order first, upserts appended.

use contracts::{Entity, EntityDelta, EntityId};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, warn};

/// Result of installing a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Entities installed
    pub installed: usize,
    /// Records that repeated an earlier id
    pub duplicates: usize,
}

/// Entity store
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: IndexMap<EntityId, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard prior state and install the snapshot
    ///
    /// A repeated id replaces the earlier record but keeps its position in
    /// store order.
    pub fn replace_all(&mut self, entities: Vec<Entity>) -> ReplaceSummary {
        self.entities.clear();
        self.entities.reserve(entities.len());

        let mut duplicates = 0;
        for entity in entities {
            let id = entity.id.clone();
            if self.entities.insert(id.clone(), entity).is_some() {
                duplicates += 1;
                warn!(entity_id = %id, "duplicate id in snapshot, later record wins");
            }
        }

        ReplaceSummary {
            installed: self.entities.len(),
            duplicates,
        }
    }

    /// Merge a partial update; absent fields stay untouched
    ///
    /// An unknown id creates a new entity holding only the supplied fields.
    /// Returns true when the entity was created by this call.
    pub fn apply_update(&mut self, delta: &EntityDelta) -> bool {
        match self.entities.entry(delta.entity_id.clone()) {
            Entry::Occupied(mut slot) => {
                merge(slot.get_mut(), delta);
                false
            }
            Entry::Vacant(slot) => {
                debug!(entity_id = %delta.entity_id, "upserting entity first seen in stream");
                let mut entity = Entity::new(delta.entity_id.clone());
                merge(&mut entity, delta);
                slot.insert(entity);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// All entities in store order
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn merge(entity: &mut Entity, delta: &EntityDelta) {
    if let Some(lat) = delta.lat {
        entity.lat = Some(lat);
    }
    if let Some(lng) = delta.lng {
        entity.lng = Some(lng);
    }
    if let Some(status) = &delta.status {
        entity.status = Some(status.clone());
    }
    if let Some(speed) = delta.speed {
        entity.speed = Some(speed);
    }
}
