//! Entity catalog and alias resolution
//!
//! Provides:
//! - The canonical entity registry of a snapshot
//! - Diacritic-insensitive key folding
//! - The alias index used to resolve surface forms to entities

pub mod alias;
pub mod normalize;

pub use alias::{load_curated_aliases, AliasIndex, AliasOptions, AliasTier, CuratedAlias, Resolution};
pub use normalize::{fold_key, token_count, token_spans};

use crate::model::{Entity, EntityCategory, EntityId};
use hopgraph_common::errors::{AppError, Result};
use std::collections::HashMap;

/// Canonical entity registry
#[derive(Debug, Default)]
pub struct EntityCatalog {
    entities: HashMap<EntityId, Entity>,
    /// Folded canonical name -> entity ids (sorted)
    by_name: HashMap<String, Vec<EntityId>>,
}

impl EntityCatalog {
    /// Build the catalog, rejecting duplicate ids
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut catalog = Self::default();

        for entity in entities {
            let key = fold_key(&entity.name);
            let id = entity.id;
            if catalog.entities.insert(id, entity).is_some() {
                return Err(AppError::GraphIntegrity {
                    message: format!("duplicate entity id {}", id),
                });
            }
            if !key.is_empty() {
                let ids = catalog.by_name.entry(key).or_default();
                ids.push(id);
                ids.sort_unstable();
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|e| e.name.as_str())
    }

    pub fn category(&self, id: EntityId) -> Option<EntityCategory> {
        self.entities.get(&id).map(|e| e.category)
    }

    /// Entities whose canonical name folds to the same key as `name`
    pub fn ids_by_name(&self, name: &str) -> &[EntityId] {
        self.by_name
            .get(&fold_key(name))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = EntityCatalog::new(vec![
            Entity::new(1, EntityCategory::Person, "Nguyễn Quang Hải"),
            Entity::new(2, EntityCategory::Organization, "Hà Nội"),
            Entity::new(3, EntityCategory::Place, "Hà Nội"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(1), Some("Nguyễn Quang Hải"));
        assert_eq!(catalog.category(3), Some(EntityCategory::Place));
        assert_eq!(catalog.ids_by_name("ha noi"), &[2, 3]);
        assert!(catalog.ids_by_name("Hải Phòng").is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = EntityCatalog::new(vec![
            Entity::new(7, EntityCategory::Person, "A"),
            Entity::new(7, EntityCategory::Person, "B"),
        ]);
        assert!(matches!(result, Err(AppError::GraphIntegrity { .. })));
    }
}
