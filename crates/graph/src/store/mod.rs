//! Backing store read contract
//!
//! The snapshot builder consumes a store once per build through two bulk
//! reads. Implementations:
//! - [`SqlStore`]: Postgres tables via SeaORM
//! - [`FileStore`]: JSON export on disk
//! - [`MemoryStore`]: in-process records

mod file;
mod memory;
mod sql;

pub use file::{FileStore, GraphExport};
pub use memory::MemoryStore;
pub use sql::SqlStore;

use crate::model::{EdgeAttributes, Entity, EntityCategory, EntityId, RelationEdge, RelationType};
use async_trait::async_trait;
use hopgraph_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Entity row as read from a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

impl EntityRecord {
    pub fn new(id: EntityId, category: EntityCategory, name: &str) -> Self {
        Self {
            id,
            category: category.as_str().to_string(),
            name: name.to_string(),
            properties: None,
        }
    }

    /// Validate and convert into a catalog entity
    pub fn into_entity(self) -> Result<Entity> {
        let category: EntityCategory = self.category.parse()?;
        let properties = match self.properties {
            None | Some(serde_json::Value::Null) => serde_json::Map::new(),
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                return Err(AppError::InvalidFormat {
                    message: format!("entity {} properties must be an object, got {}", self.id, other),
                })
            }
        };
        Ok(Entity {
            id: self.id,
            category,
            name: self.name,
            properties,
        })
    }
}

/// Relation row as read from a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub source_id: EntityId,
    pub relation_type: String,
    pub target_id: EntityId,
    #[serde(default)]
    pub from_period: Option<String>,
    #[serde(default)]
    pub to_period: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

impl RelationRecord {
    pub fn new(source_id: EntityId, relation_type: &str, target_id: EntityId) -> Self {
        Self {
            source_id,
            relation_type: relation_type.to_string(),
            target_id,
            from_period: None,
            to_period: None,
            properties: None,
        }
    }

    pub fn to_edge(&self) -> RelationEdge {
        RelationEdge {
            source: self.source_id,
            relation: RelationType::new(&self.relation_type),
            target: self.target_id,
            attributes: EdgeAttributes {
                from_period: self.from_period.clone(),
                to_period: self.to_period.clone(),
            },
        }
    }
}

/// Relation-type allow-list applied to the bulk relation read
#[derive(Debug, Clone, Default)]
pub struct RelationFilter {
    allow: Option<HashSet<RelationType>>,
}

impl RelationFilter {
    /// Admit every relation type
    pub fn all() -> Self {
        Self::default()
    }

    /// Admit only the listed types; an empty list admits everything
    pub fn allow_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow: HashSet<RelationType> = names
            .into_iter()
            .map(|n| RelationType::new(n.as_ref()))
            .filter(|r| !r.is_empty())
            .collect();
        Self {
            allow: (!allow.is_empty()).then_some(allow),
        }
    }

    pub fn admits(&self, relation: &RelationType) -> bool {
        self.allow.as_ref().map_or(true, |allow| allow.contains(relation))
    }

    /// Allowed type names, sorted, or `None` when unrestricted
    pub fn names(&self) -> Option<Vec<String>> {
        self.allow.as_ref().map(|allow| {
            let mut names: Vec<String> = allow.iter().map(|r| r.as_str().to_string()).collect();
            names.sort();
            names
        })
    }
}

/// Bulk read access to the graph's backing store
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Every entity in the store
    async fn load_entities(&self) -> Result<Vec<EntityRecord>>;

    /// Every relation admitted by `filter`
    async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>>;

    /// Store name for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_into_entity() {
        let record = EntityRecord {
            id: 3,
            category: "Club".into(),
            name: "Hoàng Anh Gia Lai".into(),
            properties: Some(json!({"founded": 2001})),
        };
        let entity = record.into_entity().unwrap();
        assert_eq!(entity.category, EntityCategory::Organization);
        assert_eq!(entity.property("founded"), Some(&json!(2001)));
    }

    #[test]
    fn test_record_rejects_bad_properties() {
        let mut record = EntityRecord::new(1, EntityCategory::Person, "A");
        record.properties = Some(json!([1, 2]));
        assert!(matches!(record.into_entity(), Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn test_relation_filter() {
        let all = RelationFilter::all();
        assert!(all.admits(&RelationType::new("ANYTHING")));
        assert!(all.names().is_none());

        let filter = RelationFilter::allow_list(["born in", "AFFILIATED_WITH"]);
        assert!(filter.admits(&RelationType::new("BORN_IN")));
        assert!(!filter.admits(&RelationType::new("COACHED")));
        assert_eq!(filter.names().unwrap(), vec!["AFFILIATED_WITH", "BORN_IN"]);

        assert!(RelationFilter::allow_list(Vec::<String>::new()).names().is_none());
    }

    #[test]
    fn test_relation_record_to_edge() {
        let mut record = RelationRecord::new(1, "played for", 2);
        record.from_period = Some("2016".into());
        let edge = record.to_edge();
        assert_eq!(edge.relation.as_str(), "PLAYED_FOR");
        assert_eq!(edge.attributes.from_period.as_deref(), Some("2016"));
    }
}
