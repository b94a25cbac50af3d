use super::{BackingStore, EntityRecord, RelationFilter, RelationRecord};
use crate::model::{EntityCategory, EntityId, RelationType};
use async_trait::async_trait;
use hopgraph_common::errors::Result;

/// In-process store, used for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entities: Vec<EntityRecord>,
    relations: Vec<RelationRecord>,
}

impl MemoryStore {
    pub fn new(entities: Vec<EntityRecord>, relations: Vec<RelationRecord>) -> Self {
        Self { entities, relations }
    }

    pub fn with_entity(mut self, id: EntityId, category: EntityCategory, name: &str) -> Self {
        self.entities.push(EntityRecord::new(id, category, name));
        self
    }

    pub fn with_relation(mut self, source: EntityId, relation: &str, target: EntityId) -> Self {
        self.relations.push(RelationRecord::new(source, relation, target));
        self
    }

    pub fn with_record(mut self, record: RelationRecord) -> Self {
        self.relations.push(record);
        self
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn load_entities(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.entities.clone())
    }

    async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>> {
        Ok(self
            .relations
            .iter()
            .filter(|r| filter.admits(&RelationType::new(&r.relation_type)))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_filters_relations() {
        let store = MemoryStore::default()
            .with_entity(1, EntityCategory::Person, "P1")
            .with_entity(2, EntityCategory::Organization, "O1")
            .with_relation(1, "AFFILIATED_WITH", 2)
            .with_relation(1, "BORN_IN", 2);

        assert_eq!(store.load_entities().await.unwrap().len(), 2);
        let filter = RelationFilter::allow_list(["AFFILIATED_WITH"]);
        let relations = store.load_relations(&filter).await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relation_type, "AFFILIATED_WITH");
    }
}
