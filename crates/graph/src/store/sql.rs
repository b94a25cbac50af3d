use super::{BackingStore, EntityRecord, RelationFilter, RelationRecord};
use async_trait::async_trait;
use hopgraph_common::db::models::{KgEntityEntity, KgRelationColumn, KgRelationEntity};
use hopgraph_common::db::DbPool;
use hopgraph_common::errors::Result;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

/// Postgres-backed store reading `kg_entities` / `kg_relations`
#[derive(Clone)]
pub struct SqlStore {
    db: DbPool,
}

impl SqlStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BackingStore for SqlStore {
    async fn load_entities(&self) -> Result<Vec<EntityRecord>> {
        let rows = KgEntityEntity::find().all(self.db.read()).await?;
        debug!(count = rows.len(), "Loaded entity rows");

        Ok(rows
            .into_iter()
            .map(|row| EntityRecord {
                id: row.id,
                category: row.category,
                name: row.name,
                properties: row.properties,
            })
            .collect())
    }

    async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>> {
        let mut query = KgRelationEntity::find().order_by_asc(KgRelationColumn::Id);
        if let Some(names) = filter.names() {
            query = query.filter(KgRelationColumn::RelationType.is_in(names));
        }

        let rows = query.all(self.db.read()).await?;
        debug!(count = rows.len(), "Loaded relation rows");

        Ok(rows
            .into_iter()
            .map(|row| RelationRecord {
                source_id: row.source_id,
                relation_type: row.relation_type,
                target_id: row.target_id,
                from_period: row.from_period,
                to_period: row.to_period,
                properties: row.properties,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
