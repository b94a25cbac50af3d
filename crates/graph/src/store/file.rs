use super::{BackingStore, EntityRecord, RelationFilter, RelationRecord};
use crate::model::RelationType;
use async_trait::async_trait;
use hopgraph_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON export layout: `{"entities": [...], "relations": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphExport {
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
}

/// Store reading a JSON export produced by the importer
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    name: String,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }

    async fn read_export(&self) -> Result<GraphExport> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::BackingStoreUnavailable {
                message: format!("Failed to read {}: {}", self.path.display(), e),
            })?;
        let export: GraphExport = serde_json::from_str(&raw)?;
        debug!(
            path = %self.path.display(),
            entities = export.entities.len(),
            relations = export.relations.len(),
            "Read graph export"
        );
        Ok(export)
    }
}

#[async_trait]
impl BackingStore for FileStore {
    async fn load_entities(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.read_export().await?.entities)
    }

    async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>> {
        let mut relations = self.read_export().await?.relations;
        relations.retain(|r| filter.admits(&RelationType::new(&r.relation_type)));
        Ok(relations)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("hopgraph-export-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reads_export() {
        let path = temp_path();
        let json = r#"{
            "entities": [
                {"id": 1, "category": "player", "name": "Nguyễn Quang Hải"},
                {"id": 2, "category": "club", "name": "Hà Nội", "properties": {"founded": 2006}}
            ],
            "relations": [
                {"source_id": 1, "relation_type": "AFFILIATED_WITH", "target_id": 2, "from_period": "2016"},
                {"source_id": 1, "relation_type": "BORN_IN", "target_id": 2}
            ]
        }"#;
        tokio::fs::write(&path, json).await.unwrap();

        let store = FileStore::new(&path);
        let entities = store.load_entities().await.unwrap();
        assert_eq!(entities.len(), 2);

        let relations = store
            .load_relations(&RelationFilter::allow_list(["affiliated with"]))
            .await
            .unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].from_period.as_deref(), Some("2016"));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let store = FileStore::new(temp_path());
        let err = store.load_entities().await.unwrap_err();
        assert!(matches!(err, AppError::BackingStoreUnavailable { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_export_is_permanent() {
        let path = temp_path();
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = FileStore::new(&path).load_entities().await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
        assert!(!err.is_transient());

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
