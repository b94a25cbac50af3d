use super::{GraphSnapshot, SnapshotBuilder};
use hopgraph_common::errors::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Holder of the active snapshot.
///
/// Readers clone the inner `Arc` and keep that generation for the whole
/// request; a refresh builds the next generation off to the side and
/// publishes it with a single pointer swap.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<GraphSnapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The active snapshot
    pub fn current(&self) -> Arc<GraphSnapshot> {
        self.current.read().clone()
    }

    /// Publish a snapshot, returning the one it replaced
    pub fn swap(&self, snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
        let next = Arc::new(snapshot);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Rebuild and publish. On failure the active snapshot stays in place.
    pub async fn refresh(&self, builder: &SnapshotBuilder) -> Result<Arc<GraphSnapshot>> {
        let snapshot = builder.build().await?;
        let previous = self.swap(snapshot);
        let current = self.current();
        info!(
            previous = %previous.id(),
            current = %current.id(),
            "Snapshot swapped"
        );
        Ok(current)
    }

    /// Rebuild every `interval` until the task is aborted
    pub fn spawn_refresh(self: &Arc<Self>, builder: Arc<SnapshotBuilder>, interval: Duration) -> JoinHandle<()> {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; the initial build already ran
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = handle.refresh(&builder).await {
                    error!(
                        error = %e,
                        fatal = e.is_fatal(),
                        active = %handle.current().id(),
                        "Snapshot refresh failed, keeping active snapshot"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityCategory;
    use crate::snapshot::SnapshotConfig;
    use crate::store::{BackingStore, EntityRecord, MemoryStore, RelationFilter, RelationRecord};
    use async_trait::async_trait;
    use hopgraph_common::errors::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that can be switched off
    struct SwitchStore {
        inner: MemoryStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl BackingStore for SwitchStore {
        async fn load_entities(&self) -> Result<Vec<EntityRecord>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(AppError::BackingStoreUnavailable {
                    message: "down".into(),
                });
            }
            self.inner.load_entities().await
        }

        async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>> {
            self.inner.load_relations(filter).await
        }

        fn name(&self) -> &str {
            "switch"
        }
    }

    fn config() -> SnapshotConfig {
        SnapshotConfig {
            load_timeout: Duration::from_millis(100),
            max_retry_elapsed: Duration::from_millis(100),
            initial_retry_interval: Duration::from_millis(10),
            ..SnapshotConfig::default()
        }
    }

    fn store() -> Arc<SwitchStore> {
        Arc::new(SwitchStore {
            inner: MemoryStore::default()
                .with_entity(1, EntityCategory::Person, "P1")
                .with_entity(2, EntityCategory::Organization, "O1")
                .with_relation(1, "AFFILIATED_WITH", 2),
            down: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_refresh_swaps_snapshot() {
        let store = store();
        let builder = SnapshotBuilder::new(store.clone(), config());
        let handle = SnapshotHandle::new(GraphSnapshot::empty());

        let before = handle.current();
        let after = handle.refresh(&builder).await.unwrap();

        assert_ne!(before.id(), after.id());
        assert_eq!(handle.current().id(), after.id());
        assert_eq!(after.stats().entities, 2);
        // The old generation stays readable for whoever still holds it
        assert!(before.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_active_snapshot() {
        let store = store();
        let builder = SnapshotBuilder::new(store.clone(), config());
        let handle = SnapshotHandle::new(builder.build().await.unwrap());
        let active = handle.current().id();

        store.down.store(true, Ordering::SeqCst);
        let err = handle.refresh(&builder).await.unwrap_err();

        assert!(matches!(err, AppError::BackingStoreUnavailable { .. }));
        assert_eq!(handle.current().id(), active);
    }

    #[tokio::test]
    async fn test_periodic_refresh() {
        let store = store();
        let builder = Arc::new(SnapshotBuilder::new(store.clone(), config()));
        let handle = Arc::new(SnapshotHandle::new(GraphSnapshot::empty()));
        let initial = handle.current().id();

        let task = handle.spawn_refresh(builder, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        task.abort();

        assert_ne!(handle.current().id(), initial);
        assert_eq!(handle.current().stats().edges, 1);
    }
}
