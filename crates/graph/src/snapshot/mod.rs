//! Graph snapshots
//!
//! Provides:
//! - [`GraphSnapshot`]: catalog, alias index and adjacency cache of one build
//! - [`SnapshotBuilder`]: bulk store reads with timeout and retry, then a
//!   single O(V+E) indexing pass
//! - [`SnapshotHandle`]: the active snapshot, replaced by atomic swap

mod handle;

pub use handle::SnapshotHandle;

use crate::adjacency::{AdjacencyBuilder, AdjacencyCache};
use crate::catalog::{load_curated_aliases, AliasIndex, AliasOptions, CuratedAlias, EntityCatalog};
use crate::model::RelationType;
use crate::store::{BackingStore, EntityRecord, RelationFilter, RelationRecord};
use backoff::{future::retry, ExponentialBackoffBuilder};
use chrono::{DateTime, Utc};
use hopgraph_common::config::{ResolverSettings, SnapshotSettings};
use hopgraph_common::errors::{AppError, Result};
use hopgraph_common::metrics;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Counters describing one build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub entities: usize,
    pub edges: usize,
    pub relation_types: usize,
    pub alias_keys: usize,
    pub ambiguous_aliases: usize,
    pub duplicate_edges: usize,
    pub dangling_edges_skipped: usize,
    pub duration_ms: u64,
}

/// Immutable point-in-time view of the knowledge graph
#[derive(Debug)]
pub struct GraphSnapshot {
    id: Uuid,
    built_at: DateTime<Utc>,
    catalog: EntityCatalog,
    aliases: AliasIndex,
    adjacency: AdjacencyCache,
    stats: BuildStats,
}

impl GraphSnapshot {
    pub fn new(catalog: EntityCatalog, aliases: AliasIndex, adjacency: AdjacencyCache, stats: BuildStats) -> Self {
        Self {
            id: Uuid::now_v7(),
            built_at: Utc::now(),
            catalog,
            aliases,
            adjacency,
            stats,
        }
    }

    /// A snapshot with no entities or edges
    pub fn empty() -> Self {
        Self::new(
            EntityCatalog::default(),
            AliasIndex::default(),
            AdjacencyCache::default(),
            BuildStats::default(),
        )
    }

    /// Generation id (UUID v7, ordered by build time)
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    pub fn adjacency(&self) -> &AdjacencyCache {
        &self.adjacency
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

/// Snapshot build configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Per-attempt timeout for one bulk read
    pub load_timeout: Duration,
    /// Total retry budget per bulk read
    pub max_retry_elapsed: Duration,
    /// First backoff interval
    pub initial_retry_interval: Duration,
    /// Relation-type allow-list
    pub relation_filter: RelationFilter,
    /// Relation types indexed in both directions
    pub symmetric: Vec<RelationType>,
    /// Skip dangling edges instead of failing the build
    pub skip_dangling_edges: bool,
    pub alias_options: AliasOptions,
    pub curated_aliases: Vec<CuratedAlias>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(60),
            max_retry_elapsed: Duration::from_secs(120),
            initial_retry_interval: Duration::from_millis(500),
            relation_filter: RelationFilter::all(),
            symmetric: Vec::new(),
            skip_dangling_edges: false,
            alias_options: AliasOptions::default(),
            curated_aliases: Vec::new(),
        }
    }
}

impl SnapshotConfig {
    /// Build from application settings, loading the curated alias table
    pub fn from_settings(snapshot: &SnapshotSettings, resolver: &ResolverSettings) -> Result<Self> {
        let curated_aliases = match resolver.alias_file {
            Some(ref path) => load_curated_aliases(path)?,
            None => Vec::new(),
        };

        Ok(Self {
            load_timeout: Duration::from_secs(snapshot.load_timeout_secs),
            max_retry_elapsed: Duration::from_secs(snapshot.max_retry_elapsed_secs),
            initial_retry_interval: Duration::from_millis(snapshot.initial_retry_interval_ms),
            relation_filter: RelationFilter::allow_list(&snapshot.relation_allow_list),
            symmetric: snapshot.symmetric_relations.iter().map(|r| RelationType::new(r)).collect(),
            skip_dangling_edges: snapshot.skip_dangling_edges,
            alias_options: AliasOptions::from(resolver),
            curated_aliases,
        })
    }
}

/// Builds snapshots from a backing store
pub struct SnapshotBuilder {
    store: Arc<dyn BackingStore>,
    config: SnapshotConfig,
}

impl SnapshotBuilder {
    pub fn new(store: Arc<dyn BackingStore>, config: SnapshotConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Read the store and build a new snapshot.
    ///
    /// Transient store failures are retried with exponential backoff; once
    /// the budget is spent the build fails with `BackingStoreUnavailable`.
    #[instrument(skip(self), fields(store = %self.store.name()))]
    pub async fn build(&self) -> Result<GraphSnapshot> {
        let start = Instant::now();
        let result = self.read_and_assemble().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(snapshot) => {
                let stats = snapshot.stats();
                metrics::record_snapshot_build(
                    elapsed.as_secs_f64(),
                    true,
                    stats.entities,
                    stats.edges,
                    stats.ambiguous_aliases,
                );
                info!(
                    snapshot_id = %snapshot.id(),
                    entities = stats.entities,
                    edges = stats.edges,
                    relation_types = stats.relation_types,
                    alias_keys = stats.alias_keys,
                    ambiguous_aliases = stats.ambiguous_aliases,
                    duration_ms = elapsed.as_millis() as u64,
                    "Snapshot built"
                );
            }
            Err(e) => {
                metrics::record_snapshot_build(elapsed.as_secs_f64(), false, 0, 0, 0);
                error!(error = %e, code = ?e.code(), "Snapshot build failed");
            }
        }

        result
    }

    async fn read_and_assemble(&self) -> Result<GraphSnapshot> {
        let store = &*self.store;
        let filter = &self.config.relation_filter;

        let entities = self.read_with_retry("entities", || store.load_entities()).await?;
        let relations = self
            .read_with_retry("relations", || store.load_relations(filter))
            .await?;

        self.assemble(entities, relations)
    }

    async fn read_with_retry<T, F, Fut>(&self, what: &'static str, read: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.config.load_timeout;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_retry_interval)
            .with_max_elapsed_time(Some(self.config.max_retry_elapsed))
            .build();

        let attempts = AtomicU32::new(0);
        let (read, attempts_ref) = (&read, &attempts);

        let result = retry(policy, move || async move {
            let attempt = attempts_ref.fetch_add(1, Ordering::Relaxed) + 1;
            match tokio::time::timeout(timeout, read()).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) if e.is_transient() => {
                    warn!(what, attempt, error = %e, "Store read failed, retrying");
                    Err(backoff::Error::transient(e))
                }
                Ok(Err(e)) => Err(backoff::Error::permanent(e)),
                Err(_) => {
                    let e = AppError::BackingStoreTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    };
                    warn!(what, attempt, error = %e, "Store read timed out, retrying");
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .await;

        result.map_err(|e| {
            if e.is_transient() {
                AppError::BackingStoreUnavailable {
                    message: format!(
                        "reading {} failed after {} attempts: {}",
                        what,
                        attempts.load(Ordering::Relaxed),
                        e
                    ),
                }
            } else {
                e
            }
        })
    }

    /// Index store records into a snapshot
    pub fn assemble(&self, entities: Vec<EntityRecord>, relations: Vec<RelationRecord>) -> Result<GraphSnapshot> {
        let start = Instant::now();

        let entities = entities
            .into_iter()
            .map(EntityRecord::into_entity)
            .collect::<Result<Vec<_>>>()?;
        let catalog = EntityCatalog::new(entities)?;

        let mut stats = BuildStats::default();
        let mut adjacency = AdjacencyBuilder::new(self.config.symmetric.iter().cloned());

        for record in &relations {
            let edge = record.to_edge();
            if edge.relation.is_empty() || !self.config.relation_filter.admits(&edge.relation) {
                continue;
            }

            if !catalog.contains(edge.source) || !catalog.contains(edge.target) {
                if !self.config.skip_dangling_edges {
                    return Err(AppError::GraphIntegrity {
                        message: format!(
                            "edge {} -{}-> {} references an entity missing from the catalog",
                            edge.source, edge.relation, edge.target
                        ),
                    });
                }
                stats.dangling_edges_skipped += 1;
                continue;
            }

            if !adjacency.add_edge(&edge) {
                stats.duplicate_edges += 1;
            }
        }

        if stats.dangling_edges_skipped > 0 {
            warn!(count = stats.dangling_edges_skipped, "Skipped dangling edges");
            metrics::record_dangling_edges(stats.dangling_edges_skipped);
        }

        let aliases = AliasIndex::build(&catalog, &self.config.curated_aliases, &self.config.alias_options);
        let adjacency = adjacency.build();

        for (key, ids) in aliases.ambiguous_keys() {
            tracing::debug!(alias = key, candidates = ?ids, "Ambiguous alias");
        }

        stats.entities = catalog.len();
        stats.edges = adjacency.edge_count();
        stats.relation_types = adjacency.relation_types().count();
        stats.alias_keys = aliases.len();
        stats.ambiguous_aliases = aliases.ambiguous_keys().count();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        Ok(GraphSnapshot::new(catalog, aliases, adjacency, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Resolution;
    use crate::model::EntityCategory;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn fast_config() -> SnapshotConfig {
        SnapshotConfig {
            load_timeout: Duration::from_millis(200),
            max_retry_elapsed: Duration::from_millis(300),
            initial_retry_interval: Duration::from_millis(10),
            symmetric: vec![RelationType::new("TEAMMATE")],
            ..SnapshotConfig::default()
        }
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::default()
            .with_entity(1, EntityCategory::Person, "P1")
            .with_entity(2, EntityCategory::Person, "P2")
            .with_entity(10, EntityCategory::Organization, "O1")
            .with_relation(1, "AFFILIATED_WITH", 10)
            .with_relation(2, "AFFILIATED_WITH", 10)
            .with_relation(1, "TEAMMATE", 2)
    }

    /// Fails the first `failures` entity reads
    struct FlakyStore {
        inner: MemoryStore,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BackingStore for FlakyStore {
        async fn load_entities(&self) -> Result<Vec<EntityRecord>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(AppError::BackingStoreUnavailable {
                    message: "connection refused".into(),
                });
            }
            self.inner.load_entities().await
        }

        async fn load_relations(&self, filter: &RelationFilter) -> Result<Vec<RelationRecord>> {
            self.inner.load_relations(filter).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_build_snapshot() {
        let builder = SnapshotBuilder::new(Arc::new(sample_store()), fast_config());
        let snapshot = builder.build().await.unwrap();

        assert_eq!(snapshot.stats().entities, 3);
        assert_eq!(snapshot.stats().edges, 3);
        assert_eq!(snapshot.aliases().resolve("p1"), Resolution::Resolved(1));
        let teammate = RelationType::new("TEAMMATE");
        assert!(snapshot.adjacency().has_edge(2, &teammate, 1));
    }

    #[tokio::test]
    async fn test_relation_allow_list() {
        let config = SnapshotConfig {
            relation_filter: RelationFilter::allow_list(["AFFILIATED_WITH"]),
            ..fast_config()
        };
        let snapshot = SnapshotBuilder::new(Arc::new(sample_store()), config)
            .build()
            .await
            .unwrap();

        assert_eq!(snapshot.stats().edges, 2);
        assert_eq!(snapshot.stats().relation_types, 1);
    }

    #[test]
    fn test_dangling_edge_fails_build() {
        let builder = SnapshotBuilder::new(Arc::new(MemoryStore::default()), fast_config());
        let entities = vec![EntityRecord::new(1, EntityCategory::Person, "P1")];
        let relations = vec![RelationRecord::new(1, "AFFILIATED_WITH", 99)];

        let err = builder.assemble(entities, relations).unwrap_err();
        assert!(matches!(err, AppError::GraphIntegrity { .. }));
    }

    #[test]
    fn test_dangling_edge_skipped_when_configured() {
        let config = SnapshotConfig {
            skip_dangling_edges: true,
            ..fast_config()
        };
        let builder = SnapshotBuilder::new(Arc::new(MemoryStore::default()), config);
        let entities = vec![
            EntityRecord::new(1, EntityCategory::Person, "P1"),
            EntityRecord::new(2, EntityCategory::Organization, "O1"),
        ];
        let relations = vec![
            RelationRecord::new(1, "AFFILIATED_WITH", 2),
            RelationRecord::new(1, "AFFILIATED_WITH", 99),
        ];

        let snapshot = builder.assemble(entities, relations).unwrap();
        assert_eq!(snapshot.stats().edges, 1);
        assert_eq!(snapshot.stats().dangling_edges_skipped, 1);
    }

    #[test]
    fn test_blocking_build_via_tokio_test() {
        let builder = SnapshotBuilder::new(Arc::new(sample_store()), fast_config());
        let snapshot = tokio_test::block_on(builder.build()).unwrap();
        assert_eq!(snapshot.catalog().name(10), Some("O1"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = FlakyStore {
            inner: sample_store(),
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let config = SnapshotConfig {
            max_retry_elapsed: Duration::from_secs(5),
            ..fast_config()
        };
        let snapshot = SnapshotBuilder::new(Arc::new(store), config).build().await.unwrap();
        assert_eq!(snapshot.stats().entities, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_unavailable() {
        let store = FlakyStore {
            inner: sample_store(),
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let err = SnapshotBuilder::new(Arc::new(store), fast_config())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BackingStoreUnavailable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_config_from_settings() {
        let snapshot = SnapshotSettings {
            relation_allow_list: vec!["born in".into()],
            ..SnapshotSettings::default()
        };
        let config = SnapshotConfig::from_settings(&snapshot, &ResolverSettings::default()).unwrap();
        assert_eq!(config.relation_filter.names().unwrap(), vec!["BORN_IN"]);
        assert!(config.symmetric.contains(&RelationType::new("TEAMMATE")));
        assert!(config.curated_aliases.is_empty());
    }
}
