//! HopGraph knowledge graph
//!
//! In-memory view of a closed-domain knowledge graph:
//! - Entity catalog and alias resolution
//! - Typed adjacency cache with O(1) edge membership
//! - Backing store readers (Postgres, JSON export, in-process)
//! - Immutable snapshots with atomic refresh

pub mod adjacency;
pub mod catalog;
pub mod model;
pub mod snapshot;
pub mod store;

pub use adjacency::{AdjacencyBuilder, AdjacencyCache};
pub use catalog::{fold_key, AliasIndex, EntityCatalog, Resolution};
pub use model::{relations, EdgeAttributes, Entity, EntityCategory, EntityId, RelationEdge, RelationType};
pub use snapshot::{BuildStats, GraphSnapshot, SnapshotBuilder, SnapshotConfig, SnapshotHandle};
pub use store::{BackingStore, FileStore, MemoryStore, RelationFilter, SqlStore};
