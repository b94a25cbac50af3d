//! Adjacency cache
//!
//! Provides the in-memory typed edge index that every traversal runs
//! against:
//! - Per relation type, `entity -> set<entity>` (outgoing) and the reverse
//!   `entity -> set<entity>` (incoming)
//! - Symmetric relation types indexed in both directions
//! - Temporal edge attributes for evidence reporting
//!
//! The cache is immutable once built. A refresh builds a new one.

use crate::model::{EdgeAttributes, EntityId, RelationEdge, RelationType};
use std::collections::{HashMap, HashSet};

type NeighborMap = HashMap<EntityId, HashSet<EntityId>>;

/// Read-only typed adjacency index
#[derive(Debug, Default)]
pub struct AdjacencyCache {
    /// relation -> source -> targets
    outgoing: HashMap<RelationType, NeighborMap>,

    /// relation -> target -> sources
    incoming: HashMap<RelationType, NeighborMap>,

    /// Relation types indexed in both directions
    symmetric: HashSet<RelationType>,

    /// Attributes of edges that carry any, keyed as stored
    attributes: HashMap<(EntityId, RelationType, EntityId), EdgeAttributes>,

    /// Distinct edges read from the store
    edge_count: usize,

    empty: HashSet<EntityId>,
}

impl AdjacencyCache {
    /// Does `a` relate to `b` via `relation`?
    pub fn has_edge(&self, a: EntityId, relation: &RelationType, b: EntityId) -> bool {
        self.outgoing
            .get(relation)
            .and_then(|m| m.get(&a))
            .is_some_and(|set| set.contains(&b))
    }

    /// Entities `a` relates to via `relation`
    pub fn neighbors(&self, a: EntityId, relation: &RelationType) -> &HashSet<EntityId> {
        self.outgoing
            .get(relation)
            .and_then(|m| m.get(&a))
            .unwrap_or(&self.empty)
    }

    /// Entities relating to `b` via `relation`
    pub fn incoming(&self, b: EntityId, relation: &RelationType) -> &HashSet<EntityId> {
        self.incoming
            .get(relation)
            .and_then(|m| m.get(&b))
            .unwrap_or(&self.empty)
    }

    pub fn is_symmetric(&self, relation: &RelationType) -> bool {
        self.symmetric.contains(relation)
    }

    /// Temporal attributes of the edge `a -relation-> b`, if it has any
    pub fn edge_attributes(&self, a: EntityId, relation: &RelationType, b: EntityId) -> Option<&EdgeAttributes> {
        self.attributes
            .get(&(a, relation.clone(), b))
            .or_else(|| {
                if self.is_symmetric(relation) {
                    self.attributes.get(&(b, relation.clone(), a))
                } else {
                    None
                }
            })
    }

    /// Relation types present in the cache
    pub fn relation_types(&self) -> impl Iterator<Item = &RelationType> {
        self.outgoing.keys()
    }

    /// Every indexed directed edge, including mirrored symmetric edges
    #[cfg(test)]
    pub(crate) fn edges(&self) -> impl Iterator<Item = (EntityId, &RelationType, EntityId)> + '_ {
        self.outgoing.iter().flat_map(|(relation, sources)| {
            sources
                .iter()
                .flat_map(move |(source, targets)| targets.iter().map(move |target| (*source, relation, *target)))
        })
    }

    /// Distinct edges read from the store
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

/// Single-pass builder for [`AdjacencyCache`]
#[derive(Debug, Default)]
pub struct AdjacencyBuilder {
    cache: AdjacencyCache,
}

impl AdjacencyBuilder {
    pub fn new(symmetric: impl IntoIterator<Item = RelationType>) -> Self {
        Self {
            cache: AdjacencyCache {
                symmetric: symmetric.into_iter().collect(),
                ..Default::default()
            },
        }
    }

    /// Index one edge; returns false for a duplicate
    pub fn add_edge(&mut self, edge: &RelationEdge) -> bool {
        let RelationEdge {
            source,
            relation,
            target,
            attributes,
        } = edge;
        let cache = &mut self.cache;

        let inserted = cache
            .outgoing
            .entry(relation.clone())
            .or_default()
            .entry(*source)
            .or_default()
            .insert(*target);
        if !inserted {
            return false;
        }

        cache
            .incoming
            .entry(relation.clone())
            .or_default()
            .entry(*target)
            .or_default()
            .insert(*source);

        if cache.symmetric.contains(relation) {
            cache
                .outgoing
                .entry(relation.clone())
                .or_default()
                .entry(*target)
                .or_default()
                .insert(*source);
            cache
                .incoming
                .entry(relation.clone())
                .or_default()
                .entry(*source)
                .or_default()
                .insert(*target);
        }

        if !attributes.is_empty() {
            cache
                .attributes
                .insert((*source, relation.clone(), *target), attributes.clone());
        }

        cache.edge_count += 1;
        true
    }

    pub fn build(self) -> AdjacencyCache {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn rel(name: &str) -> RelationType {
        RelationType::new(name)
    }

    #[test]
    fn test_directed_edges() {
        let mut builder = AdjacencyBuilder::new(vec![rel("TEAMMATE")]);
        builder.add_edge(&RelationEdge::new(1, "AFFILIATED_WITH", 10));
        builder.add_edge(&RelationEdge::new(2, "AFFILIATED_WITH", 10));
        let cache = builder.build();

        let affiliated = rel("AFFILIATED_WITH");
        assert!(cache.has_edge(1, &affiliated, 10));
        assert!(!cache.has_edge(10, &affiliated, 1));
        assert_eq!(cache.neighbors(1, &affiliated).len(), 1);
        assert_eq!(cache.incoming(10, &affiliated), &HashSet::from([1, 2]));
        assert!(cache.neighbors(99, &affiliated).is_empty());
        assert!(cache.neighbors(1, &rel("UNKNOWN")).is_empty());
        assert_eq!(cache.edge_count(), 2);
    }

    #[test]
    fn test_symmetric_edges() {
        let mut builder = AdjacencyBuilder::new(vec![rel("TEAMMATE")]);
        builder.add_edge(&RelationEdge::new(1, "TEAMMATE", 2));
        let cache = builder.build();

        let teammate = rel("TEAMMATE");
        assert!(cache.has_edge(1, &teammate, 2));
        assert!(cache.has_edge(2, &teammate, 1));
        assert!(cache.is_symmetric(&teammate));
        assert_eq!(cache.edge_count(), 1);
        assert_eq!(cache.edges().count(), 2);
    }

    #[test]
    fn test_duplicate_edges_counted_once() {
        let mut builder = AdjacencyBuilder::new(Vec::new());
        assert!(builder.add_edge(&RelationEdge::new(1, "BORN_IN", 5)));
        assert!(!builder.add_edge(&RelationEdge::new(1, "born in", 5)));
        assert_eq!(builder.build().edge_count(), 1);
    }

    #[test]
    fn test_edge_attributes() {
        let mut builder = AdjacencyBuilder::new(vec![rel("TEAMMATE")]);
        builder.add_edge(&RelationEdge::new(1, "AFFILIATED_WITH", 10).with_period(Some("2015"), Some("2019")));
        builder.add_edge(&RelationEdge::new(1, "TEAMMATE", 2).with_period(Some("2018"), None));
        let cache = builder.build();

        let attrs = cache.edge_attributes(1, &rel("AFFILIATED_WITH"), 10).unwrap();
        assert_eq!(attrs.to_period.as_deref(), Some("2019"));
        assert!(cache.edge_attributes(10, &rel("AFFILIATED_WITH"), 1).is_none());
        assert!(cache.edge_attributes(2, &rel("TEAMMATE"), 1).is_some());
    }

    #[test]
    fn test_round_trip_fidelity_on_random_graphs() {
        let relations = [rel("AFFILIATED_WITH"), rel("BORN_IN"), rel("TEAMMATE")];
        let symmetric = rel("TEAMMATE");
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let edges: Vec<RelationEdge> = (0..rng.gen_range(0..200))
                .map(|_| {
                    let relation = relations[rng.gen_range(0..relations.len())].clone();
                    RelationEdge::new(rng.gen_range(0..30), relation, rng.gen_range(0..30))
                })
                .collect();

            let mut builder = AdjacencyBuilder::new(vec![symmetric.clone()]);
            for edge in &edges {
                builder.add_edge(edge);
            }
            let cache = builder.build();

            // A symmetric edge and its mirror are one fact
            let distinct: BTreeSet<(EntityId, &RelationType, EntityId)> = edges
                .iter()
                .map(|e| match e.relation == symmetric {
                    true => (e.source.min(e.target), &e.relation, e.source.max(e.target)),
                    false => (e.source, &e.relation, e.target),
                })
                .collect();
            assert_eq!(cache.edge_count(), distinct.len());

            for relation in &relations {
                for entity in 0..30 {
                    let mut expected: HashSet<EntityId> = edges
                        .iter()
                        .filter(|e| &e.relation == relation && e.source == entity)
                        .map(|e| e.target)
                        .collect();
                    if relation == &symmetric {
                        expected.extend(
                            edges
                                .iter()
                                .filter(|e| &e.relation == relation && e.target == entity)
                                .map(|e| e.source),
                        );
                    }
                    assert_eq!(cache.neighbors(entity, relation), &expected);

                    for other in 0..30 {
                        let forward = cache.has_edge(entity, relation, other);
                        if relation == &symmetric {
                            assert_eq!(forward, cache.has_edge(other, relation, entity));
                        }
                    }
                }
            }
        }
    }
}
