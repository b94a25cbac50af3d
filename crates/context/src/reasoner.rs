//! Multi-hop traversal over the adjacency cache
//!
//! Every operation is a bounded number of set lookups against one
//! snapshot. Neighbors are visited in ascending id order so evidence is
//! deterministic.

use crate::classifier::McqProbe;
use hopgraph_graph::catalog::fold_key;
use hopgraph_graph::{AdjacencyCache, EntityId, GraphSnapshot, RelationType};
use std::collections::HashSet;

/// One edge of an evidence chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hop {
    pub source: EntityId,
    pub relation: RelationType,
    pub target: EntityId,
}

impl Hop {
    pub fn new(source: EntityId, relation: &RelationType, target: EntityId) -> Self {
        Self {
            source,
            relation: relation.clone(),
            target,
        }
    }
}

/// Result of a boolean template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traversal {
    pub holds: bool,
    /// Distinct witnesses found (common neighbors, chain midpoints)
    pub witnesses: usize,
    /// Reported evidence chains, possibly fewer than `witnesses`
    pub chains: Vec<Vec<Hop>>,
}

impl Traversal {
    fn negative() -> Self {
        Self::default()
    }
}

/// Result of scoring MCQ candidates
#[derive(Debug, Clone, PartialEq)]
pub struct McqSelection {
    /// One score per candidate, in input order
    pub scores: Vec<f32>,
    /// Index of the strictly best candidate
    pub selected: Option<usize>,
    /// Evidence for the selected candidate
    pub chains: Vec<Vec<Hop>>,
}

/// Condition a chain's second hop must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum ChainPredicate<'a> {
    /// Second hop lands on this entity
    Entity(EntityId),
    /// Second hop lands on a node whose property `key` equals `value`
    PropertyEquals { key: &'a str, value: &'a str },
    /// Second hop lands on a node `entity` also reaches via `relation`
    Meets {
        entity: EntityId,
        relation: &'a RelationType,
    },
}

pub struct Reasoner<'s> {
    snapshot: &'s GraphSnapshot,
    max_chains: usize,
    exhaustive: bool,
}

impl<'s> Reasoner<'s> {
    pub fn new(snapshot: &'s GraphSnapshot, max_chains: usize, exhaustive: bool) -> Self {
        Self {
            snapshot,
            max_chains: max_chains.max(1),
            exhaustive,
        }
    }

    fn adjacency(&self) -> &'s AdjacencyCache {
        self.snapshot.adjacency()
    }

    fn chain_limit(&self) -> usize {
        if self.exhaustive {
            usize::MAX
        } else {
            self.max_chains
        }
    }

    /// `a -relation-> b`
    pub fn direct(&self, a: EntityId, relation: &RelationType, b: EntityId) -> Traversal {
        if !self.adjacency().has_edge(a, relation, b) {
            return Traversal::negative();
        }
        Traversal {
            holds: true,
            witnesses: 1,
            chains: vec![vec![Hop::new(a, relation, b)]],
        }
    }

    /// Common neighbors of `a` and `b` via `relation`
    pub fn shared_neighbor(&self, a: EntityId, b: EntityId, relation: &RelationType) -> Traversal {
        let common = self.common_neighbors(a, b, relation);
        if common.is_empty() {
            return Traversal::negative();
        }

        let limit = if self.exhaustive { common.len() } else { 1 };
        let chains = common
            .iter()
            .take(limit)
            .map(|&x| vec![Hop::new(a, relation, x), Hop::new(b, relation, x)])
            .collect();

        Traversal {
            holds: true,
            witnesses: common.len(),
            chains,
        }
    }

    /// `a -first-> n -second-> target` for some `n`
    pub fn chain(
        &self,
        a: EntityId,
        first: &RelationType,
        second: &RelationType,
        target: &ChainPredicate<'_>,
    ) -> Traversal {
        let limit = self.chain_limit();
        let mut witnesses = 0;
        let mut chains = Vec::new();

        for n in sorted(self.adjacency().neighbors(a, first)) {
            let Some(tail) = self.chain_tail(n, second, target) else {
                continue;
            };
            witnesses += 1;
            if chains.len() < limit {
                let mut chain = Vec::with_capacity(tail.len() + 1);
                chain.push(Hop::new(a, first, n));
                chain.extend(tail);
                chains.push(chain);
            }
        }

        Traversal {
            holds: witnesses > 0,
            witnesses,
            chains,
        }
    }

    /// Score each candidate against the stem entity
    pub fn mcq_select(&self, stem: EntityId, candidates: &[Option<EntityId>], probe: &McqProbe) -> McqSelection {
        let scores: Vec<f32> = candidates
            .iter()
            .map(|candidate| match candidate {
                Some(c) if !self.probe_chain(stem, *c, probe).is_empty() => 1.0,
                _ => 0.0,
            })
            .collect();

        let best = scores.iter().copied().fold(0.0_f32, f32::max);
        let mut leaders = scores.iter().enumerate().filter(|(_, s)| **s == best).map(|(i, _)| i);
        let selected = match (best > 0.0, leaders.next(), leaders.next()) {
            (true, Some(index), None) => Some(index),
            _ => None,
        };

        let chains = selected
            .and_then(|i| candidates[i])
            .map(|c| vec![self.probe_chain(stem, c, probe)])
            .unwrap_or_default();

        McqSelection {
            scores,
            selected,
            chains,
        }
    }

    fn probe_chain(&self, stem: EntityId, candidate: EntityId, probe: &McqProbe) -> Vec<Hop> {
        match probe {
            McqProbe::Direct {
                relation,
                stem_is_source,
            } => {
                let adjacency = self.adjacency();
                if *stem_is_source && adjacency.has_edge(stem, relation, candidate) {
                    vec![Hop::new(stem, relation, candidate)]
                } else if !*stem_is_source && adjacency.incoming(stem, relation).contains(&candidate) {
                    vec![Hop::new(candidate, relation, stem)]
                } else {
                    Vec::new()
                }
            }
            McqProbe::Shared { relation } => {
                if stem == candidate {
                    return Vec::new();
                }
                match self.common_neighbors(stem, candidate, relation).first() {
                    Some(&x) => vec![Hop::new(stem, relation, x), Hop::new(candidate, relation, x)],
                    None => Vec::new(),
                }
            }
        }
    }

    /// Hops after the first for midpoint `n`, if the predicate holds
    fn chain_tail(&self, n: EntityId, second: &RelationType, target: &ChainPredicate<'_>) -> Option<Vec<Hop>> {
        let adjacency = self.adjacency();
        match target {
            ChainPredicate::Entity(b) => adjacency
                .has_edge(n, second, *b)
                .then(|| vec![Hop::new(n, second, *b)]),
            ChainPredicate::PropertyEquals { key, value } => sorted(adjacency.neighbors(n, second))
                .into_iter()
                .find(|&m| self.property_equals(m, key, value))
                .map(|m| vec![Hop::new(n, second, m)]),
            ChainPredicate::Meets { entity, relation } => sorted(adjacency.neighbors(n, second))
                .into_iter()
                .find(|&m| adjacency.has_edge(*entity, relation, m))
                .map(|m| vec![Hop::new(n, second, m), Hop::new(*entity, relation, m)]),
        }
    }

    fn common_neighbors(&self, a: EntityId, b: EntityId, relation: &RelationType) -> Vec<EntityId> {
        let left = self.adjacency().neighbors(a, relation);
        let right = self.adjacency().neighbors(b, relation);
        let (small, large) = if left.len() <= right.len() { (left, right) } else { (right, left) };

        let mut common: Vec<EntityId> = small.iter().copied().filter(|x| large.contains(x)).collect();
        common.sort_unstable();
        common
    }

    fn property_equals(&self, id: EntityId, key: &str, expected: &str) -> bool {
        self.snapshot
            .catalog()
            .get(id)
            .and_then(|entity| entity.property(key))
            .map_or(false, |value| value_matches(value, expected))
    }
}

fn value_matches(value: &serde_json::Value, expected: &str) -> bool {
    match value {
        serde_json::Value::String(s) => fold_key(s) == fold_key(expected),
        serde_json::Value::Number(n) => n.to_string() == expected.trim(),
        serde_json::Value::Bool(b) => b.to_string() == expected.trim().to_lowercase(),
        serde_json::Value::Array(items) => items.iter().any(|item| value_matches(item, expected)),
        serde_json::Value::Null | serde_json::Value::Object(_) => false,
    }
}

fn sorted(set: &HashSet<EntityId>) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = set.iter().copied().collect();
    ids.sort_unstable();
    ids
}
