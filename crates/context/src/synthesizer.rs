//! Confidence scoring and answer synthesis

use crate::classifier::Rule;
use crate::extractor::Candidate;
use crate::reasoner::{Hop, McqSelection, Traversal};
use crate::request::{Answer, AnswerMode, Degradation, EvidenceEdge, Outcome, ReasoningResponse};
use hopgraph_common::config::ReasoningSettings;
use hopgraph_graph::GraphSnapshot;
use std::collections::HashSet;

/// Maps traversal results to a confidence in [0, 1]
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    floor: f32,
    no_path: f32,
    multi_hop_base: f32,
    saturation: usize,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::from(&ReasoningSettings::default())
    }
}

impl From<&ReasoningSettings> for ConfidenceScorer {
    fn from(settings: &ReasoningSettings) -> Self {
        Self {
            floor: settings.confidence_floor.clamp(0.0, 1.0),
            no_path: settings.no_path_confidence.clamp(0.0, 1.0),
            multi_hop_base: settings.multi_hop_base_confidence.clamp(0.0, 1.0),
            saturation: settings.evidence_saturation.max(1),
        }
    }
}

impl ConfidenceScorer {
    /// Confidence of degraded answers
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Single edge lookup: a closed-world fact either way
    pub fn direct(&self, traversal: &Traversal) -> (f32, Outcome) {
        if traversal.holds {
            (1.0, Outcome::Answered)
        } else {
            (1.0, Outcome::NoPathFound)
        }
    }

    /// Shared-neighbor and chain results
    pub fn multi_hop(&self, traversal: &Traversal, specificity: f32) -> (f32, Outcome) {
        if !traversal.holds {
            return (self.no_path, Outcome::NoPathFound);
        }
        let support = (traversal.witnesses as f32 / self.saturation as f32).min(1.0);
        let confidence = self.multi_hop_base + (1.0 - self.multi_hop_base) * support * specificity.clamp(0.0, 1.0);
        (confidence.clamp(0.0, 1.0), Outcome::Answered)
    }

    pub fn mcq(&self, selection: &McqSelection, specificity: f32) -> (f32, Outcome) {
        match selection.selected {
            Some(_) => (specificity.clamp(0.0, 1.0), Outcome::Answered),
            None => (self.floor, Outcome::NoConfidentAnswer),
        }
    }
}

/// Builds the final response with display names on the evidence trail
#[derive(Debug, Clone, Default)]
pub struct AnswerSynthesizer {
    scorer: ConfidenceScorer,
}

impl AnswerSynthesizer {
    pub fn new(scorer: ConfidenceScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn boolean(&self, snapshot: &GraphSnapshot, rule: &Rule, traversal: &Traversal, single_edge: bool) -> ReasoningResponse {
        let (confidence, outcome) = if single_edge {
            self.scorer.direct(traversal)
        } else {
            self.scorer.multi_hop(traversal, rule.specificity)
        };

        ReasoningResponse {
            answer: Answer::Boolean(traversal.holds),
            confidence,
            evidence: evidence(snapshot, &traversal.chains),
            intent: rule.template.label().to_string(),
            rule: Some(rule.name.clone()),
            outcome,
            hops: Some(rule.template.hops()),
            degradation: None,
            snapshot_id: snapshot.id(),
        }
    }

    pub fn mcq(
        &self,
        snapshot: &GraphSnapshot,
        rule: &Rule,
        candidates: &[Candidate],
        selection: &McqSelection,
    ) -> ReasoningResponse {
        let (confidence, outcome) = self.scorer.mcq(selection, rule.specificity);
        let answer = selection
            .selected
            .and_then(|i| candidates.get(i))
            .map_or(Answer::NoConfidentAnswer, |c| Answer::Choice(c.text.clone()));

        ReasoningResponse {
            answer,
            confidence,
            evidence: evidence(snapshot, &selection.chains),
            intent: rule.template.label().to_string(),
            rule: Some(rule.name.clone()),
            outcome,
            hops: Some(rule.template.hops()),
            degradation: None,
            snapshot_id: snapshot.id(),
        }
    }

    /// Conservative default: `false` or no confident answer, at the floor
    pub fn degraded(
        &self,
        snapshot: &GraphSnapshot,
        mode: AnswerMode,
        rule: Option<&Rule>,
        degradation: Degradation,
    ) -> ReasoningResponse {
        let answer = match mode {
            AnswerMode::Boolean => Answer::Boolean(false),
            AnswerMode::Mcq => Answer::NoConfidentAnswer,
        };

        ReasoningResponse {
            answer,
            confidence: self.scorer.floor(),
            evidence: Vec::new(),
            intent: degradation.kind.intent().to_string(),
            rule: rule.map(|r| r.name.clone()),
            outcome: Outcome::Degraded,
            hops: rule.map(|r| r.template.hops()),
            degradation: Some(degradation),
            snapshot_id: snapshot.id(),
        }
    }
}

/// Flatten chains into named edges, dropping repeats
pub fn evidence(snapshot: &GraphSnapshot, chains: &[Vec<Hop>]) -> Vec<EvidenceEdge> {
    let catalog = snapshot.catalog();
    let adjacency = snapshot.adjacency();
    let mut seen = HashSet::new();

    chains
        .iter()
        .flatten()
        .filter(|hop| seen.insert(*hop))
        .map(|hop| {
            let attributes = adjacency.edge_attributes(hop.source, &hop.relation, hop.target);
            EvidenceEdge {
                source: hop.source,
                source_name: catalog.name(hop.source).unwrap_or_default().to_string(),
                relation: hop.relation.clone(),
                target: hop.target,
                target_name: catalog.name(hop.target).unwrap_or_default().to_string(),
                from_period: attributes.and_then(|a| a.from_period.clone()),
                to_period: attributes.and_then(|a| a.to_period.clone()),
            }
        })
        .collect()
}
