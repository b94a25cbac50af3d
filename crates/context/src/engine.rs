//! Reasoning engine
//!
//! A question flows through four stages against one snapshot generation:
//! extraction of entity mentions and candidates, rule classification into a
//! query plan, traversal of the adjacency cache, and scoring into the final
//! response. Domain failures (unknown or ambiguous entities, unmatched
//! intent) become degraded responses; only invalid requests are errors.

use crate::classifier::{ChainTarget, Classification, IntentClassifier, McqProbe, Rule, Template};
use crate::extractor::{split_inline_choices, Candidate, EntityExtractor, Mention, MentionResolution};
use crate::normalizer::{normalize, NormalizedQuestion};
use crate::reasoner::{ChainPredicate, McqSelection, Reasoner, Traversal};
use crate::request::{AnswerMode, Degradation, ReasoningRequest, ReasoningResponse};
use crate::synthesizer::{AnswerSynthesizer, ConfidenceScorer};
use hopgraph_common::cache::Cache;
use hopgraph_common::config::ReasoningSettings;
use hopgraph_common::errors::{AppError, Result};
use hopgraph_common::metrics::ReasoningMetrics;
use hopgraph_graph::{EntityId, GraphSnapshot, RelationType, SnapshotHandle};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Entities and candidates read from one question
#[derive(Debug, Clone)]
pub struct Extraction {
    pub question: NormalizedQuestion,
    pub mentions: Vec<Mention>,
    pub candidates: Vec<Candidate>,
}

/// A fully bound traversal
#[derive(Debug, Clone, PartialEq)]
pub enum Query<'r> {
    Direct {
        a: EntityId,
        relation: &'r RelationType,
        b: EntityId,
    },
    Shared {
        a: EntityId,
        b: EntityId,
        relation: &'r RelationType,
    },
    Chain {
        a: EntityId,
        first: &'r RelationType,
        second: &'r RelationType,
        target: ChainPredicate<'r>,
    },
    Mcq {
        stem: EntityId,
        probe: &'r McqProbe,
        candidates: Vec<Option<EntityId>>,
    },
}

/// Classification turned into either a query or a degradation
#[derive(Debug, Clone, PartialEq)]
pub enum Plan<'r> {
    Ready { rule: &'r Rule, query: Query<'r> },
    Degraded { rule: Option<&'r Rule>, degradation: Degradation },
}

impl<'r> Plan<'r> {
    pub fn rule(&self) -> Option<&'r Rule> {
        match self {
            Plan::Ready { rule, .. } => Some(*rule),
            Plan::Degraded { rule, .. } => *rule,
        }
    }
}

/// What a traversal produced, by template family
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalOutcome {
    Direct(Traversal),
    MultiHop(Traversal),
    Mcq(McqSelection),
}

/// Bind a classification to concrete entities
pub fn plan<'r>(classification: Classification<'r>, mentions: &[Mention], candidates: &[Candidate]) -> Plan<'r> {
    let Some(rule) = classification.rule else {
        return Plan::Degraded {
            rule: None,
            degradation: Degradation::unclassified(),
        };
    };

    let Some(binding) = classification.binding else {
        let resolved = mentions.iter().filter(|m| m.entity().is_some()).count();
        return Plan::Degraded {
            rule: Some(rule),
            degradation: Degradation::entity_not_found(format!(
                "rule '{}' needs {} entities, {} resolved",
                rule.name,
                rule.slots.len(),
                resolved
            )),
        };
    };

    let mut entities = Vec::with_capacity(binding.len());
    for &index in &binding {
        match &mentions[index].resolution {
            MentionResolution::Resolved { id, .. } => entities.push(*id),
            MentionResolution::Ambiguous { ids } => {
                return Plan::Degraded {
                    rule: Some(rule),
                    degradation: Degradation::ambiguous(&mentions[index].text, ids.clone()),
                };
            }
        }
    }

    let query = match (&rule.template, entities.as_slice()) {
        (Template::DirectRelation { relation }, &[a, b, ..]) => Some(Query::Direct { a, relation, b }),
        (Template::SharedNeighbor { relation }, &[a, b, ..]) => Some(Query::Shared { a, b, relation }),
        (Template::Chain { first, second, target }, &[a, ref rest @ ..]) => {
            let target = match (target, rest.first()) {
                (ChainTarget::Slot, Some(&b)) => Some(ChainPredicate::Entity(b)),
                (ChainTarget::PropertyEquals { key, value }, _) => Some(ChainPredicate::PropertyEquals {
                    key: key.as_str(),
                    value: value.as_str(),
                }),
                (ChainTarget::MeetsSlot { relation }, Some(&b)) => Some(ChainPredicate::Meets { entity: b, relation }),
                _ => None,
            };
            target.map(|target| Query::Chain {
                a,
                first,
                second,
                target,
            })
        }
        (Template::McqSelect { probe }, &[stem, ..]) => Some(Query::Mcq {
            stem,
            probe,
            candidates: candidates.iter().map(|c| c.resolution.entity()).collect(),
        }),
        _ => None,
    };

    match query {
        Some(query) => Plan::Ready { rule, query },
        None => Plan::Degraded {
            rule: Some(rule),
            degradation: Degradation::entity_not_found(format!("rule '{}' is missing a bound entity", rule.name)),
        },
    }
}

/// The reasoning pipeline, one stage per method
pub trait ReasoningCore: Send + Sync {
    /// Snapshot generation used for the next call
    fn snapshot(&self) -> Arc<GraphSnapshot>;

    /// Delimiter separating inline MCQ choices from the stem
    fn choice_delimiter(&self) -> &str;

    fn extract(&self, snapshot: &GraphSnapshot, question: &str, choices: &[String]) -> Extraction;

    fn classify(&self, extraction: &Extraction, mode: AnswerMode) -> Plan<'_>;

    fn traverse(&self, snapshot: &GraphSnapshot, query: &Query<'_>, exhaustive: bool) -> TraversalOutcome;

    fn score(
        &self,
        snapshot: &GraphSnapshot,
        rule: &Rule,
        candidates: &[Candidate],
        outcome: TraversalOutcome,
    ) -> ReasoningResponse;

    /// Conservative response for a degraded plan
    fn degrade(
        &self,
        snapshot: &GraphSnapshot,
        mode: AnswerMode,
        rule: Option<&Rule>,
        degradation: Degradation,
    ) -> ReasoningResponse;

    /// Answer against the current snapshot
    fn answer(&self, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        let snapshot = self.snapshot();
        self.answer_on(&snapshot, request)
    }

    /// Answer against a given snapshot generation
    #[instrument(skip_all, fields(mode = request.answer_mode.as_str(), snapshot = %snapshot.id()))]
    fn answer_on(&self, snapshot: &GraphSnapshot, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        request.check()?;
        let metrics = ReasoningMetrics::start();

        let (stem, choices) = match request.answer_mode {
            AnswerMode::Boolean => (request.question_text.clone(), Vec::new()),
            AnswerMode::Mcq => {
                let (stem, inline) = split_inline_choices(&request.question_text, self.choice_delimiter());
                match &request.choices {
                    Some(choices) if !choices.is_empty() => (stem, choices.clone()),
                    _ => (stem, inline),
                }
            }
        };
        if request.answer_mode == AnswerMode::Mcq && choices.is_empty() {
            return Err(AppError::validation("multiple choice question has no candidates", Some("choices")));
        }

        let extraction = self.extract(snapshot, &stem, &choices);
        let response = match self.classify(&extraction, request.answer_mode) {
            Plan::Ready { rule, query } => {
                let outcome = self.traverse(snapshot, &query, request.exhaustive_evidence);
                self.score(snapshot, rule, &extraction.candidates, outcome)
            }
            Plan::Degraded { rule, degradation } => {
                debug!(kind = degradation.kind.intent(), message = %degradation.message, "Degraded answer");
                self.degrade(snapshot, request.answer_mode, rule, degradation)
            }
        };

        metrics.finish(&response.intent, response.outcome.as_str(), response.confidence);
        debug!(
            intent = %response.intent,
            outcome = response.outcome.as_str(),
            confidence = response.confidence,
            evidence = response.evidence.len(),
            "Question answered"
        );
        Ok(response)
    }
}

/// Reasoning core over a refreshable snapshot
pub struct ReasoningEngine {
    snapshots: Arc<SnapshotHandle>,
    extractor: EntityExtractor,
    classifier: IntentClassifier,
    synthesizer: AnswerSynthesizer,
    settings: ReasoningSettings,
}

impl ReasoningEngine {
    pub fn new(snapshots: Arc<SnapshotHandle>, settings: ReasoningSettings) -> Result<Self> {
        let classifier = IntentClassifier::from_settings(&settings)?;
        Self::with_classifier(snapshots, classifier, settings)
    }

    pub fn with_classifier(
        snapshots: Arc<SnapshotHandle>,
        classifier: IntentClassifier,
        settings: ReasoningSettings,
    ) -> Result<Self> {
        Ok(Self {
            snapshots,
            extractor: EntityExtractor::new()?,
            classifier,
            synthesizer: AnswerSynthesizer::new(ConfidenceScorer::from(&settings)),
            settings,
        })
    }

    pub fn snapshots(&self) -> &Arc<SnapshotHandle> {
        &self.snapshots
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Answer through the response cache, keyed by snapshot generation
    pub async fn answer_cached(&self, cache: &Cache, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        request.check()?;
        let snapshot = self.snapshot();
        let key = request.cache_key(snapshot.id());
        cache
            .get_or_compute("reasoning", &key, || self.answer_on(&snapshot, request))
            .await
    }
}

impl ReasoningCore for ReasoningEngine {
    fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.snapshots.current()
    }

    fn choice_delimiter(&self) -> &str {
        &self.settings.choice_delimiter
    }

    fn extract(&self, snapshot: &GraphSnapshot, question: &str, choices: &[String]) -> Extraction {
        let question = normalize(question);
        let mentions = self.extractor.extract(&question, snapshot);
        let candidates = self.extractor.resolve_candidates(choices, snapshot);
        Extraction {
            question,
            mentions,
            candidates,
        }
    }

    fn classify(&self, extraction: &Extraction, mode: AnswerMode) -> Plan<'_> {
        let classification = self.classifier.classify(&extraction.question, &extraction.mentions, mode);
        plan(classification, &extraction.mentions, &extraction.candidates)
    }

    fn traverse(&self, snapshot: &GraphSnapshot, query: &Query<'_>, exhaustive: bool) -> TraversalOutcome {
        let reasoner = Reasoner::new(snapshot, self.settings.max_evidence_chains, exhaustive);
        match query {
            Query::Direct { a, relation, b } => TraversalOutcome::Direct(reasoner.direct(*a, relation, *b)),
            Query::Shared { a, b, relation } => TraversalOutcome::MultiHop(reasoner.shared_neighbor(*a, *b, relation)),
            Query::Chain {
                a,
                first,
                second,
                target,
            } => TraversalOutcome::MultiHop(reasoner.chain(*a, first, second, target)),
            Query::Mcq {
                stem,
                probe,
                candidates,
            } => TraversalOutcome::Mcq(reasoner.mcq_select(*stem, candidates, probe)),
        }
    }

    fn score(
        &self,
        snapshot: &GraphSnapshot,
        rule: &Rule,
        candidates: &[Candidate],
        outcome: TraversalOutcome,
    ) -> ReasoningResponse {
        match outcome {
            TraversalOutcome::Direct(traversal) => self.synthesizer.boolean(snapshot, rule, &traversal, true),
            TraversalOutcome::MultiHop(traversal) => self.synthesizer.boolean(snapshot, rule, &traversal, false),
            TraversalOutcome::Mcq(selection) => self.synthesizer.mcq(snapshot, rule, candidates, &selection),
        }
    }

    fn degrade(
        &self,
        snapshot: &GraphSnapshot,
        mode: AnswerMode,
        rule: Option<&Rule>,
        degradation: Degradation,
    ) -> ReasoningResponse {
        self.synthesizer.degraded(snapshot, mode, rule, degradation)
    }
}
