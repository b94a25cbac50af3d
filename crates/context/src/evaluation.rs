//! Accuracy evaluation over a labelled question set

use crate::engine::ReasoningCore;
use crate::request::{Answer, Outcome, ReasoningRequest};
use chrono::{DateTime, Utc};
use hopgraph_common::config::EvaluationSettings;
use hopgraph_common::errors::Result;
use hopgraph_graph::fold_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const PROGRESS_EVERY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    TrueFalse,
    YesNo,
    Mcq,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::TrueFalse => "true_false",
            ItemKind::YesNo => "yes_no",
            ItemKind::Mcq => "mcq",
        }
    }
}

/// Labelled answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Boolean(bool),
    Text(String),
}

impl Expected {
    /// Boolean reading, accepting yes/no words in English and Vietnamese
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expected::Boolean(b) => Some(*b),
            Expected::Text(text) => match fold_key(text).as_str() {
                "true" | "yes" | "y" | "dung" | "co" | "phai" => Some(true),
                "false" | "no" | "n" | "sai" | "khong" => Some(false),
                _ => None,
            },
        }
    }

    pub fn matches(&self, kind: ItemKind, answer: &Answer) -> bool {
        match (kind, answer) {
            (ItemKind::TrueFalse | ItemKind::YesNo, Answer::Boolean(b)) => self.as_bool() == Some(*b),
            (ItemKind::Mcq, Answer::Choice(choice)) => match self {
                Expected::Text(text) => fold_key(text) == fold_key(choice),
                Expected::Boolean(_) => false,
            },
            _ => false,
        }
    }
}

/// One dataset entry
#[derive(Debug, Clone, Deserialize)]
pub struct EvalItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: ItemKind,
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(alias = "expected")]
    pub answer: Expected,
    /// Reasoning depth; inferred from the matched rule when absent
    #[serde(default)]
    pub hops: Option<u8>,
    #[serde(default)]
    pub category: Option<String>,
}

impl EvalItem {
    pub fn request(&self) -> ReasoningRequest {
        match self.kind {
            ItemKind::Mcq => ReasoningRequest::mcq(self.question.clone(), self.choices.clone()),
            ItemKind::TrueFalse | ItemKind::YesNo => ReasoningRequest::boolean(self.question.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub correct: usize,
    pub abstained: usize,
    pub accuracy: f64,
}

impl Tally {
    fn record(&mut self, correct: bool, abstained: bool) {
        self.total += 1;
        self.correct += usize::from(correct);
        self.abstained += usize::from(abstained);
    }

    fn finalize(&mut self) {
        self.accuracy = if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        };
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub id: Option<serde_json::Value>,
    pub question: String,
    pub expected: Expected,
    pub predicted: Option<Answer>,
    pub intent: Option<String>,
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub snapshot_id: Uuid,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub overall: Tally,
    /// Requests rejected as invalid
    pub errors: usize,
    pub by_kind: BTreeMap<String, Tally>,
    pub by_hops: BTreeMap<u8, Tally>,
    pub by_category: BTreeMap<String, Tally>,
    pub failures: Vec<Failure>,
}

/// Runs a dataset through a reasoning core
pub struct Evaluator {
    settings: EvaluationSettings,
}

impl Evaluator {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    pub async fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<EvalItem>> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let items: Vec<EvalItem> = serde_json::from_str(&raw)?;
        info!(path = %path.as_ref().display(), items = items.len(), "Dataset loaded");
        Ok(items)
    }

    /// Answer every item against a single snapshot generation
    #[instrument(skip_all, fields(items = items.len()))]
    pub fn evaluate<C: ReasoningCore + ?Sized>(&self, core: &C, items: &[EvalItem]) -> EvaluationReport {
        let started = Instant::now();
        let snapshot = core.snapshot();

        let mut overall = Tally::default();
        let mut errors = 0;
        let mut by_kind: BTreeMap<String, Tally> = BTreeMap::new();
        let mut by_hops: BTreeMap<u8, Tally> = BTreeMap::new();
        let mut by_category: BTreeMap<String, Tally> = BTreeMap::new();
        let mut failures = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if (i + 1) % PROGRESS_EVERY == 0 {
                info!(done = i + 1, total = items.len(), "Evaluation progress");
            }

            let (correct, abstained, inferred_hops, failure) = match core.answer_on(&snapshot, &item.request()) {
                Ok(response) => {
                    let inferred_hops = response.hops.and_then(|h| u8::try_from(h).ok());
                    let correct = item.answer.matches(item.kind, &response.answer);
                    let abstained = response.is_abstention();
                    let failure = (!correct).then(|| Failure {
                        id: item.id.clone(),
                        question: item.question.clone(),
                        expected: item.answer.clone(),
                        predicted: Some(response.answer),
                        intent: Some(response.intent),
                        outcome: Some(response.outcome),
                        error: None,
                    });
                    (correct, abstained, inferred_hops, failure)
                }
                Err(e) => {
                    warn!(id = ?item.id, error = %e, "Evaluation item rejected");
                    errors += 1;
                    let failure = Failure {
                        id: item.id.clone(),
                        question: item.question.clone(),
                        expected: item.answer.clone(),
                        predicted: None,
                        intent: None,
                        outcome: None,
                        error: Some(e.to_string()),
                    };
                    (false, false, None, Some(failure))
                }
            };

            overall.record(correct, abstained);
            by_kind
                .entry(item.kind.as_str().to_string())
                .or_default()
                .record(correct, abstained);
            by_hops
                .entry(item.hops.or(inferred_hops).unwrap_or(1))
                .or_default()
                .record(correct, abstained);
            by_category
                .entry(item.category.clone().unwrap_or_else(|| "unknown".to_string()))
                .or_default()
                .record(correct, abstained);

            if let Some(failure) = failure {
                if failures.len() < self.settings.max_failures_reported {
                    failures.push(failure);
                }
            }
        }

        overall.finalize();
        by_kind
            .values_mut()
            .chain(by_hops.values_mut())
            .chain(by_category.values_mut())
            .for_each(Tally::finalize);

        let report = EvaluationReport {
            generated_at: Utc::now(),
            snapshot_id: snapshot.id(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            overall,
            errors,
            by_kind,
            by_hops,
            by_category,
            failures,
        };

        info!(
            total = report.overall.total,
            correct = report.overall.correct,
            abstained = report.overall.abstained,
            accuracy = report.overall.accuracy,
            elapsed_ms = report.elapsed_ms,
            "Evaluation finished"
        );
        report
    }
}
