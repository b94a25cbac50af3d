//! Reasoning request and response types

use hopgraph_common::cache::keys;
use hopgraph_common::errors::{AppError, ErrorCode, Result};
use hopgraph_graph::{EntityId, RelationType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Kind of answer the caller expects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerMode {
    /// True/false and yes/no questions
    #[default]
    #[serde(alias = "boolean")]
    Boolean,
    /// Multiple choice
    #[serde(alias = "mcq")]
    Mcq,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Boolean => "BOOLEAN",
            AnswerMode::Mcq => "MCQ",
        }
    }
}

/// A question to answer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReasoningRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,

    /// MCQ candidates; when absent they are read from the question text
    #[serde(default)]
    pub choices: Option<Vec<String>>,

    #[serde(default)]
    pub answer_mode: AnswerMode,

    /// Report every witness instead of a representative
    #[serde(default)]
    pub exhaustive_evidence: bool,
}

impl ReasoningRequest {
    pub fn boolean(question: impl Into<String>) -> Self {
        Self {
            question_text: question.into(),
            choices: None,
            answer_mode: AnswerMode::Boolean,
            exhaustive_evidence: false,
        }
    }

    pub fn mcq(question: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            question_text: question.into(),
            choices: Some(choices),
            answer_mode: AnswerMode::Mcq,
            exhaustive_evidence: false,
        }
    }

    pub fn with_exhaustive_evidence(mut self) -> Self {
        self.exhaustive_evidence = true;
        self
    }

    /// Check field constraints
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        if self.question_text.trim().is_empty() {
            return Err(AppError::validation("question text is blank", Some("question_text")));
        }
        Ok(())
    }

    /// Response cache key, scoped to a snapshot generation
    pub fn cache_key(&self, snapshot_id: Uuid) -> String {
        let choices = self.choices.as_deref().unwrap_or_default().join("\u{1f}");
        let exhaustive = if self.exhaustive_evidence { "1" } else { "0" };
        let hash = keys::request_hash(&[self.question_text.as_str(), choices.as_str(), exhaustive]);
        keys::reasoning(snapshot_id, self.answer_mode.as_str(), &hash)
    }
}

/// Final answer value. `NoConfidentAnswer` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Boolean(bool),
    Choice(String),
    NoConfidentAnswer,
}

impl Answer {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Answer::Choice(c) => Some(c),
            _ => None,
        }
    }
}

/// How the answer was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Evidence supports the answer
    Answered,
    /// Entities resolved, no satisfying edge or chain exists
    NoPathFound,
    /// MCQ with a tie or no supported candidate
    NoConfidentAnswer,
    /// Unresolved or ambiguous entities, or no matching rule
    Degraded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Answered => "answered",
            Outcome::NoPathFound => "no_path_found",
            Outcome::NoConfidentAnswer => "no_confident_answer",
            Outcome::Degraded => "degraded",
        }
    }
}

/// Expected, recoverable conditions that cap confidence at the floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegradationKind {
    EntityNotFound,
    AmbiguousEntity,
    UnclassifiedIntent,
}

impl DegradationKind {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            DegradationKind::EntityNotFound => ErrorCode::EntityNotFound,
            DegradationKind::AmbiguousEntity => ErrorCode::AmbiguousEntity,
            DegradationKind::UnclassifiedIntent => ErrorCode::UnclassifiedIntent,
        }
    }

    /// Intent label reported for a degraded answer
    pub fn intent(&self) -> &'static str {
        match self {
            DegradationKind::EntityNotFound => "ENTITY_NOT_FOUND",
            DegradationKind::AmbiguousEntity => "AMBIGUOUS_ENTITY",
            DegradationKind::UnclassifiedIntent => "UNCLASSIFIED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub kind: DegradationKind,
    pub code: u16,
    pub message: String,
    /// Candidate entity ids of an ambiguous mention
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<EntityId>,
}

impl Degradation {
    pub fn new(kind: DegradationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.error_code().as_code(),
            message: message.into(),
            candidates: Vec::new(),
        }
    }

    pub fn entity_not_found(message: impl Into<String>) -> Self {
        Self::new(DegradationKind::EntityNotFound, message)
    }

    pub fn ambiguous(mention: &str, candidates: Vec<EntityId>) -> Self {
        Self {
            candidates,
            ..Self::new(
                DegradationKind::AmbiguousEntity,
                format!("\"{}\" names more than one entity", mention),
            )
        }
    }

    pub fn unclassified() -> Self {
        Self::new(DegradationKind::UnclassifiedIntent, "no rule matches the question")
    }
}

/// One edge of the evidence trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEdge {
    pub source: EntityId,
    pub source_name: String,
    pub relation: RelationType,
    pub target: EntityId,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_period: Option<String>,
}

/// Structured answer handed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub answer: Answer,
    pub confidence: f32,
    pub evidence: Vec<EvidenceEdge>,
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub outcome: Outcome,
    /// Edges per evidence chain of the matched rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hops: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
    pub snapshot_id: Uuid,
}

impl ReasoningResponse {
    /// Whether the engine declined to commit to an answer
    pub fn is_abstention(&self) -> bool {
        matches!(self.outcome, Outcome::Degraded | Outcome::NoConfidentAnswer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserialization() {
        let request: ReasoningRequest = serde_json::from_value(json!({
            "question_text": "Are P1 and P2 co-affiliated?",
            "answer_mode": "BOOLEAN"
        }))
        .unwrap();
        assert_eq!(request.answer_mode, AnswerMode::Boolean);
        assert!(request.choices.is_none());
        assert!(request.check().is_ok());

        let request: ReasoningRequest = serde_json::from_value(json!({
            "question_text": "Which?",
            "choices": ["A", "B"],
            "answer_mode": "mcq"
        }))
        .unwrap();
        assert_eq!(request.answer_mode, AnswerMode::Mcq);
    }

    #[test]
    fn test_blank_question_rejected() {
        let err = ReasoningRequest::boolean("   ").check().unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = ReasoningRequest::boolean("").check().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_no_confident_answer_is_null() {
        assert_eq!(serde_json::to_value(Answer::NoConfidentAnswer).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Answer::Boolean(false)).unwrap(), json!(false));
        assert_eq!(serde_json::to_value(Answer::Choice("O1".into())).unwrap(), json!("O1"));

        let back: Answer = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(back, Answer::NoConfidentAnswer);
    }

    #[test]
    fn test_cache_key_depends_on_request() {
        let snapshot = Uuid::now_v7();
        let a = ReasoningRequest::boolean("Are P1 and P2 co-affiliated?");
        let b = a.clone().with_exhaustive_evidence();

        assert_eq!(a.cache_key(snapshot), a.cache_key(snapshot));
        assert_ne!(a.cache_key(snapshot), b.cache_key(snapshot));
        assert_ne!(a.cache_key(snapshot), a.cache_key(Uuid::now_v7()));
    }

    #[test]
    fn test_degradation_codes() {
        let d = Degradation::ambiguous("ha noi", vec![10, 20]);
        assert_eq!(d.code, 4002);
        assert_eq!(d.kind.intent(), "AMBIGUOUS_ENTITY");
        assert_eq!(Degradation::entity_not_found("x").code, 4001);
        assert_eq!(Degradation::unclassified().kind.intent(), "UNCLASSIFIED");
    }
}
