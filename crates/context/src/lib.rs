//! HopGraph Context Engine
//!
//! Answers closed-domain questions by multi-hop traversal of an in-memory
//! knowledge graph snapshot:
//! - Question normalization and entity extraction
//! - Rule-based intent classification
//! - Direct, shared-neighbor and chain reasoning, MCQ selection
//! - Confidence scoring with an evidence trail
//! - Dataset evaluation

pub mod classifier;
pub mod engine;
pub mod evaluation;
pub mod extractor;
pub mod normalizer;
pub mod reasoner;
pub mod request;
pub mod synthesizer;

#[cfg(test)]
mod test_support;

pub use classifier::{IntentClassifier, Rule, RuleTable, Template};
pub use engine::{ReasoningCore, ReasoningEngine};
pub use evaluation::{EvaluationReport, Evaluator};
pub use request::{Answer, AnswerMode, Outcome, ReasoningRequest, ReasoningResponse};
