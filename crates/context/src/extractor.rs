//! Entity mention extraction
//!
//! Scans the folded question against the alias index, longest match first,
//! on token boundaries only. MCQ candidates are resolved one by one and are
//! never extracted from the stem.

use crate::normalizer::NormalizedQuestion;
use hopgraph_common::errors::{AppError, Result};
use hopgraph_graph::{EntityCategory, EntityId, GraphSnapshot, Resolution};
use regex_lite::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;
use tracing::trace;

/// Single tokens never treated as a mention on their own
const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "and", "or", "of", "in", "at", "for", "with", "to", "which",
    "who", "what", "where", "did", "does", "do", "same", "co", "va", "la", "cua", "o", "tai", "cho", "khong",
    "nao", "da", "tung", "cung", "voi", "doi",
];

/// Leading choice labels: `A.`, `b)`, `(C)`, `1:`
const CHOICE_LABEL_PATTERN: &str = r"^\s*\(?(?:[A-Za-z]|[0-9]{1,2})\s*[.):]\s*";

/// How a mention resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MentionResolution {
    Resolved { id: EntityId, category: EntityCategory },
    Ambiguous { ids: Vec<EntityId> },
}

/// An entity mention found in the question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention {
    /// Byte range in the folded text
    pub span: Range<usize>,
    /// Token range in the folded text
    pub tokens: Range<usize>,
    /// Folded surface form
    pub text: String,
    pub resolution: MentionResolution,
}

impl Mention {
    pub fn entity(&self) -> Option<EntityId> {
        match self.resolution {
            MentionResolution::Resolved { id, .. } => Some(id),
            MentionResolution::Ambiguous { .. } => None,
        }
    }

    pub fn category(&self) -> Option<EntityCategory> {
        match self.resolution {
            MentionResolution::Resolved { category, .. } => Some(category),
            MentionResolution::Ambiguous { .. } => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.resolution, MentionResolution::Ambiguous { .. })
    }
}

/// An MCQ candidate and its independent resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The candidate exactly as supplied; returned verbatim when selected
    pub text: String,
    pub resolution: Resolution,
}

/// Split `stem | choice | choice` into the stem and trimmed choices
pub fn split_inline_choices(text: &str, delimiter: &str) -> (String, Vec<String>) {
    if delimiter.is_empty() || !text.contains(delimiter) {
        return (text.to_string(), Vec::new());
    }

    let mut parts = text.split(delimiter);
    let stem = parts.next().unwrap_or_default().trim().to_string();
    let choices = parts
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    (stem, choices)
}

pub struct EntityExtractor {
    stop_words: HashSet<String>,
    choice_label: Regex,
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::Internal {
        message: format!("Invalid pattern '{}': {}", pattern, e),
    })
}

impl EntityExtractor {
    pub fn new() -> Result<Self> {
        Self::with_stop_words(DEFAULT_STOP_WORDS.iter().copied())
    }

    pub fn with_stop_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Ok(Self {
            stop_words: words.into_iter().map(hopgraph_graph::fold_key).collect(),
            choice_label: compile_pattern(CHOICE_LABEL_PATTERN)?,
        })
    }

    /// Find entity mentions, ordered by position
    pub fn extract(&self, question: &NormalizedQuestion, snapshot: &GraphSnapshot) -> Vec<Mention> {
        let aliases = snapshot.aliases();
        let n = question.token_count();
        let max_len = aliases.max_key_tokens().min(n);

        // (start, len, resolution) for every n-gram that is a key
        let mut candidates: Vec<(usize, usize, Resolution)> = Vec::new();
        for start in 0..n {
            for len in 1..=max_len.min(n - start) {
                let key = question.token_text(start..start + len);
                if len == 1 && self.stop_words.contains(key) {
                    continue;
                }
                match aliases.resolve_key(key) {
                    Resolution::NotFound => {}
                    resolution => candidates.push((start, len, resolution)),
                }
            }
        }

        // Longest first, then leftmost
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut taken = vec![false; n];
        let mut mentions = Vec::new();
        for (start, len, resolution) in candidates {
            let tokens = start..start + len;
            if taken[tokens.clone()].iter().any(|t| *t) {
                continue;
            }

            let resolution = match resolution {
                Resolution::Resolved(id) => match snapshot.catalog().category(id) {
                    Some(category) => MentionResolution::Resolved { id, category },
                    None => continue,
                },
                Resolution::Ambiguous(ids) => MentionResolution::Ambiguous { ids },
                Resolution::NotFound => continue,
            };

            taken[tokens.clone()].iter_mut().for_each(|t| *t = true);
            let span = question.tokens[start].start..question.tokens[start + len - 1].end;
            mentions.push(Mention {
                text: question.folded[span.clone()].to_string(),
                span,
                tokens,
                resolution,
            });
        }

        mentions.sort_by_key(|m| m.tokens.start);
        trace!(count = mentions.len(), "Extracted mentions");
        mentions
    }

    /// Remove a leading choice label
    pub fn strip_choice_label<'a>(&self, choice: &'a str) -> &'a str {
        match self.choice_label.find(choice) {
            Some(m) => choice[m.end()..].trim(),
            None => choice.trim(),
        }
    }

    /// Resolve each candidate on its own.
    ///
    /// The full text is tried first so names such as `V.League 1` keep their
    /// leading letter; the label is stripped only when the full text is unknown.
    pub fn resolve_candidates(&self, choices: &[String], snapshot: &GraphSnapshot) -> Vec<Candidate> {
        let aliases = snapshot.aliases();
        choices
            .iter()
            .map(|choice| {
                let mut resolution = aliases.resolve(choice);
                let stripped = self.strip_choice_label(choice);
                if resolution == Resolution::NotFound && stripped != choice.trim() {
                    resolution = aliases.resolve(stripped);
                }
                Candidate {
                    text: choice.clone(),
                    resolution,
                }
            })
            .collect()
    }
}
