//! Intent classification
//!
//! Rules are tried in table order against the question with entity
//! mentions masked out. A rule applies when its phrases match and its slots
//! can be filled from the extracted mentions; the first such rule wins.

pub mod rules;

pub use rules::{ChainTarget, MaskedText, McqProbe, Phrase, PhraseMatcher, Rule, RuleTable, SlotSpec, Template};

use crate::extractor::{Mention, MentionResolution};
use crate::normalizer::NormalizedQuestion;
use crate::request::AnswerMode;
use hopgraph_common::config::ReasoningSettings;
use hopgraph_common::errors::Result;
use tracing::{debug, info};

/// Result of classifying one question
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<'r> {
    /// Matched rule, `None` when the question is unclassified
    pub rule: Option<&'r Rule>,
    /// Mention index per slot; `None` when the phrases matched but the
    /// slots could not be filled
    pub binding: Option<Vec<usize>>,
}

impl<'r> Classification<'r> {
    pub fn unclassified() -> Self {
        Self {
            rule: None,
            binding: None,
        }
    }

    pub fn slots_satisfied(&self) -> bool {
        self.binding.is_some()
    }

    /// Intent label of the matched template, or `UNCLASSIFIED`
    pub fn intent(&self) -> &'static str {
        self.rule.map_or("UNCLASSIFIED", |r| r.template.label())
    }
}

/// Question text with every mention's tokens masked
pub fn mask_mentions<'a>(question: &'a NormalizedQuestion, mentions: &[Mention]) -> MaskedText<'a> {
    let mut tokens: Vec<Option<&str>> = (0..question.token_count()).map(|i| Some(question.token(i))).collect();
    for mention in mentions {
        for token in tokens[mention.tokens.clone()].iter_mut() {
            *token = None;
        }
    }
    MaskedText::new(tokens)
}

/// Fill slots from mentions in order.
///
/// Each slot takes the first unused mention whose resolved category fits;
/// failing that, the first unused ambiguous mention. Ambiguous mentions are
/// bound as-is and never narrowed by the slot's category.
pub fn bind_slots(slots: &[SlotSpec], mentions: &[Mention]) -> Option<Vec<usize>> {
    let mut used = vec![false; mentions.len()];
    let mut binding = Vec::with_capacity(slots.len());

    for slot in slots {
        let fits = |m: &Mention| match &m.resolution {
            MentionResolution::Resolved { category, .. } => slot.category.map_or(true, |c| c == *category),
            MentionResolution::Ambiguous { .. } => false,
        };

        let index = (0..mentions.len())
            .find(|&i| !used[i] && fits(&mentions[i]))
            .or_else(|| (0..mentions.len()).find(|&i| !used[i] && mentions[i].is_ambiguous()))?;

        used[index] = true;
        binding.push(index);
    }

    Some(binding)
}

/// Ordered rule-table classifier
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    rules: RuleTable,
}

impl IntentClassifier {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    /// Built-in table, or the table named by `reasoning.rules_file`
    pub fn from_settings(settings: &ReasoningSettings) -> Result<Self> {
        let rules = match settings.rules_file {
            Some(ref path) => RuleTable::from_file(path)?,
            None => RuleTable::defaults(),
        };
        info!(rules = rules.len(), custom = settings.rules_file.is_some(), "Classifier ready");
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn classify(&self, question: &NormalizedQuestion, mentions: &[Mention], mode: AnswerMode) -> Classification<'_> {
        let masked = mask_mentions(question, mentions);
        let mut phrase_only: Option<&Rule> = None;

        for rule in self.rules.iter().filter(|r| r.mode() == mode) {
            if !rule.matches(&masked) {
                continue;
            }
            if let Some(binding) = bind_slots(&rule.slots, mentions) {
                debug!(rule = %rule.name, intent = rule.template.label(), "Rule matched");
                return Classification {
                    rule: Some(rule),
                    binding: Some(binding),
                };
            }
            phrase_only.get_or_insert(rule);
        }

        match phrase_only {
            Some(rule) => {
                debug!(rule = %rule.name, mentions = mentions.len(), "Rule phrases matched, slots unfilled");
                Classification {
                    rule: Some(rule),
                    binding: None,
                }
            }
            None => Classification::unclassified(),
        }
    }
}
