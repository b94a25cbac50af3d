//! Classifier rule table
//!
//! Rules are data: a phrase matcher, typed entity slots and a reasoning
//! template. The built-in table covers English and Vietnamese phrasings of
//! the football domain; a replacement table can be loaded from a file.

use crate::request::AnswerMode;
use hopgraph_common::errors::{AppError, Result};
use hopgraph_graph::catalog::fold_key;
use hopgraph_graph::model::relations;
use hopgraph_graph::{EntityCategory, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A folded phrase, matched token by token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Phrase {
    folded: String,
    tokens: Vec<String>,
}

impl Phrase {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn as_str(&self) -> &str {
        &self.folded
    }
}

impl From<String> for Phrase {
    fn from(text: String) -> Self {
        Phrase::from(text.as_str())
    }
}

impl From<&str> for Phrase {
    fn from(text: &str) -> Self {
        let folded = fold_key(text);
        let tokens = folded.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        Self { folded, tokens }
    }
}

impl From<Phrase> for String {
    fn from(phrase: Phrase) -> Self {
        phrase.folded
    }
}

/// Token sequence of a question with mention tokens masked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedText<'a> {
    tokens: Vec<Option<&'a str>>,
}

impl<'a> MaskedText<'a> {
    pub fn new(tokens: Vec<Option<&'a str>>) -> Self {
        Self { tokens }
    }

    /// Whether `phrase` occurs on token boundaries without crossing a mask
    pub fn contains(&self, phrase: &Phrase) -> bool {
        let wanted = phrase.tokens();
        if wanted.is_empty() || wanted.len() > self.tokens.len() {
            return false;
        }
        self.tokens
            .windows(wanted.len())
            .any(|window| window.iter().zip(wanted).all(|(t, w)| *t == Some(w.as_str())))
    }
}

/// Phrase conditions of a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhraseMatcher {
    /// At least one must occur
    #[serde(default)]
    pub any_of: Vec<Phrase>,
    /// When non-empty, at least one of these must occur as well
    #[serde(default)]
    pub also_any_of: Vec<Phrase>,
    /// Every one must occur
    #[serde(default)]
    pub all_of: Vec<Phrase>,
    /// None may occur
    #[serde(default)]
    pub none_of: Vec<Phrase>,
}

impl PhraseMatcher {
    pub fn any_of(phrases: &[&str]) -> Self {
        Self {
            any_of: phrases.iter().map(|p| Phrase::from(*p)).collect(),
            ..Self::default()
        }
    }

    pub fn also_any_of(mut self, phrases: &[&str]) -> Self {
        self.also_any_of = phrases.iter().map(|p| Phrase::from(*p)).collect();
        self
    }

    pub fn all_of(mut self, phrases: &[&str]) -> Self {
        self.all_of = phrases.iter().map(|p| Phrase::from(*p)).collect();
        self
    }

    pub fn none_of(mut self, phrases: &[&str]) -> Self {
        self.none_of = phrases.iter().map(|p| Phrase::from(*p)).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.any_of.is_empty() && self.all_of.is_empty()
    }

    pub fn matches(&self, text: &MaskedText<'_>) -> bool {
        if self.is_empty() {
            return false;
        }
        (self.any_of.is_empty() || self.any_of.iter().any(|p| text.contains(p)))
            && (self.also_any_of.is_empty() || self.also_any_of.iter().any(|p| text.contains(p)))
            && self.all_of.iter().all(|p| text.contains(p))
            && !self.none_of.iter().any(|p| text.contains(p))
    }
}

/// An entity slot a rule needs filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    #[serde(default)]
    pub category: Option<EntityCategory>,
}

impl SlotSpec {
    pub fn new(name: &str, category: EntityCategory) -> Self {
        Self {
            name: name.to_string(),
            category: Some(category),
        }
    }

    pub fn any(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: None,
        }
    }
}

/// What the second hop of a chain must reach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainTarget {
    /// The entity bound to the rule's second slot
    Slot,
    /// Any node whose property `key` equals `value` (folded comparison)
    PropertyEquals { key: String, value: String },
    /// A node the second slot's entity also reaches via `relation`
    MeetsSlot { relation: RelationType },
}

/// Relation tested between the MCQ stem entity and each candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum McqProbe {
    /// `stem -relation-> candidate`, or the reverse when `stem_is_source` is false
    Direct {
        relation: RelationType,
        #[serde(default = "default_true")]
        stem_is_source: bool,
    },
    /// Stem and candidate share a neighbor via `relation`
    Shared { relation: RelationType },
}

/// Reasoning template a rule dispatches to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Template {
    DirectRelation {
        relation: RelationType,
    },
    SharedNeighbor {
        relation: RelationType,
    },
    Chain {
        first: RelationType,
        second: RelationType,
        target: ChainTarget,
    },
    McqSelect {
        probe: McqProbe,
    },
}

impl Template {
    /// Intent label
    pub fn label(&self) -> &'static str {
        match self {
            Template::DirectRelation { .. } => "DIRECT_RELATION",
            Template::SharedNeighbor { .. } => "SHARED_NEIGHBOR",
            Template::Chain { .. } => "CHAIN",
            Template::McqSelect { .. } => "MCQ_SELECT",
        }
    }

    /// Number of entity slots the template consumes
    pub fn required_slots(&self) -> usize {
        match self {
            Template::DirectRelation { .. } | Template::SharedNeighbor { .. } => 2,
            Template::Chain { target, .. } => match target {
                ChainTarget::PropertyEquals { .. } => 1,
                ChainTarget::Slot | ChainTarget::MeetsSlot { .. } => 2,
            },
            Template::McqSelect { .. } => 1,
        }
    }

    /// Edges in one evidence chain
    pub fn hops(&self) -> usize {
        match self {
            Template::DirectRelation { .. } => 1,
            Template::SharedNeighbor { .. } => 2,
            Template::Chain { target, .. } => match target {
                ChainTarget::MeetsSlot { .. } => 3,
                _ => 2,
            },
            Template::McqSelect { probe } => match probe {
                McqProbe::Direct { .. } => 1,
                McqProbe::Shared { .. } => 2,
            },
        }
    }

    pub fn mode(&self) -> AnswerMode {
        match self {
            Template::McqSelect { .. } => AnswerMode::Mcq,
            _ => AnswerMode::Boolean,
        }
    }
}

/// One classifier rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub matcher: PhraseMatcher,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
    pub template: Template,
    /// Scales multi-hop and MCQ confidence, in (0, 1]
    #[serde(default = "default_specificity")]
    pub specificity: f32,
}

impl Rule {
    pub fn new(name: &str, matcher: PhraseMatcher, slots: Vec<SlotSpec>, template: Template) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            slots,
            template,
            specificity: 1.0,
        }
    }

    pub fn with_specificity(mut self, specificity: f32) -> Self {
        self.specificity = specificity;
        self
    }

    pub fn mode(&self) -> AnswerMode {
        self.template.mode()
    }

    /// Phrase test on its own, independent of the rest of the table
    pub fn matches(&self, text: &MaskedText<'_>) -> bool {
        self.matcher.matches(text)
    }

    fn check(&self) -> Result<()> {
        let invalid = |message: String| AppError::Configuration {
            message: format!("rule '{}': {}", self.name, message),
        };

        if self.name.trim().is_empty() {
            return Err(AppError::Configuration {
                message: "rule with an empty name".into(),
            });
        }
        if self.matcher.is_empty() {
            return Err(invalid("matcher needs any_of or all_of phrases".into()));
        }
        if self.slots.len() != self.template.required_slots() {
            return Err(invalid(format!(
                "{} needs {} slots, {} declared",
                self.template.label(),
                self.template.required_slots(),
                self.slots.len()
            )));
        }
        if !(self.specificity > 0.0 && self.specificity <= 1.0) {
            return Err(invalid(format!("specificity {} outside (0, 1]", self.specificity)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<Rule>,
}

/// Ordered, validated rule table
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Validate rules; order is evaluation order
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut names = HashSet::new();
        for rule in &rules {
            rule.check()?;
            if !names.insert(rule.name.as_str()) {
                return Err(AppError::Configuration {
                    message: format!("duplicate rule name '{}'", rule.name),
                });
            }
        }
        Ok(Self { rules })
    }

    /// Load a table from a TOML, YAML or JSON file with a `rules` array
    pub fn from_file(path: &str) -> Result<Self> {
        let file: RuleFile = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize()?;
        debug!(path, count = file.rules.len(), "Loaded rule table");
        Self::new(file.rules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The built-in table
    pub fn defaults() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::defaults()
    }
}

fn default_true() -> bool {
    true
}

fn default_specificity() -> f32 {
    1.0
}

const AFFILIATION_PHRASES: &[&str] = &[
    "affiliated with",
    "played for",
    "plays for",
    "play for",
    "playing for",
    "member of",
    "thi đấu cho",
    "chơi cho",
    "khoác áo",
    "từng chơi cho",
    "đầu quân cho",
];

fn direct(name: &str, phrases: &[&str], slots: [(&str, EntityCategory); 2], relation: &str) -> Rule {
    Rule::new(
        name,
        PhraseMatcher::any_of(phrases),
        slots.iter().map(|(n, c)| SlotSpec::new(n, *c)).collect(),
        Template::DirectRelation {
            relation: RelationType::new(relation),
        },
    )
}

fn shared(name: &str, phrases: &[&str], relation: &str) -> Rule {
    Rule::new(
        name,
        PhraseMatcher::any_of(phrases),
        vec![
            SlotSpec::new("first", EntityCategory::Person),
            SlotSpec::new("second", EntityCategory::Person),
        ],
        Template::SharedNeighbor {
            relation: RelationType::new(relation),
        },
    )
}

fn mcq(name: &str, phrases: &[&str], stem: EntityCategory, probe: McqProbe) -> Rule {
    Rule::new(
        name,
        PhraseMatcher::any_of(phrases),
        vec![SlotSpec::new("stem", stem)],
        Template::McqSelect { probe },
    )
}

fn probe(relation: &str, stem_is_source: bool) -> McqProbe {
    McqProbe::Direct {
        relation: RelationType::new(relation),
        stem_is_source,
    }
}

/// Most specific rules first
fn default_rules() -> Vec<Rule> {
    use EntityCategory::{Competition, Organization, Person, Place, Venue};

    vec![
        // Multiple choice
        mcq(
            "mcq_club_based_in",
            &[
                "which club is based",
                "which team is based",
                "which organization is based",
                "câu lạc bộ nào có trụ sở",
                "đội bóng nào có trụ sở",
            ],
            Place,
            probe(relations::BASED_IN, false),
        ),
        mcq(
            "mcq_member_of",
            &[
                "which player",
                "which person",
                "who played for",
                "who plays for",
                "cầu thủ nào",
            ],
            Organization,
            probe(relations::AFFILIATED_WITH, false),
        ),
        mcq(
            "mcq_coached_which",
            &["coached which", "coach of which", "huấn luyện đội nào", "dẫn dắt đội nào"],
            Person,
            probe(relations::COACHED, true),
        ),
        mcq(
            "mcq_teammate_of",
            &[
                "teammate of",
                "played alongside",
                "same club as",
                "đồng đội của",
                "cùng câu lạc bộ với",
            ],
            Person,
            McqProbe::Shared {
                relation: RelationType::new(relations::AFFILIATED_WITH),
            },
        ),
        mcq(
            "mcq_based_where",
            &[
                "based in which",
                "based where",
                "where is",
                "headquartered in which",
                "có trụ sở ở đâu",
                "có trụ sở ở tỉnh nào",
                "đóng ở đâu",
            ],
            Organization,
            probe(relations::BASED_IN, true),
        ),
        mcq(
            "mcq_born_where",
            &[
                "born in which",
                "born where",
                "where was",
                "hometown",
                "sinh ra ở đâu",
                "sinh ra ở tỉnh nào",
                "quê ở đâu",
                "quê ở tỉnh nào",
                "quê",
            ],
            Person,
            probe(relations::BORN_IN, true),
        ),
        mcq(
            "mcq_affiliated_with_which",
            &[
                "affiliated with which",
                "played for which",
                "plays for which",
                "play for which",
                "which club",
                "which team",
                "which organization",
                "thi đấu cho câu lạc bộ nào",
                "chơi cho câu lạc bộ nào",
                "chơi cho đội nào",
                "câu lạc bộ nào",
                "đội bóng nào",
            ],
            Person,
            probe(relations::AFFILIATED_WITH, true),
        ),
        // Three-edge chain: club in the other person's home province
        Rule::new(
            "chain_club_in_home_province",
            PhraseMatcher::any_of(AFFILIATION_PHRASES).also_any_of(&[
                "home province",
                "hometown",
                "quê nhà",
                "quê hương",
                "quê của",
                "tỉnh nhà",
            ]),
            vec![
                SlotSpec::new("player", Person),
                SlotSpec::new("native", Person),
            ],
            Template::Chain {
                first: RelationType::new(relations::AFFILIATED_WITH),
                second: RelationType::new(relations::BASED_IN),
                target: ChainTarget::MeetsSlot {
                    relation: RelationType::new(relations::BORN_IN),
                },
            },
        ),
        // Two-edge chain: club based in a place
        Rule::new(
            "chain_club_based_in",
            PhraseMatcher::any_of(AFFILIATION_PHRASES).also_any_of(&[
                "based in",
                "club in",
                "team in",
                "club from",
                "có trụ sở ở",
                "có trụ sở tại",
                "đóng ở",
                "câu lạc bộ ở",
                "đội bóng ở",
                "clb ở",
            ]),
            vec![SlotSpec::new("player", Person), SlotSpec::new("place", Place)],
            Template::Chain {
                first: RelationType::new(relations::AFFILIATED_WITH),
                second: RelationType::new(relations::BASED_IN),
                target: ChainTarget::Slot,
            },
        ),
        // Shared neighbors
        shared(
            "shared_national_team",
            &["same national team", "cùng đội tuyển", "cùng đtqg"],
            relations::REPRESENTED,
        ),
        shared(
            "shared_affiliation",
            &[
                "co affiliated",
                "same club",
                "same team",
                "played together",
                "play together",
                "cùng câu lạc bộ",
                "cùng clb",
                "cùng đội",
                "chơi cùng",
            ],
            relations::AFFILIATED_WITH,
        ),
        shared(
            "shared_birthplace",
            &[
                "same hometown",
                "same birthplace",
                "same province",
                "born in the same",
                "cùng quê",
                "cùng tỉnh",
                "đồng hương",
            ],
            relations::BORN_IN,
        ),
        // Single edge
        direct(
            "direct_teammate",
            &["teammate", "teammates", "đồng đội"],
            [("first", Person), ("second", Person)],
            relations::TEAMMATE,
        ),
        direct(
            "direct_coached",
            &["coached", "coach of", "managed", "huấn luyện", "dẫn dắt"],
            [("coach", Person), ("team", Organization)],
            relations::COACHED,
        ),
        direct(
            "direct_born_in",
            &[
                "born in",
                "born at",
                "hometown",
                "comes from",
                "native of",
                "sinh ra ở",
                "sinh ra tại",
                "sinh ở",
                "quê ở",
                "quê tại",
                "đến từ",
                "quê",
            ],
            [("person", Person), ("place", Place)],
            relations::BORN_IN,
        ),
        direct(
            "direct_based_in",
            &[
                "based in",
                "headquartered in",
                "located in",
                "có trụ sở ở",
                "có trụ sở tại",
                "đóng ở",
                "đặt trụ sở",
            ],
            [("organization", Organization), ("place", Place)],
            relations::BASED_IN,
        ),
        direct(
            "direct_home_venue",
            &["home ground", "home stadium", "home venue", "plays at", "play at", "sân nhà"],
            [("organization", Organization), ("venue", Venue)],
            relations::HOME_VENUE,
        ),
        direct(
            "direct_competes_in",
            &["compete in", "competes in", "competed in", "thi đấu ở giải", "thi đấu tại giải", "tham dự"],
            [("organization", Organization), ("competition", Competition)],
            relations::COMPETES_IN,
        ),
        direct(
            "direct_represented",
            &["represented", "national team", "đội tuyển"],
            [("person", Person), ("team", Organization)],
            relations::REPRESENTED,
        ),
        direct(
            "direct_affiliated",
            AFFILIATION_PHRASES,
            [("person", Person), ("organization", Organization)],
            relations::AFFILIATED_WITH,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(words: &[Option<&'static str>]) -> MaskedText<'static> {
        MaskedText::new(words.to_vec())
    }

    #[test]
    fn test_phrase_folding() {
        let phrase = Phrase::from("Cùng Câu-lạc-bộ");
        assert_eq!(phrase.as_str(), "cung cau lac bo");
        assert_eq!(phrase.tokens().len(), 4);
    }

    #[test]
    fn test_masked_text_respects_boundaries() {
        let t = text(&[Some("are"), None, Some("and"), None, Some("co"), Some("affiliated")]);
        assert!(t.contains(&Phrase::from("co-affiliated")));
        assert!(!t.contains(&Phrase::from("affiliated with")));
        // A phrase may not run across a masked mention
        assert!(!t.contains(&Phrase::from("are and")));
        assert!(!t.contains(&Phrase::from("affil")));
    }

    #[test]
    fn test_matcher_conditions() {
        let matcher = PhraseMatcher::any_of(&["played for"])
            .also_any_of(&["based in"])
            .none_of(&["never"]);

        let hit = text(&[None, Some("played"), Some("for"), Some("a"), Some("club"), Some("based"), Some("in"), None]);
        assert!(matcher.matches(&hit));

        let no_context = text(&[None, Some("played"), Some("for"), None]);
        assert!(!matcher.matches(&no_context));

        let excluded = text(&[None, Some("never"), Some("played"), Some("for"), Some("based"), Some("in"), None]);
        assert!(!matcher.matches(&excluded));

        assert!(!PhraseMatcher::default().matches(&hit));
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = RuleTable::new(default_rules()).unwrap();
        assert_eq!(table.len(), RuleTable::defaults().len());
        assert!(table.get("shared_affiliation").is_some());

        for rule in table.iter() {
            assert_eq!(rule.slots.len(), rule.template.required_slots(), "{}", rule.name);
        }
    }

    #[test]
    fn test_mcq_rules_precede_boolean_rules() {
        let table = RuleTable::defaults();
        let first_boolean = table.iter().position(|r| r.mode() == AnswerMode::Boolean).unwrap();
        assert!(table.iter().skip(first_boolean).all(|r| r.mode() == AnswerMode::Boolean));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut rule = RuleTable::defaults().get("direct_born_in").cloned().unwrap();
        rule.slots.pop();
        assert!(matches!(RuleTable::new(vec![rule]), Err(AppError::Configuration { .. })));

        let rule = RuleTable::defaults().get("direct_born_in").cloned().unwrap();
        let duplicate = vec![rule.clone(), rule.clone()];
        assert!(RuleTable::new(duplicate).is_err());

        let zero = rule.with_specificity(0.0);
        assert!(RuleTable::new(vec![zero]).is_err());
    }

    #[test]
    fn test_rules_deserialize() {
        let json = serde_json::json!({
            "rules": [{
                "name": "custom_chain",
                "matcher": { "any_of": ["played for"], "also_any_of": ["v-league club"] },
                "slots": [{ "name": "player", "category": "person" }],
                "template": {
                    "kind": "chain",
                    "first": "affiliated with",
                    "second": "competes_in",
                    "target": { "kind": "property_equals", "key": "tier", "value": "1" }
                },
                "specificity": 0.9
            }]
        });
        let file: RuleFile = serde_json::from_value(json).unwrap();
        let table = RuleTable::new(file.rules).unwrap();
        let rule = table.get("custom_chain").unwrap();

        assert_eq!(rule.matcher.also_any_of[0].as_str(), "v league club");
        assert_eq!(rule.slots[0].category, Some(EntityCategory::Person));
        match &rule.template {
            Template::Chain { first, target, .. } => {
                assert_eq!(first.as_str(), "AFFILIATED_WITH");
                assert!(matches!(target, ChainTarget::PropertyEquals { .. }));
            }
            other => panic!("unexpected template {:?}", other),
        }
    }
}
