//! Core graph types
//!
//! Entities, categories, relation types and edges as loaded from the
//! backing store. Everything here is immutable once a snapshot is built.

use crate::catalog::fold_key;
use hopgraph_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Opaque entity identifier assigned by the importer
pub type EntityId = i64;

/// Well-known relation type names used by the built-in rule table
pub mod relations {
    pub const AFFILIATED_WITH: &str = "AFFILIATED_WITH";
    pub const REPRESENTED: &str = "REPRESENTED";
    pub const COACHED: &str = "COACHED";
    pub const BORN_IN: &str = "BORN_IN";
    pub const BASED_IN: &str = "BASED_IN";
    pub const HOME_VENUE: &str = "HOME_VENUE";
    pub const LOCATED_IN: &str = "LOCATED_IN";
    pub const COMPETES_IN: &str = "COMPETES_IN";
    pub const TEAMMATE: &str = "TEAMMATE";
    pub const CO_AFFILIATED: &str = "CO_AFFILIATED";
    pub const SAME_BIRTHPLACE: &str = "SAME_BIRTHPLACE";
}

/// Entity category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Person,
    Organization,
    Place,
    Competition,
    Venue,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Person => "person",
            EntityCategory::Organization => "organization",
            EntityCategory::Place => "place",
            EntityCategory::Competition => "competition",
            EntityCategory::Venue => "venue",
        }
    }

    /// Parse a store label, accepting the importer's domain-specific labels
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let category = match label.as_str() {
            "person" | "player" | "coach" => EntityCategory::Person,
            "organization" | "organisation" | "club" | "team" | "national_team" | "nationalteam" => {
                EntityCategory::Organization
            }
            "place" | "province" | "city" | "country" => EntityCategory::Place,
            "competition" | "league" | "tournament" => EntityCategory::Competition,
            "venue" | "stadium" => EntityCategory::Venue,
            _ => return None,
        };
        Some(category)
    }
}

impl FromStr for EntityCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        EntityCategory::parse(s).ok_or_else(|| AppError::InvalidFormat {
            message: format!("unknown entity category '{}'", s),
        })
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub category: EntityCategory,
    /// Canonical display name
    pub name: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    pub fn new(id: EntityId, category: EntityCategory, name: impl Into<String>) -> Self {
        Self {
            id,
            category,
            name: name.into(),
            properties: serde_json::Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

/// Upper-snake-case relation type name.
///
/// Construction normalizes, so `"played for"`, `"played_for"` and
/// `"PLAYED_FOR"` are the same type. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RelationType(Arc<str>);

impl RelationType {
    pub fn new(name: &str) -> Self {
        let normalized = fold_key(name).to_uppercase().replace(' ', "_");
        Self(Arc::from(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RelationType {
    fn from(name: &str) -> Self {
        RelationType::new(name)
    }
}

impl From<String> for RelationType {
    fn from(name: String) -> Self {
        RelationType::new(&name)
    }
}

impl From<RelationType> for String {
    fn from(relation: RelationType) -> Self {
        relation.0.to_string()
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationType({})", self.0)
    }
}

/// Optional temporal bounds carried by an edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_period: Option<String>,
}

impl EdgeAttributes {
    pub fn is_empty(&self) -> bool {
        self.from_period.is_none() && self.to_period.is_none()
    }
}

/// A typed directed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source: EntityId,
    pub relation: RelationType,
    pub target: EntityId,
    #[serde(flatten)]
    pub attributes: EdgeAttributes,
}

impl RelationEdge {
    pub fn new(source: EntityId, relation: impl Into<RelationType>, target: EntityId) -> Self {
        Self {
            source,
            relation: relation.into(),
            target,
            attributes: EdgeAttributes::default(),
        }
    }

    pub fn with_period(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.attributes.from_period = from.map(str::to_string);
        self.attributes.to_period = to.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_normalization() {
        assert_eq!(RelationType::new("played for"), RelationType::new("PLAYED_FOR"));
        assert_eq!(RelationType::new(" born-in ").as_str(), "BORN_IN");
        assert_eq!(RelationType::new("a__b__").as_str(), "A_B");
        assert!(RelationType::new("  ").is_empty());
    }

    #[test]
    fn test_relation_type_keeps_non_ascii_letters() {
        assert_eq!(RelationType::new("thi đấu cho").as_str(), "THI_DAU_CHO");
        assert_eq!(RelationType::new("sinh ra ở"), RelationType::new("SINH_RA_O"));
        let name = RelationType::new("Đội tuyển");
        assert_eq!(RelationType::new(name.as_str()), name);
    }

    #[test]
    fn test_relation_type_serde_roundtrip() {
        let json = serde_json::to_string(&RelationType::new("based in")).unwrap();
        assert_eq!(json, "\"BASED_IN\"");
        let parsed: RelationType = serde_json::from_str("\"based in\"").unwrap();
        assert_eq!(parsed.as_str(), "BASED_IN");
    }

    #[test]
    fn test_category_synonyms() {
        assert_eq!(EntityCategory::parse("Player"), Some(EntityCategory::Person));
        assert_eq!(EntityCategory::parse("Club"), Some(EntityCategory::Organization));
        assert_eq!(EntityCategory::parse("national team"), Some(EntityCategory::Organization));
        assert_eq!(EntityCategory::parse("Province"), Some(EntityCategory::Place));
        assert_eq!(EntityCategory::parse("stadium"), Some(EntityCategory::Venue));
        assert!("referee".parse::<EntityCategory>().is_err());
    }

    #[test]
    fn test_edge_attributes() {
        let edge = RelationEdge::new(1, "AFFILIATED_WITH", 2).with_period(Some("2016"), None);
        assert!(!edge.attributes.is_empty());
        assert_eq!(edge.attributes.from_period.as_deref(), Some("2016"));
    }
}
