//! Alias index
//!
//! A folded-key hash map built once per snapshot from three tiers:
//! canonical names, curated aliases and derived name variants. A key that
//! names more than one entity is kept as [`Resolution::Ambiguous`]; it is
//! never collapsed to a single pick.

use super::normalize::{fold_key, token_count};
use super::EntityCatalog;
use crate::model::{Entity, EntityCategory, EntityId};
use hopgraph_common::config::ResolverSettings;
use hopgraph_common::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of resolving a surface form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "ids", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(EntityId),
    Ambiguous(Vec<EntityId>),
    NotFound,
}

impl Resolution {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Resolution::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Where an alias key came from. Lower tiers are explicit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasTier {
    Canonical,
    Curated,
    Derived,
}

impl AliasTier {
    fn is_explicit(&self) -> bool {
        !matches!(self, AliasTier::Derived)
    }
}

/// One curated alias row (abbreviation, nickname, former name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedAlias {
    pub alias: String,
    /// Canonical name of the target entity
    pub canonical: String,
    /// Restricts the target when the canonical name is shared across categories
    #[serde(default)]
    pub category: Option<EntityCategory>,
}

impl CuratedAlias {
    pub fn new(alias: &str, canonical: &str) -> Self {
        Self {
            alias: alias.to_string(),
            canonical: canonical.to_string(),
            category: None,
        }
    }

    pub fn for_category(mut self, category: EntityCategory) -> Self {
        self.category = Some(category);
        self
    }
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: Vec<CuratedAlias>,
}

/// Load a curated alias table (TOML, YAML or JSON with an `aliases` array)
pub fn load_curated_aliases(path: &str) -> Result<Vec<CuratedAlias>> {
    let file: AliasFile = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?
        .try_deserialize()?;
    debug!(path, count = file.aliases.len(), "Loaded curated aliases");
    Ok(file.aliases)
}

/// Variant generation options
#[derive(Debug, Clone)]
pub struct AliasOptions {
    /// Generate given-name and prefix-stripped variants
    pub derive_variants: bool,
    /// Folded name prefixes removed when deriving variants
    pub strip_prefixes: Vec<String>,
    /// Minimum length (in characters) of a derived variant
    pub min_variant_len: usize,
}

impl Default for AliasOptions {
    fn default() -> Self {
        Self::from(&ResolverSettings::default())
    }
}

impl From<&ResolverSettings> for AliasOptions {
    fn from(settings: &ResolverSettings) -> Self {
        let mut strip_prefixes: Vec<String> = settings
            .strip_prefixes
            .iter()
            .map(|p| fold_key(p))
            .filter(|p| !p.is_empty())
            .collect();
        // Longest prefix first so "cau lac bo bong da" wins over "cau lac bo"
        strip_prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        Self {
            derive_variants: settings.derive_variants,
            strip_prefixes,
            min_variant_len: settings.min_variant_len,
        }
    }
}

#[derive(Debug, Clone)]
enum AliasTarget {
    Unique(EntityId),
    /// Sorted, deduplicated
    Ambiguous(Vec<EntityId>),
}

#[derive(Debug, Clone)]
struct AliasEntry {
    target: AliasTarget,
    tier: AliasTier,
}

/// Read-only alias lookup table
#[derive(Debug, Default)]
pub struct AliasIndex {
    entries: HashMap<String, AliasEntry>,
    max_key_tokens: usize,
}

impl AliasIndex {
    /// Build the index from a catalog and curated aliases
    pub fn build(catalog: &EntityCatalog, curated: &[CuratedAlias], options: &AliasOptions) -> Self {
        let mut index = Self::default();

        for entity in catalog.iter() {
            index.insert(fold_key(&entity.name), entity.id, AliasTier::Canonical);
        }

        for row in curated {
            let targets: Vec<EntityId> = catalog
                .ids_by_name(&row.canonical)
                .iter()
                .copied()
                .filter(|id| match row.category {
                    Some(category) => catalog.category(*id) == Some(category),
                    None => true,
                })
                .collect();
            if targets.is_empty() {
                warn!(alias = %row.alias, canonical = %row.canonical, "Curated alias names an unknown entity, skipping");
                continue;
            }
            let key = fold_key(&row.alias);
            for id in targets {
                index.insert(key.clone(), id, AliasTier::Curated);
            }
        }

        if options.derive_variants {
            for entity in catalog.iter() {
                for variant in derive_variants(entity, options) {
                    index.insert(variant, entity.id, AliasTier::Derived);
                }
            }
        }

        index.max_key_tokens = index.entries.keys().map(|k| token_count(k)).max().unwrap_or(0);
        index
    }

    fn insert(&mut self, key: String, id: EntityId, tier: AliasTier) {
        if key.is_empty() {
            return;
        }

        let Some(entry) = self.entries.get_mut(&key) else {
            self.entries.insert(key, AliasEntry { target: AliasTarget::Unique(id), tier });
            return;
        };

        match (entry.tier.is_explicit(), tier.is_explicit()) {
            // Heuristic variants never shadow explicit data
            (true, false) => return,
            (false, true) => {
                *entry = AliasEntry { target: AliasTarget::Unique(id), tier };
                return;
            }
            _ => {}
        }

        entry.tier = entry.tier.min(tier);
        entry.target = match &entry.target {
            AliasTarget::Unique(existing) if *existing == id => AliasTarget::Unique(id),
            AliasTarget::Unique(existing) => {
                debug!(key = %key, first = *existing, second = id, "Alias conflict, marking ambiguous");
                let mut ids = vec![*existing, id];
                ids.sort_unstable();
                AliasTarget::Ambiguous(ids)
            }
            AliasTarget::Ambiguous(ids) => {
                let mut ids = ids.clone();
                if let Err(pos) = ids.binary_search(&id) {
                    ids.insert(pos, id);
                }
                AliasTarget::Ambiguous(ids)
            }
        };
    }

    /// Resolve arbitrary text (folded first)
    pub fn resolve(&self, text: &str) -> Resolution {
        self.resolve_key(&fold_key(text))
    }

    /// Resolve an already folded key
    pub fn resolve_key(&self, key: &str) -> Resolution {
        match self.entries.get(key).map(|e| &e.target) {
            Some(AliasTarget::Unique(id)) => Resolution::Resolved(*id),
            Some(AliasTarget::Ambiguous(ids)) => Resolution::Ambiguous(ids.clone()),
            None => Resolution::NotFound,
        }
    }

    #[cfg(test)]
    pub(crate) fn tier(&self, key: &str) -> Option<AliasTier> {
        self.entries.get(key).map(|e| e.tier)
    }

    /// Longest key, in tokens; bounds the extractor's n-gram scan
    pub fn max_key_tokens(&self) -> usize {
        self.max_key_tokens
    }

    /// Keys naming more than one entity
    pub fn ambiguous_keys(&self) -> impl Iterator<Item = (&str, &[EntityId])> {
        self.entries.iter().filter_map(|(key, entry)| match &entry.target {
            AliasTarget::Ambiguous(ids) => Some((key.as_str(), ids.as_slice())),
            AliasTarget::Unique(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn derive_variants(entity: &Entity, options: &AliasOptions) -> Vec<String> {
    let folded = fold_key(&entity.name);
    let mut variants = Vec::new();

    // Vietnamese-style person names: family name first, given name last
    if entity.category == EntityCategory::Person {
        let tokens: Vec<&str> = folded.split(' ').collect();
        if tokens.len() >= 3 {
            variants.push(tokens[tokens.len() - 2..].join(" "));
        }
    }

    for prefix in &options.strip_prefixes {
        if let Some(rest) = folded.strip_prefix(prefix.as_str()) {
            if let Some(rest) = rest.strip_prefix(' ') {
                variants.push(rest.to_string());
                break;
            }
        }
    }

    variants.retain(|v| v.chars().count() >= options.min_variant_len && *v != folded);
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Entity::new(1, EntityCategory::Person, "Nguyễn Quang Hải"),
            Entity::new(2, EntityCategory::Organization, "Câu lạc bộ bóng đá Hà Nội"),
            Entity::new(3, EntityCategory::Place, "Hà Nội"),
            Entity::new(4, EntityCategory::Organization, "Hoàng Anh Gia Lai"),
            Entity::new(5, EntityCategory::Person, "Trần Quang Hải"),
            Entity::new(6, EntityCategory::Person, "Nguyễn Công Phượng"),
        ])
        .unwrap()
    }

    #[test]
    fn test_canonical_resolution_is_diacritic_insensitive() {
        let index = AliasIndex::build(&catalog(), &[], &AliasOptions::default());
        assert_eq!(index.resolve("nguyen cong phuong"), Resolution::Resolved(6));
        assert_eq!(index.resolve("NGUYỄN CÔNG PHƯỢNG"), Resolution::Resolved(6));
        assert_eq!(index.resolve("Zzznotfound"), Resolution::NotFound);
    }

    #[test]
    fn test_curated_alias() {
        let curated = vec![CuratedAlias::new("HAGL", "Hoàng Anh Gia Lai")];
        let index = AliasIndex::build(&catalog(), &curated, &AliasOptions::default());
        assert_eq!(index.resolve("hagl"), Resolution::Resolved(4));
        assert_eq!(index.tier("hagl"), Some(AliasTier::Curated));
    }

    #[test]
    fn test_conflicting_aliases_are_ambiguous() {
        // The stripped club name collides with the province only at the
        // derived tier, so the explicit province name stays unique.
        let index = AliasIndex::build(&catalog(), &[], &AliasOptions::default());
        assert_eq!(index.resolve("Hà Nội"), Resolution::Resolved(3));

        // An explicit alias pointing at the club makes the key ambiguous
        let curated = vec![CuratedAlias::new("Hà Nội", "Câu lạc bộ bóng đá Hà Nội")];
        let index = AliasIndex::build(&catalog(), &curated, &AliasOptions::default());
        assert_eq!(index.resolve("ha noi"), Resolution::Ambiguous(vec![2, 3]));
        assert!(index.ambiguous_keys().any(|(key, ids)| key == "ha noi" && ids == [2, 3]));
    }

    #[test]
    fn test_derived_given_name_conflict() {
        let index = AliasIndex::build(&catalog(), &[], &AliasOptions::default());
        // Both "Nguyễn Quang Hải" and "Trần Quang Hải" derive "quang hai"
        assert_eq!(index.resolve("Quang Hải"), Resolution::Ambiguous(vec![1, 5]));
        assert_eq!(index.resolve("Công Phượng"), Resolution::Resolved(6));
        assert_eq!(index.tier("cong phuong"), Some(AliasTier::Derived));
    }

    #[test]
    fn test_prefix_stripping() {
        let mut catalog_entities = vec![Entity::new(9, EntityCategory::Organization, "CLB Sông Lam Nghệ An")];
        catalog_entities.push(Entity::new(10, EntityCategory::Place, "Nghệ An"));
        let catalog = EntityCatalog::new(catalog_entities).unwrap();
        let index = AliasIndex::build(&catalog, &[], &AliasOptions::default());
        assert_eq!(index.resolve("Sông Lam Nghệ An"), Resolution::Resolved(9));
        assert_eq!(index.resolve("Nghệ An"), Resolution::Resolved(10));
    }

    #[test]
    fn test_variants_disabled() {
        let options = AliasOptions {
            derive_variants: false,
            ..AliasOptions::default()
        };
        let index = AliasIndex::build(&catalog(), &[], &options);
        assert_eq!(index.resolve("Công Phượng"), Resolution::NotFound);
    }

    #[test]
    fn test_curated_alias_with_unknown_target_is_skipped() {
        let curated = vec![CuratedAlias::new("XYZ", "Does Not Exist")];
        let index = AliasIndex::build(&catalog(), &curated, &AliasOptions::default());
        assert_eq!(index.resolve("xyz"), Resolution::NotFound);
    }

    #[test]
    fn test_category_restricted_alias() {
        let entities = vec![
            Entity::new(2, EntityCategory::Organization, "Hà Nội"),
            Entity::new(3, EntityCategory::Place, "Hà Nội"),
        ];
        let catalog = EntityCatalog::new(entities).unwrap();
        let curated = vec![CuratedAlias::new("Hanoi FC", "Hà Nội").for_category(EntityCategory::Organization)];
        let index = AliasIndex::build(&catalog, &curated, &AliasOptions::default());
        assert_eq!(index.resolve("hanoi fc"), Resolution::Resolved(2));
        assert_eq!(index.resolve("Hà Nội"), Resolution::Ambiguous(vec![2, 3]));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let catalog = catalog();
        let curated = vec![CuratedAlias::new("HAGL", "Hoàng Anh Gia Lai")];
        let index = AliasIndex::build(&catalog, &curated, &AliasOptions::default());

        for text in ["HAGL", "Công Phượng", "Quang Hải", "nobody", "Hà Nội", "  hagl!! "] {
            let first = index.resolve(text);
            assert_eq!(index.resolve(&fold_key(text)), first);
            if let Resolution::Resolved(id) = first {
                let canonical = catalog.name(id).unwrap();
                assert_eq!(index.resolve(canonical), Resolution::Resolved(id));
            }
        }
    }

    #[test]
    fn test_max_key_tokens() {
        let index = AliasIndex::build(&catalog(), &[], &AliasOptions::default());
        // "cau lac bo bong da ha noi"
        assert_eq!(index.max_key_tokens(), 7);
    }
}
