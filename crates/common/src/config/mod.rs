//! Configuration management for HopGraph services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration (backing graph store)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (response cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Graph snapshot loading and refresh
    #[serde(default)]
    pub snapshot: SnapshotSettings,

    /// Entity alias resolution
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Reasoning and confidence calibration
    #[serde(default)]
    pub reasoning: ReasoningSettings,

    /// Batch evaluation
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Enable the response cache
    #[serde(default)]
    pub enabled: bool,

    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Default TTL in seconds
    #[serde(default = "default_redis_ttl")]
    pub default_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (debug, info, hopgraph_graph=debug, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Where the graph snapshot is read from
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Postgres tables via SeaORM
    Database,
    /// JSON export on disk
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotSettings {
    /// Backing store to build from
    #[serde(default = "default_snapshot_source")]
    pub source: SnapshotSource,

    /// Path of the JSON export when `source = "file"`
    pub file_path: Option<String>,

    /// Per-attempt timeout for one bulk read, in seconds
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,

    /// Total retry budget for a build, in seconds
    #[serde(default = "default_max_retry_elapsed")]
    pub max_retry_elapsed_secs: u64,

    /// First backoff interval, in milliseconds
    #[serde(default = "default_initial_retry_interval")]
    pub initial_retry_interval_ms: u64,

    /// Rebuild interval in seconds (0 disables periodic refresh)
    #[serde(default)]
    pub refresh_interval_secs: u64,

    /// Relation types to load (empty loads everything)
    #[serde(default)]
    pub relation_allow_list: Vec<String>,

    /// Relation types indexed in both directions
    #[serde(default = "default_symmetric_relations")]
    pub symmetric_relations: Vec<String>,

    /// Skip edges whose endpoints are missing instead of failing the build
    #[serde(default)]
    pub skip_dangling_edges: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    /// Curated alias table (TOML/JSON with an `aliases` array)
    pub alias_file: Option<String>,

    /// Generate given-name and prefix-stripped variants
    #[serde(default = "default_true")]
    pub derive_variants: bool,

    /// Name prefixes removed when deriving variants
    #[serde(default = "default_strip_prefixes")]
    pub strip_prefixes: Vec<String>,

    /// Minimum length (in characters) of a derived variant
    #[serde(default = "default_min_variant_len")]
    pub min_variant_len: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningSettings {
    /// Rule table file replacing the built-in rules
    pub rules_file: Option<String>,

    /// Confidence assigned to degraded answers
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,

    /// Confidence of a negative multi-hop answer
    #[serde(default = "default_no_path_confidence")]
    pub no_path_confidence: f32,

    /// Lowest confidence of a positive multi-hop answer
    #[serde(default = "default_multi_hop_base")]
    pub multi_hop_base_confidence: f32,

    /// Witness count at which multi-hop confidence saturates
    #[serde(default = "default_evidence_saturation")]
    pub evidence_saturation: usize,

    /// Maximum evidence chains reported per answer
    #[serde(default = "default_max_evidence_chains")]
    pub max_evidence_chains: usize,

    /// Separator for inline MCQ candidate lists
    #[serde(default = "default_choice_delimiter")]
    pub choice_delimiter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluationSettings {
    /// Labelled dataset evaluated at startup
    pub dataset_path: Option<String>,

    /// Number of failed items included in the report
    #[serde(default = "default_max_failures")]
    pub max_failures_reported: usize,
}

// Default value functions
fn default_database_url() -> String { "postgres://localhost/hopgraph".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_redis_url() -> String { "redis://localhost:6379".to_string() }
fn default_redis_ttl() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_snapshot_source() -> SnapshotSource { SnapshotSource::Database }
fn default_load_timeout() -> u64 { 60 }
fn default_max_retry_elapsed() -> u64 { 120 }
fn default_initial_retry_interval() -> u64 { 500 }
fn default_symmetric_relations() -> Vec<String> {
    vec![
        "CO_AFFILIATED".to_string(),
        "TEAMMATE".to_string(),
        "SAME_BIRTHPLACE".to_string(),
    ]
}
fn default_true() -> bool { true }
fn default_strip_prefixes() -> Vec<String> {
    vec![
        "câu lạc bộ bóng đá".to_string(),
        "câu lạc bộ".to_string(),
        "clb".to_string(),
        "fc".to_string(),
    ]
}
fn default_min_variant_len() -> usize { 4 }
fn default_confidence_floor() -> f32 { 0.5 }
fn default_no_path_confidence() -> f32 { 0.9 }
fn default_multi_hop_base() -> f32 { 0.8 }
fn default_evidence_saturation() -> usize { 1 }
fn default_max_evidence_chains() -> usize { 10 }
fn default_choice_delimiter() -> String { "|".to_string() }
fn default_max_failures() -> usize { 25 }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SNAPSHOT__SOURCE=file
            .add_source(environment())

            .build()?;

        config.try_deserialize()
    }

    /// Get the snapshot refresh interval, if periodic refresh is enabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.snapshot.refresh_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("APP")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("snapshot.relation_allow_list")
        .with_list_parse_key("snapshot.symmetric_relations")
        .with_list_parse_key("resolver.strip_prefixes")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            default_ttl_secs: default_redis_ttl(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            source: default_snapshot_source(),
            file_path: None,
            load_timeout_secs: default_load_timeout(),
            max_retry_elapsed_secs: default_max_retry_elapsed(),
            initial_retry_interval_ms: default_initial_retry_interval(),
            refresh_interval_secs: 0,
            relation_allow_list: Vec::new(),
            symmetric_relations: default_symmetric_relations(),
            skip_dangling_edges: false,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            alias_file: None,
            derive_variants: default_true(),
            strip_prefixes: default_strip_prefixes(),
            min_variant_len: default_min_variant_len(),
        }
    }
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            rules_file: None,
            confidence_floor: default_confidence_floor(),
            no_path_confidence: default_no_path_confidence(),
            multi_hop_base_confidence: default_multi_hop_base(),
            evidence_saturation: default_evidence_saturation(),
            max_evidence_chains: default_max_evidence_chains(),
            choice_delimiter: default_choice_delimiter(),
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            dataset_path: None,
            max_failures_reported: default_max_failures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.snapshot.source, SnapshotSource::Database);
        assert_eq!(config.reasoning.confidence_floor, 0.5);
        assert!(config.reasoning.no_path_confidence > config.reasoning.confidence_floor);
        assert!(config.refresh_interval().is_none());
        assert!(!config.redis.enabled);
    }

    #[test]
    fn test_empty_sections_deserialize_with_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"snapshot": {"source": "file"}}"#).unwrap();
        assert_eq!(config.snapshot.source, SnapshotSource::File);
        assert_eq!(config.snapshot.load_timeout_secs, 60);
        assert!(config
            .snapshot
            .symmetric_relations
            .contains(&"TEAMMATE".to_string()));
        assert_eq!(config.reasoning.choice_delimiter, "|");
    }
}
