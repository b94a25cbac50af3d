//! Redis cache integration
//!
//! Provides:
//! - A multiplexed async connection
//! - Generic JSON get/set operations with TTL
//! - Reasoning response caching keyed by snapshot generation

use crate::config::RedisConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
    /// Default TTL in seconds
    pub default_ttl_secs: u64,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            default_ttl_secs: 300,
            key_prefix: "hopgraph".to_string(),
        }
    }
}

impl From<&RedisConfig> for CacheConfig {
    fn from(config: &RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            default_ttl_secs: config.default_ttl_secs,
            ..Default::default()
        }
    }
}

/// Redis cache client
pub struct Cache {
    connection: RwLock<MultiplexedConnection>,
    config: CacheConfig,
}

impl Cache {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection: RwLock::new(connection),
            config,
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let value: Option<String> = conn.get(&full_key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", full_key, e),
        })?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse cached value: {}", e),
                })?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(parsed))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Set a value in cache with default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.default_ttl_secs).await
    }

    /// Set a value in cache with custom TTL
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(value).map_err(|e| AppError::CacheError {
            message: format!("Failed to serialize value: {}", e),
        })?;

        let mut conn = self.connection.write().await;
        conn.set_ex::<_, _, ()>(&full_key, &json, ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    /// Get or compute a value, caching the computed result.
    ///
    /// Cache failures never fail the call; the loader result is returned
    /// either way.
    pub async fn get_or_compute<T, F>(&self, cache_name: &str, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        match self.get::<T>(key).await {
            Ok(Some(cached)) => {
                metrics::record_cache(true, cache_name);
                return Ok(cached);
            }
            Ok(None) => metrics::record_cache(false, cache_name),
            Err(e) => {
                metrics::record_cache(false, cache_name);
                warn!(error = %e, "Cache read failed, computing without cache");
            }
        }

        let value = compute()?;

        if let Err(e) = self.set(key, &value).await {
            warn!(error = %e, "Failed to cache value, continuing without cache");
        }

        Ok(value)
    }
}

/// Cache key builder helpers
pub mod keys {
    use sha2::{Digest, Sha256};
    use uuid::Uuid;

    /// Hash the parts of a request into a stable hex digest
    pub fn request_hash(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            // Unit separator keeps ["ab", "c"] distinct from ["a", "bc"]
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }

    /// Build a reasoning response cache key scoped to one snapshot generation
    pub fn reasoning(snapshot_id: Uuid, mode: &str, request_hash: &str) -> String {
        format!("reasoning:{}:{}:{}", snapshot_id, mode, request_hash)
    }
}
