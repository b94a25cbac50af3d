//! HopGraph Common Library
//!
//! Shared code for the HopGraph crates including:
//! - Error types and handling
//! - Configuration management
//! - Database pool and knowledge graph table models
//! - Redis response cache
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, ErrorCode, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
