//! Error types for HopGraph services
//!
//! Provides:
//! - Distinct error types for infrastructure and request failures
//! - Machine-readable error codes, including the reasoning outcome taxonomy
//! - Transient/fatal classification used by the snapshot retry policy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Reasoning outcomes (4xxx)
    EntityNotFound,
    AmbiguousEntity,
    UnclassifiedIntent,
    NoPathFound,

    // Backing store errors (7xxx)
    DatabaseError,
    BackingStoreUnavailable,
    BackingStoreTimeout,
    GraphIntegrity,

    // External service errors (8xxx)
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            ErrorCode::EntityNotFound => 4001,
            ErrorCode::AmbiguousEntity => 4002,
            ErrorCode::UnclassifiedIntent => 4003,
            ErrorCode::NoPathFound => 4004,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::BackingStoreUnavailable => 7002,
            ErrorCode::BackingStoreTimeout => 7003,
            ErrorCode::GraphIntegrity => 7004,

            ErrorCode::CacheError => 8006,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Backing store errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Backing store unavailable: {message}")]
    BackingStoreUnavailable { message: String },

    #[error("Backing store read timed out after {timeout_ms}ms")]
    BackingStoreTimeout { timeout_ms: u64 },

    #[error("Graph integrity violation: {message}")]
    GraphIntegrity { message: String },

    // External service errors
    #[error("Cache error: {message}")]
    CacheError { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::BackingStoreUnavailable { .. } => ErrorCode::BackingStoreUnavailable,
            AppError::BackingStoreTimeout { .. } => ErrorCode::BackingStoreTimeout,
            AppError::GraphIntegrity { .. } => ErrorCode::GraphIntegrity,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether retrying the same backing store read may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::BackingStoreUnavailable { .. }
                | AppError::BackingStoreTimeout { .. }
                | AppError::Io(_)
        )
    }

    /// Errors that must stop the service from serving
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::BackingStoreUnavailable { .. }
                | AppError::BackingStoreTimeout { .. }
                | AppError::GraphIntegrity { .. }
                | AppError::Configuration { .. }
        )
    }

    /// Shorthand for request validation failures
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }
}

/// Structured error payload for logs and batch reports
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorDetails {
    fn from(err: &AppError) -> Self {
        let mut details = serde_json::json!({ "code": err.code().as_code() });
        if let AppError::Validation { field: Some(field), .. } = err {
            details["field"] = serde_json::Value::from(field.as_str());
        }
        Self {
            code: err.code(),
            message: err.to_string(),
            details: Some(details),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
