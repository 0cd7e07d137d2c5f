//! Error types for VisionChat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for VisionChat operations
///
/// Validation and lookup failures are reported to the immediate caller.
/// Backend failures are converted into response text at the delivery
/// boundary; the `Backend` variant only travels between the provider and
/// the delivery components.
#[derive(Error, Debug)]
pub enum VisionChatError {
    /// Missing or empty prompt/image, rejected before any backend call
    #[error("Validation error: {0}")]
    Validation(String),

    /// History index out of range
    #[error("History entry {index} not found (history has {len} entries)")]
    NotFound {
        /// The requested index
        index: usize,
        /// Number of entries currently stored
        len: usize,
    },

    /// Backend failure detail (network, backend-side fault, malformed response)
    #[error("{0}")]
    Backend(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for VisionChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
