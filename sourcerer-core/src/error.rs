//! Error types for the Sourcerer core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering input validation, provider calls, and configuration.

use std::path::PathBuf;

/// Top-level error type for the Sourcerer core library.
#[derive(Debug, thiserror::Error)]
pub enum SourcererError {
    /// The request itself is malformed; raised before any provider call.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SourcererError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Errors from external collaborator calls (search, embedding, completion).
///
/// These propagate uncaught to the caller; retry/backoff, if any, belongs
/// inside the provider adapter, not this layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Search request failed: {message}")]
    Search { message: String },

    #[error("Embedding request failed: {message}")]
    Embedding { message: String },

    #[error("Completion request failed: {message}")]
    Completion { message: String },

    #[error("Streaming error: {message}")]
    Streaming { message: String },
}

impl ProviderError {
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
        }
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming {
            message: message.into(),
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// A type alias for results using the top-level `SourcererError`.
pub type Result<T> = std::result::Result<T, SourcererError>;
