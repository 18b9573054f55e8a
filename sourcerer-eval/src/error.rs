//! Error types for the evaluation crate.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for evaluation operations.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Evaluation data file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Pipeline failed: {0}")]
    Pipeline(String),

    #[error("Judge error: {0}")]
    Judge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] sourcerer_core::SourcererError),
}

pub type Result<T> = std::result::Result<T, EvalError>;
