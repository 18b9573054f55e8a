//! Typed per-request options.
//!
//! The request options are an explicit structure with named, typed,
//! defaulted fields, validated once at the boundary by serde rather
//! than threaded through the pipeline as an untyped mapping.

use serde::{Deserialize, Serialize};

/// How the search index should match the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Text,
    Vectors,
    Hybrid,
}

/// Per-request overrides for an approach run.
///
/// Every field has a neutral default; an unset `retrieval_mode` means
/// hybrid behavior (both text and vector search active).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOverrides {
    pub retrieval_mode: Option<RetrievalMode>,
    pub semantic_ranker: bool,
    pub semantic_captions: bool,
    pub top: Option<usize>,
    pub temperature: Option<f32>,
    pub minimum_search_score: Option<f64>,
    pub minimum_reranker_score: Option<f64>,
    pub seed: Option<u64>,
    pub prompt_template: Option<String>,
    pub suggest_followup_questions: bool,
    pub exclude_category: Option<String>,
}

impl RequestOverrides {
    /// Vector search is active for vectors, hybrid, and unset modes.
    pub fn use_vector_search(&self) -> bool {
        !matches!(self.retrieval_mode, Some(RetrievalMode::Text))
    }

    /// Text search is active for text, hybrid, and unset modes.
    pub fn use_text_search(&self) -> bool {
        !matches!(self.retrieval_mode, Some(RetrievalMode::Vectors))
    }
}
