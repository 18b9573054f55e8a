//! Provider seams for external collaborators.
//!
//! The search index, embedding service, and completion service are
//! externally owned; this crate only defines how they are called.
//! Handles are long-lived `Arc<dyn Trait>` values whose lifecycle
//! (including shutdown) belongs to the bootstrap layer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::filter::RetrievalFilter;
use crate::overrides::RequestOverrides;
use crate::types::{CompletionRequest, CompletionResponse, ScoredDocument, StreamDelta};

/// One query to the search index.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub top: usize,
    pub query_text: Option<String>,
    pub filter: Option<RetrievalFilter>,
    pub vectors: Vec<Vec<f32>>,
    pub use_text_search: bool,
    pub use_vector_search: bool,
    pub use_semantic_ranker: bool,
    pub use_semantic_captions: bool,
    pub minimum_search_score: f64,
    pub minimum_reranker_score: f64,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            top: 3,
            query_text: None,
            filter: None,
            vectors: Vec::new(),
            use_text_search: true,
            use_vector_search: false,
            use_semantic_ranker: false,
            use_semantic_captions: false,
            minimum_search_score: 0.0,
            minimum_reranker_score: 0.0,
        }
    }
}

/// A search index exposing text/vector/hybrid query with optional
/// semantic reranking. Results are assumed already ranked; the
/// orchestrators never re-sort them.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, request: &SearchRequest)
    -> Result<Vec<ScoredDocument>, ProviderError>;
}

/// Produces fixed-dimensionality embeddings for query text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Embedding dimensionality, configured per deployment.
    fn dimensions(&self) -> usize;
}

/// A chat-completion service, supporting both full and streaming
/// completions. Streaming sends text deltas to the channel as `Ok`
/// items and closes it when done; a mid-stream failure is returned,
/// and the orchestration layer delivers it to the stream consumer as a
/// terminal `Err` item.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<StreamDelta>,
    ) -> Result<(), ProviderError>;

    /// The model this provider completes with.
    fn model_name(&self) -> &str;
}

/// Access-control claims attached to a request. Interpretation belongs
/// to the [`AuthFilterBuilder`]; this core only passes them through.
#[derive(Debug, Clone, Default)]
pub struct AuthClaims {
    pub oids: Vec<String>,
    pub groups: Vec<String>,
}

/// Builds the authorization filter for a request, or `None` when no
/// access restriction applies.
pub trait AuthFilterBuilder: Send + Sync {
    fn build(&self, overrides: &RequestOverrides, claims: &AuthClaims)
    -> Option<RetrievalFilter>;
}

/// No access control: every request sees the whole index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthFilter;

impl AuthFilterBuilder for NoAuthFilter {
    fn build(&self, _: &RequestOverrides, _: &AuthClaims) -> Option<RetrievalFilter> {
        None
    }
}

/// Category-exclusion only: honors `overrides.exclude_category` and
/// nothing else. Security trimming by oids/groups lives outside this
/// core.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryExcludeFilter;

impl AuthFilterBuilder for CategoryExcludeFilter {
    fn build(
        &self,
        overrides: &RequestOverrides,
        _claims: &AuthClaims,
    ) -> Option<RetrievalFilter> {
        overrides
            .exclude_category
            .as_deref()
            .map(RetrievalFilter::category_not)
    }
}
