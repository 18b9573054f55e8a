//! The retrieval boundary.
//!
//! Wraps the external search index and enforces the score invariant:
//! a document below the requested minimum search score or minimum
//! reranker score never reaches the orchestrators.

use std::sync::Arc;
use tracing::debug;

use crate::error::ProviderError;
use crate::providers::{SearchIndex, SearchRequest};
use crate::types::ScoredDocument;

/// Score-filtering wrapper around a search index handle.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn SearchIndex>,
}

impl Retriever {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Issue a search and drop results below the request's thresholds.
    ///
    /// A document qualifies only when both its search score and its
    /// reranker score (each treated as 0 when absent) meet the
    /// respective minimum.
    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, ProviderError> {
        let documents = self.index.search(request).await?;
        let total = documents.len();
        let qualified: Vec<ScoredDocument> = documents
            .into_iter()
            .filter(|doc| {
                doc.score.unwrap_or(0.0) >= request.minimum_search_score
                    && doc.reranker_score.unwrap_or(0.0) >= request.minimum_reranker_score
            })
            .collect();
        debug!(
            top = request.top,
            returned = total,
            qualified = qualified.len(),
            filter = request.filter.as_ref().map(|f| f.expression()),
            "Search completed"
        );
        Ok(qualified)
    }
}
