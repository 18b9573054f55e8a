//! Two-stage retrieve-and-answer orchestration.
//!
//! Stage 1 runs a broad search to cheaply identify which whole
//! documents are relevant; stage 2 re-searches restricted to those
//! documents at chunk granularity with the caller's requested result
//! count. The refined results become the grounding content for a
//! citation-enforced completion prompt.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::approaches::{Approach, FinalCall, latest_user_question};
use crate::error::Result;
use crate::filter::RetrievalFilter;
use crate::overrides::RequestOverrides;
use crate::prompt::{PromptAssembler, PromptPack};
use crate::providers::{
    AuthClaims, AuthFilterBuilder, CompletionProvider, EmbeddingProvider, SearchRequest,
};
use crate::retrieval::Retriever;
use crate::sources::format_sources;
use crate::types::{
    AnswerContext, ChatMessage, CompletionRequest, DataPoints, ScoredDocument, ThoughtStep,
};

/// Broad first pass: generous top-K at whole-document granularity.
const STAGE_ONE_TOP: usize = 15;
/// Default chunk-level result count for the second pass.
const DEFAULT_TOP: usize = 10;
const DEFAULT_MINIMUM_SEARCH_SCORE: f64 = 0.02;
const DEFAULT_MINIMUM_RERANKER_SCORE: f64 = 1.5;
/// Tokens reserved for the model's answer.
const RESPONSE_TOKEN_LIMIT: usize = 4096;

/// The two-stage chat approach: broad search, title-scoped narrow
/// search, grounded prompt, cited answer.
pub struct ChatReadRetrieveReadApproach {
    retriever: Retriever,
    embeddings: Arc<dyn EmbeddingProvider>,
    completions: Arc<dyn CompletionProvider>,
    auth: Arc<dyn AuthFilterBuilder>,
    model: String,
    prompts: PromptPack,
    assembler: PromptAssembler,
}

impl ChatReadRetrieveReadApproach {
    pub fn new(
        retriever: Retriever,
        embeddings: Arc<dyn EmbeddingProvider>,
        completions: Arc<dyn CompletionProvider>,
        auth: Arc<dyn AuthFilterBuilder>,
        model: impl Into<String>,
        prompts: PromptPack,
    ) -> Self {
        let model = model.into();
        let assembler = PromptAssembler::for_model(&model);
        Self {
            retriever,
            embeddings,
            completions,
            auth,
            model,
            prompts,
            assembler,
        }
    }

    /// Distinct stage-1 sourcefiles in first-seen order. Documents
    /// without a sourcefile are skipped.
    fn relevant_titles(documents: &[ScoredDocument]) -> Vec<String> {
        let mut titles: Vec<String> = Vec::new();
        for doc in documents {
            if let Some(sourcefile) = &doc.sourcefile
                && !titles.iter().any(|t| t == sourcefile)
            {
                titles.push(sourcefile.clone());
            }
        }
        titles
    }

    /// Compose the stage-2 filter: scope to stage-1 titles, ANDed with
    /// the authorization filter; with no usable titles, the auth filter
    /// alone (possibly none).
    fn compose_filter(
        titles: &[String],
        auth_filter: Option<RetrievalFilter>,
    ) -> Option<RetrievalFilter> {
        match (RetrievalFilter::sourcefile_any(titles), auth_filter) {
            (Some(scope), Some(auth)) => Some(scope.and(auth)),
            (Some(scope), None) => Some(scope),
            (None, auth) => auth,
        }
    }
}

#[async_trait]
impl Approach for ChatReadRetrieveReadApproach {
    async fn run_until_final_call(
        &self,
        messages: &[ChatMessage],
        overrides: &RequestOverrides,
        auth_claims: &AuthClaims,
    ) -> Result<FinalCall> {
        let original_user_query = latest_user_question(messages)?;

        let use_vector_search = overrides.use_vector_search();
        let minimum_search_score = overrides
            .minimum_search_score
            .unwrap_or(DEFAULT_MINIMUM_SEARCH_SCORE);
        let minimum_reranker_score = overrides
            .minimum_reranker_score
            .unwrap_or(DEFAULT_MINIMUM_RERANKER_SCORE);

        // Stage 1: broad, unfiltered search over the whole index.
        let mut vectors_stage1 = Vec::new();
        if use_vector_search {
            vectors_stage1.push(self.embeddings.embed(&original_user_query).await?);
        }
        let results_stage1 = self
            .retriever
            .search(&SearchRequest {
                top: STAGE_ONE_TOP,
                query_text: Some(original_user_query.clone()),
                filter: None,
                vectors: vectors_stage1,
                use_text_search: true,
                use_vector_search,
                use_semantic_ranker: true,
                use_semantic_captions: false,
                minimum_search_score,
                minimum_reranker_score,
            })
            .await?;

        let relevant_titles = Self::relevant_titles(&results_stage1);
        let auth_filter = self.auth.build(overrides, auth_claims);
        let filter = Self::compose_filter(&relevant_titles, auth_filter);
        debug!(
            stage1_results = results_stage1.len(),
            titles = relevant_titles.len(),
            filter = filter.as_ref().map(|f| f.expression()),
            "Stage-1 search narrowed the document scope"
        );

        // Stage 2: chunk-level search restricted to the stage-1 titles.
        // The embedding is recomputed rather than cached from stage 1.
        let mut vectors_stage2 = Vec::new();
        if use_vector_search {
            vectors_stage2.push(self.embeddings.embed(&original_user_query).await?);
        }
        let results_stage2 = self
            .retriever
            .search(&SearchRequest {
                top: overrides.top.unwrap_or(DEFAULT_TOP),
                query_text: Some(original_user_query.clone()),
                filter: filter.clone(),
                vectors: vectors_stage2,
                use_text_search: true,
                use_vector_search,
                use_semantic_ranker: true,
                use_semantic_captions: false,
                minimum_search_score,
                minimum_reranker_score,
            })
            .await?;

        let sources_content = format_sources(&results_stage2, false, false);
        let content = sources_content.join("\n");

        let follow_up = if overrides.suggest_followup_questions {
            self.prompts.follow_up_questions_prompt.as_str()
        } else {
            ""
        };
        let system_message = self
            .prompts
            .get_system_prompt(overrides.prompt_template.as_deref(), follow_up);

        let history = &messages[..messages.len() - 1];
        let new_user_content = format!("{original_user_query}\n\nSources:\n{content}");
        let final_messages = self.assembler.assemble(
            &system_message,
            &[],
            history,
            &new_user_content,
            RESPONSE_TOKEN_LIMIT,
        );

        let filter_value = match &filter {
            Some(f) => serde_json::json!(f.expression()),
            None => serde_json::Value::Null,
        };
        let thoughts = vec![
            ThoughtStep::new(
                "First stage search (catalog)",
                serde_json::json!(
                    results_stage1
                        .iter()
                        .map(|doc| doc.sourcefile.clone())
                        .collect::<Vec<_>>()
                ),
                HashMap::from([("filter".to_string(), serde_json::Value::Null)]),
            ),
            ThoughtStep::new(
                "Second stage search (content)",
                serde_json::json!(
                    results_stage2
                        .iter()
                        .map(ScoredDocument::serialize_for_results)
                        .collect::<Vec<_>>()
                ),
                HashMap::from([("filter".to_string(), filter_value)]),
            ),
            ThoughtStep::new(
                "Final prompt",
                serde_json::json!(final_messages),
                HashMap::from([(
                    "model".to_string(),
                    serde_json::json!(self.model.clone()),
                )]),
            ),
        ];

        Ok(FinalCall {
            request: CompletionRequest {
                messages: final_messages,
                temperature: overrides.temperature.unwrap_or(0.0),
                max_tokens: RESPONSE_TOKEN_LIMIT,
                n: 1,
                seed: None,
            },
            context: AnswerContext {
                data_points: DataPoints {
                    text: sources_content,
                },
                thoughts,
            },
        })
    }

    fn completions(&self) -> Arc<dyn CompletionProvider> {
        Arc::clone(&self.completions)
    }
}
