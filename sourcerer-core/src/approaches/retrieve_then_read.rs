//! Single-shot retrieve-then-read orchestration.
//!
//! One search, one grounded prompt, one answer. No conversation
//! history is consulted; each call stands alone. Few-shot examples
//! demonstrate the expected citation discipline to the model.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::approaches::{Approach, FinalCall, latest_user_question};
use crate::error::Result;
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

const DEFAULT_TOP: usize = 3;
const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Q&A answers are short; reserve a small response budget.
const RESPONSE_TOKEN_LIMIT: usize = 1024;

/// The single-stage ask approach: search once, ground, answer.
pub struct RetrieveThenReadApproach {
    retriever: Retriever,
    embeddings: Arc<dyn EmbeddingProvider>,
    completions: Arc<dyn CompletionProvider>,
    auth: Arc<dyn AuthFilterBuilder>,
    model: String,
    prompts: PromptPack,
    assembler: PromptAssembler,
}

impl RetrieveThenReadApproach {
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
}

#[async_trait]
impl Approach for RetrieveThenReadApproach {
    async fn run_until_final_call(
        &self,
        messages: &[ChatMessage],
        overrides: &RequestOverrides,
        auth_claims: &AuthClaims,
    ) -> Result<FinalCall> {
        let q = latest_user_question(messages)?;

        let use_vector_search = overrides.use_vector_search();
        let use_text_search = overrides.use_text_search();
        let use_semantic_ranker = overrides.semantic_ranker;
        let use_semantic_captions = overrides.semantic_captions;
        let top = overrides.top.unwrap_or(DEFAULT_TOP);
        let filter = self.auth.build(overrides, auth_claims);

        let mut vectors = Vec::new();
        if use_vector_search {
            vectors.push(self.embeddings.embed(&q).await?);
        }
        let results = self
            .retriever
            .search(&SearchRequest {
                top,
                query_text: use_text_search.then(|| q.clone()),
                filter: filter.clone(),
                vectors,
                use_text_search,
                use_vector_search,
                use_semantic_ranker,
                use_semantic_captions,
                minimum_search_score: overrides.minimum_search_score.unwrap_or(0.0),
                minimum_reranker_score: overrides.minimum_reranker_score.unwrap_or(0.0),
            })
            .await?;
        debug!(top, returned = results.len(), "Single-stage search complete");

        let sources_content = format_sources(&results, use_semantic_captions, false);
        let content = sources_content.join("\n");

        // An explicit template replaces the built-in prompt wholesale;
        // no injection marker is honored here.
        let system_message = overrides
            .prompt_template
            .clone()
            .unwrap_or_else(|| self.prompts.system_prompt.clone());

        let user_content = format!("{q}\nSources:\n {content}");
        let final_messages = self.assembler.assemble(
            &system_message,
            &self.prompts.few_shots,
            &[],
            &user_content,
            RESPONSE_TOKEN_LIMIT,
        );

        let filter_value = match &filter {
            Some(f) => serde_json::json!(f.expression()),
            None => serde_json::Value::Null,
        };
        let thoughts = vec![
            ThoughtStep::new(
                "Search using user query",
                serde_json::json!(q),
                HashMap::from([
                    ("use_semantic_captions".to_string(), serde_json::json!(use_semantic_captions)),
                    ("use_semantic_ranker".to_string(), serde_json::json!(use_semantic_ranker)),
                    ("top".to_string(), serde_json::json!(top)),
                    ("filter".to_string(), filter_value),
                    ("use_vector_search".to_string(), serde_json::json!(use_vector_search)),
                    ("use_text_search".to_string(), serde_json::json!(use_text_search)),
                ]),
            ),
            ThoughtStep::new(
                "Search results",
                serde_json::json!(
                    results
                        .iter()
                        .map(ScoredDocument::serialize_for_results)
                        .collect::<Vec<_>>()
                ),
                HashMap::new(),
            ),
            ThoughtStep::new(
                "Prompt to generate answer",
                serde_json::json!(final_messages),
                HashMap::from([("model".to_string(), serde_json::json!(self.model.clone()))]),
            ),
        ];

        Ok(FinalCall {
            request: CompletionRequest {
                messages: final_messages,
                temperature: overrides.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_tokens: RESPONSE_TOKEN_LIMIT,
                n: 1,
                seed: overrides.seed,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::{NoAuthFilter, SearchIndex};
    use crate::types::{CompletionResponse, Role};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct RecordingIndex {
        results: Vec<ScoredDocument>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn search(
            &self,
            request: &SearchRequest,
        ) -> std::result::Result<Vec<ScoredDocument>, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.results.clone())
        }
    }

    struct NullEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for NullEmbeddings {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            Ok(vec![0.0; 3])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct CannedCompletions;

    #[async_trait]
    impl CompletionProvider for CannedCompletions {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                message: ChatMessage::assistant("In-network deductibles are $500 [info1.txt]."),
                model: "gpt-35-turbo".into(),
            })
        }

        async fn complete_streaming(
            &self,
            _request: CompletionRequest,
            _tx: mpsc::Sender<crate::types::StreamDelta>,
        ) -> std::result::Result<(), ProviderError> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "gpt-35-turbo"
        }
    }

    fn approach(index: Arc<RecordingIndex>) -> RetrieveThenReadApproach {
        RetrieveThenReadApproach::new(
            Retriever::new(index),
            Arc::new(NullEmbeddings),
            Arc::new(CannedCompletions),
            Arc::new(NoAuthFilter),
            "gpt-35-turbo",
            PromptPack::default(),
        )
    }

    fn docs() -> Vec<ScoredDocument> {
        vec![
            ScoredDocument::new("info1.txt", "info1.txt", "In-network deductible is $500.")
                .with_scores(0.9, Some(2.8)),
        ]
    }

    #[tokio::test]
    async fn test_defaults_and_single_search() {
        let index = Arc::new(RecordingIndex {
            results: docs(),
            requests: Mutex::new(Vec::new()),
        });
        let approach = approach(Arc::clone(&index));

        let messages = vec![ChatMessage::user("What is my deductible?")];
        let final_call = approach
            .run_until_final_call(&messages, &RequestOverrides::default(), &AuthClaims::default())
            .await
            .unwrap();

        let requests = index.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].top, 3);
        assert_eq!(requests[0].minimum_search_score, 0.0);
        assert_eq!(requests[0].minimum_reranker_score, 0.0);
        assert_eq!(final_call.request.temperature, 0.3);
        assert_eq!(final_call.request.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_few_shots_precede_user_turn() {
        let index = Arc::new(RecordingIndex {
            results: docs(),
            requests: Mutex::new(Vec::new()),
        });
        let approach = approach(index);

        let messages = vec![ChatMessage::user("What is my deductible?")];
        let final_call = approach
            .run_until_final_call(&messages, &RequestOverrides::default(), &AuthClaims::default())
            .await
            .unwrap();

        let prompt = &final_call.request.messages;
        assert_eq!(prompt[0].role, Role::System);
        // Default pack ships one example pair.
        assert_eq!(prompt[1].role, Role::User);
        assert_eq!(prompt[2].role, Role::Assistant);
        let last = prompt.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.as_text().unwrap().contains("Sources:\n "));
    }

    #[tokio::test]
    async fn test_seed_and_template_override_pass_through() {
        let index = Arc::new(RecordingIndex {
            results: docs(),
            requests: Mutex::new(Vec::new()),
        });
        let approach = approach(index);

        let overrides = RequestOverrides {
            seed: Some(42),
            prompt_template: Some("Answer tersely.".to_string()),
            temperature: Some(0.0),
            ..Default::default()
        };
        let messages = vec![ChatMessage::user("What is my deductible?")];
        let final_call = approach
            .run_until_final_call(&messages, &overrides, &AuthClaims::default())
            .await
            .unwrap();

        assert_eq!(final_call.request.seed, Some(42));
        assert_eq!(final_call.request.temperature, 0.0);
        assert_eq!(
            final_call.request.messages[0].content.as_text(),
            Some("Answer tersely.")
        );
    }

    #[tokio::test]
    async fn test_trace_titles_and_props() {
        let index = Arc::new(RecordingIndex {
            results: docs(),
            requests: Mutex::new(Vec::new()),
        });
        let approach = approach(index);

        let messages = vec![ChatMessage::user("What is my deductible?")];
        let final_call = approach
            .run_until_final_call(&messages, &RequestOverrides::default(), &AuthClaims::default())
            .await
            .unwrap();

        let thoughts = &final_call.context.thoughts;
        assert_eq!(thoughts.len(), 3);
        assert_eq!(thoughts[0].title, "Search using user query");
        assert_eq!(thoughts[0].props["top"], serde_json::json!(3));
        assert_eq!(thoughts[0].props["filter"], serde_json::Value::Null);
        assert_eq!(thoughts[1].title, "Search results");
        assert_eq!(thoughts[2].title, "Prompt to generate answer");
        assert_eq!(thoughts[2].props["model"], serde_json::json!("gpt-35-turbo"));
    }
}
