//! Sourcerer core: retrieval-augmented answer orchestration.
//!
//! The crate wires four provider seams — a search index, an embedding
//! provider, a completion provider, and an authorization filter
//! builder — into two answer strategies:
//!
//! - [`approaches::ChatReadRetrieveReadApproach`]: a two-stage pipeline
//!   that first searches broadly to discover which documents matter,
//!   then re-searches scoped to those documents before prompting.
//! - [`approaches::RetrieveThenReadApproach`]: a single search followed
//!   by a few-shot grounded prompt, for one-off Q&A.
//!
//! Both enforce score thresholds at the retrieval boundary, budget the
//! prompt with real tokenizer counts, and return a step-by-step trace
//! with every answer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sourcerer_core::approaches::{Approach, ChatReadRetrieveReadApproach};
//! use sourcerer_core::prompt::PromptPack;
//! use sourcerer_core::providers::{AuthClaims, NoAuthFilter};
//! use sourcerer_core::retrieval::Retriever;
//! use sourcerer_core::types::ChatMessage;
//! use sourcerer_core::RequestOverrides;
//!
//! # async fn run(
//! #     index: Arc<dyn sourcerer_core::providers::SearchIndex>,
//! #     embeddings: Arc<dyn sourcerer_core::providers::EmbeddingProvider>,
//! #     completions: Arc<dyn sourcerer_core::providers::CompletionProvider>,
//! # ) -> sourcerer_core::Result<()> {
//! let approach = ChatReadRetrieveReadApproach::new(
//!     Retriever::new(index),
//!     embeddings,
//!     completions,
//!     Arc::new(NoAuthFilter),
//!     "gpt-4o-mini",
//!     PromptPack::default(),
//! );
//! let messages = vec![ChatMessage::user("What does my plan cover?")];
//! let outcome = approach
//!     .run(&messages, &RequestOverrides::default(), &AuthClaims::default(), false)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod approaches;
pub mod error;
pub mod filter;
pub mod overrides;
pub mod prompt;
pub mod providers;
pub mod retrieval;
pub mod sources;
pub mod tokens;
pub mod types;

pub use error::{ConfigError, ProviderError, Result, SourcererError};
pub use overrides::{RequestOverrides, RetrievalMode};
pub use types::{AnswerOutcome, ChatAnswer, ChatMessage, Role, StreamDelta};
