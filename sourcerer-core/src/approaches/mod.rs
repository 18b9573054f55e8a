//! Orchestration approaches.
//!
//! An approach turns a conversation into a grounded, cited answer. The
//! closed set of strategies: [`ChatReadRetrieveReadApproach`] (two-stage
//! search refinement) and [`RetrieveThenReadApproach`] (single search,
//! baseline). Both share the prompt assembler and source formatter, and
//! both split their work into `run_until_final_call` (everything up to
//! the completion call) and a provided `run` that issues the completion
//! either immediately or as a stream.

pub mod chat;
pub mod retrieve_then_read;

pub use chat::ChatReadRetrieveReadApproach;
pub use retrieve_then_read::RetrieveThenReadApproach;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

use crate::error::{Result, SourcererError};
use crate::overrides::RequestOverrides;
use crate::providers::{AuthClaims, CompletionProvider};
use crate::types::{AnswerContext, AnswerOutcome, ChatAnswer, ChatMessage, CompletionRequest};

/// Everything an approach produces short of actually calling the
/// completion provider: the fully assembled request plus the diagnostic
/// trace accumulated along the way.
#[derive(Debug, Clone)]
pub struct FinalCall {
    pub request: CompletionRequest,
    pub context: AnswerContext,
}

/// A retrieval-and-answer strategy.
#[async_trait]
pub trait Approach: Send + Sync {
    /// Run retrieval and prompt assembly, stopping before the
    /// completion call. Provider failures propagate uncaught.
    async fn run_until_final_call(
        &self,
        messages: &[ChatMessage],
        overrides: &RequestOverrides,
        auth_claims: &AuthClaims,
    ) -> Result<FinalCall>;

    /// The completion provider this approach answers with.
    fn completions(&self) -> Arc<dyn CompletionProvider>;

    /// Run the approach end to end.
    ///
    /// With `should_stream` the completion is spawned onto the runtime
    /// and its text deltas are exposed through a channel; the core does
    /// not buffer or reassemble them. A completion failure mid-stream
    /// arrives as the final `Err` item on the channel, so the consumer
    /// always observes it.
    async fn run(
        &self,
        messages: &[ChatMessage],
        overrides: &RequestOverrides,
        auth_claims: &AuthClaims,
        should_stream: bool,
    ) -> Result<AnswerOutcome> {
        let FinalCall { request, context } = self
            .run_until_final_call(messages, overrides, auth_claims)
            .await?;

        if should_stream {
            let (tx, rx) = mpsc::channel(64);
            let provider = self.completions();
            tokio::spawn(async move {
                if let Err(err) = provider.complete_streaming(request, tx.clone()).await {
                    error!(error = %err, "Streaming completion failed");
                    // Receiver already gone means nobody left to notify.
                    let _ = tx.send(Err(err)).await;
                }
            });
            Ok(AnswerOutcome::Streaming {
                deltas: rx,
                context,
            })
        } else {
            let response = self.completions().complete(request).await?;
            Ok(AnswerOutcome::Immediate(ChatAnswer {
                message: response.message,
                context,
            }))
        }
    }
}

/// Extract the latest turn's question text.
///
/// Fails synchronously — before any network call — when the latest
/// message content is not text.
pub(crate) fn latest_user_question(messages: &[ChatMessage]) -> Result<String> {
    messages
        .last()
        .and_then(|message| message.content.as_text())
        .map(str::to_string)
        .ok_or_else(|| {
            SourcererError::invalid_input("The most recent message content must be text.")
        })
}
