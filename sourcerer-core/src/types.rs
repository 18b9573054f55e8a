//! Core type definitions for the Sourcerer RAG pipeline.
//!
//! Defines the fundamental data structures used throughout the system:
//! chat messages, retrieved documents, trace steps, and completion
//! request/response shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::error::ProviderError;

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Content within a message. The orchestrators only operate on text;
/// non-text parts are carried opaquely and rejected at validation time
/// when they appear in the latest turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Parts { parts: Vec<serde_json::Value> },
}

impl Content {
    /// Create a simple text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Returns the text representation of this content, if textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Parts { .. } => None,
        }
    }
}

/// A single message in a conversation. Constructed fresh per request;
/// history persistence is an external concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

impl ChatMessage {
    pub fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::text(text))
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }
}

/// A highlighted snippet produced by the semantic ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// One retrieved passage returned by the search index.
///
/// `sourcepage` identifies the chunk (used for citation), `sourcefile`
/// the whole origin document (used for stage-1 to stage-2 filtering).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sourcepage: Option<String>,
    #[serde(default)]
    pub sourcefile: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reranker_score: Option<f64>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl ScoredDocument {
    /// Convenience constructor for the common fields.
    pub fn new(
        sourcepage: impl Into<String>,
        sourcefile: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sourcepage: Some(sourcepage.into()),
            sourcefile: Some(sourcefile.into()),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_scores(mut self, score: f64, reranker_score: Option<f64>) -> Self {
        self.score = Some(score);
        self.reranker_score = reranker_score;
        self
    }

    /// Full serialization of a document for trace output.
    pub fn serialize_for_results(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "content": self.content,
            "sourcepage": self.sourcepage,
            "sourcefile": self.sourcefile,
            "captions": self.captions,
            "score": self.score,
            "reranker_score": self.reranker_score,
        })
    }
}

/// An ordered trace record for one pipeline stage.
///
/// Purely diagnostic; accumulated in execution order and returned
/// alongside the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub title: String,
    pub description: serde_json::Value,
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
}

impl ThoughtStep {
    pub fn new(
        title: impl Into<String>,
        description: serde_json::Value,
        props: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            title: title.into(),
            description,
            props,
        }
    }
}

/// The grounding passages that backed an answer, as formatted source lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPoints {
    pub text: Vec<String>,
}

/// Diagnostic context returned with every answer: the grounding data
/// points plus the ordered trace of pipeline steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerContext {
    pub data_points: DataPoints,
    pub thoughts: Vec<ThoughtStep>,
}

/// A completed, non-streamed answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub message: ChatMessage,
    pub context: AnswerContext,
}

/// One streamed item: a text delta, or the failure that ended the
/// stream. A failed completion delivers its error as the final item
/// before the channel closes, so a clean close always means success.
pub type StreamDelta = std::result::Result<String, ProviderError>;

/// The outcome of running an approach: either a finished answer or a
/// stream of incremental text deltas. The core does not buffer or
/// reassemble deltas; that is the caller's responsibility.
#[derive(Debug)]
pub enum AnswerOutcome {
    Immediate(ChatAnswer),
    Streaming {
        deltas: mpsc::Receiver<StreamDelta>,
        context: AnswerContext,
    },
}

impl AnswerOutcome {
    /// The diagnostic context, regardless of delivery mode.
    pub fn context(&self) -> &AnswerContext {
        match self {
            AnswerOutcome::Immediate(answer) => &answer.context,
            AnswerOutcome::Streaming { context, .. } => context,
        }
    }
}

/// A request to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub n: usize,
    pub seed: Option<u64>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            temperature: 0.0,
            max_tokens: 1024,
            n: 1,
            seed: None,
        }
    }
}

/// The result of a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: ChatMessage,
    pub model: String,
}
