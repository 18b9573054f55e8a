//! LLM-as-judge scoring.
//!
//! The judge is a thin wrapper over a completion provider: it sends a
//! metric's instructions plus the case material at temperature 0 and
//! parses a single score in `[0, 1]` out of the reply.

use std::sync::Arc;

use sourcerer_core::providers::CompletionProvider;
use sourcerer_core::types::{ChatMessage, CompletionRequest};

use crate::error::{EvalError, Result};

const JUDGE_MAX_TOKENS: usize = 256;

/// Scores evaluation material against natural-language instructions.
pub struct LlmJudge {
    completions: Arc<dyn CompletionProvider>,
}

impl LlmJudge {
    pub fn new(completions: Arc<dyn CompletionProvider>) -> Self {
        Self { completions }
    }

    pub fn model_name(&self) -> &str {
        self.completions.model_name()
    }

    /// Ask the judge model to score `payload` under `instructions`.
    ///
    /// Judging always runs at temperature 0; scoring must be as
    /// repeatable as the provider allows.
    pub async fn score(&self, instructions: &str, payload: &str) -> Result<f64> {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(instructions),
                ChatMessage::user(payload),
            ],
            temperature: 0.0,
            max_tokens: JUDGE_MAX_TOKENS,
            n: 1,
            seed: None,
        };
        let response = self
            .completions
            .complete(request)
            .await
            .map_err(|e| EvalError::Judge(e.to_string()))?;
        let text = response
            .message
            .content
            .as_text()
            .ok_or_else(|| EvalError::Judge("judge reply was not text".into()))?;
        parse_score(text)
    }
}

/// Extract the first parseable float from the judge's reply and clamp
/// it to `[0, 1]`. Judges are instructed to reply with a bare number,
/// but replies like "Score: 0.8" still parse.
fn parse_score(text: &str) -> Result<f64> {
    let cleaned = text.trim();
    if let Ok(score) = cleaned.parse::<f64>() {
        return Ok(score.clamp(0.0, 1.0));
    }
    for token in cleaned.split(|c: char| c.is_whitespace() || c == ':' || c == '=') {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
        if token.is_empty() {
            continue;
        }
        if let Ok(score) = token.parse::<f64>() {
            return Ok(score.clamp(0.0, 1.0));
        }
    }
    Err(EvalError::Judge(format!(
        "could not parse a score from judge reply: {cleaned:?}"
    )))
}
