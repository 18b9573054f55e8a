//! Token counting using tiktoken-rs for accurate BPE tokenization.
//!
//! Prompt trimming decisions depend on exact token counts as measured
//! by the target model's tokenizer family, not character counts.

use crate::types::{ChatMessage, Content};

/// Token counter keyed by model name.
pub struct TokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TokenCounter {
    /// Create a token counter for the given model.
    /// Falls back to cl100k_base if the model isn't recognized.
    pub fn for_model(model: &str) -> Self {
        let bpe = tiktoken_rs::get_bpe_from_model(model).unwrap_or_else(|_| {
            tiktoken_rs::cl100k_base().expect("cl100k_base should be available")
        });
        Self { bpe }
    }

    /// Count the number of tokens in a string.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Count tokens for a single message, including the structural
    /// overhead for role and separators (~4 tokens).
    pub fn count_message(&self, message: &ChatMessage) -> usize {
        4 + match &message.content {
            Content::Text { text } => self.count(text),
            Content::Parts { parts } => parts
                .iter()
                .map(|p| self.count(&p.to_string()))
                .sum::<usize>(),
        }
    }

    /// Count tokens for a message sequence, including reply priming.
    pub fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum::<usize>() + 3
    }
}

/// Context window size for a model, keyed by model name family.
///
/// Unrecognized models get the most conservative limit.
pub fn model_token_limit(model: &str) -> usize {
    if model.contains("gpt-4o") {
        128_000
    } else if model.contains("gpt-4-32k") {
        32_768
    } else if model.contains("gpt-4") {
        8_192
    } else if model.contains("gpt-35-turbo-16k") || model.contains("gpt-3.5-turbo-16k") {
        16_384
    } else {
        4_096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_nonempty() {
        let counter = TokenCounter::for_model("gpt-4o");
        assert!(counter.count("What is the deductible for an in-network visit?") > 0);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn test_count_message_includes_overhead() {
        let counter = TokenCounter::for_model("gpt-4o");
        let msg = ChatMessage::user("hello");
        assert_eq!(counter.count_message(&msg), 4 + counter.count("hello"));
    }

    #[test]
    fn test_count_messages_includes_priming() {
        let counter = TokenCounter::for_model("gpt-4o");
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let expected: usize = messages.iter().map(|m| counter.count_message(m)).sum();
        assert_eq!(counter.count_messages(&messages), expected + 3);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        // Construction must not panic for unknown model names.
        let counter = TokenCounter::for_model("totally-unknown-model");
        assert!(counter.count("fallback tokenizer") > 0);
    }

    #[test]
    fn test_model_token_limits() {
        assert_eq!(model_token_limit("gpt-4o-mini"), 128_000);
        assert_eq!(model_token_limit("gpt-4"), 8_192);
        assert_eq!(model_token_limit("gpt-35-turbo"), 4_096);
        assert_eq!(model_token_limit("mystery-model"), 4_096);
    }
}
