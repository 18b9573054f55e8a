//! Prompt text and token-budgeted message assembly.
//!
//! `PromptPack` holds the system prompt and few-shot exemplars as data,
//! loaded once at startup and handed to approach constructors — the
//! orchestrators themselves never touch the filesystem.
//! `PromptAssembler` builds the final message sequence within the
//! model's context window.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::tokens::{TokenCounter, model_token_limit};
use crate::types::ChatMessage;

/// A fixed question/answer pair injected into the prompt to demonstrate
/// the desired answer style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShot {
    pub question: String,
    pub answer: String,
}

/// Prompt text for one approach, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPack {
    pub system_prompt: String,
    pub follow_up_questions_prompt: String,
    #[serde(default)]
    pub few_shots: Vec<FewShot>,
}

impl PromptPack {
    /// Load a prompt pack from a JSON file, once, at startup.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::ParseError {
                message: e.to_string(),
            },
        })?;
        let pack: Self = serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        if pack.system_prompt.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "system_prompt".to_string(),
            });
        }
        Ok(pack)
    }

    /// Resolve the effective system prompt for a request.
    ///
    /// A caller template starting with `>>>` is injected into the
    /// default prompt via the `{injected_prompt}` placeholder; any
    /// other template replaces the default wholesale. The
    /// `{follow_up_questions_prompt}` placeholder is substituted in
    /// either case.
    pub fn get_system_prompt(
        &self,
        override_template: Option<&str>,
        follow_up_prompt: &str,
    ) -> String {
        let resolved = match override_template {
            None => self
                .system_prompt
                .replace("{injected_prompt}", ""),
            Some(template) if template.starts_with(">>>") => self
                .system_prompt
                .replace("{injected_prompt}", &format!("{}\n", &template[3..])),
            Some(template) => template.to_string(),
        };
        resolved.replace("{follow_up_questions_prompt}", follow_up_prompt)
    }
}

impl Default for PromptPack {
    fn default() -> Self {
        Self {
            system_prompt: "You are an intelligent assistant helping people with questions \
                about their documents. Use 'you' to refer to the individual asking the \
                questions even if they ask with 'I'. Answer the question using only the data \
                provided in the sources below. Each source has a name followed by a colon and \
                the actual information; always include the source name in square brackets for \
                each fact you use in the response, for example [info1.txt]. Do not combine \
                sources; cite each source separately. If you cannot answer using the sources \
                below, say you don't know.\n{follow_up_questions_prompt}\n{injected_prompt}"
                .to_string(),
            follow_up_questions_prompt: "Generate 3 very brief follow-up questions that the \
                user would likely ask next. Enclose the follow-up questions in double angle \
                brackets, for example <<What does the plan cover?>>. Do not repeat questions \
                that have already been asked."
                .to_string(),
            few_shots: vec![FewShot {
                question: "'What is the deductible for the employee plan for a visit to \
                    Overlake in Bellevue?'\n\nSources:\ninfo1.txt: deductibles depend on \
                    whether you are in-network or out-of-network. In-network deductibles are \
                    $500 for employee and $1000 for family. Out-of-network deductibles are \
                    $1000 for employee and $2000 for family.\ninfo2.pdf: Overlake is \
                    in-network for the employee plan.\ninfo3.pdf: Overlake is the name of the \
                    area that includes a park and ride near Bellevue.\ninfo4.pdf: In-network \
                    institutions include Overlake, Swedish and others in the region."
                    .to_string(),
                answer: "In-network deductibles are $500 for employee and $1000 for family \
                    [info1.txt] and Overlake is in-network for the employee plan \
                    [info2.pdf][info4.pdf]."
                    .to_string(),
            }],
        }
    }
}

/// Builds a bounded message sequence: system prompt first, then few-shot
/// pairs, then history (newest kept preferentially), then the new user
/// turn, guaranteed to fit the model's window minus the response budget.
pub struct PromptAssembler {
    counter: TokenCounter,
    model_token_limit: usize,
}

impl PromptAssembler {
    /// Create an assembler for the given model, looking up its context
    /// window and tokenizer family by name.
    pub fn for_model(model: &str) -> Self {
        Self {
            counter: TokenCounter::for_model(model),
            model_token_limit: model_token_limit(model),
        }
    }

    pub fn model_token_limit(&self) -> usize {
        self.model_token_limit
    }

    /// Assemble the final message sequence.
    ///
    /// The system message and the new user turn are always included;
    /// few-shot pairs are added whole, in order, while the budget
    /// allows; history is trimmed from the oldest end. A new user turn
    /// that alone exceeds the budget is a caller error and is included
    /// anyway.
    pub fn assemble(
        &self,
        system_prompt: &str,
        few_shots: &[FewShot],
        history: &[ChatMessage],
        new_user_content: &str,
        reserved_response_tokens: usize,
    ) -> Vec<ChatMessage> {
        let budget = self
            .model_token_limit
            .saturating_sub(reserved_response_tokens);

        let system = ChatMessage::system(system_prompt);
        let new_user = ChatMessage::user(new_user_content);
        // 3 tokens of reply priming, counted once for the whole sequence.
        let mut used =
            self.counter.count_message(&system) + self.counter.count_message(&new_user) + 3;

        let mut shot_messages: Vec<ChatMessage> = Vec::new();
        for shot in few_shots {
            let user = ChatMessage::user(&shot.question);
            let assistant = ChatMessage::assistant(&shot.answer);
            let pair_tokens =
                self.counter.count_message(&user) + self.counter.count_message(&assistant);
            if used + pair_tokens > budget {
                break;
            }
            used += pair_tokens;
            shot_messages.push(user);
            shot_messages.push(assistant);
        }

        // Walk history newest-first, keeping what fits, then restore
        // chronological order.
        let mut kept_history: Vec<&ChatMessage> = Vec::new();
        for message in history.iter().rev() {
            let message_tokens = self.counter.count_message(message);
            if used + message_tokens > budget {
                break;
            }
            used += message_tokens;
            kept_history.push(message);
        }
        kept_history.reverse();

        let mut messages = Vec::with_capacity(2 + shot_messages.len() + kept_history.len());
        messages.push(system);
        messages.extend(shot_messages);
        messages.extend(kept_history.into_iter().cloned());
        messages.push(new_user);
        messages
    }
}
