//! The question answering contract shared by every backend.

use crate::types::{ChatAnswer, Context};
use copilot_core::{AppError, AppResult};
use copilot_llm::ChatMessage;
use copilot_prompt::REFUSAL_MESSAGE;
use regex::Regex;
use std::sync::OnceLock;

/// Answers the latest question in a conversation.
#[async_trait::async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Backend name, as selected on the command line.
    fn name(&self) -> &str;

    /// Answer the last message of `messages`.
    ///
    /// `stream` is accepted for protocol compatibility; answers are always
    /// returned whole.
    async fn answer(
        &self,
        messages: &[ChatMessage],
        stream: bool,
        context: &Context,
    ) -> AppResult<ChatAnswer>;
}

/// The question a conversation asks: its last message.
pub fn latest_question(messages: &[ChatMessage]) -> AppResult<&str> {
    messages
        .last()
        .map(|m| m.content.as_str())
        .ok_or_else(|| AppError::Input("Conversation has no messages".to_string()))
}

/// Clean a model reply before handing it back.
///
/// Replies that refuse are collapsed to the exact refusal message and
/// `[docN]` citation markers are removed.
pub fn postprocess_answer(text: &str) -> String {
    if text.contains(refusal_sentence()) {
        return REFUSAL_MESSAGE.to_string();
    }

    match doc_marker() {
        Some(marker) => marker.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// First sentence of the refusal message.
fn refusal_sentence() -> &'static str {
    REFUSAL_MESSAGE
        .split_once(". ")
        .map(|(first, _)| first)
        .unwrap_or(REFUSAL_MESSAGE)
}

fn doc_marker() -> Option<&'static Regex> {
    static DOC_MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    DOC_MARKER
        .get_or_init(|| Regex::new(r"\s?\[doc\d+\]").ok())
        .as_ref()
}
