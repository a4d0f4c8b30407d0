//! Question answering types.

use copilot_llm::ResponseContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default number of documents to retrieve.
pub const DEFAULT_TOP: u32 = 5;

/// Tuning parameters passed through to a backend.
///
/// Unknown keys are kept in `extra` and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Documents to retrieve
    #[serde(default = "default_top")]
    pub top: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top() -> u32 {
    DEFAULT_TOP
}

impl Default for Context {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            top: DEFAULT_TOP,
            extra: Map::new(),
        }
    }
}

/// A backend's reply: answer text plus what it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub text: String,

    #[serde(default)]
    pub context: ResponseContext,
}

impl ChatAnswer {
    pub fn new(text: impl Into<String>, context: ResponseContext) -> Self {
        Self {
            text: text.into(),
            context,
        }
    }
}

/// Result of a single-turn question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,
    pub answer: String,
    pub context: ResponseContext,
}
