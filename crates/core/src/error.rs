//! Error types for the Contoso copilot.
//!
//! One error enum covers every category the tool can surface: missing
//! configuration, hosted-service failures, and malformed input.

use thiserror::Error;

/// Unified error type for the copilot workspace.
///
/// All fallible functions return `Result<T, AppError>`. Errors are
/// propagated to the process boundary unmodified; nothing here retries.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (environment, config.json)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat or embedding model failures
    #[error("LLM error: {0}")]
    Llm(String),

    /// Hosted search index failures
    #[error("Search error: {0}")]
    Search(String),

    /// Prompt loading or rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Malformed input (empty conversation, bad dataset rows)
    #[error("Invalid input: {0}")]
    Input(String),

    /// Evaluation scoring errors
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Hosted flow deployment errors
    #[error("Deployment error: {0}")]
    Deployment(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
