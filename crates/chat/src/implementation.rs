//! Backend selection by name.

use copilot_core::AppError;
use std::fmt;
use std::str::FromStr;

/// The question answering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Implementation {
    /// Hosted model grounds itself on the search index
    #[default]
    AiSdk,

    /// Vector retrieval, then a templated completion
    LangChain,

    /// Hybrid retrieval, then a templated completion
    SemanticKernel,

    /// Deployed flow endpoint
    PromptFlow,
}

/// Name lookup table.
pub const IMPLEMENTATIONS: &[(&str, Implementation)] = &[
    ("aisdk", Implementation::AiSdk),
    ("langchain", Implementation::LangChain),
    ("semantickernel", Implementation::SemanticKernel),
    ("promptflow", Implementation::PromptFlow),
];

impl Implementation {
    pub fn as_str(&self) -> &'static str {
        IMPLEMENTATIONS
            .iter()
            .find(|(_, implementation)| implementation == self)
            .map(|(name, _)| *name)
            .unwrap_or("aisdk")
    }

    /// Names accepted by [`FromStr`].
    pub fn names() -> Vec<&'static str> {
        IMPLEMENTATIONS.iter().map(|(name, _)| *name).collect()
    }
}

impl FromStr for Implementation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IMPLEMENTATIONS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, implementation)| *implementation)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown implementation: {}. Supported: {}",
                    s,
                    Self::names().join(", ")
                ))
            })
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
