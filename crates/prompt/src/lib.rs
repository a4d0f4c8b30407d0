//! Prompt system for the Contoso copilot.
//!
//! - YAML prompt definitions, with the product support prompt built in
//! - Workspace overrides under `prompts/`
//! - Handlebars rendering of the system instruction and user template

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, build_system_instruction, CONTEXT_VARIABLE, QUESTION_VARIABLE};
pub use loader::{builtin_support_prompt, load_prompt, REFUSAL_MESSAGE, SUPPORT_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInputSpec, PromptOutputSpec};
