//! Command handlers for the Contoso Copilot CLI.
//!
//! One module per mode; `main` picks exactly one per invocation.

pub mod ask;
pub mod build_index;
pub mod deploy;
pub mod evaluate;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use build_index::BuildIndexCommand;
pub use deploy::DeployCommand;
pub use evaluate::EvaluateCommand;
