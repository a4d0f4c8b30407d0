//! Contoso Copilot core library
//!
//! Shared foundations for every crate in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration loaded once at startup

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ApiType, FlowAssets, ModelDeployment, Secret};
pub use error::{AppError, AppResult};
