//! Model integration crate for the Contoso copilot.
//!
//! Provides a provider-agnostic interface for chat completion and
//! embeddings, plus the client for the hosted OpenAI-compatible service.
//!
//! # Example
//! ```no_run
//! use copilot_core::AppConfig;
//! use copilot_llm::{create_client, ChatClient, ChatMessage, ChatRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let client = create_client(&config)?;
//! let request = ChatRequest::new(
//!     config.chat_deployment()?,
//!     vec![ChatMessage::user("which tent is the most waterproof?")],
//! );
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatClient, ChatRequest, ChatResponse, EmbeddingClient, SearchDataSource, SearchQueryType,
    Usage,
};
pub use factory::create_client;
pub use providers::OpenAiClient;
pub use types::{ChatMessage, Citation, ResponseContext, Role};
