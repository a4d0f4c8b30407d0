//! Model client abstraction and request/response types.
//!
//! Backends talk to the hosted model service only through [`ChatClient`]
//! and [`EmbeddingClient`], so tests can substitute in-memory fakes.

use crate::types::{ChatMessage, ResponseContext};
use copilot_core::{AppResult, ModelDeployment, Secret};
use serde::{Deserialize, Serialize};

/// How the hosted search index is queried by a server-side data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQueryType {
    Simple,
    Vector,
    VectorSimpleHybrid,
}

/// A search index the model service queries on its own before answering.
#[derive(Debug, Clone)]
pub struct SearchDataSource {
    pub endpoint: String,
    pub index_name: String,
    pub key: Secret,

    /// Restrict answers to the indexed documents
    pub in_scope: bool,

    /// Number of documents to retrieve
    pub top_n_documents: u32,

    /// System instruction the service uses to ground its answer
    pub role_information: Option<String>,

    pub query_type: SearchQueryType,

    /// Embedding deployment for vector queries
    pub embedding_deployment: Option<String>,
}

/// Chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Target deployment
    pub deployment: ModelDeployment,

    /// Conversation to complete
    pub messages: Vec<ChatMessage>,

    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Server-side retrieval sources
    pub data_sources: Vec<SearchDataSource>,
}

impl ChatRequest {
    /// Create a new chat request with required fields.
    pub fn new(deployment: ModelDeployment, messages: Vec<ChatMessage>) -> Self {
        Self {
            deployment,
            messages,
            temperature: None,
            max_tokens: None,
            data_sources: Vec::new(),
        }
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Attach a search index for the service to ground on.
    pub fn with_data_source(mut self, source: SearchDataSource) -> Self {
        self.data_sources.push(source);
        self
    }
}

/// Chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    #[serde(default)]
    pub usage: Usage,

    /// Grounding context, when the request carried a data source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ResponseContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Chat completion provider.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Provider name used in logs.
    fn provider_name(&self) -> &str;

    /// Perform a single, non-streaming completion.
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}

/// Embedding provider.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts. The result has one vector per input, in order.
    async fn embed(&self, deployment: &ModelDeployment, inputs: &[String])
        -> AppResult<Vec<Vec<f32>>>;
}
