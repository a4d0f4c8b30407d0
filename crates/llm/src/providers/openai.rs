//! Hosted OpenAI-compatible model provider.
//!
//! Speaks both the Azure deployment flavour
//! (`{base}/openai/deployments/{deployment}/chat/completions?api-version=...`,
//! `api-key` header) and the public OpenAI flavour (`{base}/chat/completions`,
//! bearer token). Grounded requests carry `data_sources`, and the service
//! returns a `context` object with citations on the reply message.

use crate::client::{
    ChatClient, ChatRequest, ChatResponse, EmbeddingClient, SearchDataSource, SearchQueryType,
    Usage,
};
use crate::types::{ChatMessage, ResponseContext};
use copilot_core::config::OpenAiSettings;
use copilot_core::{ApiType, AppError, AppResult, ModelDeployment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct WireChatRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    data_sources: Vec<WireDataSource<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireDataSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    parameters: WireSearchParameters<'a>,
}

#[derive(Debug, Serialize)]
struct WireSearchParameters<'a> {
    endpoint: &'a str,
    index_name: &'a str,
    authentication: WireAuthentication<'a>,
    in_scope: bool,
    top_n_documents: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_information: Option<&'a str>,
    query_type: SearchQueryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding_dependency: Option<WireEmbeddingDependency<'a>>,
}

#[derive(Debug, Serialize)]
struct WireAuthentication<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct WireEmbeddingDependency<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    deployment_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    context: Option<ResponseContext>,
}

#[derive(Debug, Serialize)]
struct WireEmbeddingRequest<'a> {
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireEmbeddingResponse {
    data: Vec<WireEmbedding>,
}

#[derive(Debug, Deserialize)]
struct WireEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Hosted model client.
pub struct OpenAiClient {
    settings: OpenAiSettings,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the given service settings.
    pub fn new(settings: OpenAiSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    /// URL of an operation (`chat/completions`, `embeddings`) for a deployment.
    fn operation_url(&self, deployment: &ModelDeployment, operation: &str) -> String {
        match self.settings.api_type {
            ApiType::Azure => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                self.settings.api_base, deployment.deployment, operation, self.settings.api_version
            ),
            ApiType::OpenAi => format!("{}/{}", self.settings.api_base, operation),
        }
    }

    /// Body `model` field; Azure routes by deployment in the URL instead.
    fn body_model<'a>(&self, deployment: &'a ModelDeployment) -> Option<&'a str> {
        match self.settings.api_type {
            ApiType::Azure => None,
            ApiType::OpenAi => Some(deployment.model_name()),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.settings.api_key.expose();
        match self.settings.api_type {
            ApiType::Azure => builder.header("api-key", key),
            ApiType::OpenAi => builder.bearer_auth(key),
        }
    }

    fn to_wire_request<'a>(&self, request: &'a ChatRequest) -> WireChatRequest<'a> {
        WireChatRequest {
            messages: &request.messages,
            model: self.body_model(&request.deployment),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            data_sources: request.data_sources.iter().map(to_wire_source).collect(),
            stream: false,
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B, what: &str) -> AppResult<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send {} request: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} request failed ({}): {}",
                what,
                status,
                describe_error(&error_text)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse {} response: {}", what, e)))
    }
}

fn to_wire_source(source: &SearchDataSource) -> WireDataSource<'_> {
    WireDataSource {
        kind: "azure_search",
        parameters: WireSearchParameters {
            endpoint: &source.endpoint,
            index_name: &source.index_name,
            authentication: WireAuthentication {
                kind: "api_key",
                key: source.key.expose(),
            },
            in_scope: source.in_scope,
            top_n_documents: source.top_n_documents,
            role_information: source.role_information.as_deref(),
            query_type: source.query_type,
            embedding_dependency: source.embedding_deployment.as_deref().map(|name| {
                WireEmbeddingDependency {
                    kind: "deployment_name",
                    deployment_name: name,
                }
            }),
        },
    }
}

fn convert_response(response: WireChatResponse) -> AppResult<ChatResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Llm("Chat response contained no choices".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        model: response.model,
        usage: response.usage.unwrap_or_default(),
        context: choice.message.context,
        finish_reason: choice.finish_reason,
    })
}

/// Pull the service's error message out of an error body when it has one.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<WireErrorBody>(body) {
        Ok(parsed) => match parsed.error.code {
            Some(code) => format!("{}: {}", code, parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.to_string(),
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        self.settings.api_type.as_str()
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(
            "Sending chat completion to deployment '{}' ({} messages, {} data sources)",
            request.deployment.deployment,
            request.messages.len(),
            request.data_sources.len()
        );

        let url = self.operation_url(&request.deployment, "chat/completions");
        let wire: WireChatResponse = self
            .post_json(&url, &self.to_wire_request(request), "chat completion")
            .await?;

        let response = convert_response(wire)?;

        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.usage.total_tokens
        );

        Ok(response)
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(
        &self,
        deployment: &ModelDeployment,
        inputs: &[String],
    ) -> AppResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts with deployment '{}'",
            inputs.len(),
            deployment.deployment
        );

        let url = self.operation_url(deployment, "embeddings");
        let body = WireEmbeddingRequest {
            input: inputs,
            model: self.body_model(deployment),
        };

        let response: WireEmbeddingResponse = self.post_json(&url, &body, "embedding").await?;
        order_embeddings(response, inputs.len())
    }
}

/// Put embeddings back in input order and check nothing is missing.
fn order_embeddings(response: WireEmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(AppError::Llm(format!(
            "Expected {} embeddings, received {}",
            expected,
            response.data.len()
        )));
    }

    let mut data = response.data;
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_core::Secret;

    fn settings(api_type: ApiType) -> OpenAiSettings {
        OpenAiSettings {
            api_type,
            api_key: Secret::new("key"),
            api_version: "2024-02-01".to_string(),
            api_base: "https://contoso.openai.azure.com".to_string(),
        }
    }

    fn deployment() -> ModelDeployment {
        ModelDeployment {
            deployment: "gpt-35-turbo-deploy".to_string(),
            model: Some("gpt-35-turbo".to_string()),
        }
    }

    #[test]
    fn test_azure_chat_url() {
        let client = OpenAiClient::new(settings(ApiType::Azure)).unwrap();
        assert_eq!(
            client.operation_url(&deployment(), "chat/completions"),
            "https://contoso.openai.azure.com/openai/deployments/gpt-35-turbo-deploy/chat/completions?api-version=2024-02-01"
        );
        assert_eq!(client.provider_name(), "azure");
    }

    #[test]
    fn test_openai_url_and_model() {
        let mut s = settings(ApiType::OpenAi);
        s.api_base = "https://api.openai.com/v1".to_string();
        let client = OpenAiClient::new(s).unwrap();

        assert_eq!(
            client.operation_url(&deployment(), "embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(client.body_model(&deployment()), Some("gpt-35-turbo"));
    }

    #[test]
    fn test_wire_request_with_data_source() {
        let client = OpenAiClient::new(settings(ApiType::Azure)).unwrap();
        let request = ChatRequest::new(deployment(), vec![ChatMessage::user("tents?")])
            .with_temperature(0.7)
            .with_data_source(SearchDataSource {
                endpoint: "https://contoso.search.windows.net".to_string(),
                index_name: "contoso_product_index".to_string(),
                key: Secret::new("search-key"),
                in_scope: true,
                top_n_documents: 5,
                role_information: Some("You are an AI assistant".to_string()),
                query_type: SearchQueryType::VectorSimpleHybrid,
                embedding_deployment: Some("text-embedding-ada-002".to_string()),
            });

        let json = serde_json::to_value(client.to_wire_request(&request)).unwrap();
        assert!(json.get("model").is_none());
        assert_eq!(json["stream"], false);

        let params = &json["data_sources"][0]["parameters"];
        assert_eq!(json["data_sources"][0]["type"], "azure_search");
        assert_eq!(params["index_name"], "contoso_product_index");
        assert_eq!(params["authentication"]["type"], "api_key");
        assert_eq!(params["authentication"]["key"], "search-key");
        assert_eq!(params["query_type"], "vector_simple_hybrid");
        assert_eq!(
            params["embedding_dependency"]["deployment_name"],
            "text-embedding-ada-002"
        );
    }

    #[test]
    fn test_wire_request_without_data_source() {
        let client = OpenAiClient::new(settings(ApiType::Azure)).unwrap();
        let request = ChatRequest::new(deployment(), vec![ChatMessage::user("tents?")]);

        let json = serde_json::to_value(client.to_wire_request(&request)).unwrap();
        assert!(json.get("data_sources").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_convert_grounded_response() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-35-turbo",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {
                    "role": "assistant",
                    "content": "The TrailMaster X4 Tent is waterproof [doc1].",
                    "context": {
                        "citations": [{"content": "TrailMaster X4", "title": "TrailMaster X4 Tent", "filepath": "product_info_1.md"}],
                        "intent": "[\"waterproof tent\"]"
                    }
                }
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;

        let wire: WireChatResponse = serde_json::from_str(body).unwrap();
        let response = convert_response(wire).unwrap();

        assert!(response.content.starts_with("The TrailMaster X4"));
        assert_eq!(response.usage.total_tokens, 120);
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        let context = response.context.unwrap();
        assert_eq!(context.citations[0].title.as_deref(), Some("TrailMaster X4 Tent"));
    }

    #[test]
    fn test_convert_response_without_choices() {
        let wire: WireChatResponse =
            serde_json::from_str(r#"{"model": "gpt-35-turbo", "choices": []}"#).unwrap();
        assert!(matches!(convert_response(wire), Err(AppError::Llm(_))));
    }

    #[test]
    fn test_describe_error() {
        let body = r#"{"error": {"code": "401", "message": "Access denied due to invalid subscription key."}}"#;
        assert_eq!(
            describe_error(body),
            "401: Access denied due to invalid subscription key."
        );
        assert_eq!(describe_error("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_order_embeddings() {
        let response = WireEmbeddingResponse {
            data: vec![
                WireEmbedding {
                    index: 1,
                    embedding: vec![0.0, 1.0],
                },
                WireEmbedding {
                    index: 0,
                    embedding: vec![1.0, 0.0],
                },
            ],
        };

        let ordered = order_embeddings(response, 2).unwrap();
        assert_eq!(ordered[0], vec![1.0, 0.0]);
        assert_eq!(ordered[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_order_embeddings_count_mismatch() {
        let response = WireEmbeddingResponse { data: vec![] };
        assert!(order_embeddings(response, 1).is_err());
    }
}
