//! Deployed flow endpoint backend.
//!
//! Sends the conversation to the scoring URI printed by `--deploy` and
//! reads back the chat protocol reply (`choices[0].message`).

use crate::answerer::{latest_question, postprocess_answer, QuestionAnswerer};
use crate::types::{ChatAnswer, Context};
use copilot_core::config::FlowEndpoint;
use copilot_core::{AppError, AppResult};
use copilot_llm::{ChatMessage, ResponseContext};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct WireFlowRequest<'a> {
    messages: &'a [ChatMessage],
    stream: bool,
    context: &'a Context,
}

#[derive(Debug, Deserialize)]
struct WireFlowResponse {
    choices: Vec<WireFlowChoice>,
}

#[derive(Debug, Deserialize)]
struct WireFlowChoice {
    message: WireFlowMessage,
}

#[derive(Debug, Deserialize)]
struct WireFlowMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    context: Option<ResponseContext>,
}

/// Calls a deployed flow.
pub struct FlowAnswerer {
    endpoint: FlowEndpoint,
    client: reqwest::Client,
}

impl FlowAnswerer {
    pub fn new(endpoint: FlowEndpoint) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait::async_trait]
impl QuestionAnswerer for FlowAnswerer {
    fn name(&self) -> &str {
        "promptflow"
    }

    async fn answer(
        &self,
        messages: &[ChatMessage],
        stream: bool,
        context: &Context,
    ) -> AppResult<ChatAnswer> {
        let question = latest_question(messages)?;
        tracing::debug!("Answering (stream requested: {}): {}", stream, question);
        tracing::info!("Calling flow endpoint {}", self.endpoint.url);

        let body = WireFlowRequest {
            messages,
            stream: false,
            context,
        };

        let response = self
            .client
            .post(&self.endpoint.url)
            .bearer_auth(self.endpoint.key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to call flow endpoint: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Flow endpoint request failed ({}): {}",
                status, error_text
            )));
        }

        let wire: WireFlowResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse flow response: {}", e)))?;

        convert_response(wire)
    }
}

fn convert_response(response: WireFlowResponse) -> AppResult<ChatAnswer> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| AppError::Llm("Flow response contained no choices".to_string()))?;

    Ok(ChatAnswer::new(
        postprocess_answer(&message.content),
        message.context.unwrap_or_default(),
    ))
}
