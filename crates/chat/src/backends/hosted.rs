//! Server-side grounding: the model service queries the search index
//! itself and returns citations with its reply.

use crate::answerer::{latest_question, postprocess_answer, QuestionAnswerer};
use crate::types::{ChatAnswer, Context};
use copilot_core::{AppResult, ModelDeployment};
use copilot_llm::{ChatClient, ChatMessage, ChatRequest, SearchDataSource};
use std::sync::Arc;

/// Answers with a single grounded chat completion.
pub struct HostedAnswerer {
    client: Arc<dyn ChatClient>,
    deployment: ModelDeployment,

    /// Index to ground on; `top_n_documents` is taken from the call context
    data_source: SearchDataSource,

    system: String,
}

impl HostedAnswerer {
    pub fn new(
        client: Arc<dyn ChatClient>,
        deployment: ModelDeployment,
        data_source: SearchDataSource,
        system: String,
    ) -> Self {
        Self {
            client,
            deployment,
            data_source,
            system,
        }
    }

    fn build_request(&self, messages: &[ChatMessage], context: &Context) -> ChatRequest {
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(ChatMessage::system(self.system.clone()));
        conversation.extend_from_slice(messages);

        let mut source = self.data_source.clone();
        source.top_n_documents = context.top;
        source.role_information = Some(self.system.clone());

        let mut request = ChatRequest::new(self.deployment.clone(), conversation)
            .with_temperature(context.temperature)
            .with_data_source(source);

        if let Some(max_tokens) = context.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        request
    }
}

#[async_trait::async_trait]
impl QuestionAnswerer for HostedAnswerer {
    fn name(&self) -> &str {
        "aisdk"
    }

    async fn answer(
        &self,
        messages: &[ChatMessage],
        stream: bool,
        context: &Context,
    ) -> AppResult<ChatAnswer> {
        let question = latest_question(messages)?;
        tracing::debug!("Answering (stream requested: {}): {}", stream, question);

        let response = self
            .client
            .complete(&self.build_request(messages, context))
            .await?;

        let grounding = response.context.unwrap_or_default();
        if grounding.is_empty() {
            tracing::warn!("Service returned no grounding context");
        } else {
            tracing::info!(
                "Answer grounded on {} citations",
                grounding.citations.len()
            );
        }

        Ok(ChatAnswer::new(
            postprocess_answer(&response.content),
            grounding,
        ))
    }
}
