//! Client-side grounding: retrieve documents, render them into the
//! support prompt and ask the model once.

use crate::answerer::{latest_question, postprocess_answer, QuestionAnswerer};
use crate::implementation::Implementation;
use crate::types::{ChatAnswer, Context};
use copilot_core::{AppResult, ModelDeployment};
use copilot_knowledge::{build_context, to_citation, Retriever};
use copilot_llm::{ChatClient, ChatMessage, ChatRequest, ResponseContext};
use copilot_prompt::{build_prompt, PromptDefinition, CONTEXT_VARIABLE, QUESTION_VARIABLE};
use std::collections::HashMap;
use std::sync::Arc;

/// Retrieve-then-answer backend.
pub struct RetrievalAnswerer {
    implementation: Implementation,
    client: Arc<dyn ChatClient>,
    deployment: ModelDeployment,
    retriever: Arc<dyn Retriever>,
    prompt: PromptDefinition,
}

impl RetrievalAnswerer {
    pub fn new(
        implementation: Implementation,
        client: Arc<dyn ChatClient>,
        deployment: ModelDeployment,
        retriever: Arc<dyn Retriever>,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            implementation,
            client,
            deployment,
            retriever,
            prompt,
        }
    }
}

#[async_trait::async_trait]
impl QuestionAnswerer for RetrievalAnswerer {
    fn name(&self) -> &str {
        self.implementation.as_str()
    }

    async fn answer(
        &self,
        messages: &[ChatMessage],
        stream: bool,
        context: &Context,
    ) -> AppResult<ChatAnswer> {
        let question = latest_question(messages)?;
        tracing::debug!("Answering (stream requested: {}): {}", stream, question);

        let hits = self.retriever.retrieve(question, context.top).await?;

        let mut variables = HashMap::new();
        variables.insert(QUESTION_VARIABLE.to_string(), question.to_string());
        variables.insert(CONTEXT_VARIABLE.to_string(), build_context(&hits));
        let built = build_prompt(&self.prompt, variables)?;

        let mut conversation = Vec::with_capacity(2);
        if let Some(system) = built.system {
            conversation.push(ChatMessage::system(system));
        }
        conversation.push(ChatMessage::user(built.user));

        let mut request = ChatRequest::new(self.deployment.clone(), conversation)
            .with_temperature(context.temperature);
        if let Some(max_tokens) = context.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await?;

        let citations = hits.iter().map(to_citation).collect();
        Ok(ChatAnswer::new(
            postprocess_answer(&response.content),
            ResponseContext::from_citations(citations),
        ))
    }
}
