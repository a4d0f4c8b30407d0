//! Question answering backends and their construction from configuration.

pub mod flow;
pub mod hosted;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;

pub use flow::FlowAnswerer;
pub use hosted::HostedAnswerer;
pub use retrieval::RetrievalAnswerer;

use crate::answerer::QuestionAnswerer;
use crate::implementation::Implementation;
use copilot_core::{AppConfig, AppError, AppResult};
use copilot_knowledge::{RetrievalMode, SearchClient, SearchRetriever};
use copilot_llm::{create_client, SearchDataSource, SearchQueryType};
use copilot_prompt::{build_system_instruction, load_prompt, SUPPORT_PROMPT_ID};
use std::sync::Arc;

/// Build the selected backend.
///
/// Only the settings the backend needs are resolved, so a missing variable
/// surfaces as a configuration error naming it.
pub fn create_answerer(
    implementation: Implementation,
    config: &AppConfig,
) -> AppResult<Arc<dyn QuestionAnswerer>> {
    tracing::debug!("Creating '{}' backend", implementation);

    match implementation {
        Implementation::AiSdk => {
            let client = create_client(config)?;
            let search = config.search()?;
            let embedding = config.embedding_deployment().ok();

            let prompt = load_prompt(&config.workspace, SUPPORT_PROMPT_ID)?;
            let system = build_system_instruction(&prompt)?.ok_or_else(|| {
                AppError::Prompt(format!("Prompt '{}' has no system instruction", prompt.id))
            })?;

            let data_source = SearchDataSource {
                endpoint: search.endpoint,
                index_name: search.index_name,
                key: search.key,
                in_scope: true,
                top_n_documents: crate::types::DEFAULT_TOP,
                role_information: None,
                query_type: if embedding.is_some() {
                    SearchQueryType::VectorSimpleHybrid
                } else {
                    SearchQueryType::Simple
                },
                embedding_deployment: embedding.map(|d| d.deployment),
            };

            Ok(Arc::new(HostedAnswerer::new(
                client,
                config.chat_deployment()?,
                data_source,
                system,
            )))
        }
        Implementation::LangChain | Implementation::SemanticKernel => {
            let client = create_client(config)?;
            let index = Arc::new(SearchClient::new(config.search()?)?);
            let mode = if implementation == Implementation::LangChain {
                RetrievalMode::Vector
            } else {
                RetrievalMode::Hybrid
            };
            let retriever = Arc::new(SearchRetriever::new(
                index,
                client.clone(),
                config.embedding_deployment()?,
                mode,
            ));

            Ok(Arc::new(RetrievalAnswerer::new(
                implementation,
                client,
                config.chat_deployment()?,
                retriever,
                load_prompt(&config.workspace, SUPPORT_PROMPT_ID)?,
            )))
        }
        Implementation::PromptFlow => Ok(Arc::new(FlowAnswerer::new(config.flow_endpoint()?)?)),
    }
}
