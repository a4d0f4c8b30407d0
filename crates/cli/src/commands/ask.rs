//! Ask command handler.
//!
//! Sends one question through the selected backend and prints the answer.

use copilot_chat::{copilot_qna, create_answerer, Implementation};
use copilot_core::{config::AppConfig, AppResult};

/// Ask a single question
#[derive(Debug)]
pub struct AskCommand {
    pub question: String,
    pub implementation: Implementation,
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let answerer = create_answerer(self.implementation, config)?;
        let result = copilot_qna(&self.question, answerer.as_ref()).await?;

        tracing::debug!(
            "Answer grounded on {} citations",
            result.context.citations.len()
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.answer);
        }

        Ok(())
    }
}
