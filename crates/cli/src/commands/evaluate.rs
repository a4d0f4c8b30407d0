//! Evaluate command handler.
//!
//! Scores the selected backend on a JSONL dataset and prints the summary.

use copilot_chat::{create_answerer, run_evaluation, Implementation, Judge};
use copilot_core::{config::AppConfig, AppResult};
use copilot_llm::create_client;

/// Evaluate a backend against a dataset
#[derive(Debug)]
pub struct EvaluateCommand {
    pub implementation: Implementation,

    /// Dataset path, relative to the workspace
    pub dataset_path: String,
}

impl EvaluateCommand {
    /// Name results are recorded under.
    pub fn evaluation_name(&self) -> String {
        format!("test-{}-copilot", self.implementation)
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing evaluate command");

        let answerer = create_answerer(self.implementation, config)?;
        let judge = Judge::new(create_client(config)?, config.evaluation_deployment()?);

        let dataset = config.workspace.join(&self.dataset_path);
        let output_dir = config.state_dir().join("evaluations");

        let summary = run_evaluation(
            answerer.as_ref(),
            &self.evaluation_name(),
            &dataset,
            &judge,
            &output_dir,
        )
        .await?;

        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
