//! Deploy command handler.
//!
//! Publishes the selected backend as a hosted flow and prints its scoring
//! URI.

use copilot_chat::{default_deployment_name, deploy_flow, FlowManifest, Implementation, ManagementClient};
use copilot_core::{config::AppConfig, AppResult};
use copilot_prompt::{load_prompt, SUPPORT_PROMPT_ID};

/// Deploy the copilot as a hosted flow
#[derive(Debug)]
pub struct DeployCommand {
    pub implementation: Implementation,
    pub deployment_name: Option<String>,
    pub json: bool,
}

impl DeployCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing deploy command");

        let project = config.project()?;
        let name = self
            .deployment_name
            .clone()
            .unwrap_or_else(|| default_deployment_name(&project));

        let prompt = load_prompt(&config.workspace, SUPPORT_PROMPT_ID)?;
        let manifest =
            FlowManifest::new(&name, self.implementation, prompt, config.flow_assets()?)?;
        let client = ManagementClient::new(config.management_token()?)?;

        let info = deploy_flow(&client, &project, &manifest, &config.state_dir()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            println!("Deployed '{}'", info.deployment_name);
            println!("Scoring URI: {}", info.scoring_uri);
        }

        Ok(())
    }
}
