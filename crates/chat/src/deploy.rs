//! Publishing the copilot as a hosted flow.
//!
//! A flow manifest (backend, prompt, the registered model and environment
//! that serve it, and the names of the environment variables it reads) is
//! written under the workspace state directory. A managed online endpoint
//! and a deployment of that model are then created through the hosted
//! management API.

use crate::implementation::Implementation;
use copilot_core::config::{FlowAssets, ProjectSettings};
use copilot_core::{AppError, AppResult, Secret};
use copilot_prompt::PromptDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Management API base URL
pub const MANAGEMENT_BASE_URL: &str = "https://management.azure.com";

/// Management API version for online endpoints
pub const MANAGEMENT_API_VERSION: &str = "2023-10-01";

/// Compute size of the flow deployment
const INSTANCE_TYPE: &str = "Standard_DS3_v2";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Environment variables every self-grounding backend reads.
const MODEL_ENVIRONMENT: &[&str] = &[
    "OPENAI_API_TYPE",
    "OPENAI_API_KEY",
    "OPENAI_API_VERSION",
    "OPENAI_API_BASE",
    "AZURE_AI_SEARCH_ENDPOINT",
    "AZURE_AI_SEARCH_KEY",
    "AZURE_AI_SEARCH_INDEX_NAME",
    "AZURE_OPENAI_CHAT_DEPLOYMENT",
    "AZURE_OPENAI_CHAT_MODEL",
    "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
    "AZURE_OPENAI_EMBEDDING_MODEL",
];

/// What a deployed flow runs. Holds variable names only, never values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowManifest {
    pub name: String,
    pub implementation: String,
    pub prompt: PromptDefinition,

    /// Model asset id the deployment serves
    pub model: String,

    /// Environment asset id the model runs in
    pub environment_id: String,

    pub environment: Vec<String>,
}

impl FlowManifest {
    /// Manifest for deploying `implementation` under `name`.
    pub fn new(
        name: &str,
        implementation: Implementation,
        prompt: PromptDefinition,
        assets: FlowAssets,
    ) -> AppResult<Self> {
        if implementation == Implementation::PromptFlow {
            return Err(AppError::Deployment(
                "The promptflow backend calls a deployed flow and cannot be deployed itself"
                    .to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            implementation: implementation.as_str().to_string(),
            prompt,
            model: assets.model,
            environment_id: assets.environment,
            environment: MODEL_ENVIRONMENT.iter().map(|v| v.to_string()).collect(),
        })
    }
}

/// Result of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub endpoint_name: String,
    pub deployment_name: String,
    pub scoring_uri: String,
    pub manifest_path: PathBuf,
}

/// Deployment name used when none is given.
pub fn default_deployment_name(project: &ProjectSettings) -> String {
    format!("{}-copilot", project.project_name)
}

/// Client for the hosted management API.
pub struct ManagementClient {
    base_url: String,
    token: Secret,
    client: reqwest::Client,
}

impl ManagementClient {
    pub fn new(token: Secret) -> AppResult<Self> {
        Self::with_base_url(MANAGEMENT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: Secret) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Deployment(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn endpoint_url(&self, project: &ProjectSettings, endpoint: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}/onlineEndpoints/{}?api-version={}",
            self.base_url,
            project.subscription_id,
            project.resource_group,
            project.project_name,
            endpoint,
            MANAGEMENT_API_VERSION
        )
    }

    fn deployment_url(&self, project: &ProjectSettings, endpoint: &str, deployment: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}/onlineEndpoints/{}/deployments/{}?api-version={}",
            self.base_url,
            project.subscription_id,
            project.resource_group,
            project.project_name,
            endpoint,
            deployment,
            MANAGEMENT_API_VERSION
        )
    }

    async fn put(&self, url: &str, body: &Value, what: &str) -> AppResult<Value> {
        tracing::debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .bearer_auth(self.token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Deployment(format!("Failed to send {} request: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Deployment(format!(
                "{} request failed ({}): {}",
                what, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Deployment(format!("Failed to parse {} response: {}", what, e)))
    }
}

fn endpoint_body(location: &str, manifest: &FlowManifest) -> Value {
    json!({
        "location": location,
        "identity": { "type": "SystemAssigned" },
        "properties": {
            "authMode": "Key",
            "description": format!("Contoso outdoor copilot ({})", manifest.implementation),
        }
    })
}

fn deployment_body(location: &str, manifest: &FlowManifest) -> AppResult<Value> {
    Ok(json!({
        "location": location,
        "sku": { "name": "Default", "capacity": 1 },
        "properties": {
            "endpointComputeType": "Managed",
            "instanceType": INSTANCE_TYPE,
            "model": manifest.model,
            "environmentId": manifest.environment_id,
            "environmentVariables": {
                "COPILOT_IMPLEMENTATION": manifest.implementation,
            },
            "properties": {
                "copilot.implementation": manifest.implementation,
                "copilot.manifest": serde_json::to_string(manifest)?,
            }
        }
    }))
}

/// Scoring URI reported by the service, or the conventional one.
fn scoring_uri(endpoint_response: &Value, endpoint: &str, location: &str) -> String {
    endpoint_response
        .pointer("/properties/scoringUri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://{}.{}.inference.ml.azure.com/score", endpoint, location))
}

fn write_manifest(state_dir: &Path, manifest: &FlowManifest) -> AppResult<PathBuf> {
    let dir = state_dir.join("deployments");
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{}.json", manifest.name));
    std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    Ok(path)
}

/// Create or update the endpoint and deployment for `manifest`.
pub async fn deploy_flow(
    client: &ManagementClient,
    project: &ProjectSettings,
    manifest: &FlowManifest,
    state_dir: &Path,
) -> AppResult<DeploymentInfo> {
    let location = project.location.as_deref().ok_or_else(|| {
        AppError::Config("config.json has no 'location' for the deployment".to_string())
    })?;
    let name = manifest.name.as_str();

    tracing::info!(
        "Deploying '{}' ({}) to project '{}' in {}",
        name,
        manifest.implementation,
        project.project_name,
        location
    );

    let manifest_path = write_manifest(state_dir, manifest)?;
    tracing::debug!("Wrote flow manifest to {:?}", manifest_path);

    let endpoint = client
        .put(
            &client.endpoint_url(project, name),
            &endpoint_body(location, manifest),
            "endpoint",
        )
        .await?;
    tracing::info!("Endpoint '{}' created or updated", name);

    client
        .put(
            &client.deployment_url(project, name, name),
            &deployment_body(location, manifest)?,
            "deployment",
        )
        .await?;
    tracing::info!("Deployment '{}' created or updated", name);

    Ok(DeploymentInfo {
        endpoint_name: name.to_string(),
        deployment_name: name.to_string(),
        scoring_uri: scoring_uri(&endpoint, name, location),
        manifest_path,
    })
}
