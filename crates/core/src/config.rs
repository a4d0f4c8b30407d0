//! Configuration management for the Contoso copilot.
//!
//! Configuration is read once at startup from:
//! - a `.env` file in the working directory (if present)
//! - process environment variables
//! - command-line flags (applied via [`AppConfig::with_overrides`])
//! - `config.json` in the workspace, for the hosted project identity
//!
//! The resulting [`AppConfig`] is passed by reference to every operation.
//! Nothing below the CLI reads the environment on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default index name for the product catalog.
pub const DEFAULT_INDEX_NAME: &str = "contoso_product_index";

/// Default API version for the hosted model service.
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Default base URL when the API type is plain OpenAI.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// A credential value that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw value for use in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which flavour of the hosted model API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    /// Azure-hosted deployments (`/openai/deployments/<name>/...`, `api-key` header)
    Azure,
    /// The public OpenAI API (`/chat/completions`, bearer token)
    OpenAi,
}

impl ApiType {
    /// Parse the `OPENAI_API_TYPE` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "azure" | "azure_ad" => Some(Self::Azure),
            "open_ai" | "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::OpenAi => "open_ai",
        }
    }
}

/// Connection settings for the hosted model service.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_type: ApiType,
    pub api_key: Secret,
    pub api_version: String,
    pub api_base: String,
}

/// Connection settings for the hosted search service.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: String,
    pub key: Secret,
    pub index_name: String,
}

/// A model deployment on the hosted model service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDeployment {
    /// Deployment name (Azure) or model name (OpenAI)
    pub deployment: String,

    /// Underlying model identifier, when known
    pub model: Option<String>,
}

impl ModelDeployment {
    /// Model name to put in request bodies.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.deployment)
    }
}

/// Scoring endpoint of a deployed flow.
#[derive(Debug, Clone)]
pub struct FlowEndpoint {
    pub url: String,
    pub key: Secret,
}

/// Registered assets a flow deployment runs: the model packaged from the
/// copilot sources and the environment that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowAssets {
    /// Model asset id, e.g. `azureml:contoso-copilot:1`
    pub model: String,

    /// Environment asset id, e.g. `azureml:copilot-runtime:3`
    pub environment: String,
}

/// Hosted project identity, read from `config.json` in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSettings {
    pub subscription_id: String,
    pub resource_group: String,

    #[serde(alias = "workspace_name")]
    pub project_name: String,

    /// Region of the project, used for hosted endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Main application configuration.
///
/// Raw values are kept optional so that each operation only fails on the
/// settings it actually needs. Use the typed accessors to obtain validated
/// views.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Workspace root (contains config.json, data/, .copilot/)
    pub workspace: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub openai_api_type: Option<String>,
    pub openai_api_key: Option<Secret>,
    pub openai_api_version: Option<String>,
    pub openai_api_base: Option<String>,

    pub search_endpoint: Option<String>,
    pub search_key: Option<Secret>,
    pub search_index_name: String,

    pub chat_deployment: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_deployment: Option<String>,
    pub embedding_model: Option<String>,
    pub evaluation_deployment: Option<String>,

    pub flow_endpoint: Option<String>,
    pub flow_key: Option<Secret>,
    pub flow_model: Option<String>,
    pub flow_environment: Option<String>,

    pub management_token: Option<Secret>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            log_level: None,
            verbose: false,
            no_color: false,
            openai_api_type: None,
            openai_api_key: None,
            openai_api_version: None,
            openai_api_base: None,
            search_endpoint: None,
            search_key: None,
            search_index_name: DEFAULT_INDEX_NAME.to_string(),
            chat_deployment: None,
            chat_model: None,
            embedding_deployment: None,
            embedding_model: None,
            evaluation_deployment: None,
            flow_endpoint: None,
            flow_key: None,
            flow_model: None,
            flow_environment: None,
            management_token: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment.
    ///
    /// Environment variables:
    /// - `OPENAI_API_TYPE`, `OPENAI_API_KEY`, `OPENAI_API_VERSION`, `OPENAI_API_BASE`
    /// - `AZURE_AI_SEARCH_ENDPOINT`, `AZURE_AI_SEARCH_KEY`, `AZURE_AI_SEARCH_INDEX_NAME`
    /// - `AZURE_OPENAI_CHAT_DEPLOYMENT`, `AZURE_OPENAI_CHAT_MODEL`
    /// - `AZURE_OPENAI_EMBEDDING_DEPLOYMENT`, `AZURE_OPENAI_EMBEDDING_MODEL`
    /// - `AZURE_OPENAI_EVALUATION_DEPLOYMENT`
    /// - `COPILOT_FLOW_ENDPOINT`, `COPILOT_FLOW_KEY`
    /// - `COPILOT_FLOW_MODEL`, `COPILOT_FLOW_ENVIRONMENT`
    /// - `AZURE_MANAGEMENT_TOKEN`
    /// - `COPILOT_WORKSPACE`, `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use copilot_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(AppError::Config(format!("Failed to read .env file: {}", e)));
            }
        }

        let config = Self::from_lookup(|name| std::env::var(name).ok());

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        Ok(config)
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secret = |name: &str| var(name).map(Secret::new);

        let mut config = Self::default();

        if let Some(workspace) = var("COPILOT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        config.log_level = var("RUST_LOG");
        config.no_color = lookup("NO_COLOR").is_some();

        config.openai_api_type = var("OPENAI_API_TYPE");
        config.openai_api_key = secret("OPENAI_API_KEY");
        config.openai_api_version = var("OPENAI_API_VERSION");
        config.openai_api_base = var("OPENAI_API_BASE");

        config.search_endpoint = var("AZURE_AI_SEARCH_ENDPOINT");
        config.search_key = secret("AZURE_AI_SEARCH_KEY");
        if let Some(index_name) = var("AZURE_AI_SEARCH_INDEX_NAME") {
            config.search_index_name = index_name;
        }

        config.chat_deployment = var("AZURE_OPENAI_CHAT_DEPLOYMENT");
        config.chat_model = var("AZURE_OPENAI_CHAT_MODEL");
        config.embedding_deployment = var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT");
        config.embedding_model = var("AZURE_OPENAI_EMBEDDING_MODEL");
        config.evaluation_deployment = var("AZURE_OPENAI_EVALUATION_DEPLOYMENT");

        config.flow_endpoint = var("COPILOT_FLOW_ENDPOINT");
        config.flow_key = secret("COPILOT_FLOW_KEY");
        config.flow_model = var("COPILOT_FLOW_MODEL");
        config.flow_environment = var("COPILOT_FLOW_ENVIRONMENT");

        config.management_token = secret("AZURE_MANAGEMENT_TOKEN");

        config
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Directory for files the tool writes itself (evaluation results).
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".copilot")
    }

    /// Hosted model service settings.
    pub fn openai(&self) -> AppResult<OpenAiSettings> {
        let api_type = match self.openai_api_type.as_deref() {
            None => ApiType::Azure,
            Some(raw) => ApiType::parse(raw).ok_or_else(|| {
                AppError::Config(format!(
                    "Invalid OPENAI_API_TYPE: {}. Supported: azure, open_ai",
                    raw
                ))
            })?,
        };

        let api_key = require(&self.openai_api_key, "OPENAI_API_KEY")?;

        let api_base = match (api_type, self.openai_api_base.as_ref()) {
            (_, Some(base)) => base.clone(),
            (ApiType::OpenAi, None) => DEFAULT_OPENAI_BASE.to_string(),
            (ApiType::Azure, None) => require(&self.openai_api_base, "OPENAI_API_BASE")?,
        };

        Ok(OpenAiSettings {
            api_type,
            api_key,
            api_version: self
                .openai_api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Hosted search service settings.
    pub fn search(&self) -> AppResult<SearchSettings> {
        let endpoint = require(&self.search_endpoint, "AZURE_AI_SEARCH_ENDPOINT")?;
        let key = require(&self.search_key, "AZURE_AI_SEARCH_KEY")?;

        Ok(SearchSettings {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            index_name: self.search_index_name.clone(),
        })
    }

    /// Chat model deployment.
    pub fn chat_deployment(&self) -> AppResult<ModelDeployment> {
        Ok(ModelDeployment {
            deployment: require(&self.chat_deployment, "AZURE_OPENAI_CHAT_DEPLOYMENT")?,
            model: self.chat_model.clone(),
        })
    }

    /// Embedding model deployment.
    pub fn embedding_deployment(&self) -> AppResult<ModelDeployment> {
        Ok(ModelDeployment {
            deployment: require(
                &self.embedding_deployment,
                "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
            )?,
            model: self.embedding_model.clone(),
        })
    }

    /// Deployment used to judge evaluation answers.
    pub fn evaluation_deployment(&self) -> AppResult<ModelDeployment> {
        Ok(ModelDeployment {
            deployment: require(
                &self.evaluation_deployment,
                "AZURE_OPENAI_EVALUATION_DEPLOYMENT",
            )?,
            model: None,
        })
    }

    /// Scoring endpoint of the deployed flow.
    pub fn flow_endpoint(&self) -> AppResult<FlowEndpoint> {
        Ok(FlowEndpoint {
            url: require(&self.flow_endpoint, "COPILOT_FLOW_ENDPOINT")?,
            key: require(&self.flow_key, "COPILOT_FLOW_KEY")?,
        })
    }

    /// Model and environment a flow deployment references.
    pub fn flow_assets(&self) -> AppResult<FlowAssets> {
        Ok(FlowAssets {
            model: require(&self.flow_model, "COPILOT_FLOW_MODEL")?,
            environment: require(&self.flow_environment, "COPILOT_FLOW_ENVIRONMENT")?,
        })
    }

    /// Bearer token for the hosted management API.
    pub fn management_token(&self) -> AppResult<Secret> {
        require(&self.management_token, "AZURE_MANAGEMENT_TOKEN")
    }

    /// Hosted project identity from `<workspace>/config.json`.
    pub fn project(&self) -> AppResult<ProjectSettings> {
        load_project(&self.workspace.join("config.json"))
    }
}

/// Read the project identity file.
pub fn load_project(path: &Path) -> AppResult<ProjectSettings> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Project config not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read project config {:?}: {}", path, e))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        AppError::Config(format!("Failed to parse project config {:?}: {}", path, e))
    })
}

fn require<T: Clone>(value: &Option<T>, name: &str) -> AppResult<T> {
    value
        .clone()
        .ok_or_else(|| AppError::Config(format!("Missing environment variable: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search_index_name, DEFAULT_INDEX_NAME);
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert!(config.state_dir().ends_with(".copilot"));
    }

    #[test]
    fn test_openai_settings_azure() {
        let config = config_from(&[
            ("OPENAI_API_TYPE", "azure"),
            ("OPENAI_API_KEY", "key"),
            ("OPENAI_API_VERSION", "2023-05-15"),
            ("OPENAI_API_BASE", "https://contoso.openai.azure.com/"),
        ]);

        let settings = config.openai().unwrap();
        assert_eq!(settings.api_type, ApiType::Azure);
        assert_eq!(settings.api_key.expose(), "key");
        assert_eq!(settings.api_version, "2023-05-15");
        assert_eq!(settings.api_base, "https://contoso.openai.azure.com");
    }

    #[test]
    fn test_openai_settings_default_base_for_open_ai() {
        let config = config_from(&[("OPENAI_API_TYPE", "open_ai"), ("OPENAI_API_KEY", "key")]);

        let settings = config.openai().unwrap();
        assert_eq!(settings.api_type, ApiType::OpenAi);
        assert_eq!(settings.api_base, DEFAULT_OPENAI_BASE);
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_missing_key_names_variable() {
        let config = config_from(&[("OPENAI_API_BASE", "https://contoso.openai.azure.com")]);

        let err = config.openai().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_flow_assets() {
        let config = config_from(&[("COPILOT_FLOW_MODEL", "azureml:contoso-copilot:1")]);
        let err = config.flow_assets().unwrap_err();
        assert!(err.to_string().contains("COPILOT_FLOW_ENVIRONMENT"));

        let config = config_from(&[
            ("COPILOT_FLOW_MODEL", "azureml:contoso-copilot:1"),
            ("COPILOT_FLOW_ENVIRONMENT", "azureml:copilot-runtime:3"),
        ]);
        let assets = config.flow_assets().unwrap();
        assert_eq!(assets.model, "azureml:contoso-copilot:1");
        assert_eq!(assets.environment, "azureml:copilot-runtime:3");
    }

    #[test]
    fn test_invalid_api_type() {
        let config = config_from(&[("OPENAI_API_TYPE", "bedrock"), ("OPENAI_API_KEY", "k")]);
        assert!(config.openai().is_err());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("AZURE_AI_SEARCH_ENDPOINT", "  "), ("AZURE_AI_SEARCH_KEY", "k")]);
        let err = config.search().unwrap_err();
        assert!(err.to_string().contains("AZURE_AI_SEARCH_ENDPOINT"));
    }

    #[test]
    fn test_search_index_name_override() {
        let config = config_from(&[
            ("AZURE_AI_SEARCH_ENDPOINT", "https://contoso.search.windows.net"),
            ("AZURE_AI_SEARCH_KEY", "k"),
            ("AZURE_AI_SEARCH_INDEX_NAME", "tents"),
        ]);

        let search = config.search().unwrap();
        assert_eq!(search.index_name, "tents");
    }

    #[test]
    fn test_chat_deployment_model_name() {
        let config = config_from(&[("AZURE_OPENAI_CHAT_DEPLOYMENT", "gpt-35-turbo-deploy")]);
        let deployment = config.chat_deployment().unwrap();
        assert_eq!(deployment.model_name(), "gpt-35-turbo-deploy");

        let config = config_from(&[
            ("AZURE_OPENAI_CHAT_DEPLOYMENT", "chat"),
            ("AZURE_OPENAI_CHAT_MODEL", "gpt-35-turbo"),
        ]);
        assert_eq!(config.chat_deployment().unwrap().model_name(), "gpt-35-turbo");
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = config_from(&[("OPENAI_API_KEY", "super-secret")]);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/tmp")),
            None,
            true,
            true,
        );

        assert_eq!(config.workspace, PathBuf::from("/tmp"));
        assert!(config.verbose);
        assert!(config.no_color);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_project() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.json"),
            r#"{"subscription_id": "sub", "resource_group": "rg", "project_name": "outdoor"}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();

        let project = config.project().unwrap();
        assert_eq!(project.project_name, "outdoor");
        assert_eq!(project.resource_group, "rg");
    }

    #[test]
    fn test_load_project_missing() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();

        assert!(matches!(config.project(), Err(AppError::Config(_))));
    }
}
