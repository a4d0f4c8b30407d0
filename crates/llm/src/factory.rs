//! Model client factory.
//!
//! Resolves the hosted model settings from the application configuration
//! and builds the client every backend shares for one invocation.

use crate::providers::OpenAiClient;
use copilot_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Create the hosted model client.
///
/// # Errors
/// Returns a configuration error if `OPENAI_API_KEY` is missing, if
/// `OPENAI_API_BASE` is missing for the Azure API type, or if
/// `OPENAI_API_TYPE` is not recognised.
pub fn create_client(config: &AppConfig) -> AppResult<Arc<OpenAiClient>> {
    let settings = config.openai()?;

    tracing::debug!(
        "Creating model client (api type: {}, base: {}, version: {})",
        settings.api_type.as_str(),
        settings.api_base,
        settings.api_version
    );

    Ok(Arc::new(OpenAiClient::new(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatClient;
    use copilot_core::AppError;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_create_azure_client() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "key"),
            ("OPENAI_API_BASE", "https://contoso.openai.azure.com"),
        ]);

        let client = create_client(&config).unwrap();
        assert_eq!(client.provider_name(), "azure");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = config_from(&[("OPENAI_API_BASE", "https://contoso.openai.azure.com")]);

        match create_client(&config) {
            Err(AppError::Config(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            Err(other) => panic!("Expected config error, got {}", other),
            Ok(_) => panic!("Expected error without API key"),
        }
    }
}
