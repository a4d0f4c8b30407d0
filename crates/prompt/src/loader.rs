//! Prompt loader for YAML prompt definitions.
//!
//! The support prompt ships inside the binary. A workspace can override any
//! prompt by placing `<id>.yml` under `prompts/`.

use crate::types::PromptDefinition;
use copilot_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the built-in product support prompt.
pub const SUPPORT_PROMPT_ID: &str = "copilot.support";

/// Fixed reply for questions outside the outdoor/camping gear domain.
pub const REFUSAL_MESSAGE: &str =
    "Sorry, I only can answer question related to outdoor/camping gear and clothing. So how can I help?";

const SUPPORT_PROMPT_YAML: &str = include_str!("../prompts/copilot.support.yml");

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/prompts/<id>.yml` first and falls back to the
/// built-in definition when `prompt_id` names one.
///
/// # Example
/// ```no_run
/// use copilot_prompt::{load_prompt, SUPPORT_PROMPT_ID};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), SUPPORT_PROMPT_ID)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition = parse_prompt(&contents)
            .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    match prompt_id {
        SUPPORT_PROMPT_ID => builtin_support_prompt(),
        _ => Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        ))),
    }
}

/// The built-in product support prompt.
pub fn builtin_support_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(SUPPORT_PROMPT_YAML)
}

/// Path a workspace override for `prompt_id` would live at.
pub fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join("prompts")
        .join(format!("{}.yml", prompt_id))
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
