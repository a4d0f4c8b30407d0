//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use copilot_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Variable holding the retrieved documents.
pub const CONTEXT_VARIABLE: &str = "context";

/// Variable holding the user's question.
pub const QUESTION_VARIABLE: &str = "question";

/// Build a prompt from a definition and input variables.
///
/// Every variable listed under `input.variables` must be supplied; an empty
/// value is allowed. Both the system instruction and the user template are
/// rendered with the same variables.
///
/// # Example
/// ```no_run
/// use copilot_prompt::{build_prompt, builtin_support_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_support_prompt()?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "which tent is the most waterproof?".to_string());
/// vars.insert("context".to_string(), String::new());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .input
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let context_included = variables
        .get(CONTEXT_VARIABLE)
        .map(|ctx| !ctx.trim().is_empty())
        .unwrap_or(false);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());

    let user = render_template(&definition.template, &variables)?
        .trim()
        .to_string();

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        context_included,
        variables,
    ))
}

/// Render the system instruction alone, for services that ground the
/// answer themselves and only need the role description.
pub fn build_system_instruction(definition: &PromptDefinition) -> AppResult<Option<String>> {
    definition
        .system
        .as_deref()
        .map(|template| {
            render_template(template, &HashMap::new()).map(|s| s.trim_end().to_string())
        })
        .transpose()
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
