//! Logging setup.
//!
//! Logs go to stderr; stdout carries only answers and reports so the
//! output can be piped.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Default filter when neither a flag nor `RUST_LOG` is given.
const DEFAULT_FILTER: &str = "info";

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `log_level` - Filter directive (e.g. "debug", "copilot_chat=trace")
/// * `no_color` - Disable ANSI colors
///
/// # Example
/// ```no_run
/// use copilot_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = EnvFilter::try_new(resolve_filter(log_level))
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && std::io::stderr().is_terminal());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

fn resolve_filter(log_level: Option<&str>) -> String {
    match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
    }
}
