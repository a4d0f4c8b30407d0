//! Contoso Copilot CLI
//!
//! Main entry point for the copilot command-line tool.
//! Asks the product support copilot a question, evaluates it against a
//! dataset, deploys it as a hosted flow, or builds its search index.

mod commands;

use clap::Parser;
use commands::{AskCommand, BuildIndexCommand, DeployCommand, EvaluateCommand};
use copilot_chat::Implementation;
use copilot_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Question asked when none is given.
const DEFAULT_QUESTION: &str = "which tent is the most waterproof?";

/// Dataset evaluated when none is given.
const DEFAULT_DATASET_PATH: &str = "src/tests/evaluation_dataset.jsonl";

/// Contoso Copilot - product support for outdoor and camping gear
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(about = "Product support copilot for outdoor and camping gear", long_about = None)]
#[command(version)]
struct Cli {
    /// The question to ask the copilot
    #[arg(long, default_value = DEFAULT_QUESTION)]
    question: String,

    /// The implementation to use (aisdk, langchain, semantickernel, promptflow)
    #[arg(long, default_value = "aisdk")]
    implementation: Implementation,

    /// Deploy the copilot as a hosted flow
    #[arg(long)]
    deploy: bool,

    /// Deployment name to use when deploying the flow (default: <project>-copilot)
    #[arg(long)]
    deployment_name: Option<String>,

    /// Evaluate the copilot against a dataset
    #[arg(long)]
    evaluate: bool,

    /// Test dataset to use with evaluation
    #[arg(long, default_value = DEFAULT_DATASET_PATH)]
    dataset_path: String,

    /// Build the search index from the product catalog
    #[arg(long)]
    build_index: bool,

    /// Index to build (default: AZURE_AI_SEARCH_INDEX_NAME or contoso_product_index)
    #[arg(long)]
    index_name: Option<String>,

    /// Product catalog folder for --build-index (default: data/3-product_info)
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Path to workspace directory (default: current directory)
    #[arg(short, long, env = "COPILOT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,
}

/// What one invocation does.
#[derive(Debug)]
enum Mode {
    BuildIndex(BuildIndexCommand),
    Evaluate(EvaluateCommand),
    Deploy(DeployCommand),
    Ask(AskCommand),
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::BuildIndex(_) => "build-index",
            Mode::Evaluate(_) => "evaluate",
            Mode::Deploy(_) => "deploy",
            Mode::Ask(_) => "ask",
        }
    }
}

impl Cli {
    /// Log filter taken from the flags alone, so logging can start before
    /// the configuration is loaded.
    fn log_level(&self) -> Option<String> {
        self.log_level
            .clone()
            .or_else(|| self.verbose.then(|| "debug".to_string()))
    }

    /// Resolve the mode: build-index, then evaluate, then deploy, else ask.
    fn mode(&self) -> Mode {
        if self.build_index {
            Mode::BuildIndex(BuildIndexCommand {
                index_name: self.index_name.clone(),
                data_path: self.data_path.clone(),
                json: self.json,
            })
        } else if self.evaluate {
            Mode::Evaluate(EvaluateCommand {
                implementation: self.implementation,
                dataset_path: self.dataset_path.clone(),
            })
        } else if self.deploy {
            Mode::Deploy(DeployCommand {
                implementation: self.implementation,
                deployment_name: self.deployment_name.clone(),
                json: self.json,
            })
        } else {
            Mode::Ask(AskCommand {
                question: self.question.clone(),
                implementation: self.implementation,
                json: self.json,
            })
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Initialize logging before anything can fail
    logging::init_logging(cli.log_level().as_deref(), cli.no_color)?;

    // Load base configuration from .env and the environment
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
    );

    tracing::info!("Contoso Copilot CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Implementation: {}", cli.implementation);

    let mode = cli.mode();
    let _span = tracing::info_span!("command", name = mode.name()).entered();

    // Route to command handlers
    let result = match mode {
        Mode::BuildIndex(cmd) => cmd.execute(&config).await,
        Mode::Evaluate(cmd) => cmd.execute(&config).await,
        Mode::Deploy(cmd) => cmd.execute(&config).await,
        Mode::Ask(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["copilot"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_ask() {
        let cli = parse(&[]);
        match cli.mode() {
            Mode::Ask(cmd) => {
                assert_eq!(cmd.question, "which tent is the most waterproof?");
                assert_eq!(cmd.implementation, Implementation::AiSdk);
            }
            other => panic!("expected ask, got {:?}", other),
        }
        assert_eq!(cli.dataset_path, "src/tests/evaluation_dataset.jsonl");
    }

    #[test]
    fn test_every_implementation_parses() {
        for name in ["aisdk", "langchain", "semantickernel", "promptflow"] {
            let cli = parse(&["--implementation", name]);
            assert_eq!(cli.implementation.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_implementation_fails() {
        let err = Cli::try_parse_from(["copilot", "--implementation", "llamaindex"]).unwrap_err();
        assert!(err.to_string().contains("llamaindex"));
        assert!(err.to_string().contains("aisdk, langchain, semantickernel, promptflow"));
    }

    #[test]
    fn test_log_level_from_flags() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(parse(&["--verbose"]).log_level().as_deref(), Some("debug"));
        }
        assert_eq!(
            parse(&["--verbose", "--log-level", "warn"]).log_level().as_deref(),
            Some("warn")
        );
    }

    #[test]
    fn test_mode_precedence() {
        let cli = parse(&["--deploy", "--evaluate", "--build-index"]);
        assert_eq!(cli.mode().name(), "build-index");

        let cli = parse(&["--deploy", "--evaluate"]);
        assert_eq!(cli.mode().name(), "evaluate");

        let cli = parse(&["--deploy", "--question", "tents?"]);
        assert_eq!(cli.mode().name(), "deploy");
    }

    #[test]
    fn test_evaluate_options() {
        let cli = parse(&[
            "--evaluate",
            "--implementation",
            "langchain",
            "--dataset-path",
            "data/eval.jsonl",
        ]);

        match cli.mode() {
            Mode::Evaluate(cmd) => {
                assert_eq!(cmd.implementation, Implementation::LangChain);
                assert_eq!(cmd.dataset_path, "data/eval.jsonl");
                assert_eq!(cmd.evaluation_name(), "test-langchain-copilot");
            }
            other => panic!("expected evaluate, got {:?}", other),
        }
    }

    #[test]
    fn test_deploy_name() {
        let cli = parse(&["--deploy", "--deployment-name", "outdoor-copilot-v2"]);
        match cli.mode() {
            Mode::Deploy(cmd) => {
                assert_eq!(cmd.deployment_name.as_deref(), Some("outdoor-copilot-v2"))
            }
            other => panic!("expected deploy, got {:?}", other),
        }
    }
}
