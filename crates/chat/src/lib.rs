//! Question answering for the Contoso outdoor copilot.
//!
//! - [`QuestionAnswerer`] backends selected by [`Implementation`]
//! - Single-turn [`copilot_qna`]
//! - Batch evaluation against a JSONL dataset
//! - Publishing as a hosted flow
//!
//! # Example
//! ```no_run
//! use copilot_chat::{copilot_qna, create_answerer, Implementation};
//! use copilot_core::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let answerer = create_answerer(Implementation::AiSdk, &config)?;
//! let result = copilot_qna("which tent is the most waterproof?", answerer.as_ref()).await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod answerer;
pub mod backends;
pub mod deploy;
pub mod evaluate;
pub mod implementation;
pub mod qna;
pub mod types;

// Re-export main types
pub use answerer::{latest_question, postprocess_answer, QuestionAnswerer};
pub use backends::create_answerer;
pub use deploy::{default_deployment_name, deploy_flow, DeploymentInfo, FlowManifest, ManagementClient};
pub use evaluate::{
    f1_score, load_jsonl, run_evaluation, EvaluationMetrics, EvaluationRecord, EvaluationRow,
    EvaluationSummary, Judge,
};
pub use implementation::{Implementation, IMPLEMENTATIONS};
pub use qna::copilot_qna;
pub use types::{AnswerResult, ChatAnswer, Context};
