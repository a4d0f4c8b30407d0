//! Batch evaluation of a backend against a question/truth dataset.
//!
//! Each row is answered through [`copilot_qna`], then scored with a local
//! token-overlap F1 and three ratings from a judge model. Per-row results
//! are written as JSONL next to the workspace state.

use crate::answerer::QuestionAnswerer;
use crate::qna::copilot_qna;
use chrono::{DateTime, Utc};
use copilot_core::{AppError, AppResult, ModelDeployment};
use copilot_llm::{ChatClient, ChatMessage, ChatRequest, ResponseContext};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// One dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub truth: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scored dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub question: String,
    pub truth: String,
    pub answer: String,

    /// Retrieved document text the answer was grounded on
    pub context: String,

    pub f1_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_similarity: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_relevance: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_groundedness: Option<u8>,
}

/// Mean of each metric over the rows where it is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub f1_score: Option<f64>,
    pub gpt_similarity: Option<f64>,
    pub gpt_relevance: Option<f64>,
    pub gpt_groundedness: Option<f64>,
}

/// Outcome of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub name: String,
    pub implementation: String,
    pub rows: usize,
    pub metrics: EvaluationMetrics,
    pub results_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Read a JSONL dataset. Every non-blank line must hold `question` and
/// `truth` strings.
pub fn load_jsonl(path: &Path) -> AppResult<Vec<EvaluationRecord>> {
    if !path.exists() {
        return Err(AppError::Input(format!("Dataset not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Input(format!("Failed to read dataset {:?}: {}", path, e)))?;

    let mut records = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let line_no = i + 1;
        let value: Value = serde_json::from_str(line).map_err(|e| {
            AppError::Input(format!("{:?} line {}: invalid JSON: {}", path, line_no, e))
        })?;

        for field in ["question", "truth"] {
            if !value.get(field).map(Value::is_string).unwrap_or(false) {
                return Err(AppError::Input(format!(
                    "{:?} line {}: missing string field '{}'",
                    path, line_no, field
                )));
            }
        }

        let record: EvaluationRecord = serde_json::from_value(value).map_err(|e| {
            AppError::Input(format!("{:?} line {}: {}", path, line_no, e))
        })?;
        records.push(record);
    }

    tracing::info!("Loaded {} evaluation records from {:?}", records.len(), path);
    Ok(records)
}

/// Token-overlap F1 between an answer and the ground truth.
///
/// Both sides are lowercased, stripped of punctuation and articles, and
/// split on whitespace.
pub fn f1_score(answer: &str, truth: &str) -> f64 {
    let answer_tokens = normalize_tokens(answer);
    let truth_tokens = normalize_tokens(truth);

    if answer_tokens.is_empty() || truth_tokens.is_empty() {
        return if answer_tokens == truth_tokens { 1.0 } else { 0.0 };
    }

    let mut truth_counts: HashMap<&str, usize> = HashMap::new();
    for token in &truth_tokens {
        *truth_counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut common = 0usize;
    for token in &answer_tokens {
        if let Some(count) = truth_counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    if common == 0 {
        return 0.0;
    }

    let precision = common as f64 / answer_tokens.len() as f64;
    let recall = common as f64 / truth_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| !matches!(*t, "a" | "an" | "the"))
        .map(str::to_string)
        .collect()
}

const SIMILARITY_PROMPT: &str = "Rate how similar the ANSWER is to the GROUND TRUTH in meaning, \
on a scale of 1 (completely different) to 5 (equivalent).";

const RELEVANCE_PROMPT: &str = "Rate how well the ANSWER addresses the QUESTION using the CONTEXT, \
on a scale of 1 (irrelevant) to 5 (fully relevant and complete).";

const GROUNDEDNESS_PROMPT: &str = "Rate whether every claim in the ANSWER is supported by the CONTEXT, \
on a scale of 1 (unsupported) to 5 (fully grounded).";

const RATING_INSTRUCTION: &str = "Reply with a single integer from 1 to 5 and nothing else.";

/// Judge model that rates answers.
pub struct Judge {
    client: Arc<dyn ChatClient>,
    deployment: ModelDeployment,
}

impl Judge {
    pub fn new(client: Arc<dyn ChatClient>, deployment: ModelDeployment) -> Self {
        Self { client, deployment }
    }

    pub async fn similarity(&self, question: &str, answer: &str, truth: &str) -> AppResult<Option<u8>> {
        self.rate(
            SIMILARITY_PROMPT,
            &format!(
                "QUESTION: {}\nGROUND TRUTH: {}\nANSWER: {}",
                question, truth, answer
            ),
        )
        .await
    }

    pub async fn relevance(&self, question: &str, answer: &str, context: &str) -> AppResult<Option<u8>> {
        self.rate(
            RELEVANCE_PROMPT,
            &format!(
                "CONTEXT: {}\nQUESTION: {}\nANSWER: {}",
                context, question, answer
            ),
        )
        .await
    }

    pub async fn groundedness(&self, answer: &str, context: &str) -> AppResult<Option<u8>> {
        self.rate(
            GROUNDEDNESS_PROMPT,
            &format!("CONTEXT: {}\nANSWER: {}", context, answer),
        )
        .await
    }

    async fn rate(&self, instruction: &str, input: &str) -> AppResult<Option<u8>> {
        let request = ChatRequest::new(
            self.deployment.clone(),
            vec![
                ChatMessage::system(format!("{} {}", instruction, RATING_INSTRUCTION)),
                ChatMessage::user(input),
            ],
        )
        .with_temperature(0.0)
        .with_max_tokens(5);

        let response = self.client.complete(&request).await?;
        let rating = parse_rating(&response.content);
        if rating.is_none() {
            tracing::warn!("Judge reply has no rating: {:?}", response.content);
        }

        Ok(rating)
    }
}

/// First standalone digit 1-5 in a judge reply.
pub fn parse_rating(reply: &str) -> Option<u8> {
    static RATING: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = RATING
        .get_or_init(|| Regex::new(r"\b([1-5])\b").ok())
        .as_ref()?;

    pattern
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn context_text(context: &ResponseContext) -> String {
    context
        .citations
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Means over the rows, skipping absent ratings.
pub fn summarize(rows: &[EvaluationRow]) -> EvaluationMetrics {
    EvaluationMetrics {
        f1_score: mean(rows.iter().map(|r| r.f1_score)),
        gpt_similarity: mean(rows.iter().filter_map(|r| r.gpt_similarity).map(f64::from)),
        gpt_relevance: mean(rows.iter().filter_map(|r| r.gpt_relevance).map(f64::from)),
        gpt_groundedness: mean(rows.iter().filter_map(|r| r.gpt_groundedness).map(f64::from)),
    }
}

/// Answer and score every dataset row, sequentially.
///
/// Results go to `<output_dir>/<name>.jsonl`.
pub async fn run_evaluation(
    answerer: &dyn QuestionAnswerer,
    name: &str,
    dataset_path: &Path,
    judge: &Judge,
    output_dir: &Path,
) -> AppResult<EvaluationSummary> {
    let started_at = Utc::now();
    let start = Instant::now();

    tracing::info!(
        "Starting evaluation '{}' of '{}' on {:?}",
        name,
        answerer.name(),
        dataset_path
    );

    let records = load_jsonl(dataset_path)?;
    if records.is_empty() {
        return Err(AppError::Evaluation(format!(
            "Dataset {:?} has no records",
            dataset_path
        )));
    }

    let mut rows = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        tracing::info!("Evaluating row {}/{}", i + 1, records.len());

        let result = copilot_qna(&record.question, answerer).await?;
        let context = context_text(&result.context);

        let row = EvaluationRow {
            f1_score: f1_score(&result.answer, &record.truth),
            gpt_similarity: judge
                .similarity(&record.question, &result.answer, &record.truth)
                .await?,
            gpt_relevance: judge
                .relevance(&record.question, &result.answer, &context)
                .await?,
            gpt_groundedness: judge.groundedness(&result.answer, &context).await?,
            question: result.question,
            truth: record.truth.clone(),
            answer: result.answer,
            context,
        };
        rows.push(row);
    }

    let results_path = write_results(output_dir, name, &rows)?;
    let metrics = summarize(&rows);
    let duration = start.elapsed();

    tracing::info!(
        "Evaluation '{}' completed: {} rows in {:.2}s",
        name,
        rows.len(),
        duration.as_secs_f64()
    );

    Ok(EvaluationSummary {
        name: name.to_string(),
        implementation: answerer.name().to_string(),
        rows: rows.len(),
        metrics,
        results_path,
        started_at,
        duration_secs: duration.as_secs_f64(),
    })
}

fn write_results(output_dir: &Path, name: &str, rows: &[EvaluationRow]) -> AppResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.jsonl", name));

    let mut file = std::fs::File::create(&path)?;
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row)?)?;
    }

    tracing::info!("Wrote evaluation results to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::testing::ScriptedChat;
    use crate::types::{ChatAnswer, Context};
    use copilot_llm::Citation;
    use std::fs;
    use tempfile::TempDir;

    const DATASET: &str = r#"{"question": "which tent is the most waterproof?", "truth": "The Alpine Explorer Tent is the most waterproof."}
{"question": "what is the capital of France?", "truth": "Sorry, I only can answer question related to outdoor/camping gear and clothing. So how can I help?"}

{"question": "which backpack has a rain cover?", "truth": "The Adventurer Pro Backpack.", "category": "backpacks"}
"#;

    struct EchoAnswerer;

    #[async_trait::async_trait]
    impl QuestionAnswerer for EchoAnswerer {
        fn name(&self) -> &str {
            "echo"
        }

        async fn answer(&self, messages: &[ChatMessage], _: bool, _: &Context) -> AppResult<ChatAnswer> {
            let question = &messages[0].content;
            Ok(ChatAnswer::new(
                "The Alpine Explorer Tent is the most waterproof.",
                ResponseContext::from_citations(vec![Citation {
                    content: format!("catalog entry for {}", question),
                    ..Default::default()
                }]),
            ))
        }
    }

    fn judge(chat: Arc<ScriptedChat>) -> Judge {
        Judge::new(
            chat,
            ModelDeployment {
                deployment: "gpt-4".to_string(),
                model: None,
            },
        )
    }

    fn write_dataset(dir: &Path) -> PathBuf {
        let path = dir.join("evaluation_dataset.jsonl");
        fs::write(&path, DATASET).unwrap();
        path
    }

    #[test]
    fn test_load_jsonl_counts_non_blank_lines() {
        let temp = TempDir::new().unwrap();
        let records = load_jsonl(&write_dataset(temp.path())).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.question.is_empty() && !r.truth.is_empty()));
        assert_eq!(records[2].extra.get("category"), Some(&Value::from("backpacks")));
    }

    #[test]
    fn test_load_jsonl_missing_truth_names_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.jsonl");
        fs::write(&path, "{\"question\": \"a\", \"truth\": \"b\"}\n{\"question\": \"c\"}\n").unwrap();

        let err = load_jsonl(&path).unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("'truth'"));
    }

    #[test]
    fn test_load_jsonl_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = load_jsonl(&temp.path().join("missing.jsonl"));
        assert!(matches!(result, Err(AppError::Input(_))));
    }

    #[test]
    fn test_f1_score() {
        assert_eq!(f1_score("The Alpine Explorer Tent", "alpine explorer tent!"), 1.0);
        assert_eq!(f1_score("backpack", "tent"), 0.0);
        assert_eq!(f1_score("", ""), 1.0);

        // answer: alpine tent (2 tokens); truth: alpine explorer tent (3 tokens)
        let score = f1_score("alpine tent", "alpine explorer tent");
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4"), Some(4));
        assert_eq!(parse_rating("Rating: 5."), Some(5));
        assert_eq!(parse_rating("10 out of 10"), None);
        assert_eq!(parse_rating("excellent"), None);
    }

    #[test]
    fn test_summarize_skips_absent_ratings() {
        let row = |f1: f64, similarity: Option<u8>| EvaluationRow {
            question: "q".to_string(),
            truth: "t".to_string(),
            answer: "a".to_string(),
            context: String::new(),
            f1_score: f1,
            gpt_similarity: similarity,
            gpt_relevance: None,
            gpt_groundedness: Some(3),
        };

        let metrics = summarize(&[row(1.0, Some(5)), row(0.0, None)]);
        assert_eq!(metrics.f1_score, Some(0.5));
        assert_eq!(metrics.gpt_similarity, Some(5.0));
        assert_eq!(metrics.gpt_relevance, None);
        assert_eq!(metrics.gpt_groundedness, Some(3.0));
        assert_eq!(summarize(&[]), EvaluationMetrics::default());
    }

    #[tokio::test]
    async fn test_judge_rates_each_metric() {
        let chat = Arc::new(ScriptedChat::sequence(&["5", "Relevance: 3", "no idea"]));
        let judge = judge(chat.clone());

        assert_eq!(judge.similarity("q", "a", "t").await.unwrap(), Some(5));
        assert_eq!(judge.relevance("q", "a", "c").await.unwrap(), Some(3));
        assert_eq!(judge.groundedness("a", "c").await.unwrap(), None);

        let requests = chat.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.temperature == Some(0.0) && r.max_tokens == Some(5)));
    }

    #[tokio::test]
    async fn test_run_evaluation_writes_one_row_per_record() {
        let temp = TempDir::new().unwrap();
        let dataset = write_dataset(temp.path());
        let output = temp.path().join(".copilot").join("evaluations");
        let chat = Arc::new(ScriptedChat::new("4"));

        let summary = run_evaluation(
            &EchoAnswerer,
            "test-echo-copilot",
            &dataset,
            &judge(chat.clone()),
            &output,
        )
        .await
        .unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.implementation, "echo");
        assert_eq!(summary.metrics.gpt_similarity, Some(4.0));
        assert_eq!(summary.results_path, output.join("test-echo-copilot.jsonl"));

        // three judge calls per row
        assert_eq!(chat.requests().len(), 9);

        let written = fs::read_to_string(&summary.results_path).unwrap();
        let rows: Vec<EvaluationRow> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].f1_score, 1.0);
        assert!(rows[0].context.contains("which tent is the most waterproof?"));
    }

    #[tokio::test]
    async fn test_unparseable_rating_is_absent() {
        let temp = TempDir::new().unwrap();
        let dataset = write_dataset(temp.path());
        let chat = Arc::new(ScriptedChat::new("I cannot rate this."));

        let summary = run_evaluation(
            &EchoAnswerer,
            "test-echo-copilot",
            &dataset,
            &judge(chat),
            temp.path(),
        )
        .await
        .unwrap();

        assert_eq!(summary.metrics.gpt_similarity, None);
        assert!(summary.metrics.f1_score.is_some());
    }
}
