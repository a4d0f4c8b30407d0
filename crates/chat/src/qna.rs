//! Single-turn question answering.

use crate::answerer::QuestionAnswerer;
use crate::types::{AnswerResult, Context};
use copilot_core::AppResult;
use copilot_llm::ChatMessage;

/// Ask one question as a one-message conversation.
pub async fn copilot_qna(
    question: &str,
    answerer: &dyn QuestionAnswerer,
) -> AppResult<AnswerResult> {
    let messages = [ChatMessage::user(question)];
    let answer = answerer
        .answer(&messages, false, &Context::default())
        .await?;

    Ok(AnswerResult {
        question: question.to_string(),
        answer: answer.text,
        context: answer.context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatAnswer;
    use copilot_core::AppError;
    use copilot_llm::{Citation, ResponseContext};
    use std::sync::Mutex;

    /// Records what it was called with and answers from a fixed catalog.
    struct CatalogAnswerer {
        calls: Mutex<Vec<(usize, bool, Context)>>,
    }

    #[async_trait::async_trait]
    impl QuestionAnswerer for CatalogAnswerer {
        fn name(&self) -> &str {
            "catalog"
        }

        async fn answer(
            &self,
            messages: &[ChatMessage],
            stream: bool,
            context: &Context,
        ) -> AppResult<ChatAnswer> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.len(), stream, context.clone()));

            Ok(ChatAnswer::new(
                "The Alpine Explorer Tent is the most waterproof.",
                ResponseContext::from_citations(vec![Citation {
                    title: Some("Alpine Explorer Tent".to_string()),
                    content: "Waterproof rating 3000mm".to_string(),
                    ..Default::default()
                }]),
            ))
        }
    }

    #[tokio::test]
    async fn test_qna_result() {
        let answerer = CatalogAnswerer {
            calls: Mutex::new(Vec::new()),
        };

        let result = copilot_qna("which tent is the most waterproof?", &answerer)
            .await
            .unwrap();

        assert_eq!(result.question, "which tent is the most waterproof?");
        assert!(!result.answer.is_empty());
        assert_eq!(result.context.citations.len(), 1);

        let calls = answerer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 1);
        assert!(!calls[0].1);
        assert_eq!(calls[0].2, Context::default());
    }

    struct FailingAnswerer;

    #[async_trait::async_trait]
    impl QuestionAnswerer for FailingAnswerer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn answer(&self, _: &[ChatMessage], _: bool, _: &Context) -> AppResult<ChatAnswer> {
            Err(AppError::Llm("service unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_qna_propagates_errors() {
        let result = copilot_qna("tent?", &FailingAnswerer).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
