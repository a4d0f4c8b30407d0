//! In-memory fakes for backend tests.

use copilot_core::AppResult;
use copilot_knowledge::{Retriever, SearchHit};
use copilot_llm::{ChatClient, ChatRequest, ChatResponse, ResponseContext, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Chat client that replays canned replies and records requests.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    context: Option<ResponseContext>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    /// Always reply with `reply`.
    pub fn new(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            context: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `reply`, grounded on `context`.
    pub fn with_context(reply: &str, context: ResponseContext) -> Self {
        Self {
            context: Some(context),
            ..Self::new(reply)
        }
    }

    /// Reply with `replies` in order, then with the last one.
    pub fn sequence(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: replies.last().map(|r| r.to_string()).unwrap_or_default(),
            context: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatClient for ScriptedChat {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        Ok(ChatResponse {
            content,
            model: "scripted".to_string(),
            usage: Usage::new(10, 5),
            context: self.context.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Retriever over a fixed list of documents.
pub struct StaticRetriever {
    pub hits: Vec<SearchHit>,
}

impl StaticRetriever {
    pub fn new(documents: &[(&str, &str)]) -> Self {
        Self {
            hits: documents
                .iter()
                .enumerate()
                .map(|(i, (title, content))| SearchHit {
                    score: 1.0 / (i as f64 + 1.0),
                    id: i.to_string(),
                    content: content.to_string(),
                    title: Some(title.to_string()),
                    filepath: Some(format!("product_info_{}.md", i + 1)),
                    url: None,
                    chunk_index: Some(0),
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, top: u32) -> AppResult<Vec<SearchHit>> {
        Ok(self.hits.iter().take(top as usize).cloned().collect())
    }
}
