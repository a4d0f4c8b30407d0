//! Document retrieval for client-side grounding.

use crate::index::{SearchIndex, SearchQuery};
use crate::types::SearchHit;
use copilot_core::{AppError, AppResult, ModelDeployment};
use copilot_llm::{Citation, EmbeddingClient};
use std::sync::Arc;

/// How a [`SearchRetriever`] queries the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Nearest neighbours of the question embedding
    Vector,

    /// Full-text plus vector
    Hybrid,
}

/// Source of documents relevant to a question.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top` documents for `query`, best first.
    async fn retrieve(&self, query: &str, top: u32) -> AppResult<Vec<SearchHit>>;
}

/// Retriever backed by a search index and an embedding deployment.
pub struct SearchRetriever {
    index: Arc<dyn SearchIndex>,
    embedder: Arc<dyn EmbeddingClient>,
    deployment: ModelDeployment,
    mode: RetrievalMode,
}

impl SearchRetriever {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        embedder: Arc<dyn EmbeddingClient>,
        deployment: ModelDeployment,
        mode: RetrievalMode,
    ) -> Self {
        Self {
            index,
            embedder,
            deployment,
            mode,
        }
    }

    async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        self.embedder
            .embed(&self.deployment, &[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Search("Failed to generate query embedding".to_string()))
    }
}

#[async_trait::async_trait]
impl Retriever for SearchRetriever {
    async fn retrieve(&self, query: &str, top: u32) -> AppResult<Vec<SearchHit>> {
        let search_query = match self.mode {
            RetrievalMode::Vector => SearchQuery::Vector(self.embed_query(query).await?),
            RetrievalMode::Hybrid => SearchQuery::Hybrid {
                text: query.to_string(),
                vector: self.embed_query(query).await?,
            },
        };

        let hits = self.index.search(&search_query, top).await?;

        tracing::info!(
            "Retrieved {} documents ({:?} search, top score: {:.3})",
            hits.len(),
            self.mode,
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );

        Ok(hits)
    }
}

/// Render retrieved documents as prompt context.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| match &hit.title {
            Some(title) => format!("[Document {}] {}\n{}", i + 1, title, hit.content),
            None => format!("[Document {}]\n{}", i + 1, hit.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Citation for a retrieved document.
pub fn to_citation(hit: &SearchHit) -> Citation {
    Citation {
        title: hit.title.clone(),
        content: hit.content.clone(),
        filepath: hit.filepath.clone(),
        url: hit.url.clone(),
        chunk_id: hit.chunk_index.map(|i| i.to_string()),
    }
}
