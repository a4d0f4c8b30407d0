//! Search index abstraction.
//!
//! The index build and the retrievers only see [`SearchIndex`], so the
//! hosted service can be swapped for an in-memory index in tests.

use crate::types::{ProductDocument, SearchHit};
use copilot_core::AppResult;

/// What a query matches against.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Nearest neighbours of an embedding
    Vector(Vec<f32>),

    /// Full-text and vector search, fused by the service
    Hybrid { text: String, vector: Vec<f32> },
}

/// A searchable store of product chunks.
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index, or update its definition if it already exists.
    async fn create_or_update_index(&self, index_name: &str, dimensions: usize) -> AppResult<()>;

    /// Insert or replace documents by key. Returns how many were stored.
    async fn upload_documents(
        &self,
        index_name: &str,
        documents: &[ProductDocument],
    ) -> AppResult<usize>;

    /// Top `top` hits for `query`, best first.
    async fn search(&self, query: &SearchQuery, top: u32) -> AppResult<Vec<SearchHit>>;
}
