//! Knowledge type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default folder holding the product catalog documents.
pub const DEFAULT_DATA_PATH: &str = "data/3-product_info";

/// Base URL recorded as the source of every product document.
pub const DATA_SOURCE_URL: &str = "https://product_info.com";

/// A chunk of a product document as stored in the hosted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Stable key: hash of file path and chunk index
    pub id: String,

    /// Chunk text
    pub content: String,

    /// Document title (first heading, or file stem)
    pub title: String,

    /// Path of the source file relative to the data folder
    pub filepath: String,

    /// Source URL under the data source base URL
    pub url: String,

    /// Position of this chunk within its document
    pub chunk_index: u32,

    /// Embedding of `content`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_vector: Option<Vec<f32>>,
}

/// A document returned by a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "@search.score", default)]
    pub score: f64,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub filepath: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub chunk_index: Option<u32>,
}

/// Options for building the product index.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Name of the index to create or update
    pub index_name: String,

    /// Folder of product documents
    pub data_path: PathBuf,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Texts per embedding request
    pub embedding_batch_size: usize,

    /// Documents per upload request
    pub upload_batch_size: usize,
}

impl BuildOptions {
    pub fn new(index_name: impl Into<String>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            index_name: index_name.into(),
            data_path: data_path.into(),
            chunk_size: 1024,
            chunk_overlap: 128,
            embedding_batch_size: 16,
            upload_batch_size: 100,
        }
    }
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Index that was built
    pub index_name: String,

    /// Number of source documents processed
    pub documents_count: u32,

    /// Number of chunks uploaded
    pub chunks_count: u32,

    /// Total bytes of cleaned text
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Chunk produced by the chunker, before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub position: u32,
    pub text: String,
    pub start: usize,
    pub end: usize,
}
