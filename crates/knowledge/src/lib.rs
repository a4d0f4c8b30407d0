//! Product knowledge for the copilot.
//!
//! Parses the product catalog, chunks and embeds it into the hosted search
//! index, and retrieves documents for backends that ground client-side.

pub mod build;
pub mod chunker;
pub mod index;
pub mod parser;
pub mod retriever;
pub mod schema;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use build::{build_index, document_id};
pub use index::{SearchIndex, SearchQuery};
pub use retriever::{build_context, to_citation, RetrievalMode, Retriever, SearchRetriever};
pub use search::SearchClient;
pub use types::{
    BuildOptions, BuildStats, ProductDocument, SearchHit, DATA_SOURCE_URL, DEFAULT_DATA_PATH,
};
