//! Hosted search index client.
//!
//! Talks to the search service REST API (`api-key` header, fixed
//! `api-version`) to create the product index, upload chunks and run
//! keyword, vector or hybrid queries.

use crate::index::{SearchIndex, SearchQuery};
use crate::schema::index_definition;
use crate::types::{ProductDocument, SearchHit};
use copilot_core::config::SearchSettings;
use copilot_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search service REST API version
pub const SEARCH_API_VERSION: &str = "2023-11-01";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Fields returned by queries.
const SELECT_FIELDS: &str = "id,content,title,filepath,url,chunk_index";

#[derive(Debug, Serialize)]
struct WireSearchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    top: u32,
    select: &'static str,
    #[serde(rename = "vectorQueries", skip_serializing_if = "Vec::is_empty")]
    vector_queries: Vec<WireVectorQuery<'a>>,
}

#[derive(Debug, Serialize)]
struct WireVectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    fields: &'static str,
    k: u32,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct WireIndexBatch<'a> {
    value: Vec<WireIndexAction<'a>>,
}

#[derive(Debug, Serialize)]
struct WireIndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    document: &'a ProductDocument,
}

#[derive(Debug, Deserialize)]
struct WireIndexResponse {
    #[serde(default)]
    value: Vec<WireIndexResult>,
}

#[derive(Debug, Deserialize)]
struct WireIndexResult {
    key: String,
    status: bool,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Client for one search service.
pub struct SearchClient {
    settings: SearchSettings,

    /// HTTP client
    client: reqwest::Client,
}

impl SearchClient {
    /// Create a client for the given service settings.
    pub fn new(settings: SearchSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.settings.endpoint, path, SEARCH_API_VERSION
        )
    }
}

#[async_trait::async_trait]
impl SearchIndex for SearchClient {
    async fn create_or_update_index(&self, index_name: &str, dimensions: usize) -> AppResult<()> {
        tracing::info!(
            "Creating or updating index '{}' ({} dimensions)",
            index_name,
            dimensions
        );

        let url = self.url(&format!("indexes/{}", index_name));
        let response = self
            .client
            .put(&url)
            .header("api-key", self.settings.key.expose())
            .json(&index_definition(index_name, dimensions))
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to send index request: {}", e)))?;

        check_status(response, "index definition").await?;
        Ok(())
    }

    /// Uploads with `mergeOrUpload`. Fails if any document was rejected.
    async fn upload_documents(
        &self,
        index_name: &str,
        documents: &[ProductDocument],
    ) -> AppResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            "Uploading {} documents to index '{}'",
            documents.len(),
            index_name
        );

        let url = self.url(&format!("indexes/{}/docs/index", index_name));
        let response = self
            .client
            .post(&url)
            .header("api-key", self.settings.key.expose())
            .json(&upload_batch(documents))
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to send upload request: {}", e)))?;

        let response = check_status(response, "document upload").await?;
        let body: WireIndexResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse upload response: {}", e)))?;

        count_uploaded(body)
    }

    /// Queries the index this client is configured for.
    async fn search(&self, query: &SearchQuery, top: u32) -> AppResult<Vec<SearchHit>> {
        let url = self.url(&format!("indexes/{}/docs/search", self.settings.index_name));

        let response = self
            .client
            .post(&url)
            .header("api-key", self.settings.key.expose())
            .json(&search_request(query, top))
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to send search request: {}", e)))?;

        let response = check_status(response, "search").await?;
        let body: WireSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse search response: {}", e)))?;

        tracing::debug!(
            "Search on '{}' returned {} hits",
            self.settings.index_name,
            body.value.len()
        );

        Ok(body.value)
    }
}

fn vector_queries(vector: &[f32], k: u32) -> Vec<WireVectorQuery<'_>> {
    vec![WireVectorQuery {
        kind: "vector",
        vector,
        fields: "content_vector",
        k,
    }]
}

fn search_request(query: &SearchQuery, top: u32) -> WireSearchRequest<'_> {
    match query {
        SearchQuery::Vector(vector) => WireSearchRequest {
            search: None,
            top,
            select: SELECT_FIELDS,
            vector_queries: vector_queries(vector, top),
        },
        SearchQuery::Hybrid { text, vector } => WireSearchRequest {
            search: Some(text.as_str()),
            top,
            select: SELECT_FIELDS,
            vector_queries: vector_queries(vector, top),
        },
    }
}

fn upload_batch(documents: &[ProductDocument]) -> WireIndexBatch<'_> {
    WireIndexBatch {
        value: documents
            .iter()
            .map(|document| WireIndexAction {
                action: "mergeOrUpload",
                document,
            })
            .collect(),
    }
}

/// 207 means some documents failed; each result carries its own status.
fn count_uploaded(body: WireIndexResponse) -> AppResult<usize> {
    let failed: Vec<String> = body
        .value
        .iter()
        .filter(|r| !r.status)
        .map(|r| match &r.error_message {
            Some(message) => format!("{} ({})", r.key, message),
            None => r.key.clone(),
        })
        .collect();

    if !failed.is_empty() {
        return Err(AppError::Search(format!(
            "{} documents failed to upload: {}",
            failed.len(),
            failed.join(", ")
        )));
    }

    Ok(body.value.len())
}

async fn check_status(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(AppError::Search(format!(
        "{} request failed ({}): {}",
        what,
        status,
        describe_error(&error_text)
    )))
}

/// The service wraps errors as `{"error": {"code", "message"}}`.
fn describe_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
