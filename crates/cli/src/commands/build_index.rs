//! Build-index command handler.
//!
//! Parses the product catalog and uploads it to the hosted search index.

use copilot_core::{config::AppConfig, AppResult};
use copilot_knowledge::{build_index, BuildOptions, SearchClient, DEFAULT_DATA_PATH};
use copilot_llm::create_client;
use std::path::PathBuf;

/// Build the product search index
#[derive(Debug)]
pub struct BuildIndexCommand {
    /// Index name override
    pub index_name: Option<String>,

    /// Catalog folder override
    pub data_path: Option<PathBuf>,

    pub json: bool,
}

impl BuildIndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build-index command");

        let search = config.search()?;
        let index_name = self
            .index_name
            .clone()
            .unwrap_or_else(|| search.index_name.clone());
        let data_path = self
            .data_path
            .clone()
            .unwrap_or_else(|| config.workspace.join(DEFAULT_DATA_PATH));

        let embedder = create_client(config)?;
        let deployment = config.embedding_deployment()?;
        let index = SearchClient::new(search)?;

        let options = BuildOptions::new(index_name, data_path);
        let stats = build_index(&options, &index, embedder.as_ref(), &deployment).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Created index '{}'", stats.index_name);
            println!("  Documents: {}", stats.documents_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!("  Bytes processed: {}", stats.bytes_processed);
            println!("  Duration: {:.2}s", stats.duration_secs);
        }

        Ok(())
    }
}
