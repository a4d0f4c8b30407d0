//! Product index build: parse, chunk, embed and upload the catalog.

use crate::chunker::chunk_text;
use crate::index::SearchIndex;
use crate::parser::{parse_file, ContentType};
use crate::types::{BuildOptions, BuildStats, ProductDocument, DATA_SOURCE_URL};
use copilot_core::{AppError, AppResult, ModelDeployment};
use copilot_llm::EmbeddingClient;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

/// Build (or refresh) the product index from the documents under
/// `options.data_path`.
///
/// Chunk keys are derived from file path and chunk position, so running the
/// build twice replaces documents instead of duplicating them.
pub async fn build_index(
    options: &BuildOptions,
    index: &dyn SearchIndex,
    embedder: &dyn EmbeddingClient,
    deployment: &ModelDeployment,
) -> AppResult<BuildStats> {
    let start = Instant::now();

    tracing::info!(
        "Building index '{}' from {:?}",
        options.index_name,
        options.data_path
    );

    let (mut documents, documents_count, bytes_processed) = collect_documents(options)?;
    if documents.is_empty() {
        return Err(AppError::Input(format!(
            "No product documents found in {:?}",
            options.data_path
        )));
    }

    embed_documents(&mut documents, embedder, deployment, options.embedding_batch_size).await?;

    let dimensions = documents
        .first()
        .and_then(|d| d.content_vector.as_ref())
        .map(Vec::len)
        .unwrap_or(0);
    index
        .create_or_update_index(&options.index_name, dimensions)
        .await?;

    let mut chunks_count = 0u32;
    for batch in documents.chunks(options.upload_batch_size.max(1)) {
        let uploaded = index.upload_documents(&options.index_name, batch).await?;
        chunks_count += uploaded as u32;
        tracing::info!(
            "Uploaded {}/{} chunks",
            chunks_count,
            documents.len()
        );
    }

    let duration = start.elapsed();

    tracing::info!(
        "Index build completed: {} documents, {} chunks, {} bytes in {:.2}s",
        documents_count,
        chunks_count,
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(BuildStats {
        index_name: options.index_name.clone(),
        documents_count,
        chunks_count,
        bytes_processed,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Parse and chunk every supported file under the data folder.
fn collect_documents(options: &BuildOptions) -> AppResult<(Vec<ProductDocument>, u32, u64)> {
    let root = &options.data_path;
    if !root.is_dir() {
        return Err(AppError::Input(format!(
            "Data folder not found: {:?}",
            root
        )));
    }

    let mut documents = Vec::new();
    let mut documents_count = 0u32;
    let mut bytes_processed = 0u64;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !ContentType::from_path(path).is_supported() {
            continue;
        }

        let parsed = match parse_file(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        let filepath = relative_path(root, path);
        let chunks = chunk_text(&parsed.text, options.chunk_size, options.chunk_overlap);

        tracing::debug!("Parsed {}: {} chunks", filepath, chunks.len());

        documents_count += 1;
        bytes_processed += parsed.text.len() as u64;

        documents.extend(chunks.into_iter().map(|chunk| ProductDocument {
            id: document_id(&filepath, chunk.position),
            content: chunk.text,
            title: parsed.title.clone(),
            url: format!("{}/{}", DATA_SOURCE_URL, filepath),
            filepath: filepath.clone(),
            chunk_index: chunk.position,
            content_vector: None,
        }));
    }

    Ok((documents, documents_count, bytes_processed))
}

async fn embed_documents(
    documents: &mut [ProductDocument],
    embedder: &dyn EmbeddingClient,
    deployment: &ModelDeployment,
    batch_size: usize,
) -> AppResult<()> {
    let total = documents.len();
    let mut done = 0;

    for batch in documents.chunks_mut(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder.embed(deployment, &texts).await?;

        if vectors.len() != batch.len() {
            return Err(AppError::Llm(format!(
                "Expected {} embeddings, received {}",
                batch.len(),
                vectors.len()
            )));
        }

        for (document, vector) in batch.iter_mut().zip(vectors) {
            document.content_vector = Some(vector);
        }

        done += batch.len();
        tracing::debug!("Embedded {}/{} chunks", done, total);
    }

    Ok(())
}

/// Forward-slash path of `path` relative to the data folder.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Stable index key for a chunk.
pub fn document_id(filepath: &str, chunk_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filepath.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
