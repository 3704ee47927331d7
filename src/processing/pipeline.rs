//! Extraction, chunking, embedding, and persistence for one upload batch.

use crate::embedding::SharedEmbeddingClient;
use crate::index::{BuildOptions, IndexStore, VectorIndex};
use std::path::PathBuf;

use super::chunking::ChunkingPolicy;
use super::extract::TextExtractor;
use super::types::{IndexingOutcome, PipelineError};

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Turns a batch of documents into a freshly persisted index, replacing the previous one.
#[derive(Clone)]
pub struct IndexingPipeline {
    policy: ChunkingPolicy,
    embedder: SharedEmbeddingClient,
    store: IndexStore,
    options: BuildOptions,
}

impl IndexingPipeline {
    /// Assemble a pipeline writing to `store`.
    pub fn new(
        policy: ChunkingPolicy,
        embedder: SharedEmbeddingClient,
        store: IndexStore,
        options: BuildOptions,
    ) -> Self {
        Self {
            policy,
            embedder,
            store,
            options,
        }
    }

    /// Store this pipeline persists into.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Index already extracted document texts.
    ///
    /// Blank documents are skipped. When nothing remains the call fails with
    /// [`PipelineError::NoContent`] and the existing store is left as it was.
    pub async fn index_documents(
        &self,
        documents: Vec<String>,
    ) -> Result<IndexingOutcome, PipelineError> {
        let submitted = documents.len();
        let kept: Vec<String> = documents
            .into_iter()
            .enumerate()
            .filter_map(|(position, text)| {
                if text.trim().is_empty() {
                    tracing::warn!(document = position, "Skipping blank document");
                    None
                } else {
                    Some(text)
                }
            })
            .collect();

        if kept.is_empty() {
            tracing::warn!(submitted, "Nothing to index");
            return Err(PipelineError::NoContent);
        }

        let combined = kept.join(DOCUMENT_SEPARATOR);
        let chunks: Vec<String> = self.policy.chunks(&combined).map(str::to_owned).collect();
        tracing::debug!(
            documents = kept.len(),
            characters = combined.chars().count(),
            chunks = chunks.len(),
            max_size = self.policy.max_size(),
            overlap = self.policy.overlap(),
            "Chunked documents"
        );

        let index = VectorIndex::build(chunks, self.embedder.as_ref(), &self.options).await?;
        self.store.replace(&index).await?;

        let outcome = IndexingOutcome {
            documents: kept.len(),
            chunk_count: index.len(),
            dimension: index.dimension(),
            build_id: index.metadata().build_id,
        };
        tracing::info!(
            documents = outcome.documents,
            skipped = submitted - outcome.documents,
            chunks = outcome.chunk_count,
            dimension = outcome.dimension,
            build_id = %outcome.build_id,
            location = %self.store.location().display(),
            "Documents indexed"
        );
        Ok(outcome)
    }

    /// Extract every file with `extractor`, then index the resulting texts.
    ///
    /// Any extraction failure aborts the batch before anything is embedded.
    pub async fn index_files(
        &self,
        paths: &[PathBuf],
        extractor: &dyn TextExtractor,
    ) -> Result<IndexingOutcome, PipelineError> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = extractor
                .extract_text(path)
                .await
                .map_err(|source| PipelineError::Extraction {
                    path: path.clone(),
                    source,
                })?;
            if text.trim().is_empty() {
                tracing::warn!(path = %path.display(), "Extracted no text; file skipped");
                continue;
            }
            documents.push(text);
        }
        self.index_documents(documents).await
    }
}
