//! Query-time retrieval against the persisted index.

use crate::embedding::{EmbeddingClientError, SharedEmbeddingClient};
use crate::error::ErrorKind;
use crate::index::{IndexError, IndexStore, SearchMatch};
use thiserror::Error;

/// Default number of passages fetched per question.
pub const DEFAULT_K: usize = 4;

/// Errors emitted while retrieving context for a question.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Loading or searching the index failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Embedding provider failed to embed the question.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vector for the question.
    #[error("Embedding provider returned no vector for the question")]
    EmptyEmbedding,
}

impl RetrievalError {
    /// Caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Index(error) => error.kind(),
            Self::Embedding(error) => error.kind(),
            Self::EmptyEmbedding => ErrorKind::EmbeddingService,
        }
    }
}

/// Embeds questions and fetches their nearest chunks from the current snapshot.
///
/// The snapshot is re-read on every call, so a retriever never holds index state between
/// questions and always sees the most recently persisted batch.
#[derive(Clone)]
pub struct Retriever {
    store: IndexStore,
    embedder: SharedEmbeddingClient,
    dimension: usize,
    embedding_model: String,
}

impl Retriever {
    /// Build a retriever over `store`, embedding with `embedder` at `dimension`.
    ///
    /// Snapshots built by any model other than `embedding_model` are refused as corrupt.
    pub fn new(
        store: IndexStore,
        embedder: SharedEmbeddingClient,
        dimension: usize,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            dimension,
            embedding_model: embedding_model.into(),
        }
    }

    /// Embedding dimension the retriever validates against.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embedding model the retriever expects the snapshot to be built with.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Text of the `k` chunks nearest to `question`, most similar first.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<String>, RetrievalError> {
        Ok(self
            .retrieve_scored(question, k)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Like [`Retriever::retrieve`], keeping each hit's distance.
    pub async fn retrieve_scored(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<SearchMatch>, RetrievalError> {
        if k == 0 {
            return Err(IndexError::InvalidSearchLimit.into());
        }
        let index = self
            .store
            .load_trusted(self.dimension, &self.embedding_model)
            .await?;

        let mut vectors = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(RetrievalError::EmptyEmbedding)?;

        let hits = index.search(&vector, k)?;
        tracing::debug!(
            k,
            hits = hits.len(),
            build_id = %index.metadata().build_id,
            best_distance = hits.first().map(|hit| hit.distance),
            "Retrieved context"
        );
        Ok(hits)
    }
}
