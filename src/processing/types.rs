//! Core data types and error definitions for the indexing pipeline.

use crate::error::ErrorKind;
use crate::index::{Distance, IndexError};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use super::extract::ExtractionError;

/// Errors produced while validating chunk sizing.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Overlap must leave room for new content in every chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({max_size})")]
    InvalidOverlap {
        /// Configured maximum characters per chunk.
        max_size: usize,
        /// Configured overlap in characters.
        overlap: usize,
    },
}

impl ChunkingError {
    /// Caller-facing classification.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Errors emitted while indexing a batch of documents.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The batch contained no indexable text.
    #[error("No content to index: every document was empty or blank")]
    NoContent,
    /// A source file could not be turned into text.
    #[error("Failed to extract text from {path}: {source}")]
    Extraction {
        /// File whose extraction failed.
        path: PathBuf,
        /// Underlying extractor error.
        #[source]
        source: ExtractionError,
    },
    /// Building or persisting the index failed.
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexError),
}

impl PipelineError {
    /// Caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoContent => ErrorKind::NoContent,
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::Index(error) => error.kind(),
        }
    }
}

/// Summary of a completed indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexingOutcome {
    /// Documents that contributed text to the batch.
    pub documents: usize,
    /// Chunks embedded and persisted.
    pub chunk_count: usize,
    /// Embedding dimensionality recorded in the store.
    pub dimension: usize,
    /// Identifier of the freshly persisted index.
    pub build_id: Uuid,
}

/// Description of the index currently persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    /// Snapshot file backing the index.
    pub location: PathBuf,
    /// Identifier of the build that produced the snapshot.
    pub build_id: Uuid,
    /// RFC 3339 build timestamp.
    pub built_at: String,
    /// Embedding model recorded at build time.
    pub embedding_model: String,
    /// Vector dimensionality.
    pub dimension: usize,
    /// Distance metric used for search.
    pub metric: Distance,
    /// Number of stored chunks.
    pub chunk_count: usize,
}
