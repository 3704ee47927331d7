//! Shared types used by the vector index and its store.

use crate::embedding::EmbeddingClientError;
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned while building, persisting, loading, or searching an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index has been persisted at the configured location yet.
    #[error("No documents indexed yet (no index at {path})")]
    NotFound {
        /// Store file that was expected.
        path: PathBuf,
    },
    /// The persisted index cannot be read or fails validation.
    #[error("Index at {path} is corrupt: {reason}")]
    Corrupt {
        /// Store file that failed validation.
        path: PathBuf,
        /// Human-readable validation failure.
        reason: String,
    },
    /// Vectors do not match the dimensionality recorded in the index.
    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded in the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// `k` must be at least one.
    #[error("search limit must be at least 1")]
    InvalidSearchLimit,
    /// Refused to build an index without any chunks.
    #[error("cannot build an index from zero chunks")]
    Empty,
    /// Embedding provider failed during the build.
    #[error("Failed to embed chunks: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Filesystem access failed while persisting the index.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Index could not be serialized.
    #[error("Failed to serialize index: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Background storage task failed to complete.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl IndexError {
    /// Caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::IndexNotFound,
            Self::Corrupt { .. } | Self::DimensionMismatch { .. } => ErrorKind::IndexCorrupt,
            Self::InvalidSearchLimit => ErrorKind::Configuration,
            Self::Empty => ErrorKind::NoContent,
            Self::Embedding(error) => error.kind(),
            Self::Io { .. } | Self::Serialization(_) | Self::Task(_) => ErrorKind::Storage,
        }
    }
}

/// Distance metric used for nearest-neighbour search. Smaller is more similar for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Euclidean distance.
    #[default]
    L2,
    /// One minus cosine similarity.
    Cosine,
}

impl Distance {
    /// Distance between two equal-length vectors.
    pub fn between(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Self::Cosine => {
                let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                let denominator = norm_a.sqrt() * norm_b.sqrt();
                if denominator == 0.0 {
                    1.0
                } else {
                    1.0 - dot / denominator
                }
            }
        }
    }
}

impl std::str::FromStr for Distance {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            _ => Err(()),
        }
    }
}

/// One stored (chunk text, embedding) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Chunk text returned to callers.
    pub text: String,
    /// Embedding of `text`.
    pub vector: Vec<f32>,
}

/// Provenance recorded alongside a built index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Unique identifier of the build.
    pub build_id: Uuid,
    /// RFC3339 build timestamp.
    pub built_at: String,
    /// Embedding model that produced the vectors.
    pub embedding_model: String,
}

/// Search hit with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    /// Stored chunk text.
    pub text: String,
    /// Distance to the query vector under the index metric.
    pub distance: f32,
}

/// Parameters controlling how an index is built.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Embedding requests allowed in flight at once.
    pub concurrency: usize,
    /// Metric recorded with the index.
    pub metric: Distance,
    /// Model identifier recorded with the index.
    pub embedding_model: String,
    /// Reject vectors whose dimension differs from this value.
    pub expected_dimension: Option<usize>,
}

impl BuildOptions {
    /// Options with one request per 32 texts, no concurrency, and L2 distance.
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            batch_size: 32,
            concurrency: 1,
            metric: Distance::L2,
            embedding_model: embedding_model.into(),
            expected_dimension: None,
        }
    }
}
