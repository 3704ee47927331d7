//! Caller-facing classification of pipeline failures.
//!
//! Every module keeps its own `thiserror` enum; [`ErrorKind`] is the flat vocabulary those
//! enums map onto so surfaces (HTTP, CLI) can react to a failure without matching on the
//! nested error types.

use serde::Serialize;
use std::fmt;

/// Distinguishable failure categories surfaced to callers of the core pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid sizing or parameters (chunk overlap, search limit, configuration values).
    Configuration,
    /// Nothing to index after extraction.
    NoContent,
    /// A source document could not be turned into text.
    Extraction,
    /// The embedding service failed or returned unusable vectors.
    EmbeddingService,
    /// The language model service failed.
    GenerationService,
    /// No persisted index exists yet.
    IndexNotFound,
    /// The persisted index is unreadable or incompatible with the configured model.
    IndexCorrupt,
    /// The assembled prompt exceeds the language model's input limit.
    ContextTooLarge,
    /// Local storage failed while persisting an index.
    Storage,
}

impl ErrorKind {
    /// Stable machine-readable identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::NoContent => "no_content",
            Self::Extraction => "extraction",
            Self::EmbeddingService => "embedding_service",
            Self::GenerationService => "generation_service",
            Self::IndexNotFound => "index_not_found",
            Self::IndexCorrupt => "index_corrupt",
            Self::ContextTooLarge => "context_too_large",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
