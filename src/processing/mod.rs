//! Document processing: extraction, chunking, indexing, and the service facade.

pub mod chunking;
pub mod extract;
mod pipeline;
mod service;
pub mod types;

#[cfg(feature = "pdf")]
pub use extract::PdfTextExtractor;
pub use extract::{DocumentExtractor, ExtractionError, PlainTextExtractor, TextExtractor};
pub use pipeline::IndexingPipeline;
pub use service::{AskError, DocumentApi, DocumentService, ServiceInitError, ServiceParts};
pub use types::{ChunkingError, IndexSummary, IndexingOutcome, PipelineError};
