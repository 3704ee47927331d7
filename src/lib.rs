#![deny(missing_docs)]

//! Core library for Rusty Docs, a grounded question-answering service over uploaded documents.

/// Grounded answer synthesis.
pub mod answer;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Cross-cutting error classification.
pub mod error;
/// Language model client abstraction and adapters.
pub mod generation;
/// Exact vector index and its on-disk store.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Indexing and answering metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Question-time context retrieval.
pub mod retrieval;
