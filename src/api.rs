//! HTTP surface for Rusty Docs.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /documents` – Replace the index with a batch of document texts. Returns the indexing
//!   outcome (`documents`, `chunks_indexed`, `dimension`, `build_id`).
//! - `POST /ask` – Answer a question from the indexed documents. Accepts an optional `k`
//!   (number of chunks retrieved) and returns `{ "answer": string }`.
//! - `GET /metrics` – Observe indexing and answering counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures are returned as `{ "error": kind, "message": text }` with a status derived from the
//! error kind.

use crate::error::ErrorKind;
use crate::metrics::MetricsSnapshot;
use crate::processing::{AskError, DocumentApi, PipelineError};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/documents", post(index_documents::<S>))
        .route("/ask", post(ask::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /documents` endpoint.
#[derive(Deserialize)]
struct DocumentsRequest {
    /// Extracted text of each uploaded document.
    documents: Vec<String>,
}

/// Success response for the `POST /documents` endpoint.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: usize,
    chunks_indexed: usize,
    dimension: usize,
    build_id: Uuid,
}

/// Replace the index with the supplied documents.
async fn index_documents<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<DocumentsRequest>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: DocumentApi,
{
    let submitted = request.documents.len();
    let outcome = service.index_documents(request.documents).await?;
    tracing::info!(
        submitted,
        documents = outcome.documents,
        chunks = outcome.chunk_count,
        build_id = %outcome.build_id,
        "Index request completed"
    );
    Ok(Json(DocumentsResponse {
        documents: outcome.documents,
        chunks_indexed: outcome.chunk_count,
        dimension: outcome.dimension,
        build_id: outcome.build_id,
    }))
}

/// Request body for the `POST /ask` endpoint.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Optional number of chunks to retrieve (defaults to `RETRIEVAL_K`).
    #[serde(default)]
    k: Option<usize>,
}

/// Success response for the `POST /ask` endpoint.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

/// Answer a question from the current index.
async fn ask<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: DocumentApi,
{
    let answer = service.ask(&request.question, request.k).await?;
    Ok(Json(AskResponse { answer }))
}

/// Return indexing and answering counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "index_documents",
                method: "POST",
                path: "/documents",
                description: "Chunk and embed a batch of document texts, replacing the current index. Blank documents are skipped.",
                request_example: Some(json!({
                    "documents": ["First document text", "Second document text"]
                })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question using only the indexed documents. Replies \"answer is not available in the context\" when they do not contain the answer.",
                request_example: Some(json!({
                    "question": "What is the capital of France?",
                    "k": 4
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return indexing and answering counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Error response carrying the caller-facing kind of a failure.
struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Configuration | ErrorKind::NoContent | ErrorKind::Extraction => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::IndexNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ContextTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::EmbeddingService | ErrorKind::GenerationService => StatusCode::BAD_GATEWAY,
            ErrorKind::IndexCorrupt | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = %self.kind, message = %self.message, "Request failed");
        } else {
            tracing::warn!(kind = %self.kind, message = %self.message, "Request rejected");
        }
        let message = match self.kind {
            ErrorKind::IndexNotFound => "no documents indexed yet".to_string(),
            _ => self.message,
        };
        (status, Json(json!({ "error": self.kind, "message": message }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self {
            kind: inner.kind(),
            message: inner.to_string(),
        }
    }
}

impl From<AskError> for AppError {
    fn from(inner: AskError) -> Self {
        Self {
            kind: inner.kind(),
            message: inner.to_string(),
        }
    }
}
