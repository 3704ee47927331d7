use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::POST, MockServer};
use rustydocs::{
    api,
    config::{Config, EmbeddingProvider, GenerationProvider},
    index::Distance,
    processing::DocumentService,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const SENTINEL: &str = "answer is not available in the context";

struct Harness {
    _dir: TempDir,
    server: MockServer,
    app: Router,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let server = MockServer::start_async().await;
        let config = Config {
            index_path: dir.path().join("doc_index"),
            embedding_provider: EmbeddingProvider::Hashing,
            embedding_model: "hashing".into(),
            embedding_dimension: 128,
            embedding_batch_size: 2,
            embedding_concurrency: 2,
            generation_provider: GenerationProvider::Ollama,
            generation_model: "llama3".into(),
            generation_temperature: 0.3,
            generation_max_input_tokens: 30_720,
            text_splitter_chunk_size: 120,
            text_splitter_chunk_overlap: 20,
            retrieval_k: 4,
            index_distance: Distance::L2,
            ollama_url: Some(server.base_url()),
            openai_base_url: None,
            openai_api_key: None,
            http_timeout_secs: 5,
            server_port: None,
        };
        let service = DocumentService::from_config(&config).expect("service");
        Self {
            _dir: dir,
            server,
            app: api::create_router(Arc::new(service)),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn ask_without_documents_is_not_found() {
    let harness = Harness::new().await;
    let (status, body) = harness
        .send(Method::POST, "/ask", Some(json!({ "question": "Anything?" })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "no documents indexed yet");
}

#[tokio::test]
async fn upload_then_ask_round_trip_through_ollama() {
    let harness = Harness::new().await;
    let generate = harness
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("The capital of France is Paris.")
                .body_contains("What is the capital of France?");
            then.status(200)
                .json_body(json!({ "response": "Paris", "done": true }));
        })
        .await;

    let (status, body) = harness
        .send(
            Method::POST,
            "/documents",
            Some(json!({
                "documents": [
                    "The capital of France is Paris.",
                    "   ",
                    "Photosynthesis converts light into chemical energy in plants."
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], 2);
    assert_eq!(body["dimension"], 128);

    let (status, body) = harness
        .send(
            Method::POST,
            "/ask",
            Some(json!({ "question": "What is the capital of France?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Paris");
    generate.assert_async().await;

    let (_, metrics) = harness.send(Method::GET, "/metrics", None).await;
    assert_eq!(metrics["batches_indexed"], 1);
    assert_eq!(metrics["documents_indexed"], 2);
    assert_eq!(metrics["questions_answered"], 1);
}

#[tokio::test]
async fn sentinel_from_model_is_returned_verbatim() {
    let harness = Harness::new().await;
    harness
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .json_body(json!({ "response": SENTINEL, "done": true }));
        })
        .await;

    harness
        .send(
            Method::POST,
            "/documents",
            Some(json!({ "documents": ["The capital of France is Paris."] })),
        )
        .await;
    let (status, body) = harness
        .send(
            Method::POST,
            "/ask",
            Some(json!({ "question": "Who won the 1998 World Cup?", "k": 1 })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], SENTINEL);
    let (_, metrics) = harness.send(Method::GET, "/metrics", None).await;
    assert_eq!(metrics["sentinel_answers"], 1);
}

#[tokio::test]
async fn model_outage_is_bad_gateway() {
    let harness = Harness::new().await;
    harness
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(503).body("model loading");
        })
        .await;

    harness
        .send(
            Method::POST,
            "/documents",
            Some(json!({ "documents": ["Some indexed text."] })),
        )
        .await;
    let (status, body) = harness
        .send(Method::POST, "/ask", Some(json!({ "question": "Anything?" })))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "generation_service");
}
