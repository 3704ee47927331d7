use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rustydocs::{
    answer::{AnswerSynthesizer, NOT_IN_CONTEXT, SynthesisSettings},
    embedding::{EmbeddingClient, EmbeddingClientError, HashingEmbeddingClient},
    error::ErrorKind,
    generation::{GenerationClient, GenerationClientError, GenerationRequest},
    index::{BuildOptions, Distance, IndexStore, TrustedLocation},
    processing::{
        DocumentService, IndexingPipeline, PipelineError, ServiceParts, chunking::ChunkingPolicy,
    },
    retrieval::Retriever,
};
use tempfile::TempDir;

const DIMENSION: usize = 256;

/// Stands in for the language model: answers only when the context supports the question.
#[derive(Default)]
struct GroundedModel {
    prompts: Mutex<Vec<String>>,
}

impl GroundedModel {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
    let from = prompt.find(start).map_or(0, |at| at + start.len());
    let to = prompt[from..].find(end).map_or(prompt.len(), |at| from + at);
    &prompt[from..to]
}

#[async_trait]
impl GenerationClient for GroundedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        self.prompts
            .lock()
            .expect("lock")
            .push(request.prompt.clone());
        let context = section(&request.prompt, "Context:\n", "\n\nQuestion:");
        let question = section(&request.prompt, "Question:\n", "\n\nAnswer:");
        if question.contains("capital of France") && context.contains("capital of France is Paris")
        {
            Ok("The capital of France is Paris.".into())
        } else {
            Ok(NOT_IN_CONTEXT.into())
        }
    }
}

/// Counts embedding requests so tests can assert nothing was sent.
struct CountingEmbedder {
    inner: HashingEmbeddingClient,
    calls: Mutex<usize>,
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        *self.calls.lock().expect("lock") += 1;
        self.inner.generate_embeddings(texts).await
    }
}

fn store(dir: &TempDir) -> IndexStore {
    IndexStore::new(TrustedLocation::assume_trusted(dir.path().join("doc_index")))
}

fn service(dir: &TempDir, model: Arc<GroundedModel>) -> DocumentService {
    DocumentService::new(ServiceParts {
        policy: ChunkingPolicy::default(),
        embedder: Arc::new(HashingEmbeddingClient::new(DIMENSION)),
        generator: model,
        store: store(dir),
        dimension: DIMENSION,
        build: BuildOptions::new("hashing"),
        synthesis: SynthesisSettings::new("grounded"),
        default_k: 4,
    })
}

#[tokio::test]
async fn answers_from_indexed_document() {
    let dir = TempDir::new().expect("temp dir");
    let model = Arc::new(GroundedModel::default());
    let service = service(&dir, model.clone());

    service
        .index_documents(vec!["The capital of France is Paris.".into()])
        .await
        .expect("indexed");
    let answer = service
        .ask("What is the capital of France?", None)
        .await
        .expect("answer");

    assert!(answer.contains("Paris"));
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(section(&prompts[0], "Context:\n", "\n\nQuestion:")
        .contains("The capital of France is Paris."));
}

#[tokio::test]
async fn unrelated_question_gets_exact_sentinel() {
    let dir = TempDir::new().expect("temp dir");
    let model = Arc::new(GroundedModel::default());
    let service = service(&dir, model);

    service
        .index_documents(vec!["The capital of France is Paris.".into()])
        .await
        .expect("indexed");
    let answer = service
        .ask("Who won the 1998 FIFA World Cup?", None)
        .await
        .expect("answer");

    assert_eq!(answer, NOT_IN_CONTEXT);
    assert_eq!(service.metrics_snapshot().sentinel_answers, 1);
}

#[tokio::test]
async fn retrieving_before_indexing_is_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let retriever = Retriever::new(
        store(&dir),
        Arc::new(HashingEmbeddingClient::new(DIMENSION)),
        DIMENSION,
        "hashing",
    );

    let error = retriever.retrieve("anything", 4).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::IndexNotFound);
}

#[tokio::test]
async fn blank_batches_fail_without_touching_the_store() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = Arc::new(CountingEmbedder {
        inner: HashingEmbeddingClient::new(DIMENSION),
        calls: Mutex::new(0),
    });
    let pipeline = IndexingPipeline::new(
        ChunkingPolicy::default(),
        embedder.clone(),
        store(&dir),
        BuildOptions::new("hashing"),
    );

    for batch in [Vec::new(), vec![String::new(), "  ".to_string()]] {
        let error = pipeline.index_documents(batch).await.unwrap_err();
        assert!(matches!(error, PipelineError::NoContent));
    }
    assert_eq!(*embedder.calls.lock().expect("lock"), 0);
    assert!(!pipeline.store().exists().await);

    let first = pipeline
        .index_documents(vec!["Kept content.".into()])
        .await
        .expect("indexed");
    pipeline
        .index_documents(vec!["\n\n".into()])
        .await
        .unwrap_err();
    let stored = pipeline.store().load_trusted(DIMENSION, "hashing").await.expect("load");
    assert_eq!(stored.metadata().build_id, first.build_id);
}

#[tokio::test]
async fn reindexing_replaces_previous_documents() {
    let dir = TempDir::new().expect("temp dir");
    let model = Arc::new(GroundedModel::default());
    let service = service(&dir, model);

    service
        .index_documents(vec!["The capital of France is Paris.".into()])
        .await
        .expect("first batch");
    service
        .index_documents(vec!["Mount Everest is the tallest mountain on Earth.".into()])
        .await
        .expect("second batch");

    let answer = service
        .ask("What is the capital of France?", None)
        .await
        .expect("answer");
    assert_eq!(answer, NOT_IN_CONTEXT);
}

#[tokio::test]
async fn persisted_index_survives_a_fresh_retriever() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = Arc::new(HashingEmbeddingClient::new(DIMENSION));
    let pipeline = IndexingPipeline::new(
        ChunkingPolicy::new(60, 10).expect("policy"),
        embedder.clone(),
        store(&dir),
        BuildOptions {
            metric: Distance::Cosine,
            ..BuildOptions::new("hashing")
        },
    );
    pipeline
        .index_documents(vec![
            "Bananas are rich in potassium.".into(),
            "The capital of France is Paris.".into(),
            "Volcanoes erupt molten rock.".into(),
        ])
        .await
        .expect("indexed");

    let retriever = Retriever::new(store(&dir), embedder, DIMENSION, "hashing");
    let first = retriever
        .retrieve_scored("capital of France", 2)
        .await
        .expect("retrieve");
    let again = retriever
        .retrieve_scored("capital of France", 2)
        .await
        .expect("retrieve");
    assert_eq!(first, again);
    assert!(first[0].text.contains("Paris"));

    let synthesizer = AnswerSynthesizer::new(
        Arc::new(GroundedModel::default()),
        SynthesisSettings::new("grounded"),
    );
    let chunks: Vec<String> = first.into_iter().map(|hit| hit.text).collect();
    let answer = synthesizer
        .answer("What is the capital of France?", &chunks)
        .await
        .expect("answer");
    assert!(answer.contains("Paris"));
}
