//! Document service coordinating indexing, retrieval, and answer synthesis.

use crate::{
    answer::{AnswerError, AnswerSynthesizer, SynthesisSettings, is_not_in_context},
    config::Config,
    embedding::{EmbeddingClientError, SharedEmbeddingClient, build_embedding_client},
    error::ErrorKind,
    generation::{GenerationClientError, SharedGenerationClient, build_generation_client},
    index::{BuildOptions, IndexError, IndexStore, TrustedLocation},
    metrics::{DocsMetrics, MetricsSnapshot},
    processing::{
        chunking::ChunkingPolicy,
        extract::TextExtractor,
        pipeline::IndexingPipeline,
        types::{ChunkingError, IndexSummary, IndexingOutcome, PipelineError},
    },
    retrieval::{RetrievalError, Retriever},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum AskError {
    /// Context could not be retrieved.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// The answer could not be synthesized.
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl AskError {
    /// Caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Retrieval(error) => error.kind(),
            Self::Answer(error) => error.kind(),
        }
    }
}

/// Errors raised while wiring the service from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Chunk sizing in the configuration is invalid.
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),
    /// The embedding client could not be constructed.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The generation client could not be constructed.
    #[error("Failed to initialize generation client: {0}")]
    Generation(#[from] GenerationClientError),
}

/// Abstraction over the document service used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Replace the index with the supplied documents.
    async fn index_documents(
        &self,
        documents: Vec<String>,
    ) -> Result<IndexingOutcome, PipelineError>;

    /// Answer `question` from the current index, retrieving `k` chunks (or the default).
    async fn ask(&self, question: &str, k: Option<usize>) -> Result<String, AskError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Owns the indexing pipeline, retriever, and synthesizer behind one handle.
///
/// Both halves share the embedding client and the store location, so questions are always
/// embedded with the model that built the index. Construct once near process start and share
/// it through an `Arc`.
pub struct DocumentService {
    pipeline: IndexingPipeline,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    default_k: usize,
    metrics: Arc<DocsMetrics>,
}

/// Components needed to assemble a [`DocumentService`] without reading global configuration.
pub struct ServiceParts {
    /// Chunk sizing applied to every batch.
    pub policy: ChunkingPolicy,
    /// Client shared by indexing and retrieval.
    pub embedder: SharedEmbeddingClient,
    /// Language model client.
    pub generator: SharedGenerationClient,
    /// Persisted index location.
    pub store: IndexStore,
    /// Embedding dimension every build and load is validated against.
    pub dimension: usize,
    /// Options for index builds. `expected_dimension` is overridden by `dimension`.
    pub build: BuildOptions,
    /// Answer model settings.
    pub synthesis: SynthesisSettings,
    /// Chunks retrieved when a question does not specify `k`.
    pub default_k: usize,
}

impl DocumentService {
    /// Assemble a service from explicit parts.
    pub fn new(parts: ServiceParts) -> Self {
        let ServiceParts {
            policy,
            embedder,
            generator,
            store,
            dimension,
            build,
            synthesis,
            default_k,
        } = parts;
        let build = BuildOptions {
            expected_dimension: Some(dimension),
            ..build
        };
        Self {
            retriever: Retriever::new(
                store.clone(),
                embedder.clone(),
                dimension,
                build.embedding_model.clone(),
            ),
            pipeline: IndexingPipeline::new(policy, embedder, store, build),
            synthesizer: AnswerSynthesizer::new(generator, synthesis),
            default_k: default_k.max(1),
            metrics: Arc::new(DocsMetrics::new()),
        }
    }

    /// Build the service from configuration, constructing provider clients as needed.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!("Initializing embedding client");
        let embedder = build_embedding_client(config)?;
        tracing::info!("Initializing generation client");
        let generator = build_generation_client(config)?;

        let policy = ChunkingPolicy::new(
            config.text_splitter_chunk_size,
            config.text_splitter_chunk_overlap,
        )?;
        let store = IndexStore::new(TrustedLocation::assume_trusted(config.index_path.clone()));
        let build = BuildOptions {
            batch_size: config.embedding_batch_size,
            concurrency: config.embedding_concurrency,
            metric: config.index_distance,
            embedding_model: config.embedding_model.clone(),
            expected_dimension: None,
        };
        let synthesis = SynthesisSettings {
            model: config.generation_model.clone(),
            temperature: config.generation_temperature,
            max_input_tokens: config.generation_max_input_tokens,
        };
        tracing::debug!(
            index_path = %config.index_path.display(),
            chunk_size = policy.max_size(),
            overlap = policy.overlap(),
            metric = ?build.metric,
            "Document service ready"
        );

        Ok(Self::new(ServiceParts {
            policy,
            embedder,
            generator,
            store,
            dimension: config.embedding_dimension,
            build,
            synthesis,
            default_k: config.retrieval_k,
        }))
    }

    /// Replace the index with `documents`.
    pub async fn index_documents(
        &self,
        documents: Vec<String>,
    ) -> Result<IndexingOutcome, PipelineError> {
        let outcome = self.pipeline.index_documents(documents).await?;
        self.record_batch(&outcome);
        Ok(outcome)
    }

    /// Extract `paths` with `extractor` and replace the index with their text.
    pub async fn index_files(
        &self,
        paths: &[PathBuf],
        extractor: &dyn TextExtractor,
    ) -> Result<IndexingOutcome, PipelineError> {
        let outcome = self.pipeline.index_files(paths, extractor).await?;
        self.record_batch(&outcome);
        Ok(outcome)
    }

    /// Retrieve context for `question` and synthesize a grounded answer.
    pub async fn ask(&self, question: &str, k: Option<usize>) -> Result<String, AskError> {
        let k = k.unwrap_or(self.default_k);
        tracing::info!(k, "Answering question");
        let chunks = self.retriever.retrieve(question, k).await?;
        let answer = self.synthesizer.answer(question, &chunks).await?;

        let not_in_context = is_not_in_context(&answer);
        self.metrics.record_answer(not_in_context);
        tracing::info!(
            chunks = chunks.len(),
            not_in_context,
            answer_chars = answer.chars().count(),
            "Question answered"
        );
        Ok(answer)
    }

    /// Describe the index currently on disk.
    pub async fn index_summary(&self) -> Result<IndexSummary, IndexError> {
        let store = self.pipeline.store();
        let index = store
            .load_trusted(self.retriever.dimension(), self.retriever.embedding_model())
            .await?;
        let metadata = index.metadata();
        Ok(IndexSummary {
            location: store.index_file(),
            build_id: metadata.build_id,
            built_at: metadata.built_at.clone(),
            embedding_model: metadata.embedding_model.clone(),
            dimension: index.dimension(),
            metric: index.metric(),
            chunk_count: index.len(),
        })
    }

    /// Return the current activity metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn record_batch(&self, outcome: &IndexingOutcome) {
        self.metrics
            .record_batch(outcome.documents as u64, outcome.chunk_count as u64);
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn index_documents(
        &self,
        documents: Vec<String>,
    ) -> Result<IndexingOutcome, PipelineError> {
        DocumentService::index_documents(self, documents).await
    }

    async fn ask(&self, question: &str, k: Option<usize>) -> Result<String, AskError> {
        DocumentService::ask(self, question, k).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
