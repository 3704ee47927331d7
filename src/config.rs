use crate::index::Distance;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_INDEX_PATH: &str = "doc_index";
const DEFAULT_CHUNK_SIZE: usize = 10_000;
const DEFAULT_CHUNK_OVERLAP: usize = 1_000;
const DEFAULT_RETRIEVAL_K: usize = 4;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;
const DEFAULT_EMBEDDING_CONCURRENCY: usize = 1;
const DEFAULT_GENERATION_TEMPERATURE: f32 = 0.3;
const DEFAULT_GENERATION_MAX_INPUT_TOKENS: usize = 30_720;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was already loaded for this process.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for Rusty Docs.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the persisted vector index.
    pub index_path: PathBuf,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Number of texts sent per embedding request.
    pub embedding_batch_size: usize,
    /// Maximum number of embedding requests in flight during an index build.
    pub embedding_concurrency: usize,
    /// Language model provider used for answer synthesis.
    pub generation_provider: GenerationProvider,
    /// Language model identifier passed to the provider.
    pub generation_model: String,
    /// Sampling temperature for answer synthesis.
    pub generation_temperature: f32,
    /// Prompt budget, in tokens, accepted by the language model.
    pub generation_max_input_tokens: usize,
    /// Maximum characters per chunk.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Default number of passages retrieved per question.
    pub retrieval_k: usize,
    /// Distance metric used by newly built indexes.
    pub index_distance: Distance,
    /// Base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    pub openai_base_url: Option<String>,
    /// API key for OpenAI-compatible providers.
    pub openai_api_key: Option<String>,
    /// Request timeout applied to provider HTTP calls.
    pub http_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
    /// Deterministic offline hashing embedder.
    Hashing,
}

/// Supported language model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible chat completions API.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            index_path: load_env_optional("INDEX_PATH")
                .unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string())
                .into(),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .ok()
                .filter(|dimension: &usize| *dimension > 0)
                .ok_or_else(|| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            embedding_batch_size: parse_optional("EMBEDDING_BATCH_SIZE")?
                .unwrap_or(DEFAULT_EMBEDDING_BATCH_SIZE)
                .max(1),
            embedding_concurrency: parse_optional("EMBEDDING_CONCURRENCY")?
                .unwrap_or(DEFAULT_EMBEDDING_CONCURRENCY)
                .max(1),
            generation_provider: load_env("GENERATION_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?,
            generation_model: load_env("GENERATION_MODEL")?,
            generation_temperature: parse_optional("GENERATION_TEMPERATURE")?
                .unwrap_or(DEFAULT_GENERATION_TEMPERATURE),
            generation_max_input_tokens: parse_optional("GENERATION_MAX_INPUT_TOKENS")?
                .unwrap_or(DEFAULT_GENERATION_MAX_INPUT_TOKENS),
            text_splitter_chunk_size: parse_optional("TEXT_SPLITTER_CHUNK_SIZE")?
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            text_splitter_chunk_overlap: parse_optional("TEXT_SPLITTER_CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            retrieval_k: parse_optional("RETRIEVAL_K")?
                .unwrap_or(DEFAULT_RETRIEVAL_K)
                .max(1),
            index_distance: load_env_optional("INDEX_DISTANCE")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("INDEX_DISTANCE".to_string()))
                })
                .transpose()?
                .unwrap_or_default(),
            ollama_url: load_env_optional("OLLAMA_URL"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            http_timeout_secs: parse_optional("HTTP_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Fails when a variable is missing or invalid, or when configuration was already loaded.
pub fn init_config() -> Result<(), ConfigError> {
    dotenvy::dotenv().ok();
    let config = install(&CONFIG, Config::from_env()?)?;
    tracing::debug!(
        index_path = %config.index_path.display(),
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        generation_provider = ?config.generation_provider,
        generation_model = %config.generation_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(())
}

fn install(cell: &OnceLock<Config>, config: Config) -> Result<&Config, ConfigError> {
    cell.set(config).map_err(|_| ConfigError::AlreadyInitialized)?;
    cell.get().ok_or(ConfigError::AlreadyInitialized)
}
