//! Grounded answer synthesis over retrieved chunks.

use crate::error::ErrorKind;
use crate::generation::{GenerationClientError, GenerationRequest, SharedGenerationClient};
use std::sync::Arc;
use thiserror::Error;

mod prompt;
mod strategy;

pub use prompt::{NOT_IN_CONTEXT, count_tokens, is_not_in_context, render as render_prompt};
pub use strategy::{ContextAssemblyStrategy, StuffStrategy};

/// Default sampling temperature for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default prompt budget in tokens.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 30_720;

/// Errors raised while producing an answer.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Assembled prompt exceeds the model's input budget.
    #[error("Prompt needs {tokens} tokens but the model accepts at most {limit}")]
    ContextTooLarge {
        /// Tokens counted in the rendered prompt.
        tokens: usize,
        /// Configured input budget.
        limit: usize,
    },
    /// Language model call failed.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
}

impl AnswerError {
    /// Caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContextTooLarge { .. } => ErrorKind::ContextTooLarge,
            Self::Generation(error) => error.kind(),
        }
    }
}

/// Model settings used for every answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    /// Generation model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Largest prompt, in tokens, sent to the model.
    pub max_input_tokens: usize,
}

impl SynthesisSettings {
    /// Settings for `model` with default temperature and budget.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
        }
    }
}

/// Produces answers constrained to the supplied context.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    client: SharedGenerationClient,
    strategy: Arc<dyn ContextAssemblyStrategy>,
    settings: SynthesisSettings,
}

impl AnswerSynthesizer {
    /// Synthesizer that stuffs every retrieved chunk into one prompt.
    pub fn new(client: SharedGenerationClient, settings: SynthesisSettings) -> Self {
        Self::with_strategy(client, Arc::new(StuffStrategy), settings)
    }

    /// Synthesizer using a custom context assembly strategy.
    pub fn with_strategy(
        client: SharedGenerationClient,
        strategy: Arc<dyn ContextAssemblyStrategy>,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            client,
            strategy,
            settings,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Answer `question` from `chunks`, returning the model output unmodified.
    ///
    /// Empty `chunks` still reach the model; the prompt instructs it to reply with
    /// [`NOT_IN_CONTEXT`].
    pub async fn answer(&self, question: &str, chunks: &[String]) -> Result<String, AnswerError> {
        let context = self.strategy.assemble(question, chunks).await?;
        let prompt = prompt::render(&context, question);

        let tokens = prompt::count_tokens(&prompt);
        if tokens > self.settings.max_input_tokens {
            tracing::warn!(
                tokens,
                limit = self.settings.max_input_tokens,
                chunks = chunks.len(),
                "Prompt exceeds model input budget"
            );
            return Err(AnswerError::ContextTooLarge {
                tokens,
                limit: self.settings.max_input_tokens,
            });
        }

        tracing::debug!(
            strategy = self.strategy.name(),
            model = %self.settings.model,
            chunks = chunks.len(),
            tokens,
            "Requesting answer"
        );

        let answer = self
            .client
            .generate(GenerationRequest {
                model: self.settings.model.clone(),
                prompt,
                temperature: self.settings.temperature,
            })
            .await?;
        Ok(answer)
    }
}
