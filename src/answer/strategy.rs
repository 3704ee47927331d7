use async_trait::async_trait;

use super::AnswerError;

/// Turns retrieved chunks into the text placed in the prompt's context slot.
///
/// Strategies may call out to other services (re-rankers, per-chunk summarizers), so the hook
/// is async and fallible.
#[async_trait]
pub trait ContextAssemblyStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Assemble the context for `question` from `chunks` (most similar first).
    async fn assemble(&self, question: &str, chunks: &[String]) -> Result<String, AnswerError>;
}

/// Concatenates every chunk verbatim, separated by a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuffStrategy;

#[async_trait]
impl ContextAssemblyStrategy for StuffStrategy {
    fn name(&self) -> &'static str {
        "stuff"
    }

    async fn assemble(&self, _question: &str, chunks: &[String]) -> Result<String, AnswerError> {
        Ok(chunks.join("\n\n"))
    }
}
