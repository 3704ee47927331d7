//! Grounding prompt template and token accounting.

use std::sync::OnceLock;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Exact reply the model is instructed to give when the context lacks the answer.
pub const NOT_IN_CONTEXT: &str = "answer is not available in the context";

static ENCODING: OnceLock<Option<CoreBPE>> = OnceLock::new();

/// Render the grounding prompt for `question` over an already assembled `context`.
pub fn render(context: &str, question: &str) -> String {
    format!(
        "Answer the question as thoroughly as possible using only the context below, and \
         include every relevant detail it provides.\n\
         If the context does not contain the answer, reply exactly \"{NOT_IN_CONTEXT}\" and \
         nothing else. Never guess and never give an answer the context does not support.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:\n"
    )
}

/// Count prompt tokens with the `cl100k_base` encoding.
///
/// Falls back to a four-characters-per-token estimate when the encoding cannot be loaded.
pub fn count_tokens(text: &str) -> usize {
    let encoding = ENCODING.get_or_init(|| match cl100k_base() {
        Ok(encoding) => Some(encoding),
        Err(error) => {
            tracing::warn!(
                error = %error,
                "Tokenizer unavailable; estimating prompt size from character count"
            );
            None
        }
    });

    match encoding {
        Some(encoding) => encoding.encode_ordinary(text).len(),
        None => text.chars().count().div_ceil(4),
    }
}

/// Whether `answer` is the model's "not in context" reply, tolerating quotes, case, and a
/// trailing period.
pub fn is_not_in_context(answer: &str) -> bool {
    let normalized = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .trim();
    normalized.eq_ignore_ascii_case(NOT_IN_CONTEXT)
}
