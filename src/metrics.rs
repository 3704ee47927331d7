use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indexing and answering activity.
#[derive(Default)]
pub struct DocsMetrics {
    batches_indexed: AtomicU64,
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    last_chunk_count: AtomicU64,
    questions_answered: AtomicU64,
    sentinel_answers: AtomicU64,
}

impl DocsMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed indexing batch.
    pub fn record_batch(&self, documents: u64, chunk_count: u64) {
        self.batches_indexed.fetch_add(1, Ordering::Relaxed);
        self.documents_indexed
            .fetch_add(documents, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record an answered question, noting whether the model reported missing context.
    pub fn record_answer(&self, not_in_context: bool) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        if not_in_context {
            self.sentinel_answers.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_indexed: self.batches_indexed.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            last_chunk_count: self.last_chunk_count.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            sentinel_answers: self.sentinel_answers.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Indexing batches completed since startup.
    pub batches_indexed: u64,
    /// Non-blank documents indexed since startup.
    pub documents_indexed: u64,
    /// Chunks embedded across all batches.
    pub chunks_indexed: u64,
    /// Chunk count of the most recent batch, which is the size of the live index.
    pub last_chunk_count: u64,
    /// Questions answered since startup.
    pub questions_answered: u64,
    /// Answers where the model reported the context lacked the answer.
    pub sentinel_answers: u64,
}
