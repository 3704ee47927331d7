//! Exact (brute-force) nearest-neighbour index.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::cmp::Ordering;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{BuildOptions, Distance, IndexEntry, IndexError, IndexMetadata, SearchMatch};

/// In-memory searchable collection of (chunk text, embedding) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    dimension: usize,
    metric: Distance,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk (order preserved) and assemble an index.
    ///
    /// All-or-nothing: any failed embedding request, a wrong vector count, inconsistent
    /// dimensions, or non-finite components abort the build.
    pub async fn build<E>(
        chunks: Vec<String>,
        embedder: &E,
        options: &BuildOptions,
    ) -> Result<Self, IndexError>
    where
        E: EmbeddingClient + Sync + ?Sized,
    {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }

        let batch_size = options.batch_size.max(1);
        let batches: Vec<Vec<String>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        tracing::debug!(
            chunks = chunks.len(),
            batches = batches.len(),
            concurrency = options.concurrency,
            "Embedding chunks"
        );

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|batch| embedder.generate_embeddings(batch))
            .buffered(options.concurrency.max(1))
            .try_collect()
            .await?;
        let vectors: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();

        if vectors.len() != chunks.len() {
            return Err(invalid_embeddings(format!(
                "expected {} vectors, received {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = options
            .expected_dimension
            .unwrap_or_else(|| vectors[0].len());
        if dimension == 0 {
            return Err(invalid_embeddings("embedding dimension is zero".into()));
        }
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(invalid_embeddings(format!(
                    "vector {position} has dimension {}, expected {dimension}",
                    vector.len()
                )));
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(invalid_embeddings(format!(
                    "vector {position} contains non-finite components"
                )));
            }
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| IndexEntry { text, vector })
            .collect();

        Ok(Self {
            metadata: IndexMetadata {
                build_id: Uuid::new_v4(),
                built_at: current_timestamp_rfc3339(),
                embedding_model: options.embedding_model.clone(),
            },
            dimension,
            metric: options.metric,
            entries,
        })
    }

    /// Reassemble an index from stored parts, validating every vector's dimension.
    pub(crate) fn from_parts(
        metadata: IndexMetadata,
        dimension: usize,
        metric: Distance,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, IndexError> {
        if let Some(entry) = entries.iter().find(|entry| entry.vector.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: entry.vector.len(),
            });
        }
        Ok(Self {
            metadata,
            dimension,
            metric,
            entries,
        })
    }

    /// Return up to `k` entries ordered by ascending distance to `query`.
    ///
    /// Ties keep insertion order so identical inputs always produce identical rankings.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchMatch>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidSearchLimit);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, self.metric.between(query, &entry.vector)))
            .collect();

        let by_distance =
            |a: &(usize, f32), b: &(usize, f32)| -> Ordering { a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)) };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| SearchMatch {
                text: self.entries[position].text.clone(),
                distance,
            })
            .collect())
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every stored vector.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Metric used for search.
    pub const fn metric(&self) -> Distance {
        self.metric
    }

    /// Build provenance.
    pub const fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

fn invalid_embeddings(message: String) -> IndexError {
    IndexError::Embedding(EmbeddingClientError::InvalidResponse(message))
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Embeds text via a fixed lookup table and counts requests.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
            Self {
                table: pairs
                    .iter()
                    .map(|(text, vector)| (text.to_string(), vector.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for TableEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            texts
                .iter()
                .map(|text| {
                    self.table.get(text).cloned().ok_or_else(|| {
                        EmbeddingClientError::GenerationFailed(format!("unknown text {text}"))
                    })
                })
                .collect()
        }
    }

    fn points() -> Vec<(&'static str, Vec<f32>)> {
        vec![
            ("origin", vec![0.0, 0.0]),
            ("east", vec![1.0, 0.0]),
            ("far east", vec![5.0, 0.0]),
            ("north", vec![0.0, 2.0]),
        ]
    }

    async fn build(options: &BuildOptions) -> VectorIndex {
        let pairs = points();
        let embedder = TableEmbedder::new(&pairs);
        let chunks = pairs.iter().map(|(text, _)| text.to_string()).collect();
        VectorIndex::build(chunks, &embedder, options)
            .await
            .expect("index builds")
    }

    #[tokio::test]
    async fn build_preserves_order_across_batches() {
        let pairs = points();
        let embedder = TableEmbedder::new(&pairs);
        let options = BuildOptions {
            batch_size: 1,
            concurrency: 3,
            ..BuildOptions::new("table")
        };
        let chunks: Vec<String> = pairs.iter().map(|(text, _)| text.to_string()).collect();

        let index = VectorIndex::build(chunks.clone(), &embedder, &options)
            .await
            .expect("index builds");

        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 4);
        let stored: Vec<&str> = index.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(stored, chunks);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.metadata().embedding_model, "table");
    }

    #[tokio::test]
    async fn build_aborts_when_any_embedding_fails() {
        let embedder = TableEmbedder::new(&[("known", vec![1.0])]);
        let error = VectorIndex::build(
            vec!["known".into(), "unknown".into()],
            &embedder,
            &BuildOptions::new("table"),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            error,
            IndexError::Embedding(EmbeddingClientError::GenerationFailed(_))
        ));
    }

    #[tokio::test]
    async fn build_rejects_inconsistent_or_unexpected_dimensions() {
        let embedder = TableEmbedder::new(&[("a", vec![1.0, 0.0]), ("b", vec![1.0])]);
        let error = VectorIndex::build(
            vec!["a".into(), "b".into()],
            &embedder,
            &BuildOptions::new("table"),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, IndexError::Embedding(_)));

        let options = BuildOptions {
            expected_dimension: Some(3),
            ..BuildOptions::new("table")
        };
        let error = VectorIndex::build(vec!["a".into()], &embedder, &options)
            .await
            .unwrap_err();
        assert!(matches!(error, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn build_rejects_empty_and_non_finite_input() {
        let embedder = TableEmbedder::new(&[("nan", vec![f32::NAN, 0.0])]);
        let options = BuildOptions::new("table");
        assert!(matches!(
            VectorIndex::build(Vec::new(), &embedder, &options).await,
            Err(IndexError::Empty)
        ));
        assert!(matches!(
            VectorIndex::build(vec!["nan".into()], &embedder, &options).await,
            Err(IndexError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn search_orders_by_ascending_distance() {
        let index = build(&BuildOptions::new("table")).await;
        let hits = index.search(&[0.9, 0.1], 3).expect("search");

        let texts: Vec<&str> = hits.iter().map(|hit| hit.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "origin", "north"]);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    }

    #[tokio::test]
    async fn search_never_exceeds_k_or_index_size() {
        let index = build(&BuildOptions::new("table")).await;
        for k in 1..=6 {
            let hits = index.search(&[0.0, 0.0], k).expect("search");
            assert_eq!(hits.len(), k.min(index.len()));
            assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        }
    }

    #[tokio::test]
    async fn search_validates_limit_and_query_dimension() {
        let index = build(&BuildOptions::new("table")).await;
        assert!(matches!(
            index.search(&[0.0, 0.0], 0),
            Err(IndexError::InvalidSearchLimit)
        ));
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 2),
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn cosine_metric_ignores_magnitude() {
        let options = BuildOptions {
            metric: Distance::Cosine,
            ..BuildOptions::new("table")
        };
        let index = build(&options).await;
        let hits = index.search(&[10.0, 0.0], 2).expect("search");
        assert!(hits[0].distance.abs() < 1e-6);
        assert!(hits[1].distance.abs() < 1e-6);
        let mut texts: Vec<&str> = hits.iter().map(|hit| hit.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["east", "far east"]);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let embedder = TableEmbedder::new(&[("left", vec![-1.0]), ("right", vec![1.0])]);
        let index = VectorIndex::build(
            vec!["left".into(), "right".into()],
            &embedder,
            &BuildOptions::new("table"),
        )
        .await
        .expect("index builds");
        let hits = index.search(&[0.0], 1).expect("search");
        assert_eq!(hits[0].text, "left");
    }
}
