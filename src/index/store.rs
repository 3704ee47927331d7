//! Durable storage for [`VectorIndex`] snapshots.
//!
//! A store is a directory holding one `index.json` file. Writes go to a temporary file in the
//! same directory which is then renamed over `index.json`, so a concurrent reader sees either
//! the previous snapshot or the new one and never a partial file. No locks are involved.
//!
//! # Trust
//!
//! Loading is only available through [`IndexStore::load_trusted`], and a store can only be
//! opened on a [`TrustedLocation`]. The stored chunk texts are pasted verbatim into language
//! model prompts and the file dictates allocation sizes, so a store planted by someone else can
//! inject instructions into answers or exhaust memory. Only point a store at a directory the
//! operator controls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task::spawn_blocking;
use uuid::Uuid;

use super::flat::VectorIndex;
use super::types::{Distance, IndexEntry, IndexError, IndexMetadata};

/// File name of the snapshot inside a store directory.
pub const INDEX_FILE_NAME: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

/// A storage location the operator vouches for.
///
/// Constructing one is an explicit statement that the directory is not writable by untrusted
/// parties; see the module docs for why that matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedLocation(PathBuf);

impl TrustedLocation {
    /// Mark `path` as trusted.
    pub fn assume_trusted(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Directory backing the store.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Handle to the single persisted index used by indexing and retrieval.
#[derive(Debug, Clone)]
pub struct IndexStore {
    location: TrustedLocation,
}

#[derive(Serialize)]
struct StoredIndexRef<'a> {
    format_version: u32,
    build_id: Uuid,
    built_at: &'a str,
    embedding_model: &'a str,
    dimension: usize,
    metric: Distance,
    checksum: String,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct StoredIndex {
    format_version: u32,
    build_id: Uuid,
    built_at: String,
    embedding_model: String,
    dimension: usize,
    metric: Distance,
    checksum: String,
    entries: Vec<IndexEntry>,
}

impl IndexStore {
    /// Open a store rooted at `location`. Nothing is read or created until used.
    pub fn new(location: TrustedLocation) -> Self {
        Self { location }
    }

    /// Directory backing the store.
    pub fn location(&self) -> &Path {
        self.location.path()
    }

    /// Path of the snapshot file.
    pub fn index_file(&self) -> PathBuf {
        self.location.path().join(INDEX_FILE_NAME)
    }

    /// Whether a snapshot currently exists.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(self.index_file())
            .await
            .unwrap_or(false)
    }

    /// Atomically replace the persisted snapshot with `index`.
    ///
    /// Intermediate directories are created as needed.
    pub async fn replace(&self, index: &VectorIndex) -> Result<(), IndexError> {
        let metadata = index.metadata();
        let stored = StoredIndexRef {
            format_version: FORMAT_VERSION,
            build_id: metadata.build_id,
            built_at: &metadata.built_at,
            embedding_model: &metadata.embedding_model,
            dimension: index.dimension(),
            metric: index.metric(),
            checksum: compute_checksum(index.dimension(), index.entries()),
            entries: index.entries(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        let directory = self.location.path().to_path_buf();
        let target = self.index_file();

        tracing::debug!(
            path = %target.display(),
            bytes = bytes.len(),
            entries = index.len(),
            "Persisting index"
        );
        spawn_blocking(move || write_atomically(&directory, &target, &bytes))
            .await
            .map_err(|error| IndexError::Task(error.to_string()))??;

        tracing::info!(
            path = %self.index_file().display(),
            build_id = %metadata.build_id,
            entries = index.len(),
            "Index replaced"
        );
        Ok(())
    }

    /// Load the persisted snapshot.
    ///
    /// Fails with [`IndexError::NotFound`] when nothing has been persisted. A snapshot that is
    /// unreadable or was built by another embedding model than `expected_model` is
    /// [`IndexError::Corrupt`]; one with vectors of another width than `expected_dimension` is
    /// [`IndexError::DimensionMismatch`].
    pub async fn load_trusted(
        &self,
        expected_dimension: usize,
        expected_model: &str,
    ) -> Result<VectorIndex, IndexError> {
        let path = self.index_file();
        let index = spawn_blocking(move || read_snapshot(&path))
            .await
            .map_err(|error| IndexError::Task(error.to_string()))??;

        let stored_model = &index.metadata().embedding_model;
        if stored_model != expected_model {
            return Err(IndexError::Corrupt {
                path: self.index_file(),
                reason: format!(
                    "built with embedding model {stored_model}, configured model is {expected_model}"
                ),
            });
        }
        if index.dimension() != expected_dimension {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: index.dimension(),
            });
        }

        tracing::debug!(
            path = %self.index_file().display(),
            build_id = %index.metadata().build_id,
            entries = index.len(),
            "Index loaded"
        );
        Ok(index)
    }
}

fn write_atomically(directory: &Path, target: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| IndexError::Io { path, source }
    };

    std::fs::create_dir_all(directory).map_err(io_error(directory))?;
    let mut staging = NamedTempFile::new_in(directory).map_err(io_error(directory))?;
    staging.write_all(bytes).map_err(io_error(staging.path()))?;
    staging
        .as_file()
        .sync_all()
        .map_err(io_error(staging.path()))?;
    staging.persist(target).map_err(|error| IndexError::Io {
        path: target.to_path_buf(),
        source: error.error,
    })?;
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<VectorIndex, IndexError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == IoErrorKind::NotFound => {
            return Err(IndexError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(IndexError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let corrupt = |reason: String| IndexError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let stored: StoredIndex = serde_json::from_slice(&bytes)
        .map_err(|error| corrupt(format!("unreadable snapshot: {error}")))?;

    if stored.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {}",
            stored.format_version
        )));
    }
    if stored.dimension == 0 || stored.entries.is_empty() {
        return Err(corrupt("snapshot holds no vectors".into()));
    }
    if compute_checksum(stored.dimension, &stored.entries) != stored.checksum {
        return Err(corrupt("checksum mismatch".into()));
    }

    VectorIndex::from_parts(
        IndexMetadata {
            build_id: stored.build_id,
            built_at: stored.built_at,
            embedding_model: stored.embedding_model,
        },
        stored.dimension,
        stored.metric,
        stored.entries,
    )
    .map_err(|error| corrupt(error.to_string()))
}

/// SHA-256 over the dimension, every text (length-prefixed), and every vector's bit pattern.
fn compute_checksum(dimension: usize, entries: &[IndexEntry]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((dimension as u64).to_le_bytes());
    for entry in entries {
        hasher.update((entry.text.len() as u64).to_le_bytes());
        hasher.update(entry.text.as_bytes());
        hasher.update((entry.vector.len() as u64).to_le_bytes());
        for value in &entry.vector {
            hasher.update(value.to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}
