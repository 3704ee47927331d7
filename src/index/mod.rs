//! Local vector index: exact nearest-neighbour search plus atomic on-disk snapshots.

pub mod flat;
pub mod store;
pub mod types;

pub use flat::VectorIndex;
pub use store::{INDEX_FILE_NAME, IndexStore, TrustedLocation};
pub use types::{BuildOptions, Distance, IndexEntry, IndexError, IndexMetadata, SearchMatch};
