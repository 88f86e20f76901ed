//! Triage-Index: similarity-index contract for bug triage retrieval
//!
//! This crate defines the boundary between the triage core and whatever
//! nearest-neighbour service holds the knowledge corpora (code snippets,
//! historical cases, known log-error patterns).
//!
//! ## Layer 0 - Knowledge Access
//!
//! Focus: a read-only, backend-agnostic query contract.
//!
//! ## Key Components
//!
//! - `SimilarityIndex`: async query/count contract over named collections
//! - `IndexHit`: one candidate item with its raw distance
//! - `MetadataFilter`: structured filters a backend must honour
//! - `fakes::MemorySimilarityIndex`: in-memory implementation for tests and local use

mod error;
pub mod fakes;
pub mod index;

pub use error::IndexError;
pub use index::{
    similarity_from_distance, IndexHit, IndexRecord, Metadata, MetadataFilter, SimilarityIndex,
    NEUTRAL_SIMILARITY,
};

/// Result type for index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;
