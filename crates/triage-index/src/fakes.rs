//! In-memory similarity index (testing and local use)
//!
//! `MemorySimilarityIndex` satisfies the `SimilarityIndex` contract without an
//! embedding model. Distance is lexical: `1 - jaccard(query_tokens, doc_tokens)`
//! over lower-cased alphanumeric tokens, so results are deterministic.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::IndexError;
use crate::index::{IndexHit, IndexRecord, MetadataFilter, SimilarityIndex};
use crate::IndexResult;

/// In-memory index backed by a `HashMap<collection, Vec<IndexRecord>>`.
#[derive(Debug, Default)]
pub struct MemorySimilarityIndex {
    collections: Mutex<HashMap<String, Vec<IndexRecord>>>,
}

impl MemorySimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with the given (empty) collections.
    pub fn with_collections(names: &[&str]) -> Self {
        let index = Self::new();
        for name in names {
            index.create_collection(name);
        }
        index
    }

    /// Create an empty collection. No-op if it already exists.
    pub fn create_collection(&self, name: &str) {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collections.entry(name.to_string()).or_default();
    }

    /// Append records to a collection, creating it if needed.
    ///
    /// A record whose id already exists replaces the stored one in place.
    pub fn insert(&self, collection: &str, records: impl IntoIterator<Item = IndexRecord>) {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = collections.entry(collection.to_string()).or_default();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
    }
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn lexical_distance(query: &BTreeSet<String>, document: &BTreeSet<String>) -> f64 {
    let union = query.union(document).count();
    if union == 0 {
        return 1.0;
    }
    let shared = query.intersection(document).count();
    1.0 - shared as f64 / union as f64
}

#[async_trait]
impl SimilarityIndex for MemorySimilarityIndex {
    async fn query(
        &self,
        collection: &str,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> IndexResult<Vec<IndexHit>> {
        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let records = collections
            .get(collection)
            .ok_or_else(|| IndexError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let query_tokens = tokens(text);
        let mut hits: Vec<IndexHit> = records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| IndexHit {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: Some(lexical_distance(&query_tokens, &tokens(&r.document))),
            })
            .collect();

        // Stable: equal distances keep insertion order.
        hits.sort_by(|a, b| {
            let da = a.distance.unwrap_or(f64::MAX);
            let db = b.distance.unwrap_or(f64::MAX);
            da.total_cmp(&db)
        });
        hits.truncate(n_results);

        debug!(collection, hits = hits.len(), "memory index query");
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> IndexResult<usize> {
        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .get(collection)
            .map(Vec::len)
            .ok_or_else(|| IndexError::CollectionNotFound {
                collection: collection.to_string(),
            })
    }
}
