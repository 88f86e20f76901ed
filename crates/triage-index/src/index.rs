//! Similarity-index contract
//!
//! A `SimilarityIndex` answers "which stored items are closest to this text?"
//! for a named collection. Embedding, persistence, and nearest-neighbour
//! search all live behind this trait; callers only see ranked hits with a
//! non-negative distance.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::IndexResult;

/// Arbitrary item attributes stored alongside a document.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Similarity assigned when a backend returns a hit without a distance.
pub const NEUTRAL_SIMILARITY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Records and hits
// ---------------------------------------------------------------------------

/// An item stored in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    #[serde(alias = "content", alias = "pattern")]
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexRecord {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata attribute.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// One candidate returned by a similarity query, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Distance from the query (>= 0). `None` when the backend does not report one.
    pub distance: Option<f64>,
}

impl IndexHit {
    /// Similarity in `(0, 1]` derived from the distance.
    pub fn similarity(&self) -> f64 {
        self.distance
            .map(similarity_from_distance)
            .unwrap_or(NEUTRAL_SIMILARITY)
    }
}

/// Convert a non-negative distance into a similarity score: `1 / (1 + d)`.
///
/// Negative distances are clamped to zero. NaN carries no ranking information
/// and scores [`NEUTRAL_SIMILARITY`], same as a missing distance.
pub fn similarity_from_distance(distance: f64) -> f64 {
    if distance.is_nan() {
        return NEUTRAL_SIMILARITY;
    }
    1.0 / (1.0 + distance.max(0.0))
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Structured metadata filter a backend applies before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum MetadataFilter {
    /// String attribute `field` contains `needle` as a substring.
    Contains { field: String, needle: String },
    /// Tag attribute `field` shares at least one tag with `tags`.
    ///
    /// The attribute may be a comma-separated string or an array of strings.
    AnyTag { field: String, tags: Vec<String> },
}

impl MetadataFilter {
    pub fn contains(field: &str, needle: &str) -> Self {
        MetadataFilter::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }
    }

    pub fn any_tag(field: &str, tags: &[String]) -> Self {
        MetadataFilter::AnyTag {
            field: field.to_string(),
            tags: tags.to_vec(),
        }
    }

    /// Evaluate the filter against an item's metadata. Missing attributes never match.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            MetadataFilter::Contains { field, needle } => metadata
                .get(field)
                .and_then(|v| v.as_str())
                .map(|s| s.contains(needle.as_str()))
                .unwrap_or(false),
            MetadataFilter::AnyTag { field, tags } => {
                let stored: Vec<String> = match metadata.get(field) {
                    Some(serde_json::Value::String(s)) => {
                        s.split(',').map(|t| t.trim().to_string()).collect()
                    }
                    Some(serde_json::Value::Array(items)) => items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(|t| t.trim().to_string())
                        .collect(),
                    _ => return false,
                };
                stored
                    .iter()
                    .filter(|t| !t.is_empty())
                    .any(|t| tags.iter().any(|wanted| wanted.trim() == t))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SimilarityIndex
// ---------------------------------------------------------------------------

/// Read-only nearest-neighbour service over named collections.
///
/// Guarantees:
/// - `query` returns at most `n_results` hits, nearest first.
/// - When `filter` is given, every returned hit satisfies it.
/// - Implementations are safe to call concurrently from independent tasks.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Return up to `n_results` items of `collection` closest to `text`.
    async fn query(
        &self,
        collection: &str,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> IndexResult<Vec<IndexHit>>;

    /// Number of items stored in `collection`.
    async fn count(&self, collection: &str) -> IndexResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_from_distance() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.5);
        assert_eq!(similarity_from_distance(3.0), 0.25);
    }

    #[test]
    fn test_similarity_clamps_negative_distance() {
        assert_eq!(similarity_from_distance(-2.0), 1.0);
    }

    #[test]
    fn test_nan_distance_is_neutral_not_best() {
        assert_eq!(similarity_from_distance(f64::NAN), NEUTRAL_SIMILARITY);
        let hit = IndexHit {
            id: "broken".into(),
            document: "doc".into(),
            metadata: Metadata::new(),
            distance: Some(f64::NAN),
        };
        assert!(hit.similarity() < similarity_from_distance(0.5));
    }

    #[test]
    fn test_hit_without_distance_is_neutral() {
        let hit = IndexHit {
            id: "x".into(),
            document: "doc".into(),
            metadata: Metadata::new(),
            distance: None,
        };
        assert_eq!(hit.similarity(), NEUTRAL_SIMILARITY);
    }

    #[test]
    fn test_contains_filter() {
        let record = IndexRecord::new("c1", "fn main() {}").with_metadata("file_path", "src/api/routes.py");
        assert!(MetadataFilter::contains("file_path", "api/").matches(&record.metadata));
        assert!(!MetadataFilter::contains("file_path", "worker").matches(&record.metadata));
        assert!(!MetadataFilter::contains("missing", "api").matches(&record.metadata));
    }

    #[test]
    fn test_any_tag_filter_comma_string() {
        let record = IndexRecord::new("case-1", "redis timeout").with_metadata("tags", "redis, timeout,cache");
        let filter = MetadataFilter::any_tag("tags", &["timeout".to_string()]);
        assert!(filter.matches(&record.metadata));

        let filter = MetadataFilter::any_tag("tags", &["auth".to_string()]);
        assert!(!filter.matches(&record.metadata));
    }

    #[test]
    fn test_any_tag_filter_array() {
        let record = IndexRecord::new("case-2", "oom")
            .with_metadata("tags", serde_json::json!(["memory", "oom"]));
        let filter = MetadataFilter::any_tag("tags", &["oom".to_string()]);
        assert!(filter.matches(&record.metadata));
    }

    #[test]
    fn test_record_accepts_content_alias() {
        let record: IndexRecord =
            serde_json::from_str(r#"{"id": "p1", "content": "rate limit exceeded"}"#).unwrap();
        assert_eq!(record.document, "rate limit exceeded");
        assert!(record.metadata.is_empty());
    }
}
