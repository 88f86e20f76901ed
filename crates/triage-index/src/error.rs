//! Error types for triage-index

use thiserror::Error;

/// Errors that can occur while querying a similarity index
#[derive(Error, Debug)]
pub enum IndexError {
    /// The named collection does not exist in the backend
    #[error("collection not found: {collection}")]
    CollectionNotFound { collection: String },

    /// The backend failed (connection, timeout, internal error)
    #[error("index backend failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_not_found_display() {
        let err = IndexError::CollectionNotFound {
            collection: "history_cases".to_string(),
        };
        assert_eq!(err.to_string(), "collection not found: history_cases");
    }

    #[test]
    fn test_backend_error_display() {
        let err = IndexError::Backend("connection reset".to_string());
        assert!(err.to_string().contains("connection reset"));
    }
}
