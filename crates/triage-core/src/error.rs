//! Error taxonomy for the triage core.
//!
//! Signal extraction never fails; the only runtime errors are per-channel
//! retrieval failures and configuration problems at the process boundary.

use crate::domain::Channel;

/// Errors produced by a single retrieval channel.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("index error: {0}")]
    Index(#[from] triage_index::IndexError),

    #[error("channel {channel} does not support this filter")]
    UnsupportedFilter { channel: Channel },

    #[error("channel task failed: {0}")]
    Join(String),
}

/// Result type for a single channel search.
pub type ChannelResult<T> = std::result::Result<T, RetrievalError>;

/// Errors at the configuration and I/O boundary.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for triage boundary operations.
pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_filter_names_channel() {
        let err = RetrievalError::UnsupportedFilter {
            channel: Channel::LogPattern,
        };
        assert_eq!(
            err.to_string(),
            "channel log_pattern does not support this filter"
        );
    }

    #[test]
    fn test_index_error_converts() {
        let err: RetrievalError = triage_index::IndexError::Backend("down".to_string()).into();
        assert!(err.to_string().contains("index error"));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = TriageError::InvalidConfig("top_k must be > 0".to_string());
        assert!(err.to_string().contains("invalid config"));
    }
}
