//! Retrieval channels and scored results.

use serde::{Deserialize, Serialize};

use triage_index::{IndexHit, Metadata};

/// One independent knowledge source.
///
/// Declaration order is the channel enumeration order used when fusing
/// results: code, case, log_pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Code,
    Case,
    LogPattern,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Code, Channel::Case, Channel::LogPattern];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Case => "case",
            Self::LogPattern => "log_pattern",
        }
    }

    /// Name of the index collection backing this channel.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Code => "code_snippets",
            Self::Case => "history_cases",
            Self::LogPattern => "log_patterns",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A knowledge item returned by a channel.
///
/// `score` is the raw similarity in `[0, 1]` as returned by the channel; after
/// fusion it holds the channel-weighted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub source: Channel,
    pub id: String,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RetrievalResult {
    pub fn new(source: Channel, id: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            source,
            id: id.into(),
            content: content.into(),
            score,
            metadata: Metadata::new(),
        }
    }

    /// Tag an index hit with its channel, converting distance to similarity.
    pub fn from_hit(source: Channel, hit: IndexHit) -> Self {
        let score = hit.similarity();
        Self {
            source,
            id: hit.id,
            content: hit.document,
            score,
            metadata: hit.metadata,
        }
    }
}
