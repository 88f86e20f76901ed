//! Channel retrievers: one per knowledge corpus, sharing one search contract.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use triage_index::{MetadataFilter, SimilarityIndex};

use crate::domain::{Channel, RetrievalResult};
use crate::error::{ChannelResult, RetrievalError};

/// Metadata attribute holding a code item's file path.
pub const FILE_PATH_FIELD: &str = "file_path";

/// Metadata attribute holding a case's comma-separated tags.
pub const TAGS_FIELD: &str = "tags";

/// Channel-specific narrowing of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFilter {
    /// Code channel: file path contains this substring.
    FilePath(String),
    /// Case channel: case carries at least one of these tags.
    Tags(Vec<String>),
}

/// Uniform search contract over one knowledge channel.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The channel this retriever serves; every result is tagged with it.
    fn channel(&self) -> Channel;

    /// Return up to `top_k` results for `query`, most similar first.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>>;
}

async fn query_channel(
    index: &dyn SimilarityIndex,
    channel: Channel,
    query: &str,
    top_k: usize,
    filter: Option<&MetadataFilter>,
) -> ChannelResult<Vec<RetrievalResult>> {
    let hits = index
        .query(channel.collection(), query, top_k, filter)
        .await?;
    debug!(channel = %channel, hits = hits.len(), "channel query");
    Ok(hits
        .into_iter()
        .map(|hit| RetrievalResult::from_hit(channel, hit))
        .collect())
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

/// Searches indexed source-code snippets.
#[derive(Clone)]
pub struct CodeRetriever {
    index: Arc<dyn SimilarityIndex>,
}

impl CodeRetriever {
    pub const DEFAULT_TOP_K: usize = 5;

    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    /// Look up code by file path, optionally narrowed by function name.
    pub async fn search_by_file(
        &self,
        file_path: &str,
        function_name: Option<&str>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        let query = match function_name {
            Some(function) => format!("{file_path} {function}"),
            None => file_path.to_string(),
        };
        let filter = ChannelFilter::FilePath(file_path.to_string());
        self.search(&query, Self::DEFAULT_TOP_K, Some(&filter)).await
    }
}

#[async_trait]
impl Retriever for CodeRetriever {
    fn channel(&self) -> Channel {
        Channel::Code
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        let where_clause = match filter {
            None => None,
            Some(ChannelFilter::FilePath(needle)) => {
                Some(MetadataFilter::contains(FILE_PATH_FIELD, needle))
            }
            Some(_) => {
                return Err(RetrievalError::UnsupportedFilter {
                    channel: Channel::Code,
                })
            }
        };
        query_channel(
            self.index.as_ref(),
            Channel::Code,
            query,
            top_k,
            where_clause.as_ref(),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Case
// ---------------------------------------------------------------------------

/// Searches resolved historical debugging cases.
#[derive(Clone)]
pub struct CaseRetriever {
    index: Arc<dyn SimilarityIndex>,
}

impl CaseRetriever {
    pub const DEFAULT_TOP_K: usize = 5;

    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for CaseRetriever {
    fn channel(&self) -> Channel {
        Channel::Case
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        let where_clause = match filter {
            None => None,
            Some(ChannelFilter::Tags(tags)) if tags.is_empty() => None,
            Some(ChannelFilter::Tags(tags)) => Some(MetadataFilter::any_tag(TAGS_FIELD, tags)),
            Some(_) => {
                return Err(RetrievalError::UnsupportedFilter {
                    channel: Channel::Case,
                })
            }
        };
        query_channel(
            self.index.as_ref(),
            Channel::Case,
            query,
            top_k,
            where_clause.as_ref(),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// LogPattern
// ---------------------------------------------------------------------------

/// Searches known log-error patterns.
#[derive(Clone)]
pub struct LogPatternRetriever {
    index: Arc<dyn SimilarityIndex>,
}

impl LogPatternRetriever {
    pub const DEFAULT_TOP_K: usize = 3;

    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for LogPatternRetriever {
    fn channel(&self) -> Channel {
        Channel::LogPattern
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        if filter.is_some() {
            return Err(RetrievalError::UnsupportedFilter {
                channel: Channel::LogPattern,
            });
        }
        query_channel(self.index.as_ref(), Channel::LogPattern, query, top_k, None).await
    }
}
