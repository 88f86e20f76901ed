//! Concurrent multi-channel search with isolated per-channel outcomes.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{instrument, warn};

use triage_index::SimilarityIndex;

use crate::config::{ChannelToggles, ChannelWeights, RetrievalConfig};
use crate::domain::{BugInput, BugSignal, Channel, RetrievalResult};
use crate::error::{ChannelResult, RetrievalError};
use crate::metrics::METRICS;
use crate::obs::{emit_channel_failed, emit_channel_searched};

use super::channel::{CaseRetriever, CodeRetriever, LogPatternRetriever, Retriever};
use super::fusion;

/// Inputs to one hybrid search.
///
/// `top_k` and `channels` fall back to the retriever's configuration when unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    pub top_k: Option<usize>,
    pub channels: Option<ChannelToggles>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Request for a preprocessed bug: the signal's search query plus the
    /// bug's error message and raw stack trace.
    pub fn for_bug(bug: &BugInput, signal: &BugSignal) -> Self {
        let mut request = Self::new(signal.search_query(bug))
            .with_error_message(bug.error.error_message.clone());
        if let Some(stack) = bug.stack_trace() {
            request = request.with_stack_trace(stack);
        }
        request
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_channels(mut self, channels: ChannelToggles) -> Self {
        self.channels = Some(channels);
        self
    }
}

/// Query text sent to each channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelQueries {
    pub code: String,
    pub case: String,
    pub log_pattern: String,
}

impl ChannelQueries {
    /// Code: error message (or query) plus the leading `code_stack_chars` of
    /// the stack trace. Case: the query. Log pattern: error message (or query).
    ///
    /// Empty strings count as absent.
    pub fn build(request: &SearchRequest, code_stack_chars: usize) -> Self {
        let primary = request
            .error_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&request.query);

        let code = match request.stack_trace.as_deref().filter(|s| !s.is_empty()) {
            Some(stack) => {
                let head: String = stack.chars().take(code_stack_chars).collect();
                format!("{primary} {head}")
            }
            None => primary.to_string(),
        };

        Self {
            code,
            case: request.query.clone(),
            log_pattern: primary.to_string(),
        }
    }

    pub fn get(&self, channel: Channel) -> &str {
        match channel {
            Channel::Code => &self.code,
            Channel::Case => &self.case,
            Channel::LogPattern => &self.log_pattern,
        }
    }
}

/// Fans a request out to the enabled channels and fuses their results.
#[derive(Clone)]
pub struct HybridRetriever {
    index: Arc<dyn SimilarityIndex>,
    code: Arc<dyn Retriever>,
    case: Arc<dyn Retriever>,
    log_pattern: Arc<dyn Retriever>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self::with_config(index, &RetrievalConfig::default())
    }

    pub fn with_config(index: Arc<dyn SimilarityIndex>, config: &RetrievalConfig) -> Self {
        Self {
            code: Arc::new(CodeRetriever::new(Arc::clone(&index))),
            case: Arc::new(CaseRetriever::new(Arc::clone(&index))),
            log_pattern: Arc::new(LogPatternRetriever::new(Arc::clone(&index))),
            index,
            config: config.clone(),
        }
    }

    /// Replace the retriever serving `retriever.channel()`.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        match retriever.channel() {
            Channel::Code => self.code = retriever,
            Channel::Case => self.case = retriever,
            Channel::LogPattern => self.log_pattern = retriever,
        }
        self
    }

    pub fn weights(&self) -> &ChannelWeights {
        &self.config.weights
    }

    pub fn retriever(&self, channel: Channel) -> Arc<dyn Retriever> {
        match channel {
            Channel::Code => Arc::clone(&self.code),
            Channel::Case => Arc::clone(&self.case),
            Channel::LogPattern => Arc::clone(&self.log_pattern),
        }
    }

    pub fn channel_queries(&self, request: &SearchRequest) -> ChannelQueries {
        ChannelQueries::build(request, self.config.code_stack_chars)
    }

    /// Search every enabled channel concurrently.
    ///
    /// Each channel runs as its own task and results are collected as tasks
    /// finish. A channel that errors or panics contributes an empty list;
    /// disabled channels are absent from the map. Dropping the returned future
    /// aborts any channel still running.
    #[instrument(skip_all, fields(query_len = request.query.len()))]
    pub async fn search(&self, request: &SearchRequest) -> BTreeMap<Channel, Vec<RetrievalResult>> {
        let top_k = request.top_k.unwrap_or(self.config.top_k);
        let toggles = request.channels.unwrap_or(self.config.channels);
        let queries = self.channel_queries(request);

        let mut results: BTreeMap<Channel, Vec<RetrievalResult>> =
            toggles.enabled().into_iter().map(|c| (c, Vec::new())).collect();

        let mut tasks = JoinSet::new();
        for channel in toggles.enabled() {
            let retriever = self.retriever(channel);
            let query = queries.get(channel).to_string();
            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(retriever.search(&query, top_k, None))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(RetrievalError::Join(format!("{channel} search panicked")))
                    });
                (channel, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (channel, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "channel task did not complete");
                    continue;
                }
            };
            METRICS.inc_channel_searches();
            match outcome {
                Ok(items) => {
                    emit_channel_searched(channel, items.len());
                    results.insert(channel, items);
                }
                Err(e) => {
                    METRICS.inc_channel_failures();
                    emit_channel_failed(channel, &e);
                }
            }
        }
        results
    }

    /// Fuse per-channel results with this retriever's weights.
    pub fn merge_and_rerank(
        &self,
        results: BTreeMap<Channel, Vec<RetrievalResult>>,
        top_k: usize,
    ) -> Vec<RetrievalResult> {
        fusion::merge_and_rerank(
            results,
            &self.config.weights,
            top_k,
            self.config.dedup_prefix_chars,
        )
    }

    /// [`search`](Self::search) then [`merge_and_rerank`](Self::merge_and_rerank)
    /// with the same `top_k`.
    pub async fn retrieve(&self, request: &SearchRequest) -> Vec<RetrievalResult> {
        let top_k = request.top_k.unwrap_or(self.config.top_k);
        let results = self.search(request).await;
        self.merge_and_rerank(results, top_k)
    }

    /// Item count of each channel's backing collection.
    pub async fn stats(&self) -> ChannelResult<BTreeMap<Channel, usize>> {
        let mut counts = BTreeMap::new();
        for channel in Channel::ALL {
            counts.insert(channel, self.index.count(channel.collection()).await?);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_query_appends_stack_head() {
        let request = SearchRequest::new("q")
            .with_error_message("boom")
            .with_stack_trace("a".repeat(600));
        let queries = ChannelQueries::build(&request, 500);
        assert_eq!(queries.code, format!("boom {}", "a".repeat(500)));
        assert_eq!(queries.case, "q");
        assert_eq!(queries.log_pattern, "boom");
    }

    #[test]
    fn test_queries_fall_back_to_query() {
        let request = SearchRequest::new("redis timeout").with_error_message("");
        let queries = ChannelQueries::build(&request, 500);
        assert_eq!(queries.code, "redis timeout");
        assert_eq!(queries.log_pattern, "redis timeout");
        assert_eq!(queries.get(Channel::Case), "redis timeout");
    }

    #[test]
    fn test_empty_stack_is_absent() {
        let request = SearchRequest::new("q").with_stack_trace("");
        assert_eq!(ChannelQueries::build(&request, 500).code, "q");
    }

    #[test]
    fn test_request_for_bug() {
        let bug = BugInput::new("Redis timeout")
            .with_stack_trace("ValueError: x")
            .with_description("checkout hangs");
        let signal = BugSignal::default();
        let request = SearchRequest::for_bug(&bug, &signal);
        assert_eq!(request.error_message.as_deref(), Some("Redis timeout"));
        assert_eq!(request.stack_trace.as_deref(), Some("ValueError: x"));
        assert!(request.query.contains("checkout hangs"));
        assert!(request.top_k.is_none());
    }
}
