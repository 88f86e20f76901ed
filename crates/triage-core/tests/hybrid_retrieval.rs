use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;

use triage_core::retrieval::FILE_PATH_FIELD;
use triage_core::{
    Channel, ChannelFilter, ChannelResult, ChannelToggles, CodeRetriever, HybridRetriever,
    LogPatternRetriever, RetrievalConfig, RetrievalResult, Retriever, SearchRequest, METRICS,
};
use triage_index::fakes::MemorySimilarityIndex;
use triage_index::{IndexError, IndexHit, IndexRecord, IndexResult, MetadataFilter, SimilarityIndex};

fn knowledge() -> MemorySimilarityIndex {
    let index =
        MemorySimilarityIndex::with_collections(&["code_snippets", "history_cases", "log_patterns"]);
    index.insert(
        "code_snippets",
        [
            IndexRecord::new(
                "code-redis",
                "def get_client(): return redis.Redis(host=HOST, socket_timeout=5)",
            )
            .with_metadata(FILE_PATH_FIELD, "app/cache/client.py"),
            IndexRecord::new("code-llm", "async def complete(prompt): return await llm.generate(prompt)")
                .with_metadata(FILE_PATH_FIELD, "app/api/completion.py"),
        ],
    );
    index.insert(
        "history_cases",
        [
            IndexRecord::new(
                "case-redis",
                "Redis timeout under load: connection pool exhausted, raised pool size",
            )
            .with_metadata("tags", "redis,timeout"),
            IndexRecord::new("case-auth", "Token expired causing auth failed errors")
                .with_metadata("tags", "auth"),
        ],
    );
    index.insert("log_patterns", [IndexRecord::new("REDIS_TIMEOUT", "redis timeout")]);
    index
}

/// Delegates to an in-memory index but fails every call for one collection.
struct FailingIndex {
    inner: MemorySimilarityIndex,
    broken: &'static str,
}

#[async_trait]
impl SimilarityIndex for FailingIndex {
    async fn query(
        &self,
        collection: &str,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> IndexResult<Vec<IndexHit>> {
        if collection == self.broken {
            return Err(IndexError::Backend(format!("{collection} offline")));
        }
        self.inner.query(collection, text, n_results, filter).await
    }

    async fn count(&self, collection: &str) -> IndexResult<usize> {
        if collection == self.broken {
            return Err(IndexError::Backend(format!("{collection} offline")));
        }
        self.inner.count(collection).await
    }
}

struct PanickingRetriever(Channel);

#[async_trait]
impl Retriever for PanickingRetriever {
    fn channel(&self) -> Channel {
        self.0
    }

    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        panic!("{} channel crashed", self.0);
    }
}

/// Sleeps before answering and records whether it ever finished.
struct SlowRetriever {
    channel: Channel,
    delay: Duration,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl Retriever for SlowRetriever {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Waits for `gate` before delegating; the code channel cannot finish first.
struct GatedRetriever {
    inner: CodeRetriever,
    gate: Arc<Notify>,
}

#[async_trait]
impl Retriever for GatedRetriever {
    fn channel(&self) -> Channel {
        self.inner.channel()
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        self.gate.notified().await;
        self.inner.search(query, top_k, filter).await
    }
}

/// Opens `gate` once its own search is done.
struct OpeningRetriever {
    inner: LogPatternRetriever,
    gate: Arc<Notify>,
}

#[async_trait]
impl Retriever for OpeningRetriever {
    fn channel(&self) -> Channel {
        self.inner.channel()
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&ChannelFilter>,
    ) -> ChannelResult<Vec<RetrievalResult>> {
        let results = self.inner.search(query, top_k, filter).await;
        self.gate.notify_one();
        results
    }
}

fn request() -> SearchRequest {
    SearchRequest::new("redis timeout under load")
        .with_error_message("redis timeout")
        .with_stack_trace("File \"app/cache/client.py\", line 42, in get_client")
}

// ---- Fan-out ----

#[tokio::test]
async fn search_returns_every_enabled_channel() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let results = retriever.search(&request()).await;

    assert_eq!(results.keys().copied().collect::<Vec<_>>(), Channel::ALL.to_vec());
    assert_eq!(results[&Channel::Code].len(), 2);
    assert_eq!(results[&Channel::Case].len(), 2);
    assert_eq!(results[&Channel::LogPattern].len(), 1);

    for (channel, items) in &results {
        assert!(items.iter().all(|r| r.source == *channel));
    }
    assert_eq!(results[&Channel::Case][0].id, "case-redis");
    assert_eq!(results[&Channel::LogPattern][0].score, 1.0);
}

#[tokio::test]
async fn search_respects_per_channel_top_k() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let results = retriever.search(&request().with_top_k(1)).await;
    assert!(results.values().all(|items| items.len() <= 1));
}

#[tokio::test]
async fn disabled_channels_are_absent() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let toggles = ChannelToggles::default().with(Channel::Code, false);
    let results = retriever.search(&request().with_channels(toggles)).await;
    assert_eq!(
        results.keys().copied().collect::<Vec<_>>(),
        vec![Channel::Case, Channel::LogPattern]
    );

    let results = retriever
        .search(&request().with_channels(ChannelToggles::none()))
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn config_toggles_apply_when_request_is_silent() {
    let config = RetrievalConfig {
        channels: ChannelToggles::only(Channel::LogPattern),
        ..RetrievalConfig::default()
    };
    let retriever = HybridRetriever::with_config(Arc::new(knowledge()), &config);
    let results = retriever.search(&request()).await;
    assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![Channel::LogPattern]);
}

// ---- Failure isolation ----

#[tokio::test]
async fn failing_channel_yields_empty_list_and_others_are_untouched() {
    let healthy = HybridRetriever::new(Arc::new(knowledge()));
    let expected = healthy.search(&request()).await;

    let failures_before = METRICS.channel_failures();
    let degraded = HybridRetriever::new(Arc::new(FailingIndex {
        inner: knowledge(),
        broken: "history_cases",
    }));
    let results = degraded.search(&request()).await;

    assert_eq!(results.len(), 3);
    assert!(results[&Channel::Case].is_empty());
    assert!(!results[&Channel::Code].is_empty());
    assert_eq!(results[&Channel::Code], expected[&Channel::Code]);
    assert_eq!(results[&Channel::LogPattern], expected[&Channel::LogPattern]);
    assert!(METRICS.channel_failures() > failures_before);
}

#[tokio::test]
async fn panicking_channel_is_isolated() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()))
        .with_retriever(Arc::new(PanickingRetriever(Channel::Code)));
    let results = retriever.search(&request()).await;

    assert!(results[&Channel::Code].is_empty());
    assert_eq!(results[&Channel::Case].len(), 2);
    assert_eq!(results[&Channel::LogPattern].len(), 1);
}

#[tokio::test]
async fn all_channels_failing_yields_empty_retrieve() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()))
        .with_retriever(Arc::new(PanickingRetriever(Channel::Code)))
        .with_retriever(Arc::new(PanickingRetriever(Channel::Case)))
        .with_retriever(Arc::new(PanickingRetriever(Channel::LogPattern)));
    assert!(retriever.retrieve(&request()).await.is_empty());
}

// ---- Concurrency and cancellation ----

#[tokio::test]
async fn slow_channel_does_not_hold_back_others() {
    let index: Arc<dyn SimilarityIndex> = Arc::new(knowledge());
    let gate = Arc::new(Notify::new());
    let retriever = HybridRetriever::new(Arc::clone(&index))
        .with_retriever(Arc::new(GatedRetriever {
            inner: CodeRetriever::new(Arc::clone(&index)),
            gate: Arc::clone(&gate),
        }))
        .with_retriever(Arc::new(OpeningRetriever {
            inner: LogPatternRetriever::new(index),
            gate,
        }));

    let results = timeout(Duration::from_secs(1), retriever.search(&request()))
        .await
        .expect("channels run concurrently");

    assert_eq!(results[&Channel::Code].len(), 2);
    assert_eq!(results[&Channel::Case].len(), 2);
    assert_eq!(results[&Channel::LogPattern].len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_retrieve_aborts_running_channels() {
    let finished = Arc::new(AtomicBool::new(false));
    let retriever = HybridRetriever::new(Arc::new(knowledge())).with_retriever(Arc::new(
        SlowRetriever {
            channel: Channel::Case,
            delay: Duration::from_millis(200),
            finished: Arc::clone(&finished),
        },
    ));

    let outcome = timeout(Duration::from_millis(20), retriever.retrieve(&request())).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn completed_slow_channel_is_collected() {
    let finished = Arc::new(AtomicBool::new(false));
    let retriever = HybridRetriever::new(Arc::new(knowledge())).with_retriever(Arc::new(
        SlowRetriever {
            channel: Channel::Case,
            delay: Duration::from_millis(200),
            finished: Arc::clone(&finished),
        },
    ));

    let results = retriever.search(&request()).await;
    assert!(finished.load(Ordering::SeqCst));
    assert!(results[&Channel::Case].is_empty());
    assert_eq!(results[&Channel::Code].len(), 2);
}

// ---- Retriever replacement ----

#[tokio::test]
async fn replacement_retriever_fills_its_own_channel_slot() {
    let alternate = MemorySimilarityIndex::with_collections(&["code_snippets"]);
    alternate.insert(
        "code_snippets",
        [IndexRecord::new("code-alt", "redis timeout retry wrapper")],
    );
    let retriever = HybridRetriever::new(Arc::new(knowledge()))
        .with_retriever(Arc::new(CodeRetriever::new(Arc::new(alternate))));

    let searched = retriever.search(&request()).await;
    for (channel, items) in &searched {
        assert!(items.iter().all(|r| r.source == *channel));
    }
    let code_ids: Vec<&str> = searched[&Channel::Code].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(code_ids, vec!["code-alt"]);
    assert_eq!(searched[&Channel::Case][0].id, "case-redis");

    let merged = retriever.merge_and_rerank(searched.clone(), 10);
    for result in &merged {
        let raw = searched[&result.source]
            .iter()
            .find(|r| r.id == result.id)
            .expect("merged result comes from its source channel");
        let expected = raw.score * retriever.weights().get(result.source);
        assert!((result.score - expected).abs() < 1e-12);
    }
}

// ---- Query construction ----

#[tokio::test]
async fn channel_queries_use_error_message_and_stack() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let queries = retriever.channel_queries(&request());
    assert_eq!(
        queries.code,
        "redis timeout File \"app/cache/client.py\", line 42, in get_client"
    );
    assert_eq!(queries.case, "redis timeout under load");
    assert_eq!(queries.log_pattern, "redis timeout");
}

#[tokio::test]
async fn code_stack_chars_limits_code_query() {
    let config = RetrievalConfig {
        code_stack_chars: 4,
        ..RetrievalConfig::default()
    };
    let retriever = HybridRetriever::with_config(Arc::new(knowledge()), &config);
    assert_eq!(retriever.channel_queries(&request()).code, "redis timeout File");
}

// ---- Retrieve ----

#[tokio::test]
async fn retrieve_is_search_then_merge() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let req = request().with_top_k(3);

    let searched = retriever.search(&req).await;
    let expected = retriever.merge_and_rerank(searched, 3);
    let retrieved = retriever.retrieve(&req).await;

    assert_eq!(retrieved, expected);
    assert_eq!(retrieved.len(), 3);
    assert_eq!(retrieved[0].id, "case-redis");
}

#[tokio::test]
async fn retrieve_applies_configured_weights() {
    let config = RetrievalConfig {
        weights: triage_core::ChannelWeights {
            code: 0.0,
            case: 0.0,
            log_pattern: 1.0,
        },
        ..RetrievalConfig::default()
    };
    let retriever = HybridRetriever::with_config(Arc::new(knowledge()), &config);
    let results = retriever.retrieve(&request()).await;
    assert_eq!(results[0].id, "REDIS_TIMEOUT");
    assert_eq!(results[0].score, 1.0);
    assert!(results[1..].iter().all(|r| r.score == 0.0));
}

// ---- Direct channel access ----

#[tokio::test]
async fn code_lookup_by_file() {
    let code = CodeRetriever::new(Arc::new(knowledge()));
    let hits = code.search_by_file("completion.py", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "code-llm");
}

// ---- Stats ----

#[tokio::test]
async fn stats_counts_each_collection() {
    let retriever = HybridRetriever::new(Arc::new(knowledge()));
    let stats = retriever.stats().await.unwrap();
    let expected: BTreeMap<Channel, usize> =
        [(Channel::Code, 2), (Channel::Case, 2), (Channel::LogPattern, 1)].into();
    assert_eq!(stats, expected);
}

#[tokio::test]
async fn stats_reports_index_errors() {
    let retriever = HybridRetriever::new(Arc::new(FailingIndex {
        inner: knowledge(),
        broken: "log_patterns",
    }));
    assert!(retriever.stats().await.is_err());
}
