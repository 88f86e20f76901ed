//! Triage Core Library
//!
//! Turns a raw bug report into normalized debugging signals and retrieves
//! ranked knowledge (code, historical cases, log-error patterns) for it.
//!
//! - [`signal`]: stack-trace parsing, entity/keyword extraction, log correlation
//! - [`retrieval`]: per-channel retrievers and the hybrid fan-out/fusion engine

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod retrieval;
pub mod signal;
pub mod telemetry;

pub use config::{ChannelToggles, ChannelWeights, PreprocessConfig, RetrievalConfig, TriageConfig};

pub use domain::{
    BugContext, BugInput, BugSignal, Channel, EntityKind, ErrorInfo, ParsedStackTrace,
    RetrievalResult, StackFrame,
};

pub use error::{ChannelResult, Result, RetrievalError, TriageError};

pub use retrieval::{
    merge_and_rerank, CaseRetriever, ChannelFilter, ChannelQueries, CodeRetriever,
    HybridRetriever, LogPatternRetriever, Retriever, SearchRequest,
};

pub use signal::{EntityExtractor, LogAggregator, Preprocessor, StackParser};

pub use metrics::METRICS;
pub use obs::{
    emit_channel_failed, emit_channel_searched, emit_retrieval_merged, emit_signal_processed,
    RequestSpan,
};
pub use telemetry::{init_tracing, LogFormat};

pub use triage_index::{IndexError, SimilarityIndex};

/// Triage version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
