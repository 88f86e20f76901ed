//! Multi-channel knowledge retrieval.
//!
//! - [`channel`]: Code, Case and LogPattern retrievers over the similarity index
//! - [`hybrid`]: concurrent fan-out across enabled channels
//! - [`fusion`]: weighted merge, dedup and rerank

pub mod channel;
pub mod fusion;
pub mod hybrid;

pub use channel::{
    CaseRetriever, ChannelFilter, CodeRetriever, LogPatternRetriever, Retriever, FILE_PATH_FIELD,
    TAGS_FIELD,
};
pub use fusion::merge_and_rerank;
pub use hybrid::{ChannelQueries, HybridRetriever, SearchRequest};
