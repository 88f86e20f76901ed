//! Knowledge-base file loading into the in-memory similarity index.
//!
//! ```json
//! {
//!   "code":         [{"id": "c1", "content": "...", "metadata": {"file_path": "app/x.py"}}],
//!   "cases":        [{"id": "case-1", "content": "...", "metadata": {"tags": "redis,timeout"}}],
//!   "log_patterns": [{"id": "REDIS_TIMEOUT", "pattern": "..."}]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use triage_core::Channel;
use triage_index::fakes::MemorySimilarityIndex;
use triage_index::IndexRecord;

/// Records for each channel; missing sections are empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KnowledgeBase {
    pub code: Vec<IndexRecord>,
    pub cases: Vec<IndexRecord>,
    pub log_patterns: Vec<IndexRecord>,
}

impl KnowledgeBase {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid knowledge file {}", path.display()))
    }

    /// Build an index holding every channel's collection, even empty ones.
    pub fn into_index(self) -> MemorySimilarityIndex {
        let collections = Channel::ALL.map(|c| c.collection());
        let index = MemorySimilarityIndex::with_collections(&collections);

        for (channel, records) in [
            (Channel::Code, self.code),
            (Channel::Case, self.cases),
            (Channel::LogPattern, self.log_patterns),
        ] {
            debug!(channel = %channel, records = records.len(), "seeding collection");
            index.insert(channel.collection(), records);
        }
        index
    }
}
