//! Weighted fusion of per-channel results into one ranked list.

use std::collections::{BTreeMap, HashSet};

use crate::config::ChannelWeights;
use crate::domain::{Channel, RetrievalResult};
use crate::metrics::METRICS;
use crate::obs::emit_retrieval_merged;

/// Deduplication key: the first `prefix_chars` characters of the content, or
/// the id when the content is empty.
fn dedup_key(result: &RetrievalResult, prefix_chars: usize) -> String {
    if result.content.is_empty() {
        result.id.clone()
    } else {
        result.content.chars().take(prefix_chars).collect()
    }
}

/// Weight, flatten, rank, deduplicate and truncate per-channel results.
///
/// Items are flattened in channel order (the map's key order) keeping each
/// channel's own order, then stable-sorted by descending weighted score, so
/// equal scores keep their flattened order. The first item for each dedup key
/// survives and its `score` is replaced by the weighted score.
pub fn merge_and_rerank(
    results: BTreeMap<Channel, Vec<RetrievalResult>>,
    weights: &ChannelWeights,
    top_k: usize,
    dedup_prefix_chars: usize,
) -> Vec<RetrievalResult> {
    let mut weighted: Vec<(f64, RetrievalResult)> = results
        .into_iter()
        .flat_map(|(channel, items)| {
            let weight = weights.get(channel);
            items.into_iter().map(move |item| (item.score * weight, item))
        })
        .collect();
    let candidates = weighted.len();

    weighted.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut seen = HashSet::new();
    let merged: Vec<RetrievalResult> = weighted
        .into_iter()
        .filter(|(_, item)| seen.insert(dedup_key(item, dedup_prefix_chars)))
        .take(top_k)
        .map(|(score, mut item)| {
            item.score = score;
            item
        })
        .collect();

    METRICS.add_results_merged(merged.len() as u64);
    emit_retrieval_merged(candidates, merged.len());
    merged
}
