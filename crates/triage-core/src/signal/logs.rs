//! Log correlation: trace filtering, timestamp ordering, error-line selection.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// ISO-like (`2024-05-01T12:00:03` / `2024-05-01 12:00:03`) then access-log
/// (`01/May/2024:12:00:03`) timestamps. The first that matches wins.
static TIMESTAMP_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2})").expect("valid iso timestamp regex"),
        Regex::new(r"(\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2})").expect("valid access-log timestamp regex"),
    ]
});

static ERROR_INDICATORS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"\b(ERROR|FATAL|CRITICAL|SEVERE)\b",
        r"\b(Exception|Error|Failure)\b",
        r"\b(failed|failure|error)\b",
    ]
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .expect("valid severity regex")
    })
});

/// Timestamp substring of `line`, or `""` when none is found.
pub fn extract_timestamp(line: &str) -> &str {
    TIMESTAMP_PATTERNS
        .iter()
        .find_map(|re| re.captures(line).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
        .unwrap_or("")
}

/// Correlates and orders raw log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAggregator;

impl LogAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Lines containing `trace_id` verbatim, in original order.
    ///
    /// With no (or an empty) trace id the input is returned unchanged.
    pub fn aggregate_by_trace(&self, logs: &[String], trace_id: Option<&str>) -> Vec<String> {
        match trace_id.filter(|t| !t.is_empty()) {
            None => logs.to_vec(),
            Some(trace_id) => logs
                .iter()
                .filter(|line| line.contains(trace_id))
                .cloned()
                .collect(),
        }
    }

    /// Stable sort by extracted timestamp text; lines without one sort first.
    pub fn sort_by_timestamp(&self, logs: &[String]) -> Vec<String> {
        let mut keyed: Vec<(&str, &String)> =
            logs.iter().map(|l| (extract_timestamp(l), l)).collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));
        keyed.into_iter().map(|(_, l)| l.clone()).collect()
    }

    /// Lines carrying an error-severity marker, each included at most once.
    pub fn extract_error_logs(&self, logs: &[String]) -> Vec<String> {
        logs.iter()
            .filter(|line| ERROR_INDICATORS.iter().any(|re| re.is_match(line)))
            .cloned()
            .collect()
    }
}
