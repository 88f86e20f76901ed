//! Regex-based entity and error-keyword extraction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::domain::EntityKind;

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid extraction regex")
}

/// Alternatives per entity type; group 1 is the extracted value.
static ENTITY_PATTERNS: LazyLock<Vec<(EntityKind, Vec<Regex>)>> = LazyLock::new(|| {
    let table: [(EntityKind, &[&str]); 9] = [
        (
            EntityKind::TraceId,
            &[
                r"trace[_-]?id[=:\s]+([a-zA-Z0-9-]+)",
                r"x-trace-id[=:\s]+([a-zA-Z0-9-]+)",
            ],
        ),
        (
            EntityKind::RequestId,
            &[
                r"request[_-]?id[=:\s]+([a-zA-Z0-9-]+)",
                r"req[_-]?id[=:\s]+([a-zA-Z0-9-]+)",
            ],
        ),
        (
            EntityKind::UserId,
            &[
                r"user[_-]?id[=:\s]+([a-zA-Z0-9-]+)",
                r"uid[=:\s]+([a-zA-Z0-9-]+)",
            ],
        ),
        (
            EntityKind::ErrorCode,
            &[
                r"error[_-]?code[=:\s]+(\d+)",
                r"code[=:\s]+(\d{3,})",
                r"HTTP[/\s]+\d+\.\d+\s+(\d{3})",
            ],
        ),
        (
            EntityKind::ApiEndpoint,
            &[
                r"(?:GET|POST|PUT|DELETE|PATCH)\s+(/\S+)",
                r"endpoint[=:\s]+(/\S+)",
                r"path[=:\s]+(/\S+)",
            ],
        ),
        (
            EntityKind::ServiceName,
            &[
                r"service[=:\s]+([a-zA-Z0-9_-]+)",
                r"from\s+([a-zA-Z0-9_-]+-service)",
            ],
        ),
        (
            EntityKind::Timeout,
            &[
                r"timeout[=:\s]+(\d+(?:\.\d+)?)\s*(?:s|ms)?",
                r"(\d+(?:\.\d+)?)\s*(?:seconds?|ms|milliseconds?)\s+timeout",
            ],
        ),
        (
            EntityKind::IpAddress,
            &[r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b"],
        ),
        (EntityKind::Port, &[r":(\d{2,5})\b"]),
    ];

    table
        .into_iter()
        .map(|(kind, patterns)| (kind, patterns.iter().map(|p| ci(p)).collect()))
        .collect()
});

/// Common failure signatures; group 1 is the keyword.
static ERROR_KEYWORD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(timeout|timed?\s*out)\b",
        r"\b(connection\s+(?:refused|reset|closed|failed))\b",
        r"\b(null\s*pointer|none\s*type|undefined)\b",
        r"\b(out\s+of\s+memory|oom)\b",
        r"\b(rate\s*limit|throttl)",
        r"\b(auth(?:entication|orization)?\s+(?:failed|error))\b",
        r"\b(permission\s+denied|forbidden)\b",
        r"\b(not\s+found|404)\b",
        r"\b(internal\s+(?:server\s+)?error|500)\b",
        r"\b(bad\s+(?:request|gateway)|400|502)\b",
        r"\b(deadlock|race\s+condition)\b",
        r"\b(memory\s+leak)\b",
        r"\b(stack\s+overflow)\b",
    ]
    .into_iter()
    .map(ci)
    .collect()
});

/// Lower-case and collapse internal whitespace runs to one space.
fn normalize_keyword(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Extracts named entities and failure keywords from free text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// All entity values in `text`, grouped by type.
    ///
    /// Values keep first-seen order across a type's alternatives, exact
    /// duplicates are dropped, and types with no match are omitted.
    pub fn extract(&self, text: &str) -> BTreeMap<EntityKind, Vec<String>> {
        let mut entities = BTreeMap::new();

        for (kind, patterns) in ENTITY_PATTERNS.iter() {
            let mut values: Vec<String> = Vec::new();
            for re in patterns {
                for caps in re.captures_iter(text) {
                    let Some(m) = caps.get(1) else {
                        continue;
                    };
                    if !values.iter().any(|v| v == m.as_str()) {
                        values.push(m.as_str().to_string());
                    }
                }
            }
            if !values.is_empty() {
                entities.insert(*kind, values);
            }
        }

        entities
    }

    /// Deduplicated, normalized failure keywords found in `text`.
    pub fn extract_error_keywords(&self, text: &str) -> BTreeSet<String> {
        ERROR_KEYWORD_PATTERNS
            .iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|caps| caps.get(1).map(|m| normalize_keyword(m.as_str())))
            .collect()
    }
}
