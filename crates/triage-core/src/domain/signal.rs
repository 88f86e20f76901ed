//! Normalized debugging signals extracted from a bug report.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::bug::BugInput;

/// One frame of a parsed stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u64,
    pub function: String,
    /// Source line shown under the frame, when the trace includes one.
    pub code: Option<String>,
    /// True when the file path matches a known framework/library signature.
    pub is_framework: bool,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u64, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            code: None,
            is_framework: false,
        }
    }

    pub fn framework(mut self, is_framework: bool) -> Self {
        self.is_framework = is_framework;
        self
    }
}

/// A stack trace broken into exception and frames (outer → inner call order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStackTrace {
    pub exception_type: String,
    pub exception_message: String,
    pub frames: Vec<StackFrame>,
    /// Innermost business (non-framework) frame, if any.
    pub root_frame: Option<StackFrame>,
}

impl ParsedStackTrace {
    /// Build a parsed trace, deriving `root_frame` from the frames.
    pub fn new(
        exception_type: impl Into<String>,
        exception_message: impl Into<String>,
        frames: Vec<StackFrame>,
    ) -> Self {
        let root_frame = frames.iter().rev().find(|f| !f.is_framework).cloned();
        Self {
            exception_type: exception_type.into(),
            exception_message: exception_message.into(),
            frames,
            root_frame,
        }
    }

    /// Frames that belong to the service's own code, in call order.
    pub fn business_frames(&self) -> Vec<StackFrame> {
        self.frames
            .iter()
            .filter(|f| !f.is_framework)
            .cloned()
            .collect()
    }
}

/// Entity types recognised by the entity extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TraceId,
    RequestId,
    UserId,
    ErrorCode,
    ApiEndpoint,
    ServiceName,
    Timeout,
    IpAddress,
    Port,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::TraceId,
        EntityKind::RequestId,
        EntityKind::UserId,
        EntityKind::ErrorCode,
        EntityKind::ApiEndpoint,
        EntityKind::ServiceName,
        EntityKind::Timeout,
        EntityKind::IpAddress,
        EntityKind::Port,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TraceId => "trace_id",
            Self::RequestId => "request_id",
            Self::UserId => "user_id",
            Self::ErrorCode => "error_code",
            Self::ApiEndpoint => "api_endpoint",
            Self::ServiceName => "service_name",
            Self::Timeout => "timeout",
            Self::IpAddress => "ip_address",
            Self::Port => "port",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preprocessor output. Every field is empty/absent when its input is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugSignal {
    pub parsed_stack: Option<ParsedStackTrace>,
    /// Matched values per entity type, first-seen order, no duplicates.
    pub entities: BTreeMap<EntityKind, Vec<String>>,
    /// Normalized (lower-case, single-spaced) failure keywords.
    pub error_keywords: BTreeSet<String>,
    /// Related log lines correlated to the trace and ordered by timestamp.
    pub aggregated_logs: Vec<String>,
    /// Error-severity subset of `aggregated_logs`.
    pub error_logs: Vec<String>,
    pub business_frames: Vec<StackFrame>,
}

impl BugSignal {
    /// Values extracted for one entity type (empty when none matched).
    pub fn entity(&self, kind: EntityKind) -> &[String] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the free-text retrieval query for `bug`.
    ///
    /// Joins the error message, the parsed exception type, up to three error
    /// keywords, and the user description with single spaces.
    pub fn search_query(&self, bug: &BugInput) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !bug.error.error_message.is_empty() {
            parts.push(&bug.error.error_message);
        }
        if let Some(parsed) = &self.parsed_stack {
            parts.push(&parsed.exception_type);
        }
        parts.extend(self.error_keywords.iter().take(3).map(String::as_str));
        if let Some(description) = bug.user_description() {
            parts.push(description);
        }
        parts.join(" ")
    }
}
