//! Raw bug report as submitted by an alerting system, ticket, or person.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error details attached to a bug report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Free-form context supplied by the reporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
}

/// A bug report: error message plus optional stack, trace id, description, logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<String>,
    #[serde(alias = "error_info")]
    pub error: ErrorInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BugContext>,
    #[serde(default)]
    pub related_logs: Vec<String>,
}

impl BugInput {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo {
                error_message: error_message.into(),
                ..ErrorInfo::default()
            },
            ..Self::default()
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.error.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.error.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.context = Some(BugContext {
            user_description: Some(description.into()),
        });
        self
    }

    pub fn with_logs<I, S>(mut self, logs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_logs = logs.into_iter().map(Into::into).collect();
        self
    }

    /// The stack trace, if present and non-empty.
    pub fn stack_trace(&self) -> Option<&str> {
        self.error.stack_trace.as_deref().filter(|s| !s.is_empty())
    }

    /// The trace identifier, if present and non-empty.
    pub fn trace_id(&self) -> Option<&str> {
        self.error.trace_id.as_deref().filter(|s| !s.is_empty())
    }

    /// The reporter's description, if present and non-empty.
    pub fn user_description(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.user_description.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Assign `BUG-<YYYYmmddHHMMSS>-<6 hex>` if no id was supplied; return the id.
    pub fn ensure_bug_id(&mut self) -> &str {
        self.bug_id.get_or_insert_with(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("BUG-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..6])
        })
    }
}
