//! Preprocessor: stack parsing + entity extraction + log correlation.

use tracing::{debug, instrument};

use crate::config::PreprocessConfig;
use crate::domain::{BugInput, BugSignal};
use crate::metrics::METRICS;
use crate::obs::emit_signal_processed;

use super::entities::EntityExtractor;
use super::logs::LogAggregator;
use super::stack::StackParser;

/// Composes the signal extractors into one pass over a bug report.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    stack_parser: StackParser,
    entity_extractor: EntityExtractor,
    log_aggregator: LogAggregator,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &PreprocessConfig) -> Self {
        Self {
            stack_parser: StackParser::new().with_extra_patterns(&config.extra_framework_patterns),
            ..Self::default()
        }
    }

    /// Extract a [`BugSignal`] from `bug`.
    ///
    /// Each step tolerates its input being absent; the result is then simply
    /// empty for that part.
    #[instrument(skip_all, fields(bug_id = bug.bug_id.as_deref().unwrap_or("-")))]
    pub fn process(&self, bug: &BugInput) -> BugSignal {
        let mut signal = BugSignal::default();

        if let Some(stack_trace) = bug.stack_trace() {
            let parsed = self.stack_parser.parse(stack_trace);
            signal.business_frames = self.stack_parser.get_business_frames(&parsed);
            signal.parsed_stack = Some(parsed);
        }

        let text = [
            bug.error.error_message.as_str(),
            bug.stack_trace().unwrap_or(""),
            bug.user_description().unwrap_or(""),
        ]
        .join(" ");
        signal.entities = self.entity_extractor.extract(&text);
        signal.error_keywords = self.entity_extractor.extract_error_keywords(&text);

        if !bug.related_logs.is_empty() {
            let related = self
                .log_aggregator
                .aggregate_by_trace(&bug.related_logs, bug.trace_id());
            signal.aggregated_logs = self.log_aggregator.sort_by_timestamp(&related);
            signal.error_logs = self
                .log_aggregator
                .extract_error_logs(&signal.aggregated_logs);
            debug!(
                related = related.len(),
                total = bug.related_logs.len(),
                "correlated logs"
            );
        }

        METRICS.inc_signals_processed();
        emit_signal_processed(
            signal.parsed_stack.as_ref().map_or(0, |p| p.frames.len()),
            signal.business_frames.len(),
            signal.entities.len(),
            signal.aggregated_logs.len(),
        );
        signal
    }
}
