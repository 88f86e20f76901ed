//! Structured observability hooks for the triage pipeline.
//!
//! - Request-scoped tracing spans via the `RequestSpan` RAII guard
//! - Emission functions for key events: signal extracted, channel searched,
//!   channel failed, results merged
//!
//! Events are emitted at `info!` level except channel failures (`warn!`).

use tracing::info;

use crate::domain::Channel;

/// RAII guard that enters a request-scoped span for the duration of a triage request.
///
/// # Example
///
/// ```ignore
/// let _span = RequestSpan::enter("BUG-20240101120000-a1b2c3");
/// // all tracing calls are now tagged with bug_id
/// ```
pub struct RequestSpan {
    _span: tracing::span::EnteredSpan,
}

impl RequestSpan {
    /// Create and enter a span tagged with the bug id.
    pub fn enter(bug_id: &str) -> Self {
        let span = tracing::info_span!("triage.request", bug_id = %bug_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a bug report was turned into a signal.
pub fn emit_signal_processed(frames: usize, business_frames: usize, entities: usize, logs: usize) {
    info!(
        event = "signal.processed",
        frames = frames,
        business_frames = business_frames,
        entities = entities,
        logs = logs,
    );
}

/// Emit event: one channel returned results.
pub fn emit_channel_searched(channel: Channel, hits: usize) {
    info!(event = "channel.searched", channel = %channel, hits = hits);
}

/// Emit event: one channel failed; its contribution is dropped (warning level).
pub fn emit_channel_failed(channel: Channel, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "channel.failed", channel = %channel, error = %error);
}

/// Emit event: per-channel results were fused into one ranked list.
pub fn emit_retrieval_merged(candidates: usize, returned: usize) {
    info!(
        event = "retrieval.merged",
        candidates = candidates,
        returned = returned,
    );
}
