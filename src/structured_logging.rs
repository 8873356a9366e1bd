//! Structured logging for confirmation tracking

use crate::confirmation::{ConfirmationError, DurabilityLevel, PollOutcome};
use crate::observability::TraceContext;

/// Structured logger bound to one `confirm` call
#[derive(Debug, Clone)]
pub struct ConfirmationLogger {
    context: TraceContext,
    signature: String,
}

impl ConfirmationLogger {
    pub fn new(context: TraceContext, signature: String) -> Self {
        Self { context, signature }
    }

    pub fn log_start(&self, desired: DurabilityLevel, timeout_ms: u64, poll_interval_ms: u64) {
        tracing::debug!(
            correlation_id = %self.context.correlation_id(),
            span_id = %self.context.span_id(),
            signature = %self.signature,
            desired = %desired,
            timeout_ms = timeout_ms,
            poll_interval_ms = poll_interval_ms,
            "Awaiting transaction confirmation"
        );
    }

    pub fn log_poll(&self, attempt: u32, elapsed_ms: u64) {
        tracing::debug!(
            correlation_id = %self.context.correlation_id(),
            signature = %self.signature,
            attempt = attempt,
            elapsed_ms = elapsed_ms,
            "Querying signature status"
        );
    }

    pub fn log_pending(&self, attempt: u32, outcome: &PollOutcome) {
        let observed = match outcome {
            PollOutcome::Observed(level) => Some(level.as_str()),
            _ => None,
        };
        tracing::debug!(
            correlation_id = %self.context.correlation_id(),
            signature = %self.signature,
            attempt = attempt,
            observed = ?observed,
            "Transaction not yet at desired level"
        );
    }

    pub fn log_confirmed(&self, level: DurabilityLevel, polls: u32, elapsed_ms: u64) {
        tracing::info!(
            correlation_id = %self.context.correlation_id(),
            signature = %self.signature,
            level = %level,
            polls = polls,
            elapsed_ms = elapsed_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_failed(&self, error: &ConfirmationError, polls: u32, elapsed_ms: u64) {
        tracing::warn!(
            correlation_id = %self.context.correlation_id(),
            signature = %self.signature,
            kind = error.kind(),
            error = %error,
            polls = polls,
            elapsed_ms = elapsed_ms,
            "Transaction confirmation failed"
        );
    }
}
