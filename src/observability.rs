//! Trace identifiers for confirmation calls
//!
//! Every `confirm` runs inside a `confirm` tracing span carrying its trace,
//! span and (for batches) parent span ids. A batch shares one trace and one
//! correlation id across all of its signatures.

use solana_sdk::signature::Signature;
use tracing::field;
use uuid::Uuid;

/// Correlation ID tying together the log lines of one confirmation (or batch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span identity of one confirmation
#[derive(Debug, Clone)]
pub struct TraceContext {
    operation: &'static str,
    trace_id: Uuid,
    span_id: Uuid,
    parent_span_id: Option<Uuid>,
    correlation_id: CorrelationId,
}

impl TraceContext {
    /// Root context for a standalone operation
    pub fn root(operation: &'static str) -> Self {
        Self {
            operation,
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            correlation_id: CorrelationId::new(),
        }
    }

    /// Context for one member of a batch rooted at `self`
    pub fn child_span(&self, operation: &'static str) -> Self {
        Self {
            operation,
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            correlation_id: self.correlation_id,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn span_id(&self) -> Uuid {
        self.span_id
    }

    pub fn parent_span_id(&self) -> Option<Uuid> {
        self.parent_span_id
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Open the tracing span a confirmation of `signature` runs in
    pub fn confirm_span(&self, signature: &Signature) -> tracing::Span {
        let span = tracing::debug_span!(
            "confirm",
            operation = self.operation,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            parent_span_id = field::Empty,
            signature = %signature,
        );
        if let Some(parent) = self.parent_span_id {
            span.record("parent_span_id", field::display(parent));
        }
        span
    }
}
