//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

use crate::confirmation::ConfirmationError;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub confirm_requests_total: IntCounter,
    pub confirm_success_total: IntCounter,
    pub status_polls_total: IntCounter,

    // Failures by kind
    pub confirm_tx_errors_total: IntCounter,
    pub confirm_query_failures_total: IntCounter,
    pub confirm_timeouts_total: IntCounter,
    pub confirm_cancelled_total: IntCounter,
    pub confirm_rejected_total: IntCounter,

    // Histograms
    pub confirm_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let confirm_requests_total = IntCounter::with_opts(Opts::new(
            "confirm_requests_total",
            "Total number of confirmation requests",
        ))?;

        let confirm_success_total = IntCounter::with_opts(Opts::new(
            "confirm_success_total",
            "Confirmations that reached the desired level",
        ))?;

        let status_polls_total = IntCounter::with_opts(Opts::new(
            "status_polls_total",
            "Signature status queries issued",
        ))?;

        let confirm_tx_errors_total = IntCounter::with_opts(Opts::new(
            "confirm_tx_errors_total",
            "Confirmations ending with an on-chain transaction error",
        ))?;

        let confirm_query_failures_total = IntCounter::with_opts(Opts::new(
            "confirm_query_failures_total",
            "Confirmations ending because the status query failed",
        ))?;

        let confirm_timeouts_total = IntCounter::with_opts(Opts::new(
            "confirm_timeouts_total",
            "Confirmations ending at the deadline",
        ))?;

        let confirm_cancelled_total = IntCounter::with_opts(Opts::new(
            "confirm_cancelled_total",
            "Confirmations abandoned by the caller",
        ))?;

        let confirm_rejected_total = IntCounter::with_opts(Opts::new(
            "confirm_rejected_total",
            "Confirmations rejected before polling (invalid request or failed submission)",
        ))?;

        let confirm_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirm_latency_seconds",
                "Time from first poll to terminal outcome",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(confirm_requests_total.clone()))?;
        registry.register(Box::new(confirm_success_total.clone()))?;
        registry.register(Box::new(status_polls_total.clone()))?;
        registry.register(Box::new(confirm_tx_errors_total.clone()))?;
        registry.register(Box::new(confirm_query_failures_total.clone()))?;
        registry.register(Box::new(confirm_timeouts_total.clone()))?;
        registry.register(Box::new(confirm_cancelled_total.clone()))?;
        registry.register(Box::new(confirm_rejected_total.clone()))?;
        registry.register(Box::new(confirm_latency.clone()))?;

        Ok(Self {
            registry,
            confirm_requests_total,
            confirm_success_total,
            status_polls_total,
            confirm_tx_errors_total,
            confirm_query_failures_total,
            confirm_timeouts_total,
            confirm_cancelled_total,
            confirm_rejected_total,
            confirm_latency,
        })
    }

    /// Count a terminal failure under its kind
    pub fn record_failure(&self, error: &ConfirmationError) {
        match error {
            ConfirmationError::TransactionError(_) => self.confirm_tx_errors_total.inc(),
            ConfirmationError::QueryFailure(_) => self.confirm_query_failures_total.inc(),
            ConfirmationError::Timeout { .. } => self.confirm_timeouts_total.inc(),
            ConfirmationError::Cancelled { .. } => self.confirm_cancelled_total.inc(),
            ConfirmationError::Submission(_) | ConfirmationError::InvalidRequest(_) => {
                self.confirm_rejected_total.inc()
            }
        }
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}
