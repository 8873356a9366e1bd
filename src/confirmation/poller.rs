//! Deadline-bounded confirmation poller
//!
//! One `confirm` call is a single flow of query -> evaluate -> sleep steps.
//! The deadline is checked at the top of every iteration rather than by a
//! preemptive timer, so an observed timeout can land up to one poll interval
//! plus one query latency past the budget.

use futures::future::join_all;
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::errors::{ConfirmationError, RpcCallError};
use super::query::{StatusQuery, TransactionSubmitter};
use super::types::{ConfirmationResult, DurabilityLevel, PollOutcome};
use crate::metrics::{metrics, Metrics};
use crate::observability::TraceContext;
use crate::structured_logging::ConfirmationLogger;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Check a timeout/interval pair.
///
/// An interval longer than the whole budget is rejected rather than clamped.
pub fn check_budget(timeout: Duration, poll_interval: Duration) -> Result<(), String> {
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    if poll_interval.is_zero() {
        return Err("poll interval must be greater than zero".to_string());
    }
    if poll_interval > timeout {
        return Err(format!(
            "poll interval ({}ms) exceeds timeout ({}ms)",
            poll_interval.as_millis(),
            timeout.as_millis()
        ));
    }
    Ok(())
}

/// Parameters of one confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    pub signature: Signature,
    pub desired_level: DurabilityLevel,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Forwarded to the status query; inspects archived signatures too
    pub search_history: bool,
}

impl ConfirmRequest {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            desired_level: DurabilityLevel::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            search_history: false,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_desired_level(mut self, level: DurabilityLevel) -> Self {
        self.desired_level = level;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_search_history(mut self, search_history: bool) -> Self {
        self.search_history = search_history;
        self
    }

    /// Reject requests that cannot be polled meaningfully.
    ///
    /// The all-zero signature is treated as "no signature".
    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.signature == Signature::default() {
            return Err(ConfirmationError::InvalidRequest(
                "signature must not be empty".to_string(),
            ));
        }
        check_budget(self.timeout, self.poll_interval).map_err(ConfirmationError::InvalidRequest)
    }
}

/// Polls signature status until a desired durability level, a terminal
/// error, or the deadline
#[derive(Clone)]
pub struct ConfirmationPoller<Q> {
    query: Q,
    metrics: &'static Metrics,
}

impl<Q: fmt::Debug> fmt::Debug for ConfirmationPoller<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationPoller")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<Q: StatusQuery> ConfirmationPoller<Q> {
    /// Poller reporting into the process-wide [`metrics()`] registry
    pub fn new(query: Q) -> Self {
        Self {
            query,
            metrics: metrics(),
        }
    }

    /// Report into `metrics` instead of the process-wide registry
    pub fn with_metrics(mut self, metrics: &'static Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Wait for `request.signature` to reach `request.desired_level`.
    pub async fn confirm(&self, request: &ConfirmRequest) -> ConfirmationResult {
        self.confirm_in(request, TraceContext::root("confirm"), None)
            .await
    }

    /// Like [`confirm`](Self::confirm), but abandons the query or sleep in
    /// flight as soon as `cancel` fires.
    pub async fn confirm_with_cancel(
        &self,
        request: &ConfirmRequest,
        cancel: &CancellationToken,
    ) -> ConfirmationResult {
        self.confirm_in(request, TraceContext::root("confirm"), Some(cancel))
            .await
    }

    /// Confirm independent signatures concurrently. Results are aligned with
    /// `requests`.
    pub async fn confirm_all(&self, requests: &[ConfirmRequest]) -> Vec<ConfirmationResult> {
        let batch = TraceContext::root("confirm_all");
        join_all(
            requests
                .iter()
                .map(|request| self.confirm_in(request, batch.child_span("confirm"), None)),
        )
        .await
    }

    /// Submit a signed transaction and confirm the returned signature using
    /// the settings of `template`.
    pub async fn submit_and_confirm<S>(
        &self,
        submitter: &S,
        tx: &VersionedTransaction,
        template: ConfirmRequest,
    ) -> ConfirmationResult
    where
        S: TransactionSubmitter + ?Sized,
    {
        let signature = match submitter.submit(tx).await {
            Ok(signature) => signature,
            Err(e) => {
                let error = ConfirmationError::Submission(e);
                self.metrics.confirm_requests_total.inc();
                self.metrics.record_failure(&error);
                return Err(error);
            }
        };
        tracing::debug!(signature = %signature, "Transaction submitted");
        self.confirm(&template.with_signature(signature)).await
    }

    async fn confirm_in(
        &self,
        request: &ConfirmRequest,
        context: TraceContext,
        cancel: Option<&CancellationToken>,
    ) -> ConfirmationResult {
        let m = self.metrics;
        m.confirm_requests_total.inc();

        if let Err(e) = request.validate() {
            m.record_failure(&e);
            return Err(e);
        }

        let span = context.confirm_span(&request.signature);
        let logger = ConfirmationLogger::new(context, request.signature.to_string());

        async {
            logger.log_start(
                request.desired_level,
                request.timeout.as_millis() as u64,
                request.poll_interval.as_millis() as u64,
            );

            let start = Instant::now();
            let (result, polls) = self.poll_until_terminal(request, &logger, start, cancel).await;
            let elapsed = start.elapsed();

            m.confirm_latency.observe(elapsed.as_secs_f64());
            match &result {
                Ok(record) => {
                    m.confirm_success_total.inc();
                    if let Some(level) = record.observed_level {
                        logger.log_confirmed(level, polls, elapsed.as_millis() as u64);
                    }
                }
                Err(e) => {
                    m.record_failure(e);
                    logger.log_failed(e, polls, elapsed.as_millis() as u64);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn poll_until_terminal(
        &self,
        request: &ConfirmRequest,
        logger: &ConfirmationLogger,
        start: Instant,
        cancel: Option<&CancellationToken>,
    ) -> (ConfirmationResult, u32) {
        let signatures = [request.signature];
        let mut polls: u32 = 0;

        while start.elapsed() < request.timeout {
            let attempt = polls + 1;
            logger.log_poll(attempt, start.elapsed().as_millis() as u64);

            let query = self
                .query
                .query_statuses(&signatures, request.search_history);
            let response = match until_cancelled(cancel, query).await {
                None => return (Err(ConfirmationError::Cancelled { polls }), polls),
                Some(response) => response,
            };
            polls = attempt;
            self.metrics.status_polls_total.inc();

            let statuses = match response {
                Ok(statuses) => statuses,
                Err(e) => return (Err(ConfirmationError::QueryFailure(e)), polls),
            };

            // No entry at all means the query path is broken, not that the
            // transaction is pending.
            let Some(entry) = statuses.into_iter().next() else {
                let e = RpcCallError::EmptyResponse {
                    requested: signatures.len(),
                };
                return (Err(ConfirmationError::QueryFailure(e)), polls);
            };

            match (PollOutcome::classify(entry.as_ref()), entry) {
                (PollOutcome::Errored(err), _) => {
                    return (Err(ConfirmationError::TransactionError(err)), polls)
                }
                (PollOutcome::Observed(level), Some(record))
                    if level.satisfies(request.desired_level) =>
                {
                    return (Ok(record), polls)
                }
                (outcome, _) => logger.log_pending(polls, &outcome),
            }

            if until_cancelled(cancel, sleep(request.poll_interval))
                .await
                .is_none()
            {
                return (Err(ConfirmationError::Cancelled { polls }), polls);
            }
        }

        let timeout = ConfirmationError::Timeout {
            timeout_ms: request.timeout.as_millis() as u64,
            elapsed_ms: start.elapsed().as_millis() as u64,
            polls,
        };
        (Err(timeout), polls)
    }
}

/// Run `fut` to completion unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => None,
            out = fut => Some(out),
        },
        None => Some(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::StatusRecord;
    use crate::test_utils::{failed_record, observed_record, MockStatusQuery, MockSubmitter};
    use solana_sdk::transaction::TransactionError;

    fn sig() -> Signature {
        Signature::from([7u8; 64])
    }

    fn request() -> ConfirmRequest {
        ConfirmRequest::new(sig())
            .with_timeout(Duration::from_millis(5_000))
            .with_poll_interval(Duration::from_millis(1_000))
    }

    #[test]
    fn test_request_defaults() {
        let req = ConfirmRequest::new(sig());
        assert_eq!(req.desired_level, DurabilityLevel::Confirmed);
        assert_eq!(req.timeout, Duration::from_millis(30_000));
        assert_eq!(req.poll_interval, Duration::from_millis(1_000));
        assert!(!req.search_history);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_check_budget() {
        let s = Duration::from_secs(1);
        assert!(check_budget(s, s).is_ok());
        assert!(check_budget(Duration::ZERO, s).is_err());
        assert!(check_budget(s, Duration::ZERO).is_err());
        assert!(check_budget(s, s * 2).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalized_on_first_poll_satisfies_any_level() {
        for desired in DurabilityLevel::ALL {
            let query = MockStatusQuery::new(vec![Ok(vec![Some(observed_record(
                DurabilityLevel::Finalized,
            ))])]);
            let poller = ConfirmationPoller::new(query);
            let start = Instant::now();

            let record = poller
                .confirm(&request().with_desired_level(desired))
                .await
                .unwrap();

            assert_eq!(record.observed_level, Some(DurabilityLevel::Finalized));
            assert_eq!(poller.query().calls(), 1);
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_absent_confirmed() {
        let query = MockStatusQuery::new(vec![
            Ok(vec![None]),
            Ok(vec![None]),
            Ok(vec![Some(observed_record(DurabilityLevel::Confirmed))]),
        ]);
        let poller = ConfirmationPoller::new(query);
        let start = Instant::now();

        let record = poller.confirm(&request()).await.unwrap();

        assert_eq!(record.observed_level, Some(DurabilityLevel::Confirmed));
        assert_eq!(poller.query().calls(), 3);
        // exactly two sleeps of the poll interval
        assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_level_keeps_polling() {
        let query = MockStatusQuery::new(vec![
            Ok(vec![Some(observed_record(DurabilityLevel::Processed))]),
            Ok(vec![Some(observed_record(DurabilityLevel::Confirmed))]),
            Ok(vec![Some(observed_record(DurabilityLevel::Finalized))]),
        ]);
        let poller = ConfirmationPoller::new(query);

        let record = poller
            .confirm(&request().with_desired_level(DurabilityLevel::Finalized))
            .await
            .unwrap();

        assert_eq!(record.observed_level, Some(DurabilityLevel::Finalized));
        assert_eq!(poller.query().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_without_level_is_pending() {
        let mut pending = observed_record(DurabilityLevel::Processed);
        pending.observed_level = None;
        let query = MockStatusQuery::new(vec![
            Ok(vec![Some(pending)]),
            Ok(vec![Some(observed_record(DurabilityLevel::Processed))]),
        ]);
        let poller = ConfirmationPoller::new(query);

        let result = poller
            .confirm(&request().with_desired_level(DurabilityLevel::Processed))
            .await;

        assert!(result.is_ok());
        assert_eq!(poller.query().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_error_short_circuits() {
        let query = MockStatusQuery::new(vec![
            Ok(vec![Some(failed_record(TransactionError::InsufficientFundsForFee))]),
            Ok(vec![Some(observed_record(DurabilityLevel::Finalized))]),
        ]);
        let poller = ConfirmationPoller::new(query);

        let err = poller.confirm(&request()).await.unwrap_err();

        assert_eq!(
            err,
            ConfirmationError::TransactionError(TransactionError::InsufficientFundsForFee)
        );
        assert_eq!(poller.query().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_response_is_query_failure() {
        let query = MockStatusQuery::new(vec![Ok(vec![]), Ok(vec![None])]);
        let poller = ConfirmationPoller::new(query);

        let err = poller.confirm(&request()).await.unwrap_err();

        assert_eq!(
            err,
            ConfirmationError::QueryFailure(RpcCallError::EmptyResponse { requested: 1 })
        );
        assert_eq!(poller.query().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_retried() {
        let transport = RpcCallError::Transport {
            endpoint: "http://localhost:8899".to_string(),
            message: "connection refused".to_string(),
        };
        let query = MockStatusQuery::new(vec![Err(transport.clone()), Ok(vec![None])]);
        let poller = ConfirmationPoller::new(query);

        let err = poller.confirm(&request()).await.unwrap_err();

        assert_eq!(err, ConfirmationError::QueryFailure(transport));
        assert_eq!(poller.query().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds() {
        let poller = ConfirmationPoller::new(MockStatusQuery::pending());
        let req = request().with_timeout(Duration::from_millis(4_500));
        let start = Instant::now();

        let err = poller.confirm(&req).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= req.timeout);
        assert!(elapsed <= req.timeout + req.poll_interval);
        // polls at t = 0, 1, 2, 3, 4 seconds
        assert_eq!(poller.query().calls(), 5);
        match err {
            ConfirmationError::Timeout {
                timeout_ms, polls, ..
            } => {
                assert_eq!(timeout_ms, 4_500);
                assert_eq!(polls, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bound_includes_query_latency() {
        let latency = Duration::from_millis(300);
        let poller = ConfirmationPoller::new(MockStatusQuery::pending().with_latency(latency));
        let req = request();
        let start = Instant::now();

        let err = poller.confirm(&req).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= req.timeout);
        assert!(elapsed <= req.timeout + req.poll_interval + latency);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_history_is_forwarded() {
        let poller = ConfirmationPoller::new(MockStatusQuery::new(vec![Ok(vec![Some(
            observed_record(DurabilityLevel::Confirmed),
        )])]));

        poller
            .confirm(&request().with_search_history(true))
            .await
            .unwrap();

        assert_eq!(poller.query().search_history_flags().await, vec![true]);
    }

    #[tokio::test]
    async fn test_invalid_request_performs_no_query() {
        let poller = ConfirmationPoller::new(MockStatusQuery::pending());

        let empty = ConfirmRequest::new(Signature::default());
        assert!(matches!(
            poller.confirm(&empty).await,
            Err(ConfirmationError::InvalidRequest(_))
        ));

        let oversized = request().with_poll_interval(Duration::from_secs(10));
        assert!(matches!(
            poller.confirm(&oversized).await,
            Err(ConfirmationError::InvalidRequest(_))
        ));

        let zero = request().with_timeout(Duration::ZERO);
        assert!(matches!(
            poller.confirm(&zero).await,
            Err(ConfirmationError::InvalidRequest(_))
        ));

        assert_eq!(poller.query().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start() {
        let poller = ConfirmationPoller::new(MockStatusQuery::pending());
        let token = CancellationToken::new();
        token.cancel();

        let err = poller
            .confirm_with_cancel(&request(), &token)
            .await
            .unwrap_err();

        assert_eq!(err, ConfirmationError::Cancelled { polls: 0 });
        assert_eq!(poller.query().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_sleeping_stops_polling() {
        let poller = ConfirmationPoller::new(MockStatusQuery::pending());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2_500)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = poller
            .confirm_with_cancel(&request(), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfirmationError::Cancelled { polls: 3 }));
        assert_eq!(poller.query().calls(), 3);
        assert!(start.elapsed() < Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_all_aligned_with_input() {
        let finalized = MockStatusQuery::new(vec![Ok(vec![Some(observed_record(
            DurabilityLevel::Finalized,
        ))])]);
        let poller = ConfirmationPoller::new(finalized);
        let requests = vec![
            request(),
            ConfirmRequest::new(Signature::default()),
            request().with_desired_level(DurabilityLevel::Processed),
        ];

        let results = poller.confirm_all(&requests).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ConfirmationError::InvalidRequest(_))
        ));
        assert!(results[2].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_confirm() {
        let poller = ConfirmationPoller::new(MockStatusQuery::new(vec![
            Ok(vec![None]),
            Ok(vec![Some(observed_record(DurabilityLevel::Confirmed))]),
        ]));
        let submitter = MockSubmitter::succeeding(sig());

        let record: StatusRecord = poller
            .submit_and_confirm(&submitter, &VersionedTransaction::default(), request())
            .await
            .unwrap();

        assert_eq!(record.observed_level, Some(DurabilityLevel::Confirmed));
        assert_eq!(submitter.submitted(), 1);
        assert_eq!(poller.query().queried_signatures().await, vec![sig(), sig()]);
    }

    #[tokio::test]
    async fn test_submit_failure_skips_polling() {
        let poller = ConfirmationPoller::new(MockStatusQuery::pending());
        let submitter = MockSubmitter::failing(RpcCallError::RateLimited {
            endpoint: "http://localhost:8899".to_string(),
        });

        let err = poller
            .submit_and_confirm(&submitter, &VersionedTransaction::default(), request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "submission");
        assert_eq!(poller.query().calls(), 0);
    }

    fn fresh_metrics() -> &'static Metrics {
        Box::leak(Box::new(Metrics::new().unwrap()))
    }

    #[tokio::test]
    async fn test_submit_failure_counts_request() {
        let m = fresh_metrics();
        let poller = ConfirmationPoller::new(MockStatusQuery::pending()).with_metrics(m);
        let submitter = MockSubmitter::failing(RpcCallError::Transport {
            endpoint: "http://localhost:8899".to_string(),
            message: "connection reset".to_string(),
        });

        let _ = poller
            .submit_and_confirm(&submitter, &VersionedTransaction::default(), request())
            .await;

        assert_eq!(m.confirm_requests_total.get(), 1);
        assert_eq!(m.confirm_rejected_total.get(), 1);
        assert_eq!(m.status_polls_total.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_success_counts_request_once() {
        let m = fresh_metrics();
        let poller = ConfirmationPoller::new(MockStatusQuery::new(vec![Ok(vec![Some(
            observed_record(DurabilityLevel::Confirmed),
        )])]))
        .with_metrics(m);
        let submitter = MockSubmitter::succeeding(sig());

        poller
            .submit_and_confirm(&submitter, &VersionedTransaction::default(), request())
            .await
            .unwrap();

        assert_eq!(m.confirm_requests_total.get(), 1);
        assert_eq!(m.confirm_success_total.get(), 1);
        assert_eq!(m.confirm_rejected_total.get(), 0);
        assert_eq!(m.status_polls_total.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processed_request_accepts_confirmed() {
        let query = MockStatusQuery::new(vec![Ok(vec![Some(observed_record(
            DurabilityLevel::Confirmed,
        ))])]);
        let poller = ConfirmationPoller::new(query);
        let start = Instant::now();

        let record = poller
            .confirm(&request().with_desired_level(DurabilityLevel::Processed))
            .await
            .unwrap();

        assert_eq!(record.observed_level, Some(DurabilityLevel::Confirmed));
        assert_eq!(poller.query().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
