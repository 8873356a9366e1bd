//! Test Utilities Module
//!
//! Scripted stand-ins for the cluster so confirmation flows can be tested
//! deterministically, without network calls.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::confirmation::{
    DurabilityLevel, RpcCallError, StatusQuery, StatusRecord, TransactionSubmitter,
};

pub type ScriptedResponse = Result<Vec<Option<StatusRecord>>, RpcCallError>;

/// Status record at `level` with no error
pub fn observed_record(level: DurabilityLevel) -> StatusRecord {
    StatusRecord {
        slot: 1,
        ledger_error: None,
        confirmations: match level {
            DurabilityLevel::Finalized => None,
            _ => Some(1),
        },
        observed_level: Some(level),
    }
}

/// Status record reporting an on-chain failure
pub fn failed_record(err: TransactionError) -> StatusRecord {
    StatusRecord {
        slot: 1,
        ledger_error: Some(err),
        confirmations: Some(0),
        observed_level: Some(DurabilityLevel::Processed),
    }
}

/// Mock StatusQuery for testing
///
/// Answers each query with the next scripted response. Once the script is
/// exhausted, the final response is repeated.
#[derive(Clone)]
pub struct MockStatusQuery {
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    last: Arc<Mutex<Option<ScriptedResponse>>>,
    calls: Arc<AtomicUsize>,
    search_history_flags: Arc<Mutex<Vec<bool>>>,
    queried: Arc<Mutex<Vec<Signature>>>,
    latency: Option<Duration>,
}

impl MockStatusQuery {
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
            search_history_flags: Arc::new(Mutex::new(Vec::new())),
            queried: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// A cluster that never indexes the signature
    pub fn pending() -> Self {
        Self::new(vec![Ok(vec![None])])
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of queries answered so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn search_history_flags(&self) -> Vec<bool> {
        self.search_history_flags.lock().await.clone()
    }

    pub async fn queried_signatures(&self) -> Vec<Signature> {
        self.queried.lock().await.clone()
    }
}

#[async_trait]
impl StatusQuery for MockStatusQuery {
    async fn query_statuses(
        &self,
        signatures: &[Signature],
        search_history: bool,
    ) -> Result<Vec<Option<StatusRecord>>, RpcCallError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.search_history_flags.lock().await.push(search_history);
        self.queried.lock().await.extend_from_slice(signatures);

        let mut last = self.last.lock().await;
        if let Some(next) = self.script.lock().await.pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Ok(vec![None; signatures.len()]))
    }
}

/// Mock TransactionSubmitter returning a fixed outcome
#[derive(Clone)]
pub struct MockSubmitter {
    outcome: Result<Signature, RpcCallError>,
    submitted: Arc<AtomicUsize>,
}

impl MockSubmitter {
    pub fn succeeding(signature: Signature) -> Self {
        Self {
            outcome: Ok(signature),
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: RpcCallError) -> Self {
        Self {
            outcome: Err(error),
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn submit(&self, _tx: &VersionedTransaction) -> Result<Signature, RpcCallError> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
