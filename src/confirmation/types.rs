//! Core data types for confirmation tracking
//!
//! Durability levels, per-signature status records and the tagged outcome of
//! a single status poll.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::transaction::TransactionError;
use solana_transaction_status::{TransactionConfirmationStatus, TransactionStatus};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::errors::ConfirmationError;

/// How irreversibly a transaction has been recorded by the cluster
///
/// Variants are declared in order of increasing durability, so the derived
/// `Ord` is the durability order: `Processed < Confirmed < Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityLevel {
    /// Seen by the connected node, may still be dropped on a fork
    Processed,
    /// Voted on by a supermajority of the cluster
    Confirmed,
    /// Rooted; cannot be reverted
    Finalized,
}

impl DurabilityLevel {
    pub const ALL: [DurabilityLevel; 3] = [
        DurabilityLevel::Processed,
        DurabilityLevel::Confirmed,
        DurabilityLevel::Finalized,
    ];

    /// Whether an observed level is good enough for the `desired` one.
    ///
    /// `Finalized` satisfies every request.
    pub fn satisfies(self, desired: DurabilityLevel) -> bool {
        self >= desired || self == DurabilityLevel::Finalized
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurabilityLevel::Processed => "processed",
            DurabilityLevel::Confirmed => "confirmed",
            DurabilityLevel::Finalized => "finalized",
        }
    }

    /// Commitment to use for RPC reads that should agree with this level
    pub fn commitment(self) -> CommitmentConfig {
        match self {
            DurabilityLevel::Processed => CommitmentConfig::processed(),
            DurabilityLevel::Confirmed => CommitmentConfig::confirmed(),
            DurabilityLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl Default for DurabilityLevel {
    fn default() -> Self {
        DurabilityLevel::Confirmed
    }
}

impl fmt::Display for DurabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown durability level '{0}' (expected processed, confirmed or finalized)")]
pub struct ParseLevelError(String);

impl FromStr for DurabilityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(DurabilityLevel::Processed),
            "confirmed" => Ok(DurabilityLevel::Confirmed),
            "finalized" => Ok(DurabilityLevel::Finalized),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<TransactionConfirmationStatus> for DurabilityLevel {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => DurabilityLevel::Processed,
            TransactionConfirmationStatus::Confirmed => DurabilityLevel::Confirmed,
            TransactionConfirmationStatus::Finalized => DurabilityLevel::Finalized,
        }
    }
}

/// Status of one signature as reported by a single status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Slot the transaction was processed in
    pub slot: u64,

    /// Present when the transaction failed on-chain. Terminal.
    pub ledger_error: Option<TransactionError>,

    /// Number of blocks since the transaction was processed; `None` once rooted
    pub confirmations: Option<usize>,

    /// Durability level reached so far, if the node reports one
    pub observed_level: Option<DurabilityLevel>,
}

impl From<TransactionStatus> for StatusRecord {
    fn from(status: TransactionStatus) -> Self {
        Self {
            slot: status.slot,
            ledger_error: status.err,
            confirmations: status.confirmations,
            observed_level: status.confirmation_status.map(DurabilityLevel::from),
        }
    }
}

/// Interpretation of a single poll for one signature
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The node has not indexed the signature, or reports no level yet
    NotYetObserved,
    /// The ledger reports the transaction failed
    Errored(TransactionError),
    /// The transaction reached this level
    Observed(DurabilityLevel),
}

impl PollOutcome {
    /// Classify the entry returned for a signature.
    ///
    /// An error always wins over a reported level.
    pub fn classify(record: Option<&StatusRecord>) -> Self {
        match record {
            None => PollOutcome::NotYetObserved,
            Some(StatusRecord {
                ledger_error: Some(err),
                ..
            }) => PollOutcome::Errored(err.clone()),
            Some(StatusRecord {
                observed_level: Some(level),
                ..
            }) => PollOutcome::Observed(*level),
            Some(_) => PollOutcome::NotYetObserved,
        }
    }
}

/// Terminal result of a whole `confirm` call
pub type ConfirmationResult = Result<StatusRecord, ConfirmationError>;
