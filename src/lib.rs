//! Transaction confirmation tracking for Solana
//!
//! Polls signature status until a transaction reaches a desired commitment,
//! fails on-chain, or runs out of time.

pub mod config;
pub mod confirmation;
pub mod metrics;
pub mod observability;
pub mod structured_logging;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use confirmation::{
    ConfirmRequest, ConfirmationError, ConfirmationPoller, ConfirmationResult, DurabilityLevel,
    StatusRecord,
};
pub use solana_sdk::signature::Signature;
