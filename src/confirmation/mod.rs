//! Transaction confirmation tracking
//!
//! Given the signature of a submitted transaction, block until the cluster
//! reports a desired durability level, reports the transaction failed, or a
//! deadline passes.
//!
//! ## Architecture
//!
//! - **types**: durability levels, status records and per-poll outcomes
//! - **errors**: terminal failure taxonomy and RPC error classification
//! - **query**: the status-query and submission capabilities, with RPC
//!   implementations
//! - **poller**: the deadline-bounded retry loop
//!
//! ## Semantics
//!
//! - An on-chain error is terminal and is reported on the poll that sees it
//! - `Finalized` satisfies every desired level
//! - An empty status response or a failed query is a `QueryFailure` and is
//!   never retried
//! - Only "not indexed yet" and "level too low" are retried, on a fixed
//!   interval without backoff
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use solana_client::nonblocking::rpc_client::RpcClient;
//! use solana_sdk::signature::Signature;
//! use tx_confirm::confirmation::{ConfirmRequest, ConfirmationPoller, DurabilityLevel, RpcStatusQuery};
//!
//! # async fn example(signature: Signature) -> Result<(), tx_confirm::confirmation::ConfirmationError> {
//! let client = Arc::new(RpcClient::new("https://api.devnet.solana.com".to_string()));
//! let poller = ConfirmationPoller::new(RpcStatusQuery::new(client));
//!
//! let request = ConfirmRequest::new(signature).with_desired_level(DurabilityLevel::Finalized);
//! let record = poller.confirm(&request).await?;
//! println!("landed in slot {}", record.slot);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod poller;
pub mod query;
pub mod types;

pub use errors::{ConfirmationError, RpcCallError};
pub use poller::{check_budget, ConfirmRequest, ConfirmationPoller};
pub use query::{RpcStatusQuery, StatusQuery, TransactionSubmitter};
pub use types::{ConfirmationResult, DurabilityLevel, ParseLevelError, PollOutcome, StatusRecord};
