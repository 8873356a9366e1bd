//! Error taxonomy for confirmation tracking
//!
//! Every `ConfirmationError` is terminal: the poller never retries after
//! producing one. Only "not indexed yet" and "level too low" are retried, and
//! those never surface as errors.

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_rpc_client_api::request::RpcError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// Failure of a single call on the RPC channel (status query or submission)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcCallError {
    /// The node answered but returned no entries for the requested batch
    #[error("Empty status response ({requested} signature(s) requested)")]
    EmptyResponse { requested: usize },

    /// Network or connection level failure
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// The endpoint is throttling us
    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimited { endpoint: String },

    /// JSON-RPC error returned by the node
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    Rpc {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },
}

impl RpcCallError {
    /// Classify a Solana client error.
    ///
    /// Structured JSON-RPC errors keep their code; everything else is
    /// classified by message.
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        if let ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) =
            err.kind()
        {
            if *code == 429 {
                return RpcCallError::RateLimited {
                    endpoint: endpoint.to_string(),
                };
            }
            return RpcCallError::Rpc {
                endpoint: endpoint.to_string(),
                message: message.clone(),
                code: Some(*code),
            };
        }

        let err_str = err.to_string().to_lowercase();
        if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcCallError::RateLimited {
                endpoint: endpoint.to_string(),
            }
        } else if matches!(
            err.kind(),
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_)
        ) || err_str.contains("timed out")
            || err_str.contains("connection")
        {
            RpcCallError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            RpcCallError::Rpc {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
                code: None,
            }
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcCallError::EmptyResponse { .. } => None,
            RpcCallError::Transport { endpoint, .. } => Some(endpoint),
            RpcCallError::RateLimited { endpoint } => Some(endpoint),
            RpcCallError::Rpc { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Terminal failure of a `confirm` call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfirmationError {
    /// The ledger reports the transaction failed. It will never land.
    #[error("Transaction failed: {0}")]
    TransactionError(TransactionError),

    /// The status channel is unusable
    #[error("Status query failed: {0}")]
    QueryFailure(RpcCallError),

    /// No terminal state was observed before the deadline
    #[error("Transaction confirmation timeout after {timeout_ms}ms ({polls} polls, {elapsed_ms}ms elapsed)")]
    Timeout {
        timeout_ms: u64,
        elapsed_ms: u64,
        polls: u32,
    },

    /// The caller cancelled the operation
    #[error("Confirmation cancelled after {polls} polls")]
    Cancelled { polls: u32 },

    /// Submitting the transaction failed, so there is nothing to confirm
    #[error("Transaction submission failed: {0}")]
    Submission(RpcCallError),

    /// The request was rejected before any query was made
    #[error("Invalid confirmation request: {0}")]
    InvalidRequest(String),
}

impl ConfirmationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConfirmationError::Timeout { .. })
    }

    pub fn is_transaction_error(&self) -> bool {
        matches!(self, ConfirmationError::TransactionError(_))
    }

    pub fn is_query_failure(&self) -> bool {
        matches!(self, ConfirmationError::QueryFailure(_))
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ConfirmationError::TransactionError(_) => "transaction_error",
            ConfirmationError::QueryFailure(_) => "query_failure",
            ConfirmationError::Timeout { .. } => "timeout",
            ConfirmationError::Cancelled { .. } => "cancelled",
            ConfirmationError::Submission(_) => "submission",
            ConfirmationError::InvalidRequest(_) => "invalid_request",
        }
    }
}
