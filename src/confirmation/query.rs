//! External RPC capabilities consumed by the poller
//!
//! The poller only needs two things from the cluster: the status of a batch
//! of signatures and, optionally, a way to submit an already-signed
//! transaction. Both are traits so tests can script the cluster.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::sync::Arc;
use tracing::trace;

use super::errors::RpcCallError;
use super::types::StatusRecord;

/// Status lookup for a batch of signatures
#[async_trait]
pub trait StatusQuery: Send + Sync {
    /// Look up `signatures`.
    ///
    /// The response is aligned positionally with the input; an entry is
    /// `None` when the node does not know the signature. Transport or RPC
    /// failures are returned as `Err`.
    async fn query_statuses(
        &self,
        signatures: &[Signature],
        search_history: bool,
    ) -> Result<Vec<Option<StatusRecord>>, RpcCallError>;
}

/// Submission of an already-signed transaction
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, tx: &VersionedTransaction) -> Result<Signature, RpcCallError>;
}

/// `StatusQuery` backed by a Solana JSON-RPC node
#[derive(Clone)]
pub struct RpcStatusQuery {
    client: Arc<RpcClient>,
}

impl RpcStatusQuery {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for RpcStatusQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcStatusQuery")
            .field("endpoint", &self.client.url())
            .finish()
    }
}

#[async_trait]
impl StatusQuery for RpcStatusQuery {
    async fn query_statuses(
        &self,
        signatures: &[Signature],
        search_history: bool,
    ) -> Result<Vec<Option<StatusRecord>>, RpcCallError> {
        let response = if search_history {
            self.client
                .get_signature_statuses_with_history(signatures)
                .await
        } else {
            self.client.get_signature_statuses(signatures).await
        }
        .map_err(|e| RpcCallError::from_client_error(e, &self.client.url()))?;

        trace!(
            slot = response.context.slot,
            entries = response.value.len(),
            "Signature statuses received"
        );

        Ok(response
            .value
            .into_iter()
            .map(|status| status.map(StatusRecord::from))
            .collect())
    }
}

#[async_trait]
impl TransactionSubmitter for RpcClient {
    async fn submit(&self, tx: &VersionedTransaction) -> Result<Signature, RpcCallError> {
        self.send_transaction(tx)
            .await
            .map_err(|e| RpcCallError::from_client_error(e, &self.url()))
    }
}

