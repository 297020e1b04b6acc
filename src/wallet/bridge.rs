use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::block_chain::utils::{normalize_address, TransactionResponse};
use crate::transactions::builder::BuiltTransaction;
use crate::wallet::{ConnectRequest, SignAndSubmit, WalletBridge, WalletError};

type Responder = oneshot::Sender<Result<TransactionResponse, WalletError>>;

struct PendingRequest {
    transaction: BuiltTransaction,
    created_at: DateTime<Utc>,
    responder: Responder,
}

/// Signature request waiting for the browser wallet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub id: Uuid,
    pub transaction: BuiltTransaction,
    pub created_at: DateTime<Utc>,
}

/// Bridge to a wallet extension running in the browser. The extension reports
/// its account on connect; signature requests are queued here until the
/// browser has signed and executed them (or the user rejected them).
#[derive(Default)]
pub struct BrowserBridge {
    pending: Arc<Mutex<HashMap<Uuid, PendingRequest>>>,
}

/// Withdraws the request when the waiting side goes away, e.g. on timeout.
struct PendingGuard {
    id: Uuid,
    pending: Arc<Mutex<HashMap<Uuid, PendingRequest>>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.lock().remove(&self.id).is_some() {
            debug!(request_id = %self.id, "signature request withdrawn");
        }
    }
}

impl BrowserBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_requests(&self) -> Vec<SignatureRequest> {
        let mut requests: Vec<_> = self
            .pending
            .lock()
            .iter()
            .map(|(id, request)| SignatureRequest {
                id: *id,
                transaction: request.transaction.clone(),
                created_at: request.created_at,
            })
            .collect();
        requests.sort_by_key(|request| request.created_at);
        requests
    }

    /// Deliver the wallet's answer for a queued request: the executed
    /// transaction response, or the rejection message.
    pub fn resolve(&self, id: Uuid, outcome: Result<TransactionResponse, String>) -> Result<(), WalletError> {
        let request = self
            .pending
            .lock()
            .remove(&id)
            .ok_or_else(|| WalletError::UnknownRequest(id.to_string()))?;

        info!(request_id = %id, approved = outcome.is_ok(), "signature request answered");
        // the waiter may already have timed out
        let _ = request.responder.send(outcome.map_err(WalletError::Rejected));
        Ok(())
    }
}

#[async_trait]
impl SignAndSubmit for BrowserBridge {
    async fn sign_and_submit(&self, transaction: &BuiltTransaction) -> Result<TransactionResponse, WalletError> {
        let id = Uuid::new_v4();
        let (responder, receiver) = oneshot::channel();
        self.pending.lock().insert(
            id,
            PendingRequest {
                transaction: transaction.clone(),
                created_at: Utc::now(),
                responder,
            },
        );
        let _guard = PendingGuard {
            id,
            pending: self.pending.clone(),
        };
        debug!(request_id = %id, operation = ?transaction.operation, "signature requested");

        receiver
            .await
            .unwrap_or_else(|_| Err(WalletError::Rejected("signature request dropped".to_string())))
    }
}

#[async_trait]
impl WalletBridge for BrowserBridge {
    async fn connect(&self, request: ConnectRequest) -> Result<String, WalletError> {
        let address = request.address.ok_or(WalletError::NotInstalled)?;
        normalize_address(&address).ok_or(WalletError::InvalidAddress(address))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let dropped: Vec<_> = self.pending.lock().drain().collect();
        for (id, request) in dropped {
            debug!(request_id = %id, "rejecting signature request on disconnect");
            let _ = request
                .responder
                .send(Err(WalletError::Rejected("wallet disconnected".to_string())));
        }
        Ok(())
    }
}
