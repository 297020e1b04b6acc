use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::block_chain::utils::TransactionResponse;
use crate::block_chain::ChainClients;
use crate::notifications::Notifier;
use crate::transactions::builder::BuiltTransaction;
use crate::wallet::SignAndSubmit;

const STATUS_POLL_ATTEMPTS: u32 = 5;
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub show_pending: bool,
    pub pending_message: String,
    pub success_message: String,
    pub error_message: String,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            show_pending: true,
            pending_message: "Processing transaction...".to_string(),
            success_message: "Transaction successful!".to_string(),
            error_message: "Transaction failed".to_string(),
        }
    }
}

impl ExecuteOptions {
    pub fn with_messages(pending: &str, success: &str, error: &str) -> Self {
        Self {
            show_pending: true,
            pending_message: pending.to_string(),
            success_message: success.to_string(),
            error_message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Success { response: TransactionResponse },
    Failure { message: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ExecutionOutcome::Failure { message: message.into() }
    }
}

/// Single submission path for every mutating transaction.
pub struct TransactionExecutor {
    notifier: Arc<dyn Notifier>,
    chains: ChainClients,
    signature_timeout: Duration,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl TransactionExecutor {
    pub fn new(notifier: Arc<dyn Notifier>, chains: ChainClients, signature_timeout: Duration) -> Self {
        Self {
            notifier,
            chains,
            signature_timeout,
            poll_attempts: STATUS_POLL_ATTEMPTS,
            poll_interval: STATUS_POLL_INTERVAL,
        }
    }

    pub fn with_status_poll(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// Hand the transaction to the signer and report the outcome. Never
    /// retries and never returns an error: failures become a notification
    /// and a `Failure` outcome.
    pub async fn execute<S>(&self, transaction: &BuiltTransaction, signer: &S, options: ExecuteOptions) -> ExecutionOutcome
    where
        S: SignAndSubmit + ?Sized,
    {
        let notification = options
            .show_pending
            .then(|| self.notifier.pending(&options.pending_message));

        let submitted = match timeout(self.signature_timeout, signer.sign_and_submit(transaction)).await {
            Ok(Ok(response)) => self.confirm(transaction, response).await,
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "wallet did not respond within {} seconds",
                self.signature_timeout.as_secs()
            )),
        };

        match submitted {
            Ok(response) => {
                info!(digest = %response.digest, operation = ?transaction.operation, "transaction executed");
                if options.show_pending {
                    self.notifier.success(notification, &options.success_message);
                }
                ExecutionOutcome::Success { response }
            }
            Err(cause) => {
                error!(operation = ?transaction.operation, error = %cause, "transaction failed");
                let message = format!("{}: {}", options.error_message, cause);
                self.notifier.error(notification, &message);
                ExecutionOutcome::Failure { message }
            }
        }
    }

    /// Check the effects status, polling the node when the wallet only
    /// returned a digest.
    async fn confirm(&self, transaction: &BuiltTransaction, response: TransactionResponse) -> Result<TransactionResponse, String> {
        if let Some(status) = response.status() {
            return if status.is_success() {
                Ok(response)
            } else {
                Err(status.error.clone().unwrap_or_else(|| "Transaction execution failed".to_string()))
            };
        }

        let chain = self
            .chains
            .get(transaction.network)
            .ok_or_else(|| format!("no RPC client for {}", transaction.network))?;

        for attempt in 1..=self.poll_attempts {
            match chain.get_transaction_status(&response.digest).await {
                Ok(Some(status)) if status.is_success() => return Ok(response),
                Ok(Some(status)) => {
                    return Err(status.error.unwrap_or_else(|| "Transaction execution failed".to_string()))
                }
                Ok(None) => {}
                Err(e) => warn!(digest = %response.digest, attempt, error = %e, "transaction status poll failed"),
            }
            if attempt < self.poll_attempts {
                sleep(self.poll_interval).await;
            }
        }

        Err(format!("status of transaction {} could not be confirmed", response.digest))
    }
}
