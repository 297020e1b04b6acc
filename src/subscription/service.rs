use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::block_chain::utils::now_ms;
use crate::config::Network;
use crate::notifications::Notifier;
use crate::subscription::query::SubscriptionQuery;
use crate::transactions::builder::{parse_tier, BuildError, BuiltTransaction, TransactionBuilder};
use crate::transactions::executor::{ExecuteOptions, ExecutionOutcome, TransactionExecutor};
use crate::wallet::{WalletSession, WalletSessionAdapter};

/// Subscribe, renew, cancel and auto-renew for the connected wallet.
/// Every path ends in an `ExecutionOutcome`; callers need no error handling.
pub struct SubscriptionService {
    wallet: Arc<WalletSessionAdapter>,
    query: Arc<SubscriptionQuery>,
    executor: Arc<TransactionExecutor>,
    notifier: Arc<dyn Notifier>,
    builders: HashMap<Network, Result<TransactionBuilder, BuildError>>,
}

impl SubscriptionService {
    pub fn new(
        wallet: Arc<WalletSessionAdapter>,
        query: Arc<SubscriptionQuery>,
        executor: Arc<TransactionExecutor>,
        notifier: Arc<dyn Notifier>,
        builders: HashMap<Network, Result<TransactionBuilder, BuildError>>,
    ) -> Self {
        Self {
            wallet,
            query,
            executor,
            notifier,
            builders,
        }
    }

    pub async fn subscribe(&self, tier: u8, months: u64) -> ExecutionOutcome {
        let (session, address) = match self.connected() {
            Ok(connected) => connected,
            Err(outcome) => return outcome,
        };
        let built = parse_tier(tier).and_then(|tier| self.builder(session.network)?.build_subscribe(tier, months));
        let options = ExecuteOptions::with_messages(
            "Processing subscription...",
            "Subscription successful!",
            "Subscription failed",
        );
        self.run(&session, &address, built, options).await
    }

    pub async fn renew(&self, months: u64) -> ExecutionOutcome {
        let (session, address) = match self.connected() {
            Ok(connected) => connected,
            Err(outcome) => return outcome,
        };
        let Some(subscription) = self.query.get_subscription_status(session.network, Some(&address)).await else {
            return self.reject("No subscription to renew");
        };
        let built = self
            .builder(session.network)
            .and_then(|builder| builder.build_renew(&subscription.id, subscription.tier, months));
        let success = format!(
            "Subscription renewed for {} month{}!",
            months,
            if months == 1 { "" } else { "s" }
        );
        let options = ExecuteOptions::with_messages("Renewing subscription...", &success, "Failed to renew subscription");
        self.run(&session, &address, built, options).await
    }

    /// The subscription stays usable until it expires.
    pub async fn cancel(&self) -> ExecutionOutcome {
        let (session, address) = match self.connected() {
            Ok(connected) => connected,
            Err(outcome) => return outcome,
        };
        let Some(subscription) = self.query.get_subscription_status(session.network, Some(&address)).await else {
            return self.reject("No subscription to cancel");
        };
        let built = self
            .builder(session.network)
            .and_then(|builder| builder.build_cancel(&subscription.id));
        let options = ExecuteOptions::with_messages(
            "Cancelling subscription...",
            "Subscription cancelled successfully",
            "Failed to cancel subscription",
        );
        self.run(&session, &address, built, options).await
    }

    pub async fn set_auto_renew(&self, enabled: bool) -> ExecutionOutcome {
        let (session, address) = match self.connected() {
            Ok(connected) => connected,
            Err(outcome) => return outcome,
        };
        let Some(subscription) = self.query.get_subscription_status(session.network, Some(&address)).await else {
            return self.reject("No subscription to update");
        };
        let built = self
            .builder(session.network)
            .and_then(|builder| builder.build_set_auto_renew(&subscription.id, enabled));
        let options = ExecuteOptions::with_messages(
            "Updating auto-renewal...",
            "Auto-renewal settings updated",
            "Failed to update auto-renewal settings",
        );
        self.run(&session, &address, built, options).await
    }

    /// Records a view on chain. Needs a subscription that has not expired;
    /// the tier check itself is done by the Move module.
    pub async fn view_content(&self, content_id: &str) -> ExecutionOutcome {
        let (session, address) = match self.connected() {
            Ok(connected) => connected,
            Err(outcome) => return outcome,
        };
        let subscription = match self.query.get_subscription_status(session.network, Some(&address)).await {
            Some(subscription) if subscription.is_current(now_ms()) => subscription,
            _ => return self.reject("An active subscription is required to view content"),
        };
        let built = self
            .builder(session.network)
            .and_then(|builder| builder.build_view_content(content_id, &subscription.id));
        let options = ExecuteOptions::with_messages("Opening content...", "Enjoy watching!", "Failed to open content");
        self.run(&session, &address, built, options).await
    }

    fn connected(&self) -> Result<(WalletSession, String), ExecutionOutcome> {
        let session = self.wallet.session();
        match session.connected_address().map(str::to_string) {
            Some(address) => Ok((session, address)),
            None => Err(self.reject("Please connect your wallet first")),
        }
    }

    fn builder(&self, network: Network) -> Result<&TransactionBuilder, BuildError> {
        match self.builders.get(&network) {
            Some(Ok(builder)) => Ok(builder),
            Some(Err(e)) => Err(e.clone()),
            None => Err(BuildError::MissingConfig(format!("network {}", network))),
        }
    }

    fn reject(&self, message: &str) -> ExecutionOutcome {
        warn!(reason = %message, "subscription action refused");
        self.notifier.error(None, message);
        ExecutionOutcome::failure(message)
    }

    async fn run(
        &self,
        session: &WalletSession,
        address: &str,
        built: Result<BuiltTransaction, BuildError>,
        options: ExecuteOptions,
    ) -> ExecutionOutcome {
        let transaction = match built {
            Ok(transaction) => transaction,
            Err(e) => return self.reject(&format!("{}: {}", options.error_message, e)),
        };

        let bridge = self.wallet.bridge();
        let outcome = self.executor.execute(&transaction, bridge.as_ref(), options).await;

        if outcome.is_success() && transaction.operation.changes_subscription() {
            // invalidate first so the refetch cannot be answered from cache
            self.query.invalidate(session.network, address);
            info!(address = %address, operation = ?transaction.operation, "refreshing subscription after mutation");
            let query = self.query.clone();
            let network = session.network;
            let address = address.to_string();
            tokio::spawn(async move {
                query.refetch(network, &address).await;
            });
        }
        outcome
    }
}
