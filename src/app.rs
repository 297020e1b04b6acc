use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::balance::BalanceTracker;
use crate::block_chain::ChainClients;
use crate::config::AppConfig;
use crate::notifications::NotificationCenter;
use crate::subscription::query::SubscriptionQuery;
use crate::subscription::service::SubscriptionService;
use crate::transactions::builder::TransactionBuilder;
use crate::transactions::executor::TransactionExecutor;
use crate::wallet::bridge::BrowserBridge;
use crate::wallet::WalletSessionAdapter;

/// Every component, wired once at startup and shared by the HTTP handlers.
pub struct AppState {
    pub config: AppConfig,
    pub notifications: Arc<NotificationCenter>,
    pub bridge: Arc<BrowserBridge>,
    pub wallet: Arc<WalletSessionAdapter>,
    pub balance: Arc<BalanceTracker>,
    pub query: Arc<SubscriptionQuery>,
    pub subscriptions: Arc<SubscriptionService>,
}

impl AppState {
    pub fn new(config: AppConfig, chains: ChainClients) -> Self {
        let notifications = Arc::new(NotificationCenter::default());
        let bridge = Arc::new(BrowserBridge::new());
        let wallet = Arc::new(WalletSessionAdapter::new(
            bridge.clone(),
            notifications.clone(),
            config.network,
            config.configured_networks(),
        ));
        let balance = Arc::new(BalanceTracker::new(
            chains.clone(),
            wallet.watch(),
            config.balance_poll_interval,
        ));
        let query = Arc::new(SubscriptionQuery::new(
            chains.clone(),
            config.subscription_stale_after,
            config.subscription_refetch_interval,
        ));
        let executor = Arc::new(TransactionExecutor::new(
            notifications.clone(),
            chains,
            config.signature_timeout,
        ));

        let builders = config
            .networks
            .iter()
            .map(|(network, network_config)| {
                let builder = TransactionBuilder::new(*network, network_config);
                if let Err(e) = &builder {
                    warn!(network = %network, error = %e, "transactions disabled for network");
                }
                (*network, builder)
            })
            .collect();

        let subscriptions = Arc::new(SubscriptionService::new(
            wallet.clone(),
            query.clone(),
            executor,
            notifications.clone(),
            builders,
        ));

        Self {
            config,
            notifications,
            bridge,
            wallet,
            balance,
            query,
            subscriptions,
        }
    }

    /// Balance polling and periodic subscription refetch.
    pub fn spawn_background(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            self.balance.clone().spawn(shutdown.clone()),
            self.query.clone().spawn_refetch(self.wallet.watch(), shutdown),
        ]
    }
}
