use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::block_chain::utils::mist_to_sui;
use crate::block_chain::ChainClients;
use crate::config::Network;
use crate::wallet::WalletSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: Option<String>,
    pub network: Network,
    /// SUI with four decimals.
    pub amount: String,
    pub mist: String,
}

impl Balance {
    pub fn zero(address: Option<String>, network: Network) -> Self {
        Self {
            address,
            network,
            amount: "0".to_string(),
            mist: "0".to_string(),
        }
    }

    fn from_mist(address: String, network: Network, mist: u128) -> Self {
        Self {
            address: Some(address),
            network,
            amount: mist_to_sui(mist),
            mist: mist.to_string(),
        }
    }
}

/// Keeps the connected account's SUI balance current. Read failures degrade
/// to `"0"` and are only logged.
pub struct BalanceTracker {
    chains: ChainClients,
    session: watch::Receiver<WalletSession>,
    current: RwLock<Balance>,
    poll_interval: Duration,
}

impl BalanceTracker {
    pub fn new(chains: ChainClients, session: watch::Receiver<WalletSession>, poll_interval: Duration) -> Self {
        let network = session.borrow().network;
        Self {
            chains,
            session,
            current: RwLock::new(Balance::zero(None, network)),
            poll_interval,
        }
    }

    pub fn current(&self) -> Balance {
        self.current.read().clone()
    }

    /// Fetch for the current session. The result is dropped if the session
    /// moved to another address or network while the read was in flight.
    pub async fn refresh(&self) {
        let snapshot = self.session.borrow().clone();
        let Some(address) = snapshot.connected_address().map(str::to_string) else {
            *self.current.write() = Balance::zero(None, snapshot.network);
            return;
        };

        let balance = match self.chains.get(snapshot.network) {
            Some(chain) => match chain.get_balance(&address).await {
                Ok(mist) => Balance::from_mist(address.clone(), snapshot.network, mist),
                Err(e) => {
                    warn!(address = %address, network = %snapshot.network, error = %e, "Error fetching balance");
                    Balance::zero(Some(address.clone()), snapshot.network)
                }
            },
            None => {
                warn!(network = %snapshot.network, "no RPC client for network");
                Balance::zero(Some(address.clone()), snapshot.network)
            }
        };

        let latest = self.session.borrow().clone();
        if latest.connected_address() != Some(address.as_str()) || latest.network != snapshot.network {
            debug!(address = %address, "discarding balance for previous session");
            return;
        }
        *self.current.write() = balance;
    }

    /// Poll on an interval and immediately on every session change.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let mut session = self.session.clone();
        tokio::spawn(async move {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = session.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        ticker.reset();
                    }
                    _ = shutdown.changed() => break,
                }
                self.refresh().await;
            }
            debug!("balance tracker stopped");
        })
    }
}
