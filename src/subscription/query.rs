use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::block_chain::ChainClients;
use crate::config::Network;
use crate::subscription::cache::QueryCache;
use crate::subscription::models::{latest, Subscription};
use crate::wallet::WalletSession;

const SUBSCRIPTION_QUERY: &str = "subscription";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub operation: &'static str,
    pub network: Network,
    pub address: String,
}

impl QueryKey {
    pub fn subscription(network: Network, address: &str) -> Self {
        Self {
            operation: SUBSCRIPTION_QUERY,
            network,
            address: address.to_string(),
        }
    }
}

/// What the caller knows about a subscription right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "subscription", rename_all = "lowercase")]
pub enum SubscriptionState {
    Loading,
    Resolved(Option<Subscription>),
}

/// Counts a running read for its key until dropped, including when the
/// caller abandons the read mid-flight.
struct InFlight<'a> {
    counts: &'a Mutex<HashMap<QueryKey, usize>>,
    key: QueryKey,
}

impl<'a> InFlight<'a> {
    fn enter(counts: &'a Mutex<HashMap<QueryKey, usize>>, key: QueryKey) -> Self {
        *counts.lock().entry(key.clone()).or_insert(0) += 1;
        Self { counts, key }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&self.key);
            }
        }
    }
}

/// Cached, fail-closed view of the caller's on-chain subscription.
pub struct SubscriptionQuery {
    chains: ChainClients,
    cache: QueryCache<QueryKey, Option<Subscription>>,
    in_flight: Mutex<HashMap<QueryKey, usize>>,
    refetch_interval: Duration,
}

impl SubscriptionQuery {
    pub fn new(chains: ChainClients, stale_after: Duration, refetch_interval: Duration) -> Self {
        Self {
            chains,
            cache: QueryCache::new(stale_after),
            in_flight: Mutex::new(HashMap::new()),
            refetch_interval,
        }
    }

    pub fn cache(&self) -> &QueryCache<QueryKey, Option<Subscription>> {
        &self.cache
    }

    /// Fresh cached value, otherwise a chain read. No address means no
    /// subscription; read failures also resolve to `None`.
    pub async fn get_subscription_status(&self, network: Network, address: Option<&str>) -> Option<Subscription> {
        let address = address?;
        let key = QueryKey::subscription(network, address);
        if let Some(cached) = self.cache.get_fresh(&key) {
            return cached;
        }
        self.fetch(key).await
    }

    /// Chain read that ignores the staleness window.
    pub async fn refetch(&self, network: Network, address: &str) -> Option<Subscription> {
        self.fetch(QueryKey::subscription(network, address)).await
    }

    /// `Loading` until a value for the key exists in the cache.
    pub fn status(&self, network: Network, address: Option<&str>) -> SubscriptionState {
        let Some(address) = address else {
            return SubscriptionState::Resolved(None);
        };
        match self.cache.get(&QueryKey::subscription(network, address)) {
            Some(entry) => SubscriptionState::Resolved(entry.value),
            None => SubscriptionState::Loading,
        }
    }

    pub fn is_fetching(&self, network: Network, address: &str) -> bool {
        self.in_flight.lock().contains_key(&QueryKey::subscription(network, address))
    }

    pub fn invalidate(&self, network: Network, address: &str) {
        debug!(address = %address, network = %network, "invalidating subscription cache");
        self.cache.invalidate(&QueryKey::subscription(network, address));
    }

    /// Start a resolution unless one is already running for the key.
    pub fn resolve_in_background(self: &Arc<Self>, network: Network, address: &str) {
        if self.is_fetching(network, address) {
            return;
        }
        let query = self.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            query.refetch(network, &address).await;
        });
    }

    async fn fetch(&self, key: QueryKey) -> Option<Subscription> {
        let generation = self.cache.generation(&key);
        let in_flight = InFlight::enter(&self.in_flight, key.clone());

        let result = match self.chains.get(key.network) {
            Some(chain) => match chain.get_subscriptions(&key.address).await {
                Ok(subscriptions) => latest(subscriptions),
                Err(e) => {
                    warn!(address = %key.address, network = %key.network, error = %e, "Error fetching subscription");
                    None
                }
            },
            None => {
                warn!(network = %key.network, "no RPC client for network");
                None
            }
        };

        drop(in_flight);
        if !self.cache.insert_if_current(key.clone(), generation, result.clone()) {
            debug!(address = %key.address, "discarding subscription read started before invalidation");
        }
        result
    }

    /// Resolve the session's subscription on every session change and again
    /// every refetch interval, independent of the staleness window.
    pub fn spawn_refetch(
        self: Arc<Self>,
        mut session: watch::Receiver<WalletSession>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.refetch_interval);
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

                let current = session.borrow().clone();
                if let Some(address) = current.connected_address() {
                    self.refetch(current.network, address).await;
                }
            }
            debug!("subscription refetch stopped");
        })
    }
}
