pub mod sui;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::block_chain::utils::ExecutionStatus;
use crate::config::{AppConfig, Network};
use crate::subscription::models::Subscription;

/// Blockchain read interface used by the balance tracker, the subscription
/// query and the executor's status poll.
#[async_trait]
pub trait Blockchain: Send + Sync {
    /// Get blockchain name
    fn get_name(&self) -> &'static str;

    /// Total SUI balance of `owner`, in MIST.
    async fn get_balance(&self, owner: &str) -> Result<u128>;

    /// Subscription objects owned by `owner`.
    async fn get_subscriptions(&self, owner: &str) -> Result<Vec<Subscription>>;

    /// Execution status of a submitted transaction, `None` while the node has
    /// no effects for it yet.
    async fn get_transaction_status(&self, digest: &str) -> Result<Option<ExecutionStatus>>;
}

/// One RPC client per configured network.
#[derive(Clone, Default)]
pub struct ChainClients {
    clients: HashMap<Network, Arc<dyn Blockchain>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a Sui client for every configured network, sharing one HTTP pool.
    /// Every request is bounded by `rpc_timeout` so a hung node cannot stall
    /// the background loops.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.rpc_timeout)
            .build()
            .context("Cannot build RPC HTTP client")?;
        let mut clients = Self::new();
        for (network, network_config) in &config.networks {
            let chain: Arc<dyn Blockchain> = Arc::new(sui::SuiBlockchain::new(network_config, http.clone()));
            info!(
                network = %network,
                chain = chain.get_name(),
                rpc = %network_config.full_node_url,
                "RPC client ready"
            );
            clients.insert(*network, chain);
        }
        Ok(clients)
    }

    pub fn insert(&mut self, network: Network, chain: Arc<dyn Blockchain>) {
        self.clients.insert(network, chain);
    }

    pub fn with(mut self, network: Network, chain: Arc<dyn Blockchain>) -> Self {
        self.insert(network, chain);
        self
    }

    pub fn get(&self, network: Network) -> Option<Arc<dyn Blockchain>> {
        self.clients.get(&network).cloned()
    }
}
