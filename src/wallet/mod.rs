pub mod bridge;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::block_chain::utils::{normalize_address, TransactionResponse};
use crate::config::Network;
use crate::notifications::Notifier;
use crate::transactions::builder::BuiltTransaction;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet extension detected")]
    NotInstalled,
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Network {0} is not configured")]
    UnsupportedNetwork(Network),
    #[error("Unknown signature request: {0}")]
    UnknownRequest(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub is_connected: bool,
    pub address: Option<String>,
    pub network: Network,
}

impl WalletSession {
    pub fn disconnected(network: Network) -> Self {
        Self {
            is_connected: false,
            address: None,
            network,
        }
    }

    /// Address of a connected session.
    pub fn connected_address(&self) -> Option<&str> {
        if self.is_connected {
            self.address.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectRequest {
    pub address: Option<String>,
}

/// Signing and broadcasting capability of a wallet.
#[async_trait]
pub trait SignAndSubmit: Send + Sync {
    async fn sign_and_submit(&self, transaction: &BuiltTransaction) -> Result<TransactionResponse, WalletError>;
}

/// Wallet extension as seen from this side: connect, disconnect, sign.
#[async_trait]
pub trait WalletBridge: SignAndSubmit {
    /// Returns the connected account address.
    async fn connect(&self, request: ConnectRequest) -> Result<String, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;
}

/// Owns the wallet session. Everyone else reads snapshots or watches it.
pub struct WalletSessionAdapter {
    bridge: Arc<dyn WalletBridge>,
    notifier: Arc<dyn Notifier>,
    session: watch::Sender<WalletSession>,
    networks: Vec<Network>,
}

impl WalletSessionAdapter {
    pub fn new(
        bridge: Arc<dyn WalletBridge>,
        notifier: Arc<dyn Notifier>,
        network: Network,
        networks: Vec<Network>,
    ) -> Self {
        let (session, _) = watch::channel(WalletSession::disconnected(network));
        Self {
            bridge,
            notifier,
            session,
            networks,
        }
    }

    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    pub fn bridge(&self) -> Arc<dyn WalletBridge> {
        self.bridge.clone()
    }

    /// Connect through the bridge. Failures are notified and leave the
    /// previous session in place; retrying is up to the user.
    pub async fn connect(&self, request: ConnectRequest) -> bool {
        let address = match self.bridge.connect(request).await {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "wallet connect failed");
                self.notifier.error(None, &format!("Failed to connect wallet: {}", e));
                return false;
            }
        };

        let Some(address) = normalize_address(&address) else {
            let e = WalletError::InvalidAddress(address);
            warn!(error = %e, "wallet connect failed");
            self.notifier.error(None, &format!("Failed to connect wallet: {}", e));
            return false;
        };

        info!(address = %address, "wallet connected");
        self.session.send_modify(|session| {
            session.is_connected = true;
            session.address = Some(address);
        });
        self.notifier.success(None, "Wallet connected successfully");
        true
    }

    pub async fn disconnect(&self) -> bool {
        if let Err(e) = self.bridge.disconnect().await {
            warn!(error = %e, "wallet disconnect failed");
            self.notifier.error(None, &format!("Failed to disconnect wallet: {}", e));
            return false;
        }

        info!("wallet disconnected");
        self.session.send_modify(|session| {
            session.is_connected = false;
            session.address = None;
        });
        self.notifier.success(None, "Wallet disconnected");
        true
    }

    pub fn switch_network(&self, network: Network) -> Result<(), WalletError> {
        if !self.networks.contains(&network) {
            return Err(WalletError::UnsupportedNetwork(network));
        }
        self.session.send_if_modified(|session| {
            if session.network == network {
                return false;
            }
            info!(from = %session.network, to = %network, "switching network");
            session.network = network;
            true
        });
        Ok(())
    }
}
