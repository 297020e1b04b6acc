use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MODULE: &str = "suistream";
const DEFAULT_EXPLORER: &str = "https://suiexplorer.com";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8088";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("no configuration found for network: {0}")]
    MissingNetwork(Network),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Sui network the wallet session points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
    Devnet,
    Local,
}

impl Network {
    pub const ALL: [Network; 4] = [Network::Testnet, Network::Mainnet, Network::Devnet, Network::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            Network::Testnet => "SUI_TESTNET",
            Network::Mainnet => "SUI_MAINNET",
            Network::Devnet => "SUI_DEVNET",
            Network::Local => "SUI_LOCAL",
        }
    }

    /// Public full node used when no RPC override is configured.
    pub fn default_rpc(&self) -> &'static str {
        match self {
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Local => "http://127.0.0.1:9000",
        }
    }

    fn default_faucet(&self) -> Option<&'static str> {
        match self {
            Network::Testnet => Some("https://faucet.testnet.sui.io/gas"),
            Network::Devnet => Some("https://faucet.devnet.sui.io/gas"),
            Network::Local => Some("http://127.0.0.1:9123/gas"),
            Network::Mainnet => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Contract addresses and endpoints for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub package_id: String,
    pub module: String,
    pub platform_wallet: String,
    pub full_node_url: String,
    pub faucet_url: Option<String>,
    pub explorer_url: String,
}

impl NetworkConfig {
    pub fn address_url(&self, network: Network, address: &str) -> String {
        format!("{}/address/{}?network={}", self.explorer_url, address, network)
    }

    pub fn transaction_url(&self, network: Network, digest: &str) -> String {
        format!("{}/txblock/{}?network={}", self.explorer_url, digest, network)
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: Network,
    pub networks: HashMap<Network, NetworkConfig>,
    pub bind_addr: String,
    pub balance_poll_interval: Duration,
    pub subscription_stale_after: Duration,
    pub subscription_refetch_interval: Duration,
    pub signature_timeout: Duration,
    pub rpc_timeout: Duration,
}

impl AppConfig {
    /// Reads the process environment. A selected network without package id
    /// and platform wallet is a startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("SUI_NETWORK") {
            Some(value) => value.parse()?,
            None => Network::Testnet,
        };
        let module = lookup("SUI_MODULE").unwrap_or_else(|| DEFAULT_MODULE.to_string());

        let mut networks = HashMap::new();
        for candidate in Network::ALL {
            let prefix = candidate.env_prefix();
            let package_id = lookup(&format!("{}_PACKAGE_ID", prefix));
            let platform_wallet = lookup(&format!("{}_PLATFORM_WALLET", prefix));
            if let (Some(package_id), Some(platform_wallet)) = (package_id, platform_wallet) {
                networks.insert(
                    candidate,
                    NetworkConfig {
                        package_id,
                        module: module.clone(),
                        platform_wallet,
                        full_node_url: lookup(&format!("{}_RPC", prefix))
                            .unwrap_or_else(|| candidate.default_rpc().to_string()),
                        faucet_url: lookup(&format!("{}_FAUCET", prefix))
                            .or_else(|| candidate.default_faucet().map(str::to_string)),
                        explorer_url: lookup(&format!("{}_EXPLORER", prefix))
                            .unwrap_or_else(|| DEFAULT_EXPLORER.to_string()),
                    },
                );
            }
        }

        if !networks.contains_key(&network) {
            return Err(ConfigError::MissingNetwork(network));
        }

        Ok(Self {
            network,
            networks,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            balance_poll_interval: seconds(&lookup, "BALANCE_POLL_SECS", 30)?,
            subscription_stale_after: seconds(&lookup, "SUBSCRIPTION_STALE_SECS", 60)?,
            subscription_refetch_interval: seconds(&lookup, "SUBSCRIPTION_REFETCH_SECS", 60)?,
            signature_timeout: seconds(&lookup, "SIGNATURE_TIMEOUT_SECS", 120)?,
            rpc_timeout: seconds(&lookup, "RPC_TIMEOUT_SECS", 15)?,
        })
    }

    pub fn network_config(&self, network: Network) -> Result<&NetworkConfig, ConfigError> {
        self.networks.get(&network).ok_or(ConfigError::MissingNetwork(network))
    }

    pub fn current(&self) -> &NetworkConfig {
        // from_lookup refuses to build without the selected network
        &self.networks[&self.network]
    }

    pub fn configured_networks(&self) -> Vec<Network> {
        Network::ALL.into_iter().filter(|n| self.networks.contains_key(n)).collect()
    }
}

fn seconds<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value }),
        },
        None => Ok(Duration::from_secs(default)),
    }
}
