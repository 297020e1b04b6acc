#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;

use suistream_access::block_chain::utils::{normalize_address, ExecutionStatus, TransactionResponse};
use suistream_access::block_chain::{Blockchain, ChainClients};
use suistream_access::config::{AppConfig, Network, NetworkConfig};
use suistream_access::subscription::models::Subscription;
use suistream_access::subscription::tiers::SubscriptionTier;
use suistream_access::transactions::builder::BuiltTransaction;
use suistream_access::wallet::{ConnectRequest, SignAndSubmit, WalletBridge, WalletError};

pub const NOW_SECS: u64 = 1_700_000_000;

pub fn address(short: &str) -> String {
    normalize_address(short).unwrap()
}

pub fn app_config() -> AppConfig {
    let vars: HashMap<&str, &str> = [
        ("SUI_TESTNET_PACKAGE_ID", "0xabc"),
        ("SUI_TESTNET_PLATFORM_WALLET", "0xfee"),
        ("SUI_DEVNET_PACKAGE_ID", "0xabd"),
        ("SUI_DEVNET_PLATFORM_WALLET", "0xfee"),
    ]
    .into_iter()
    .collect();
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub fn network_config() -> NetworkConfig {
    app_config().current().clone()
}

pub fn subscription(tier: SubscriptionTier, owner: &str, expires_at: u64) -> Subscription {
    Subscription {
        id: "0x5".to_string(),
        tier,
        user_address: owner.to_string(),
        start_date: NOW_SECS,
        expires_at,
        is_active: true,
        auto_renew: false,
    }
}

pub fn response(digest: &str, status: Option<&str>) -> TransactionResponse {
    let value = match status {
        Some(status) => json!({ "digest": digest, "effects": { "status": { "status": status } } }),
        None => json!({ "digest": digest }),
    };
    serde_json::from_value(value).unwrap()
}

/// In-memory chain with scripted answers.
#[derive(Default)]
pub struct FakeChain {
    pub balance: Mutex<Option<u128>>,
    pub subscriptions: Mutex<Option<Vec<Subscription>>>,
    pub statuses: Mutex<VecDeque<Option<ExecutionStatus>>>,
    pub balance_calls: AtomicUsize,
    pub subscription_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub balance_gate: Mutex<Option<Arc<Notify>>>,
    pub subscription_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_balance(&self, mist: Option<u128>) {
        *self.balance.lock() = mist;
    }

    pub fn set_subscriptions(&self, subscriptions: Option<Vec<Subscription>>) {
        *self.subscriptions.lock() = subscriptions;
    }

    pub fn gate_subscriptions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.subscription_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn open_subscriptions(&self) {
        *self.subscription_gate.lock() = None;
    }

    pub fn push_status(&self, status: Option<&str>) {
        self.statuses.lock().push_back(status.map(|status| ExecutionStatus {
            status: status.to_string(),
            error: None,
        }));
    }

    pub fn clients(self: &Arc<Self>) -> ChainClients {
        ChainClients::new().with(Network::Testnet, self.clone())
    }
}

#[async_trait]
impl Blockchain for FakeChain {
    fn get_name(&self) -> &'static str {
        "fake"
    }

    async fn get_balance(&self, _owner: &str) -> Result<u128> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.balance_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.balance.lock().ok_or_else(|| anyhow!("connection refused"))
    }

    async fn get_subscriptions(&self, _owner: &str) -> Result<Vec<Subscription>> {
        self.subscription_calls.fetch_add(1, Ordering::SeqCst);
        // answer with the state at request time, even if released later
        let answer = self.subscriptions.lock().clone();
        let gate = self.subscription_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        answer.ok_or_else(|| anyhow!("Sui RPC returned error: timeout"))
    }

    async fn get_transaction_status(&self, _digest: &str) -> Result<Option<ExecutionStatus>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statuses.lock().pop_front().flatten())
    }
}

pub enum SubmitBehaviour {
    Respond(Result<TransactionResponse, WalletError>),
    Hang,
}

/// Wallet that answers from a script and records what it was asked to sign.
pub struct ScriptedWallet {
    pub connect_results: Mutex<VecDeque<Result<String, WalletError>>>,
    pub submit: Mutex<SubmitBehaviour>,
    pub submitted: Mutex<Vec<BuiltTransaction>>,
}

impl ScriptedWallet {
    pub fn new(submit: SubmitBehaviour) -> Arc<Self> {
        Arc::new(Self {
            connect_results: Mutex::new(VecDeque::new()),
            submit: Mutex::new(submit),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn approving() -> Arc<Self> {
        Self::new(SubmitBehaviour::Respond(Ok(response("D1gest", Some("success")))))
    }

    pub fn push_connect(&self, result: Result<String, WalletError>) {
        self.connect_results.lock().push_back(result);
    }

    pub fn submitted(&self) -> Vec<BuiltTransaction> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl SignAndSubmit for ScriptedWallet {
    async fn sign_and_submit(&self, transaction: &BuiltTransaction) -> Result<TransactionResponse, WalletError> {
        self.submitted.lock().push(transaction.clone());
        let answer = match &*self.submit.lock() {
            SubmitBehaviour::Respond(result) => Some(result.clone()),
            SubmitBehaviour::Hang => None,
        };
        match answer {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl WalletBridge for ScriptedWallet {
    async fn connect(&self, request: ConnectRequest) -> Result<String, WalletError> {
        match self.connect_results.lock().pop_front() {
            Some(result) => result,
            None => request.address.ok_or(WalletError::NotInstalled),
        }
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(())
    }
}
