use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::block_chain::utils::{ExecutionStatus, TransactionResponse, SUI_COIN_TYPE};
use crate::block_chain::Blockchain;
use crate::config::NetworkConfig;
use crate::subscription::models::Subscription;

const OWNED_OBJECTS_PAGE_SIZE: u64 = 50;

/// Sui blockchain implementation
pub struct SuiBlockchain {
    rpc_url: String,
    package_id: String,
    module: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SuiBalance {
    #[serde(rename = "totalBalance")]
    total_balance: String,
}

#[derive(Debug, Deserialize)]
struct SuiObjectPage {
    data: Vec<Value>,
    #[serde(rename = "nextCursor")]
    next_cursor: Option<Value>,
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
}

impl SuiBlockchain {
    pub fn new(config: &NetworkConfig, client: Client) -> Self {
        Self {
            rpc_url: config.full_node_url.clone(),
            package_id: config.package_id.clone(),
            module: config.module.clone(),
            client,
        }
    }

    fn subscription_type(&self) -> String {
        format!("{}::{}::Subscription", self.package_id, self.module)
    }

    /// Send one JSON-RPC request and return its `result` member.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Sui RPC {} request failed", method))?;

        if !response.status().is_success() {
            return Err(anyhow!("Sui RPC request failed: {}", response.status()));
        }

        let response_json: Value = response.json().await?;
        rpc_result(response_json)
    }
}

fn rpc_result(mut response_json: Value) -> Result<Value> {
    if let Some(error) = response_json.get("error") {
        return Err(anyhow!("Sui RPC returned error: {}", error));
    }

    match response_json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(anyhow!("Cannot parse Sui RPC response")),
    }
}

fn parse_balance(result: Value) -> Result<u128> {
    let balance: SuiBalance = serde_json::from_value(result)?;
    balance
        .total_balance
        .parse()
        .with_context(|| format!("Cannot parse balance: {}", balance.total_balance))
}

/// Decode a page of owned objects; entries that fail to decode are skipped.
fn parse_subscriptions(page: &SuiObjectPage, owner: &str) -> Vec<Subscription> {
    page.data
        .iter()
        .filter_map(|entry| match Subscription::from_object(entry, owner) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(owner = %owner, error = %e, "skipping undecodable subscription object");
                None
            }
        })
        .collect()
}

fn parse_transaction_status(result: Value) -> Result<Option<ExecutionStatus>> {
    let response: TransactionResponse = serde_json::from_value(result)?;
    Ok(response.effects.map(|effects| effects.status))
}

#[async_trait]
impl Blockchain for SuiBlockchain {
    fn get_name(&self) -> &'static str {
        "sui"
    }

    async fn get_balance(&self, owner: &str) -> Result<u128> {
        let result = self.rpc_call("suix_getBalance", json!([owner, SUI_COIN_TYPE])).await?;
        parse_balance(result)
    }

    async fn get_subscriptions(&self, owner: &str) -> Result<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        let mut cursor: Option<Value> = None;

        loop {
            let query = json!({
                "filter": { "StructType": self.subscription_type() },
                "options": { "showType": true, "showContent": true }
            });
            let result = self
                .rpc_call("suix_getOwnedObjects", json!([owner, query, cursor, OWNED_OBJECTS_PAGE_SIZE]))
                .await?;
            let page: SuiObjectPage = serde_json::from_value(result)?;
            subscriptions.extend(parse_subscriptions(&page, owner));

            match page.next_cursor {
                Some(next) if page.has_next_page && !next.is_null() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(owner = %owner, count = subscriptions.len(), "fetched subscription objects");
        Ok(subscriptions)
    }

    async fn get_transaction_status(&self, digest: &str) -> Result<Option<ExecutionStatus>> {
        let result = self
            .rpc_call("sui_getTransactionBlock", json!([digest, { "showEffects": true }]))
            .await?;
        parse_transaction_status(result)
    }
}
