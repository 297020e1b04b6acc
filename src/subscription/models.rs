use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block_chain::utils::{normalize_address, to_unix_seconds, value_as_bool, value_as_u64};
use crate::subscription::tiers::SubscriptionTier;

/// Cached read of an on-chain `Subscription` object. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub tier: SubscriptionTier,
    pub user_address: String,
    pub start_date: u64,
    pub expires_at: u64,
    pub is_active: bool,
    pub auto_renew: bool,
}

impl Subscription {
    /// Active flag re-checked against the clock; the cached flag alone may be stale.
    pub fn is_current(&self, now_ms: i64) -> bool {
        self.is_active && (self.expires_at as i128) * 1000 > now_ms as i128
    }

    /// Decode one entry of `suix_getOwnedObjects` (`{"data": {...}}` or the
    /// inner object) holding a `Subscription` Move object.
    pub fn from_object(object: &Value, owner: &str) -> Result<Self> {
        let data = object.get("data").unwrap_or(object);
        let id = data
            .get("objectId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Subscription object without objectId"))?;
        let fields = data
            .get("content")
            .and_then(|content| content.get("fields"))
            .ok_or_else(|| anyhow!("Subscription object {} has no content fields", id))?;

        let tier_raw = field(fields, &["tier"])
            .and_then(value_as_u64)
            .ok_or_else(|| anyhow!("Subscription {} has no tier", id))?;
        let tier = u8::try_from(tier_raw)
            .ok()
            .and_then(SubscriptionTier::from_u8)
            .ok_or_else(|| anyhow!("Subscription {} has unknown tier {}", id, tier_raw))?;

        let start_date = field(fields, &["start_date", "start_time", "started_at"])
            .and_then(value_as_u64)
            .map(to_unix_seconds)
            .unwrap_or(0);
        let expires_at = field(fields, &["expiry_date", "end_time", "expires_at"])
            .and_then(value_as_u64)
            .map(to_unix_seconds)
            .ok_or_else(|| anyhow!("Subscription {} has no expiry", id))?;

        let user_address = field(fields, &["user_address", "user", "subscriber", "owner"])
            .and_then(Value::as_str)
            .and_then(normalize_address)
            .or_else(|| normalize_address(owner))
            .unwrap_or_else(|| owner.to_string());

        Ok(Self {
            id: id.to_string(),
            tier,
            user_address,
            start_date,
            expires_at,
            is_active: field(fields, &["is_active", "active"]).and_then(value_as_bool).unwrap_or(false),
            auto_renew: field(fields, &["auto_renew"]).and_then(value_as_bool).unwrap_or(false),
        })
    }
}

fn field<'a>(fields: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| fields.get(*name))
}

/// With several subscription objects, the one expiring last is authoritative.
pub fn latest(subscriptions: Vec<Subscription>) -> Option<Subscription> {
    subscriptions.into_iter().max_by_key(|s| (s.expires_at, s.is_active))
}
