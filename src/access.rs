//! Access decisions for tier-gated content. Everything here is pure: the
//! caller supplies the subscription state and the clock.

use serde::Serialize;

use crate::subscription::models::Subscription;
use crate::subscription::query::SubscriptionState;
use crate::subscription::tiers::SubscriptionTier;

/// State of a gated region: `Unknown` until the subscription resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    Unknown,
    Granted,
    Denied,
}

/// Tier check against a resolved subscription. Expiry is re-checked against
/// `now_ms` even when the cached record still says active.
pub fn subscription_grants(subscription: Option<&Subscription>, required: SubscriptionTier, now_ms: i64) -> bool {
    match subscription {
        Some(subscription) => subscription.is_current(now_ms) && subscription.tier >= required,
        None => false,
    }
}

/// `false` while loading, so nothing is granted before the real state is known.
pub fn has_access(state: &SubscriptionState, required: SubscriptionTier, now_ms: i64) -> bool {
    match state {
        SubscriptionState::Loading => false,
        SubscriptionState::Resolved(subscription) => subscription_grants(subscription.as_ref(), required, now_ms),
    }
}

pub fn evaluate(state: &SubscriptionState, required: SubscriptionTier, now_ms: i64) -> AccessState {
    match state {
        SubscriptionState::Loading => AccessState::Unknown,
        resolved if has_access(resolved, required, now_ms) => AccessState::Granted,
        _ => AccessState::Denied,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessReport {
    pub required_tier: SubscriptionTier,
    pub state: AccessState,
    pub has_access: bool,
    pub is_loading: bool,
    pub subscription_tier: Option<SubscriptionTier>,
    pub is_subscribed: bool,
}

impl AccessReport {
    pub fn new(state: &SubscriptionState, required: SubscriptionTier, now_ms: i64) -> Self {
        let subscription = match state {
            SubscriptionState::Resolved(Some(subscription)) => Some(subscription),
            _ => None,
        };
        let access = evaluate(state, required, now_ms);
        Self {
            required_tier: required,
            state: access,
            has_access: access == AccessState::Granted,
            is_loading: access == AccessState::Unknown,
            subscription_tier: subscription.map(|s| s.tier),
            is_subscribed: subscription.map_or(false, |s| s.is_current(now_ms)),
        }
    }
}
