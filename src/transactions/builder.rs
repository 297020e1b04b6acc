use base64::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::block_chain::utils::{address_bytes, normalize_address};
use crate::config::{Network, NetworkConfig};
use crate::subscription::tiers::SubscriptionTier;

/// Gas budget attached to every transaction: 0.1 SUI.
pub const GAS_BUDGET_MIST: u64 = 100_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Invalid subscription tier: {0}")]
    InvalidTier(u8),
    #[error("Subscription length must be at least one month")]
    InvalidMonths,
    #[error("Payment for {months} months of {tier} overflows")]
    PriceOverflow { tier: SubscriptionTier, months: u64 },
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),
    #[error("Content id must not be empty")]
    EmptyContentId,
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

/// BCS-encoded pure argument of a Move call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PureValue {
    U8(u8),
    U64(u64),
    Bool(bool),
    Address([u8; 32]),
    String(String),
}

impl PureValue {
    pub fn type_tag(&self) -> &'static str {
        match self {
            PureValue::U8(_) => "u8",
            PureValue::U64(_) => "u64",
            PureValue::Bool(_) => "bool",
            PureValue::Address(_) => "address",
            PureValue::String(_) => "string",
        }
    }

    /// BCS: fixed-width little-endian integers, one byte for bool, raw 32
    /// address bytes, strings as ULEB128 length followed by UTF-8 bytes.
    pub fn to_bcs(&self) -> Vec<u8> {
        match self {
            PureValue::U8(v) => vec![*v],
            PureValue::U64(v) => v.to_le_bytes().to_vec(),
            PureValue::Bool(v) => vec![u8::from(*v)],
            PureValue::Address(bytes) => bytes.to_vec(),
            PureValue::String(s) => {
                let mut out = uleb128(s.len() as u64);
                out.extend_from_slice(s.as_bytes());
                out
            }
        }
    }

    fn display_value(&self) -> String {
        match self {
            PureValue::U8(v) => v.to_string(),
            PureValue::U64(v) => v.to_string(),
            PureValue::Bool(v) => v.to_string(),
            PureValue::Address(bytes) => format!("0x{}", hex::encode(bytes)),
            PureValue::String(s) => s.clone(),
        }
    }
}

fn uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

impl Serialize for PureValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PureValue", 3)?;
        state.serialize_field("type", self.type_tag())?;
        state.serialize_field("value", &self.display_value())?;
        state.serialize_field("bcs", &BASE64_STANDARD.encode(self.to_bcs()))?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Argument {
    GasCoin,
    Pure { value: PureValue },
    Object {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    Result { index: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Command {
    SplitCoins { coin: Argument, amounts: Vec<Argument> },
    TransferObjects { objects: Vec<Argument>, address: Argument },
    MoveCall { target: String, arguments: Vec<Argument> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Subscribe,
    CancelSubscription,
    RenewSubscription,
    SetAutoRenew,
    ViewContent,
}

impl Operation {
    pub fn function(&self) -> &'static str {
        match self {
            Operation::Subscribe => "subscribe",
            Operation::CancelSubscription => "cancel_subscription",
            Operation::RenewSubscription => "renew_subscription",
            Operation::SetAutoRenew => "set_auto_renew",
            Operation::ViewContent => "view_content",
        }
    }

    /// Whether a successful call changes the caller's subscription record.
    pub fn changes_subscription(&self) -> bool {
        !matches!(self, Operation::ViewContent)
    }
}

/// Unsigned programmable transaction, ready to hand to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    pub network: Network,
    pub operation: Operation,
    pub commands: Vec<Command>,
    pub gas_budget: u64,
}

impl BuiltTransaction {
    /// MIST split off the gas coin for the platform, if any.
    pub fn payment_amount(&self) -> Option<u64> {
        self.commands.iter().find_map(|command| match command {
            Command::SplitCoins { amounts, .. } => amounts.iter().find_map(|amount| match amount {
                Argument::Pure { value: PureValue::U64(v) } => Some(*v),
                _ => None,
            }),
            _ => None,
        })
    }

    pub fn move_call(&self) -> Option<(&str, &[Argument])> {
        self.commands.iter().find_map(|command| match command {
            Command::MoveCall { target, arguments } => Some((target.as_str(), arguments.as_slice())),
            _ => None,
        })
    }
}

/// Pure construction of subscription transactions for one network.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network: Network,
    package_id: String,
    module: String,
    platform_wallet: [u8; 32],
}

impl TransactionBuilder {
    pub fn new(network: Network, config: &NetworkConfig) -> Result<Self, BuildError> {
        let package_id = normalize_address(&config.package_id)
            .ok_or_else(|| BuildError::MissingConfig(format!("package id for {}", network)))?;
        let platform_wallet = address_bytes(&config.platform_wallet)
            .ok_or_else(|| BuildError::MissingConfig(format!("platform wallet for {}", network)))?;
        if config.module.is_empty() {
            return Err(BuildError::MissingConfig(format!("module name for {}", network)));
        }

        Ok(Self {
            network,
            package_id,
            module: config.module.clone(),
            platform_wallet,
        })
    }

    fn target(&self, operation: Operation) -> String {
        format!("{}::{}::{}", self.package_id, self.module, operation.function())
    }

    fn payment(&self, tier: SubscriptionTier, months: u64) -> Result<Vec<Command>, BuildError> {
        if months == 0 {
            return Err(BuildError::InvalidMonths);
        }
        let amount = tier.cost(months).ok_or(BuildError::PriceOverflow { tier, months })?;

        Ok(vec![
            Command::SplitCoins {
                coin: Argument::GasCoin,
                amounts: vec![Argument::Pure { value: PureValue::U64(amount) }],
            },
            Command::TransferObjects {
                objects: vec![Argument::Result { index: 0 }],
                address: Argument::Pure { value: PureValue::Address(self.platform_wallet) },
            },
        ])
    }

    fn finish(&self, operation: Operation, mut commands: Vec<Command>, arguments: Vec<Argument>) -> BuiltTransaction {
        commands.push(Command::MoveCall {
            target: self.target(operation),
            arguments,
        });
        BuiltTransaction {
            network: self.network,
            operation,
            commands,
            gas_budget: GAS_BUDGET_MIST,
        }
    }

    pub fn build_subscribe(&self, tier: SubscriptionTier, months: u64) -> Result<BuiltTransaction, BuildError> {
        let commands = self.payment(tier, months)?;
        Ok(self.finish(
            Operation::Subscribe,
            commands,
            vec![
                Argument::Pure { value: PureValue::U8(tier.as_u8()) },
                Argument::Pure { value: PureValue::U64(months) },
            ],
        ))
    }

    pub fn build_cancel(&self, subscription_id: &str) -> Result<BuiltTransaction, BuildError> {
        let object = object_argument(subscription_id)?;
        Ok(self.finish(Operation::CancelSubscription, Vec::new(), vec![object]))
    }

    /// Renewal is charged at the price of the tier currently held.
    pub fn build_renew(
        &self,
        subscription_id: &str,
        current_tier: SubscriptionTier,
        months: u64,
    ) -> Result<BuiltTransaction, BuildError> {
        let object = object_argument(subscription_id)?;
        let commands = self.payment(current_tier, months)?;
        Ok(self.finish(
            Operation::RenewSubscription,
            commands,
            vec![object, Argument::Pure { value: PureValue::U64(months) }],
        ))
    }

    pub fn build_set_auto_renew(&self, subscription_id: &str, enabled: bool) -> Result<BuiltTransaction, BuildError> {
        let object = object_argument(subscription_id)?;
        Ok(self.finish(
            Operation::SetAutoRenew,
            Vec::new(),
            vec![object, Argument::Pure { value: PureValue::Bool(enabled) }],
        ))
    }

    /// Records a view of `content_id` against the caller's subscription.
    pub fn build_view_content(&self, content_id: &str, subscription_id: &str) -> Result<BuiltTransaction, BuildError> {
        let content_id = content_id.trim();
        if content_id.is_empty() {
            return Err(BuildError::EmptyContentId);
        }
        let subscription = address_bytes(subscription_id)
            .ok_or_else(|| BuildError::InvalidObjectId(subscription_id.to_string()))?;
        Ok(self.finish(
            Operation::ViewContent,
            Vec::new(),
            vec![
                Argument::Pure { value: PureValue::String(content_id.to_string()) },
                Argument::Pure { value: PureValue::Address(subscription) },
            ],
        ))
    }
}

/// Tier numbers arriving from callers are checked before anything is built.
pub fn parse_tier(raw: u8) -> Result<SubscriptionTier, BuildError> {
    SubscriptionTier::from_u8(raw).ok_or(BuildError::InvalidTier(raw))
}

fn object_argument(object_id: &str) -> Result<Argument, BuildError> {
    normalize_address(object_id)
        .map(|object_id| Argument::Object { object_id })
        .ok_or_else(|| BuildError::InvalidObjectId(object_id.to_string()))
}
