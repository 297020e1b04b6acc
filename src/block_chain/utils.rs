use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 1 SUI = 10^9 MIST
pub const MIST_PER_SUI: u128 = 1_000_000_000;

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

const ADDRESS_HEX_LEN: usize = 64;

/// Remove 0x prefix from address
pub fn remove_0x_prefix(address: &str) -> &str {
    address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address)
}

/// Lowercase, left-pad to 32 bytes and re-attach the 0x prefix.
/// Returns `None` for anything that is not a Sui address or object id.
pub fn normalize_address(address: &str) -> Option<String> {
    let hex_part = remove_0x_prefix(address.trim());
    if hex_part.is_empty()
        || hex_part.len() > ADDRESS_HEX_LEN
        || !hex_part.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    Some(format!("0x{:0>64}", hex_part.to_ascii_lowercase()))
}

pub fn address_bytes(address: &str) -> Option<[u8; 32]> {
    let normalized = normalize_address(address)?;
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(remove_0x_prefix(&normalized), &mut bytes).ok()?;
    Some(bytes)
}

/// `0x1234...abcd` style shortening for display.
pub fn format_address(address: &str, start: usize, end: usize) -> String {
    if address.len() <= start + end {
        return address.to_string();
    }
    format!("{}...{}", &address[..start], &address[address.len() - end..])
}

/// Render MIST as SUI with four decimals, e.g. `1_250_000_000` -> `"1.2500"`.
pub fn mist_to_sui(mist: u128) -> String {
    let whole = mist / MIST_PER_SUI;
    // round to 4 places: 10^9 / 10^4 = 10^5 MIST per unit
    let frac = (mist % MIST_PER_SUI + 50_000) / 100_000;
    if frac == 10_000 {
        format!("{}.0000", whole + 1)
    } else {
        format!("{}.{:04}", whole, frac)
    }
}

/// Sui JSON renders u64 as strings and smaller ints as numbers.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Timestamps above 10^12 are taken as milliseconds.
pub fn to_unix_seconds(raw: u64) -> u64 {
    if raw > 1_000_000_000_000 {
        raw / 1000
    } else {
        raw
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

pub fn format_timestamp(secs: u64) -> Option<String> {
    Utc.timestamp_opt(secs as i64, 0).single().map(|dt| dt.to_rfc3339())
}

/// Execution status as reported in transaction effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
}

/// Response of an executed transaction block, as returned by the wallet
/// extension or `sui_getTransactionBlock`. Extra fields are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<TransactionEffects>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TransactionResponse {
    pub fn status(&self) -> Option<&ExecutionStatus> {
        self.effects.as_ref().map(|effects| &effects.status)
    }
}
