//! Transaction Parameters
//!
//! A sign request arrives as loosely typed JSON. [`build`] validates it,
//! fills omitted fields from the network defaults and produces a
//! [`TransactionParameters`] tagged by generation, so the encoder never
//! branches on optional fields.

use crate::config::FeeSchedule;
use crate::crypto::Address;
use crate::error::{SignerError, SignerResult};
use serde::Deserialize;
use serde_json::Value;

/// EIP-2718 type byte of the fee-market generation.
pub const FEE_MARKET_TX_TYPE: u8 = 0x02;

/// Type value selecting the legacy generation in a request.
pub const LEGACY_TX_TYPE: u8 = 0x00;

// =============================================================================
// Parameters
// =============================================================================

/// Pre-London transaction with a single gas price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyParameters {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    /// `Some` signs with EIP-155 replay protection.
    pub chain_id: Option<u64>,
}

/// EIP-1559 transaction. The access list is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeMarketParameters {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionParameters {
    Legacy(LegacyParameters),
    FeeMarket(FeeMarketParameters),
}

/// Which wire format a transaction uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Legacy,
    FeeMarket,
}

impl TransactionParameters {
    pub fn generation(&self) -> Generation {
        match self {
            TransactionParameters::Legacy(_) => Generation::Legacy,
            TransactionParameters::FeeMarket(_) => Generation::FeeMarket,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            TransactionParameters::Legacy(p) => p.nonce,
            TransactionParameters::FeeMarket(p) => p.nonce,
        }
    }

    pub fn to(&self) -> &Address {
        match self {
            TransactionParameters::Legacy(p) => &p.to,
            TransactionParameters::FeeMarket(p) => &p.to,
        }
    }

    pub fn value(&self) -> u128 {
        match self {
            TransactionParameters::Legacy(p) => p.value,
            TransactionParameters::FeeMarket(p) => p.value,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            TransactionParameters::Legacy(p) => &p.data,
            TransactionParameters::FeeMarket(p) => &p.data,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            TransactionParameters::Legacy(p) => p.chain_id,
            TransactionParameters::FeeMarket(p) => Some(p.chain_id),
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// The sign payload as received. Every field stays untyped until
/// [`build`] so that a bad value becomes a structured rejection rather than
/// a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRequest {
    #[serde(default, alias = "dst_eth_addr")]
    pub dst_address: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub nonce: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub chainid: Option<Value>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<Value>,
    #[serde(default)]
    pub gas_limit: Option<Value>,
    #[serde(default)]
    pub gas_price: Option<Value>,
    #[serde(default)]
    pub max_fee_per_gas: Option<Value>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<Value>,
}

impl TransactionRequest {
    /// Extract the request from a whole event object, ignoring unrelated keys.
    pub fn from_event(event: &Value) -> SignerResult<Self> {
        Self::deserialize(event)
            .map_err(|e| SignerError::invalid(format!("malformed sign request: {}", e)))
    }
}

/// Network-level values the request may omit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDefaults {
    pub chain_id: u64,
    pub legacy_replay_protection: bool,
    pub fees: FeeSchedule,
}

// =============================================================================
// Builder
// =============================================================================

const REQUIRED_FIELDS: &str = "sign requires amount, dst_address and nonce to be specified";

/// Validate `request` and fill the gaps from `defaults`.
pub fn build(
    request: &TransactionRequest,
    defaults: &TransactionDefaults,
) -> SignerResult<TransactionParameters> {
    let (to, value, nonce) = match (
        present(&request.dst_address),
        present(&request.amount),
        present(&request.nonce),
    ) {
        (Some(to), Some(value), Some(nonce)) => (to, value, nonce),
        _ => return Err(SignerError::missing(REQUIRED_FIELDS)),
    };

    let to = parse_address(to)?;
    let value = parse_quantity("amount", value)?;
    let nonce = narrow_u64("nonce", parse_quantity("nonce", nonce)?)?;
    let data = parse_data(present(&request.data))?;
    let chain_id = optional_u64("chainid", &request.chainid)?;
    if chain_id == Some(0) {
        return Err(SignerError::invalid("chainid must be greater than zero"));
    }
    let gas_limit = optional_u64("gas_limit", &request.gas_limit)?.unwrap_or(defaults.fees.gas_limit);
    if gas_limit == 0 {
        return Err(SignerError::invalid("gas_limit must be greater than zero"));
    }

    match select_generation(request)? {
        Generation::Legacy => {
            if present(&request.max_fee_per_gas).is_some()
                || present(&request.max_priority_fee_per_gas).is_some()
            {
                return Err(SignerError::invalid(
                    "max_fee_per_gas and max_priority_fee_per_gas are not valid for a legacy transaction",
                ));
            }
            let gas_price = optional_quantity("gas_price", &request.gas_price)?
                .unwrap_or(defaults.fees.gas_price);

            // An explicit chain id always opts into replay protection.
            let chain_id = chain_id.or_else(|| {
                defaults
                    .legacy_replay_protection
                    .then_some(defaults.chain_id)
            });

            Ok(TransactionParameters::Legacy(LegacyParameters {
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                data,
                chain_id,
            }))
        }
        Generation::FeeMarket => {
            if present(&request.gas_price).is_some() {
                return Err(SignerError::invalid(
                    "gas_price is not valid for a fee-market transaction",
                ));
            }
            let max_fee_per_gas = optional_quantity("max_fee_per_gas", &request.max_fee_per_gas)?
                .unwrap_or(defaults.fees.max_fee_per_gas);

            let max_priority_fee_per_gas = match optional_quantity(
                "max_priority_fee_per_gas",
                &request.max_priority_fee_per_gas,
            )? {
                Some(priority) if priority > max_fee_per_gas => {
                    return Err(SignerError::invalid(format!(
                        "max_priority_fee_per_gas {} exceeds max_fee_per_gas {}",
                        priority, max_fee_per_gas
                    )));
                }
                Some(priority) => priority,
                None => defaults.fees.max_priority_fee_per_gas.min(max_fee_per_gas),
            };

            Ok(TransactionParameters::FeeMarket(FeeMarketParameters {
                chain_id: chain_id.unwrap_or(defaults.chain_id),
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
            }))
        }
    }
}

fn select_generation(request: &TransactionRequest) -> SignerResult<Generation> {
    match optional_quantity("type", &request.tx_type)? {
        Some(t) if t == LEGACY_TX_TYPE as u128 => Ok(Generation::Legacy),
        Some(t) if t == FEE_MARKET_TX_TYPE as u128 => Ok(Generation::FeeMarket),
        Some(t) => Err(SignerError::invalid(format!(
            "unsupported transaction type {}",
            t
        ))),
        None => {
            if present(&request.max_fee_per_gas).is_some()
                || present(&request.max_priority_fee_per_gas).is_some()
            {
                Ok(Generation::FeeMarket)
            } else {
                Ok(Generation::Legacy)
            }
        }
    }
}

// =============================================================================
// Field parsing
// =============================================================================

/// `null` counts as absent.
fn present(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|v| !v.is_null())
}

fn parse_address(value: &Value) -> SignerResult<Address> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<Address>()
            .map_err(|e| SignerError::invalid(format!("dst_address: {}", strip_kind(&e)))),
        other => Err(SignerError::invalid(format!(
            "dst_address must be a hex string, got {}",
            other
        ))),
    }
}

fn parse_data(value: Option<&Value>) -> SignerResult<Vec<u8>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let body = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .unwrap_or(trimmed);
            hex::decode(body).map_err(|e| SignerError::invalid(format!("data is not hex: {}", e)))
        }
        Some(other) => Err(SignerError::invalid(format!(
            "data must be a hex string, got {}",
            other
        ))),
    }
}

/// Non-negative integer from a JSON number, a decimal string or a `0x` hex
/// string.
pub fn parse_quantity(name: &str, value: &Value) -> SignerResult<u128> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(v as u128)
            } else if n.as_i64().map_or(false, |v| v < 0) {
                Err(SignerError::invalid(format!("{} must be non-negative", name)))
            } else if n.as_f64().map_or(false, |v| v < 0.0) {
                Err(SignerError::invalid(format!("{} must be non-negative", name)))
            } else {
                Err(SignerError::invalid(format!(
                    "{} must be an integer; pass values above 2^64 as a decimal or 0x string",
                    name
                )))
            }
        }
        Value::String(s) => parse_quantity_str(name, s.trim()),
        other => Err(SignerError::invalid(format!(
            "{} must be a number, got {}",
            name, other
        ))),
    }
}

fn parse_quantity_str(name: &str, s: &str) -> SignerResult<u128> {
    if s.starts_with('-') {
        return Err(SignerError::invalid(format!("{} must be non-negative", name)));
    }
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => None,
        Some(hex_digits) if hex_digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u128::from_str_radix(hex_digits, 16).ok()
        }
        Some(_) => None,
        None if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse::<u128>().ok(),
        None => None,
    };
    parsed.ok_or_else(|| {
        SignerError::invalid(format!(
            "{} must be a non-negative integer below 2^128, got {:?}",
            name, s
        ))
    })
}

fn optional_quantity(name: &str, field: &Option<Value>) -> SignerResult<Option<u128>> {
    present(field).map(|v| parse_quantity(name, v)).transpose()
}

fn optional_u64(name: &str, field: &Option<Value>) -> SignerResult<Option<u64>> {
    optional_quantity(name, field)?
        .map(|v| narrow_u64(name, v))
        .transpose()
}

fn narrow_u64(name: &str, value: u128) -> SignerResult<u64> {
    u64::try_from(value).map_err(|_| SignerError::invalid(format!("{} exceeds 2^64 - 1", name)))
}

fn strip_kind(err: &SignerError) -> String {
    match err {
        SignerError::InvalidParameter(msg) | SignerError::MissingParameter(msg) => msg.clone(),
        other => other.to_string(),
    }
}
