//! Runtime Configuration
//!
//! Everything the signer needs from its environment, read once per
//! invocation and passed down explicitly. Nothing below this module touches
//! environment variables.

pub mod fees;

pub use fees::{FeeDefaults, FeeSchedule, StaticFeeDefaults};

use crate::error::{SignerError, SignerResult};
use crate::tx::TransactionDefaults;
use std::fmt;
use std::str::FromStr;

/// Well-known network names and their chain ids.
pub const KNOWN_NETWORKS: &[(&str, u64)] = &[
    ("mainnet", 1),
    ("ropsten", 3),
    ("rinkeby", 4),
    ("goerli", 5),
    ("holesky", 17_000),
    ("sepolia", 11_155_111),
];

pub const DEFAULT_LOG_LEVEL: &str = "warn";

// =============================================================================
// Network
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
}

impl Network {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            chain_id,
        }
    }

    /// Chain id of a well-known network name (case-insensitive).
    pub fn known_chain_id(name: &str) -> Option<u64> {
        KNOWN_NETWORKS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|&(_, id)| id)
    }

    /// Resolve `name`, letting an explicit chain id override the table.
    /// Unknown names need the explicit id.
    pub fn resolve(name: &str, chain_id: Option<u64>) -> SignerResult<Self> {
        let name = name.trim().to_ascii_lowercase();
        let chain_id = match (chain_id, Self::known_chain_id(&name)) {
            (Some(0), _) => {
                return Err(SignerError::configuration(
                    "ETH_CHAIN_ID must be greater than zero",
                ))
            }
            (Some(id), _) => id,
            (None, Some(id)) => id,
            (None, None) => {
                return Err(SignerError::configuration(format!(
                    "unknown network {:?}; set ETH_CHAIN_ID",
                    name
                )))
            }
        };
        Ok(Self { name, chain_id })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

// =============================================================================
// Signer configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    /// Oracle key identifier (`KMS_KEY_ID`)
    pub key_id: String,
    pub network: Network,
    /// Sign legacy transactions with EIP-155
    pub legacy_replay_protection: bool,
    pub cache_public_keys: bool,
    /// `tracing` filter directive
    pub log_level: String,
}

impl SignerConfig {
    pub fn new(key_id: impl Into<String>, network: Network) -> Self {
        Self {
            key_id: key_id.into(),
            network,
            legacy_replay_protection: true,
            cache_public_keys: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn from_env() -> SignerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> SignerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_id = require(&lookup, "KMS_KEY_ID")?;
        let network_name = require(&lookup, "ETH_NETWORK")?;
        let chain_id = parse_var::<u64, _>(&lookup, "ETH_CHAIN_ID")?;
        let network = Network::resolve(&network_name, chain_id)?;

        Ok(Self {
            key_id,
            network,
            legacy_replay_protection: parse_flag(&lookup, "ETH_LEGACY_REPLAY_PROTECTION")?
                .unwrap_or(true),
            cache_public_keys: parse_flag(&lookup, "SIGNER_CACHE_PUBLIC_KEYS")?.unwrap_or(true),
            log_level: read(&lookup, "LOG_LEVEL")
                .map(|level| level.to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn transaction_defaults(&self, fees: FeeSchedule) -> TransactionDefaults {
        TransactionDefaults {
            chain_id: self.network.chain_id,
            legacy_replay_protection: self.legacy_replay_protection,
            fees,
        }
    }
}

// =============================================================================
// Lookup helpers
// =============================================================================

fn read<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require<F>(lookup: &F, name: &str) -> SignerResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    read(lookup, name).ok_or_else(|| SignerError::configuration(format!("{} is not set", name)))
}

pub(crate) fn parse_var<T, F>(lookup: &F, name: &str) -> SignerResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    read(lookup, name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| SignerError::configuration(format!("{}={:?}: {}", name, raw, e)))
        })
        .transpose()
}

fn parse_flag<F>(lookup: &F, name: &str) -> SignerResult<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    read(lookup, name)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(SignerError::configuration(format!(
                "{}={:?} is not a boolean",
                name, raw
            ))),
        })
        .transpose()
}
