//! Fee Defaults
//!
//! Gas values a sign request may omit. Where they come from is a deployment
//! decision, so the assembler only sees the [`FeeDefaults`] trait.

use super::{parse_var, Network};
use crate::error::SignerResult;

/// 1 gwei in wei
pub const GWEI: u128 = 1_000_000_000;

pub const DEFAULT_GAS_LIMIT: u64 = 100_000;
pub const DEFAULT_GAS_PRICE: u128 = GWEI;
pub const DEFAULT_MAX_FEE_PER_GAS: u128 = 2 * GWEI;
pub const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: u128 = GWEI;

/// Gas values for both generations, all in wei except the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub gas_limit: u64,
    pub gas_price: u128,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: DEFAULT_GAS_PRICE,
            max_fee_per_gas: DEFAULT_MAX_FEE_PER_GAS,
            max_priority_fee_per_gas: DEFAULT_MAX_PRIORITY_FEE_PER_GAS,
        }
    }
}

/// Source of per-network gas defaults, e.g. a static table or a live
/// fee estimator.
pub trait FeeDefaults: Send + Sync {
    fn fee_schedule(&self, network: &Network) -> SignerResult<FeeSchedule>;
}

/// The same schedule for every network.
#[derive(Debug, Clone, Default)]
pub struct StaticFeeDefaults {
    schedule: FeeSchedule,
}

impl StaticFeeDefaults {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn from_env() -> SignerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Built-in defaults overridden by `ETH_GAS_LIMIT`, `ETH_GAS_PRICE`,
    /// `ETH_MAX_FEE_PER_GAS` and `ETH_MAX_PRIORITY_FEE_PER_GAS`.
    pub fn from_lookup<F>(lookup: F) -> SignerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FeeSchedule::default();
        let schedule = FeeSchedule {
            gas_limit: parse_var(&lookup, "ETH_GAS_LIMIT")?.unwrap_or(defaults.gas_limit),
            gas_price: parse_var(&lookup, "ETH_GAS_PRICE")?.unwrap_or(defaults.gas_price),
            max_fee_per_gas: parse_var(&lookup, "ETH_MAX_FEE_PER_GAS")?
                .unwrap_or(defaults.max_fee_per_gas),
            max_priority_fee_per_gas: parse_var(&lookup, "ETH_MAX_PRIORITY_FEE_PER_GAS")?
                .unwrap_or(defaults.max_priority_fee_per_gas),
        };
        Ok(Self { schedule })
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }
}

impl FeeDefaults for StaticFeeDefaults {
    fn fee_schedule(&self, _network: &Network) -> SignerResult<FeeSchedule> {
        Ok(self.schedule)
    }
}
