//! Pool record assembly
//!
//! Converts a vault's fixed-point on-chain values into USD and APY figures.
//!
//! USD:  amount / 10^assetDecimals * price
//! APY:  rate / 10^25   (lens rates are 1e27 = 100%, so this lands in percent)

use alloy_primitives::utils::format_units;
use alloy_primitives::U256;
use serde::Serialize;

use crate::cartographer::VaultInfo;

/// Project slug every record carries
pub const PROJECT: &str = "euler-v2";

/// Decimals that turn a lens rate into a percentage
pub const RATE_DECIMALS: u8 = 25;

const APP_URL: &str = "https://app.euler.finance/vault";

/// One yield pool, as consumed by the downstream index
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    pub pool_meta: String,
    /// NaN when the asset had no price (serialised as `null`)
    pub tvl_usd: f64,
    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
    pub apy_base: f64,
    pub apy_base_borrow: f64,
    pub underlying_tokens: Vec<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy_reward: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reward_tokens: Vec<String>,
}

impl PoolRecord {
    /// False when any USD figure is NaN or infinite
    pub fn is_priced(&self) -> bool {
        self.tvl_usd.is_finite() && self.total_supply_usd.is_finite() && self.total_borrow_usd.is_finite()
    }
}

/// Fixed-point integer to decimal. Unrepresentable inputs give NaN.
pub fn fixed_to_f64(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

pub fn vault_url(vault: &str, chain: &str) -> String {
    format!("{}/{}?network={}", APP_URL, vault, chain)
}

/// Build the pool record for one vault.
///
/// `price = None` propagates as NaN through every USD field. Negative TVL
/// (borrows above supply) is passed through unclamped.
pub fn to_pool_record(chain: &str, info: &VaultInfo, price: Option<f64>) -> PoolRecord {
    let price = price.unwrap_or(f64::NAN);
    let rates = info.interest_rates.unwrap_or_default();

    let total_supply_usd = fixed_to_f64(info.total_assets, info.asset_decimals) * price;
    let total_borrow_usd = fixed_to_f64(info.total_borrowed, info.asset_decimals) * price;

    let vault = info.vault.to_checksum(None);

    PoolRecord {
        url: vault_url(&vault, chain),
        pool: vault,
        chain: chain.to_string(),
        project: PROJECT.to_string(),
        symbol: info.asset_symbol.clone(),
        pool_meta: info.vault_name.clone(),
        tvl_usd: total_supply_usd - total_borrow_usd,
        total_supply_usd,
        total_borrow_usd,
        apy_base: fixed_to_f64(rates.supply_apy, RATE_DECIMALS),
        apy_base_borrow: fixed_to_f64(rates.borrow_apy, RATE_DECIMALS),
        underlying_tokens: vec![info.asset.to_checksum(None)],
        apy_reward: None,
        reward_tokens: Vec::new(),
    }
}
