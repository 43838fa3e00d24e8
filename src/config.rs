//! Runtime configuration
//!
//! Loaded from environment variables (with `.env` support) or from a TOML
//! file. Chain deployment data lives in `chains.rs`; this only holds the
//! knobs an operator may want to change between runs.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::chains::{self, ChainConfig};

// ============================================
// UNPRICED POLICY
// ============================================

/// What to do with records whose asset had no price quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpricedPolicy {
    /// Emit the record; USD fields are NaN and serialise as `null`
    #[default]
    Keep,
    /// Remove the record before reward augmentation
    Drop,
}

impl UnpricedPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "keep" => Some(UnpricedPolicy::Keep),
            "drop" => Some(UnpricedPolicy::Drop),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnpricedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnpricedPolicy::Keep => write!(f, "KEEP"),
            UnpricedPolicy::Drop => write!(f, "DROP"),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Network Settings ==========
    /// Per-chain RPC overrides, keyed by chain name
    pub rpc_urls: HashMap<String, String>,

    /// Max blocks per eth_getLogs request
    pub max_log_range: u64,

    /// Lens calls per Multicall3 request
    pub lens_batch_size: usize,

    // ========== HTTP Collaborators ==========
    /// Price service base URL
    pub price_api_url: String,

    /// Merkl API base URL
    pub merkl_api_url: String,

    /// Timeout for price and reward HTTP requests
    pub http_timeout_secs: u64,

    /// Add Merkl reward APY after collection
    pub rewards_enabled: bool,

    // ========== Output ==========
    /// Protocol id passed to reward augmentation
    pub protocol_id: String,

    pub unpriced_policy: UnpricedPolicy,

    /// Write JSON here instead of stdout
    pub output_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let rpc_urls = chains::all_chains()
            .iter()
            .filter_map(|c| {
                env::var(format!("RPC_URL_{}", c.name.to_uppercase()))
                    .ok()
                    .map(|url| (c.name.to_string(), url))
            })
            .collect();

        let unpriced_policy = match env::var("UNPRICED_POLICY") {
            Ok(v) => UnpricedPolicy::parse(&v)
                .ok_or_else(|| eyre::eyre!("UNPRICED_POLICY must be 'keep' or 'drop' (got '{}')", v))?,
            Err(_) => defaults.unpriced_policy,
        };

        Ok(Self {
            rpc_urls,
            max_log_range: env::var("MAX_LOG_RANGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_log_range),
            lens_batch_size: env::var("LENS_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lens_batch_size),
            price_api_url: env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            merkl_api_url: env::var("MERKL_API_URL").unwrap_or(defaults.merkl_api_url),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            rewards_enabled: env::var("REWARDS_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rewards_enabled),
            protocol_id: env::var("PROTOCOL_ID").unwrap_or(defaults.protocol_id),
            unpriced_policy,
            output_path: env::var("OUTPUT_PATH").ok(),
        })
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// RPC endpoint for `chain`: configured override, else the public default
    pub fn rpc_url_for(&self, chain: &ChainConfig) -> String {
        self.rpc_urls
            .get(chain.name)
            .cloned()
            .unwrap_or_else(|| chain.default_rpc_url.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_log_range == 0 {
            return Err(eyre::eyre!("MAX_LOG_RANGE must be > 0"));
        }
        if self.lens_batch_size == 0 {
            return Err(eyre::eyre!("LENS_BATCH_SIZE must be > 0"));
        }
        if self.price_api_url.trim().is_empty() {
            return Err(eyre::eyre!("PRICE_API_URL is empty"));
        }
        if self.rewards_enabled && self.merkl_api_url.trim().is_empty() {
            return Err(eyre::eyre!("MERKL_API_URL is empty but rewards are enabled"));
        }
        if self.http_timeout_secs == 0 {
            return Err(eyre::eyre!("HTTP_TIMEOUT_SECS must be > 0"));
        }
        if let Some(name) = self.rpc_urls.keys().find(|n| chains::chain_by_name(n).is_none()) {
            return Err(eyre::eyre!("RPC override for unknown chain '{}'", name));
        }
        if let Some((name, _)) = self.rpc_urls.iter().find(|(_, url)| url.trim().is_empty()) {
            return Err(eyre::eyre!("Empty RPC URL for chain '{}'", name));
        }
        Ok(())
    }

    /// Print configuration summary (stderr; stdout carries the JSON output)
    pub fn print_summary(&self) {
        eprintln!("╔════════════════════════════════════════════════════════════╗");
        eprintln!("║              EULER V2 YIELDS - CONFIGURATION               ║");
        eprintln!("╠════════════════════════════════════════════════════════════╣");
        eprintln!("║ Chains:            {:^40} ║", chains::all_chains().len());
        eprintln!("║ RPC Overrides:     {:^40} ║", self.rpc_urls.len());
        eprintln!("║ Max Log Range:     {:^40} ║", self.max_log_range);
        eprintln!("║ Lens Batch Size:   {:^40} ║", self.lens_batch_size);
        eprintln!("╠════════════════════════════════════════════════════════════╣");
        eprintln!("║ Price API:         {:^40} ║", self.price_api_url);
        eprintln!("║ Rewards:           {:^40} ║",
            if self.rewards_enabled { "✓ Merkl" } else { "✗ Disabled" }
        );
        eprintln!("║ Unpriced Records:  {:^40} ║", self.unpriced_policy);
        eprintln!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_urls: HashMap::new(),
            max_log_range: 500_000,
            lens_batch_size: 25,
            price_api_url: "https://coins.llama.fi".to_string(),
            merkl_api_url: "https://api.merkl.xyz".to_string(),
            http_timeout_secs: 30,
            rewards_enabled: true,
            protocol_id: "euler".to_string(),
            unpriced_policy: UnpricedPolicy::Keep,
            output_path: None,
        }
    }
}
