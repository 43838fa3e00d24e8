//! Spot prices for vault assets
//!
//! API: https://coins.llama.fi/prices/current/{chain:address,...}
//!
//! One request per chain. Missing coins are simply absent from the response;
//! there is no fallback source.

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: f64,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

// ============================================
// QUOTES
// ============================================

/// `"chain:address"` key used by the price service
pub fn price_key(chain: &str, asset: &Address) -> String {
    format!("{}:{}", chain, asset)
}

/// Prices keyed by `"chain:address"`, matched case-insensitively
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuotes {
    prices: HashMap<String, f64>,
}

impl PriceQuotes {
    pub fn insert(&mut self, key: &str, price: f64) {
        self.prices.insert(key.to_lowercase(), price);
    }

    pub fn get(&self, chain: &str, asset: &Address) -> Option<f64> {
        self.prices.get(&price_key(chain, asset).to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, f64)> for PriceQuotes {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut quotes = PriceQuotes::default();
        for (key, price) in iter {
            quotes.insert(&key, price);
        }
        quotes
    }
}

// ============================================
// PRICE SOURCE
// ============================================

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current USD prices for `keys`. Unknown keys are absent, not errors.
    async fn current_prices(&self, keys: &[String]) -> Result<PriceQuotes>;
}

pub struct LlamaPrices {
    http_client: Client,
    base_url: String,
}

impl LlamaPrices {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, keys: &[String]) -> String {
        let mut seen = std::collections::HashSet::new();
        let joined = keys
            .iter()
            .filter(|k| seen.insert(k.to_lowercase()))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/prices/current/{}", self.base_url, joined)
    }
}

#[async_trait]
impl PriceSource for LlamaPrices {
    async fn current_prices(&self, keys: &[String]) -> Result<PriceQuotes> {
        if keys.is_empty() {
            return Ok(PriceQuotes::default());
        }

        let url = self.url_for(keys);
        trace!("GET {}", url);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(eyre!("Price API returned {}", response.status()));
        }

        let body: PricesResponse = response.json().await?;
        debug!("Price API: {}/{} coins quoted", body.coins.len(), keys.len());

        for (key, coin) in &body.coins {
            if let Some(confidence) = coin.confidence {
                trace!(
                    "{} {} = ${} (confidence {:.2})",
                    key,
                    coin.symbol.as_deref().unwrap_or("?"),
                    coin.price,
                    confidence
                );
            }
        }

        Ok(body.coins.into_iter().map(|(k, c)| (k, c.price)).collect())
    }
}
