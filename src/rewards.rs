//! Reward APY augmentation
//!
//! Runs once over the full record set after every chain is collected.
//! Merkl campaigns add `apyReward` / `rewardTokens` on matching pools.
//!
//! API: https://api.merkl.xyz/v4/opportunities?mainProtocolId={id}&status=LIVE

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::chains;
use crate::metrics::PoolRecord;

/// Opportunities per page requested from Merkl
const PAGE_SIZE: usize = 100;

/// Hard stop on pagination
const MAX_PAGES: usize = 20;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub chain_id: u64,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub explorer_address: Option<String>,
    #[serde(default)]
    pub apr: f64,
    #[serde(default)]
    pub rewards_record: Option<RewardsRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardsRecord {
    #[serde(default)]
    pub breakdowns: Vec<RewardBreakdown>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardBreakdown {
    pub token: RewardToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardToken {
    pub address: String,
}

impl Opportunity {
    /// Distinct lowercased pool addresses this opportunity points at
    fn pool_addresses(&self) -> HashSet<String> {
        std::iter::once(self.identifier.as_str())
            .chain(self.explorer_address.as_deref())
            .filter(|a| a.starts_with("0x"))
            .map(|a| a.to_lowercase())
            .collect()
    }

    fn reward_tokens(&self) -> Vec<String> {
        self.rewards_record
            .as_ref()
            .map(|r| r.breakdowns.iter().map(|b| b.token.address.clone()).collect())
            .unwrap_or_default()
    }
}

// ============================================
// AUGMENTERS
// ============================================

#[async_trait]
pub trait RewardAugmenter: Send + Sync {
    async fn augment(&self, records: Vec<PoolRecord>, protocol_id: &str) -> Result<Vec<PoolRecord>>;
}

/// Pass-through
pub struct NoRewards;

#[async_trait]
impl RewardAugmenter for NoRewards {
    async fn augment(&self, records: Vec<PoolRecord>, _protocol_id: &str) -> Result<Vec<PoolRecord>> {
        Ok(records)
    }
}

pub struct MerklRewards {
    http_client: Client,
    base_url: String,
}

impl MerklRewards {
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

    /// All live opportunities for `protocol_id`, across pages
    async fn fetch_opportunities(&self, protocol_id: &str) -> Result<Vec<Opportunity>> {
        let mut all = Vec::new();

        for page in 0..MAX_PAGES {
            let url = format!(
                "{}/v4/opportunities?mainProtocolId={}&status=LIVE&items={}&page={}",
                self.base_url, protocol_id, PAGE_SIZE, page
            );

            let response = self.http_client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(eyre!("Merkl API returned {}", response.status()));
            }

            let batch: Vec<Opportunity> = response.json().await?;
            let last = batch.len() < PAGE_SIZE;
            all.extend(batch);

            if last {
                break;
            }
        }

        debug!("Merkl: {} live opportunities for {}", all.len(), protocol_id);
        Ok(all)
    }
}

#[async_trait]
impl RewardAugmenter for MerklRewards {
    async fn augment(&self, records: Vec<PoolRecord>, protocol_id: &str) -> Result<Vec<PoolRecord>> {
        match self.fetch_opportunities(protocol_id).await {
            Ok(opportunities) => Ok(apply_opportunities(records, &opportunities)),
            Err(e) => {
                warn!("Merkl rewards unavailable, returning base APY only: {}", e);
                Ok(records)
            }
        }
    }
}

/// Attach campaign APR to every record whose `(chain id, pool)` has a live,
/// positive-APR opportunity. Several campaigns on one pool add up.
pub fn apply_opportunities(mut records: Vec<PoolRecord>, opportunities: &[Opportunity]) -> Vec<PoolRecord> {
    let mut by_pool: HashMap<(&str, String), (f64, Vec<String>)> = HashMap::new();

    for opp in opportunities.iter().filter(|o| o.apr > 0.0) {
        let Some(chain) = chains::chain_by_evm_id(opp.chain_id) else {
            debug!("Merkl: skipping opportunity on unsupported chain {}", opp.chain_id);
            continue;
        };
        for pool in opp.pool_addresses() {
            let entry = by_pool.entry((chain.name, pool)).or_insert((0.0, Vec::new()));
            entry.0 += opp.apr;
            for token in opp.reward_tokens() {
                if !entry.1.iter().any(|t| t.eq_ignore_ascii_case(&token)) {
                    entry.1.push(token);
                }
            }
        }
    }

    let mut matched = 0;
    for record in records.iter_mut() {
        if let Some((apr, tokens)) = by_pool.get(&(record.chain.as_str(), record.pool.to_lowercase())) {
            record.apy_reward = Some(*apr);
            record.reward_tokens = tokens.clone();
            matched += 1;
        }
    }

    info!("Merkl: reward APY added to {}/{} pools", matched, records.len());
    records
}
