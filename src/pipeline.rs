//! Per-chain collection loop
//!
//! Chains run strictly one after another:
//!   discover -> lens fetch -> filter -> price join -> transform
//!
//! A failure anywhere in a chain's sequence is logged with the chain name and
//! that chain contributes no records. Rewards are applied once at the end.

use indicatif::ProgressBar;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use eyre::{eyre, Result};

use crate::cartographer::{supplying, VaultBackend};
use crate::chains::ChainConfig;
use crate::config::UnpricedPolicy;
use crate::metrics::{to_pool_record, PoolRecord};
use crate::pricing::{price_key, PriceSource};
use crate::rewards::RewardAugmenter;

// ============================================
// RUN STATE
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Pending,
    Succeeded {
        discovered: usize,
        supplying: usize,
        records: usize,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct ChainReport {
    pub chain: &'static str,
    pub outcome: ChainOutcome,
    pub elapsed: Duration,
}

impl ChainReport {
    fn pending(chain: &ChainConfig) -> Self {
        Self {
            chain: chain.name,
            outcome: ChainOutcome::Pending,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ChainOutcome::Failed { .. })
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pools: Vec<PoolRecord>,
    pub chains: Vec<ChainReport>,
    /// Records removed under `UnpricedPolicy::Drop`
    pub dropped_unpriced: usize,
}

impl RunReport {
    pub fn failed_chains(&self) -> Vec<&'static str> {
        self.chains.iter().filter(|c| c.is_failed()).map(|c| c.chain).collect()
    }
}

/// Result of one successful chain pass
struct ChainCollection {
    discovered: usize,
    supplying: usize,
    records: Vec<PoolRecord>,
}

// ============================================
// PIPELINE
// ============================================

pub struct Pipeline {
    backend: Box<dyn VaultBackend>,
    prices: Box<dyn PriceSource>,
    rewards: Box<dyn RewardAugmenter>,
    protocol_id: String,
    unpriced_policy: UnpricedPolicy,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(
        backend: Box<dyn VaultBackend>,
        prices: Box<dyn PriceSource>,
        rewards: Box<dyn RewardAugmenter>,
        protocol_id: String,
    ) -> Self {
        Self {
            backend,
            prices,
            rewards,
            protocol_id,
            unpriced_policy: UnpricedPolicy::default(),
            progress: None,
        }
    }

    pub fn with_unpriced_policy(mut self, policy: UnpricedPolicy) -> Self {
        self.unpriced_policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Collect every chain in order, then apply reward augmentation once
    pub async fn run(&self, chains: &[&ChainConfig]) -> Result<RunReport> {
        let mut reports: Vec<ChainReport> = chains.iter().map(|c| ChainReport::pending(c)).collect();
        let mut pools: Vec<PoolRecord> = Vec::new();

        for (chain, report) in chains.iter().zip(reports.iter_mut()) {
            if let Some(pb) = &self.progress {
                pb.set_message(chain.name);
            }

            let start = Instant::now();
            match self.collect_chain(chain).await {
                Ok(collected) => {
                    info!(
                        "{}: {} vaults, {} supplying, {} pools in {:?}",
                        chain.name,
                        collected.discovered,
                        collected.supplying,
                        collected.records.len(),
                        start.elapsed()
                    );
                    report.outcome = ChainOutcome::Succeeded {
                        discovered: collected.discovered,
                        supplying: collected.supplying,
                        records: collected.records.len(),
                    };
                    pools.extend(collected.records);
                }
                Err(e) => {
                    error!("Error processing chain {}: {:#}", chain.name, e);
                    report.outcome = ChainOutcome::Failed {
                        error: format!("{:#}", e),
                    };
                }
            }
            report.elapsed = start.elapsed();

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let (pools, dropped_unpriced) = apply_unpriced_policy(pools, self.unpriced_policy);
        if dropped_unpriced > 0 {
            warn!("Dropped {} pools with no asset price", dropped_unpriced);
        }

        let pools = self.rewards.augment(pools, &self.protocol_id).await?;

        Ok(RunReport {
            pools,
            chains: reports,
            dropped_unpriced,
        })
    }

    async fn collect_chain(&self, chain: &ChainConfig) -> Result<ChainCollection> {
        let vaults = self.backend.discover_vaults(chain).await?;
        debug!("{}: {} vaults discovered", chain.name, vaults.len());

        let infos = self.backend.fetch_vault_infos(chain, &vaults).await?;
        if infos.len() != vaults.len() {
            return Err(eyre!(
                "lens returned {} results for {} vaults",
                infos.len(),
                vaults.len()
            ));
        }

        let active = supplying(infos);

        let keys: Vec<String> = active.iter().map(|i| price_key(chain.name, &i.asset)).collect();
        let quotes = self.prices.current_prices(&keys).await?;
        debug!("{}: {} prices for {} supplying vaults", chain.name, quotes.len(), keys.len());

        let records: Vec<PoolRecord> = active
            .iter()
            .map(|info| {
                let price = quotes.get(chain.name, &info.asset);
                if price.is_none() {
                    debug!("{}: no price for {} ({:?})", chain.name, info.asset_symbol, info.asset);
                }
                to_pool_record(chain.name, info, price)
            })
            .collect();

        Ok(ChainCollection {
            discovered: vaults.len(),
            supplying: active.len(),
            records,
        })
    }
}

/// Apply the unpriced-record policy; returns the kept records and the drop count
pub fn apply_unpriced_policy(pools: Vec<PoolRecord>, policy: UnpricedPolicy) -> (Vec<PoolRecord>, usize) {
    match policy {
        UnpricedPolicy::Keep => (pools, 0),
        UnpricedPolicy::Drop => {
            let before = pools.len();
            let kept: Vec<PoolRecord> = pools.into_iter().filter(PoolRecord::is_priced).collect();
            let dropped = before - kept.len();
            (kept, dropped)
        }
    }
}
