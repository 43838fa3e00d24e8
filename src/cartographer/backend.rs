//! Chain access seam used by the pipeline

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::Result;

use super::discovery::FactoryScanner;
use super::lens::{LensReader, VaultInfo};
use crate::chains::ChainConfig;
use crate::config::Config;

/// Read-only access to one chain's vault set and vault state
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Vault addresses deployed by the chain's factory, `[start_block, head]`,
    /// in emission order
    async fn discover_vaults(&self, chain: &ChainConfig) -> Result<Vec<Address>>;

    /// Lens snapshot per vault; same length and order as `vaults`
    async fn fetch_vault_infos(&self, chain: &ChainConfig, vaults: &[Address]) -> Result<Vec<Option<VaultInfo>>>;
}

/// JSON-RPC backed implementation. Providers are built per call from the
/// configured endpoint for that chain.
pub struct AlloyBackend {
    config: Config,
}

impl AlloyBackend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl VaultBackend for AlloyBackend {
    async fn discover_vaults(&self, chain: &ChainConfig) -> Result<Vec<Address>> {
        let scanner = FactoryScanner::new(self.config.rpc_url_for(chain), self.config.max_log_range);
        scanner.discover_vaults(chain.factory, chain.start_block).await
    }

    async fn fetch_vault_infos(&self, chain: &ChainConfig, vaults: &[Address]) -> Result<Vec<Option<VaultInfo>>> {
        let reader = LensReader::new(self.config.rpc_url_for(chain), self.config.lens_batch_size);
        reader.fetch_vault_infos(chain, vaults).await
    }
}
