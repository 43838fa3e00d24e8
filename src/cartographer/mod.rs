//! The Cartographer (on-chain data ingest)
//!
//! Factory log scanning for vault discovery, then one Multicall3-batched
//! lens read per vault.

mod backend;
mod discovery;
mod lens;
mod multicall;

pub use backend::{AlloyBackend, VaultBackend};
pub use lens::{supplying, InterestRates, VaultInfo};
