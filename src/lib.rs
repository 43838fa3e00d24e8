//! Euler v2 yield collector
//!
//! Discovers every EVK vault deployed per chain, reads vault state through
//! the VaultLens, joins USD prices and emits one pool record per vault.

pub mod cartographer;
pub mod chains;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod pricing;
pub mod rewards;

pub use config::{Config, UnpricedPolicy};
pub use metrics::PoolRecord;
pub use pipeline::{ChainOutcome, ChainReport, Pipeline, RunReport};
