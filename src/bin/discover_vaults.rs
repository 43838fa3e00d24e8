//! Vault discovery diagnostic
//!
//! Run with: cargo run --bin discover-vaults -- --chain base
//!
//! Scans one chain's factory logs and lens, without prices or rewards.
//! Useful for checking an RPC endpoint's log range limits.

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use std::time::Instant;

use euler_yields::cartographer::{supplying, AlloyBackend, VaultBackend};
use euler_yields::chains;
use euler_yields::metrics::{fixed_to_f64, RATE_DECIMALS};
use euler_yields::Config;

#[derive(Debug, Parser)]
#[command(name = "discover-vaults")]
struct Args {
    /// Chain to scan
    #[arg(long)]
    chain: String,

    /// RPC endpoint (default: RPC_URL_<CHAIN> or the public endpoint)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Print every supplying vault
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let chain = chains::chain_by_name(&args.chain)
        .ok_or_else(|| eyre!("Unknown chain '{}'", args.chain))?;

    let mut config = Config::from_env()?;
    if let Some(url) = args.rpc_url {
        config.rpc_urls.insert(chain.name.to_string(), url);
    }
    config.validate()?;

    println!("📡 {} via {}", chain.name, config.rpc_url_for(chain));
    println!("   factory {:?} from block {}", chain.factory, chain.start_block);
    println!("   lens    {:?}", chain.lens);
    println!();

    let backend = AlloyBackend::new(config);

    let start = Instant::now();
    let vaults = backend.discover_vaults(chain).await?;
    println!("{} {} vaults discovered in {:?}", style("✓").green(), vaults.len(), start.elapsed());

    let start = Instant::now();
    let infos = backend.fetch_vault_infos(chain, &vaults).await?;
    let readable = infos.iter().filter(|i| i.is_some()).count();
    println!("{} {}/{} lens reads succeeded in {:?}", style("✓").green(), readable, vaults.len(), start.elapsed());

    let active = supplying(infos);
    println!("{} {} vaults with positive supply APY", style("✓").green(), active.len());

    if args.verbose {
        println!();
        for info in &active {
            let rates = info.interest_rates.unwrap_or_default();
            println!(
                "   {:?}  {:<10} supply {:>7.3}%  borrow {:>7.3}%  {}",
                info.vault,
                info.asset_symbol,
                fixed_to_f64(rates.supply_apy, RATE_DECIMALS),
                fixed_to_f64(rates.borrow_apy, RATE_DECIMALS),
                info.vault_name
            );
        }
    }

    Ok(())
}
