//! Euler v2 yields - one collection run
//!
//! Run with: cargo run -- [--chain base --chain ethereum] [--output pools.json]
//!
//! Writes `{generatedAt, project, pools}` JSON to stdout or `--output`.
//! Logs, banner and summary go to stderr.

use chrono::{DateTime, Utc};
use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use euler_yields::cartographer::AlloyBackend;
use euler_yields::chains;
use euler_yields::metrics::PROJECT;
use euler_yields::pricing::LlamaPrices;
use euler_yields::rewards::{MerklRewards, NoRewards, RewardAugmenter};
use euler_yields::{ChainOutcome, Config, Pipeline, PoolRecord, RunReport, UnpricedPolicy};

#[derive(Debug, Parser)]
#[command(name = "euler-yields", about = "Collect Euler v2 vault yields across chains")]
struct Cli {
    /// TOML config file (default: environment / .env)
    #[arg(long)]
    config: Option<String>,

    /// Only process these chains (repeatable)
    #[arg(long = "chain")]
    chains: Vec<String>,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<String>,

    /// Skip Merkl reward augmentation
    #[arg(long)]
    no_rewards: bool,

    /// Remove pools whose asset has no price
    #[arg(long)]
    drop_unpriced: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output<'a> {
    generated_at: DateTime<Utc>,
    project: &'a str,
    pools: &'a [PoolRecord],
}

fn print_banner() {
    eprintln!();
    eprintln!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    eprintln!(
        "{}",
        style(" EULER V2 YIELDS - Vault APY / TVL Collector").cyan().bold()
    );
    eprintln!(
        "{}",
        style("    Factory logs | VaultLens multicall | USD prices | Merkl").cyan()
    );
    eprintln!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    eprintln!();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if cli.no_rewards {
        config.rewards_enabled = false;
    }
    if cli.drop_unpriced {
        config.unpriced_policy = UnpricedPolicy::Drop;
    }
    if cli.output.is_some() {
        config.output_path = cli.output.clone();
    }

    Ok(config)
}

fn print_run_summary(report: &RunReport) {
    eprintln!();
    eprintln!("{}", style("═══ CHAIN SUMMARY ═══").blue().bold());
    for chain in &report.chains {
        match &chain.outcome {
            ChainOutcome::Succeeded { discovered, supplying, records } => eprintln!(
                "{} {:<12} {:>5} vaults  {:>5} supplying  {:>5} pools  ({:?})",
                style("✓").green(),
                chain.chain,
                discovered,
                supplying,
                records,
                chain.elapsed
            ),
            ChainOutcome::Failed { error } => eprintln!(
                "{} {:<12} {}",
                style("✗").red(),
                chain.chain,
                style(error).red()
            ),
            ChainOutcome::Pending => eprintln!("{} {:<12} not run", style("…").yellow(), chain.chain),
        }
    }

    let unpriced = report.pools.iter().filter(|p| !p.is_priced()).count();
    let tvl: f64 = report.pools.iter().filter(|p| p.is_priced()).map(|p| p.tvl_usd).sum();
    eprintln!();
    eprintln!(
        "{} {} pools, TVL ${:.0}, {} unpriced kept, {} unpriced dropped",
        style("Total:").bold(),
        report.pools.len(),
        tvl,
        unpriced,
        report.dropped_unpriced
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("euler_yields=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    print_banner();

    let config = load_config(&cli)?;
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }
    config.print_summary();

    let selected = chains::select_chains(&cli.chains)?;

    let rewards: Box<dyn RewardAugmenter> = if config.rewards_enabled {
        Box::new(MerklRewards::new(config.merkl_api_url.clone(), config.http_timeout_secs)?)
    } else {
        Box::new(NoRewards)
    };

    let progress = ProgressBar::new(selected.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} chains  {msg}")?
            .progress_chars("=> "),
    );

    let pipeline = Pipeline::new(
        Box::new(AlloyBackend::new(config.clone())),
        Box::new(LlamaPrices::new(config.price_api_url.clone(), config.http_timeout_secs)?),
        rewards,
        config.protocol_id.clone(),
    )
    .with_unpriced_policy(config.unpriced_policy)
    .with_progress(progress);

    let start = Instant::now();
    let report = pipeline.run(&selected).await?;
    info!("Run finished in {:?}", start.elapsed());

    print_run_summary(&report);

    let output = Output {
        generated_at: Utc::now(),
        project: PROJECT,
        pools: &report.pools,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match &config.output_path {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("{} Wrote {}", style("✓").green(), path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
