use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing::info;

use vpn_check::config::Config;
use vpn_check::engine::SubnetCache;
use vpn_check::error::LookupError;
use vpn_check::init::setup_logging;

/// Checks whether an IP address belongs to a known VPN network.
#[derive(Parser, Debug)]
#[command(name = "vpn-check", version, about)]
struct Cli {
    /// Path to a TOML config file (built-in defaults are used when absent)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Dump every known VPN subnet, one per line
    #[arg(long)]
    subnets: bool,

    /// An IP address to analyze
    #[arg(long, value_name = "IP")]
    check: Option<String>,

    /// List the configured origins and their source locations
    #[arg(long)]
    sources: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Config
    let config = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    // 2. Setup Logging
    setup_logging(&config.logging);

    if cli.sources {
        for (origin, location) in config.sources_sorted() {
            println!("{}\t{}", origin, location);
        }
        return Ok(());
    }

    if !cli.subnets && cli.check.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    // 3. Build Cache
    let cache = SubnetCache::from_config(&config)?;

    if cli.subnets {
        let subnets = cache.all_subnets().await;
        info!("Dumping {} subnets", subnets.len());
        for subnet in subnets {
            println!("{}", subnet);
        }
        return Ok(());
    }

    if let Some(ip) = cli.check {
        match cache.check(&ip).await {
            Ok(origin) => println!("Looks like a '{}' address.", origin),
            Err(LookupError::NotFound) => println!("Does not look like a vpn address."),
            Err(e @ LookupError::InvalidAddress(_)) => bail!(e),
        }
    }

    Ok(())
}
