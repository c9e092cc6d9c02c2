//! insights-runner: maintain the Fear & Greed sidecars and regenerate the
//! per-market insights reports.
//!
//! Usage:
//!   cargo run -p insights-runner                          # insights for all markets
//!   cargo run -p insights-runner -- --5y                  # from the five-year histories
//!   cargo run -p insights-runner -- --markets gold stocks --dry-run
//!   cargo run -p insights-runner -- --record gold --components components.json --price 245.1
//!   cargo run -p insights-runner -- --rebuild crypto
//!   cargo run -p insights-runner -- --alerts

mod commands;
mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use sentiment_core::Market;
use std::path::PathBuf;

use crate::config::RunnerConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let long_history = args.iter().any(|a| a == "--5y");

    let config = RunnerConfig::from_env().context("loading configuration")?;
    let now = Utc::now();
    tracing::info!("Data directory: {}", config.data_dir.display());

    if let Some(market) = flag_value(&args, "--record") {
        let market: Market = market.parse()?;
        let components = flag_value(&args, "--components")
            .map(PathBuf::from)
            .context("--record needs --components FILE")?;
        let price = flag_value(&args, "--price")
            .map(|p| p.parse::<f64>())
            .transpose()
            .context("invalid --price")?;

        let document = commands::record(&config, market, &components, price, now)?;
        tracing::info!("{}: {} ({})", market, document.score, document.label);
        return Ok(());
    }

    if let Some(market) = flag_value(&args, "--rebuild") {
        let market: Market = market.parse()?;
        let document = commands::rebuild(&config, market, now)?;
        tracing::info!("{}: rebuilt {} days", market, document.history.len());
        return Ok(());
    }

    if args.iter().any(|a| a == "--alerts") {
        let changes = commands::alerts(&config, dry_run, now)?;
        tracing::info!("{} zone changes", changes.len());
        return Ok(());
    }

    let markets = selected_markets(&args)?;
    tracing::info!(
        "Generating {} insights for {} markets{}",
        if long_history { "5Y" } else { "1Y" },
        markets.len(),
        if dry_run { " (dry run)" } else { "" }
    );
    let reports = commands::generate_insights(&config, &markets, long_history, dry_run, now);
    if reports.is_empty() {
        anyhow::bail!("no insights generated");
    }

    Ok(())
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

/// The argument following `flag`, if both are present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Markets listed after `--markets` up to the next flag; all of them otherwise.
fn selected_markets(args: &[String]) -> Result<Vec<Market>> {
    let Some(start) = args.iter().position(|a| a == "--markets") else {
        return Ok(Market::ALL.to_vec());
    };

    let markets = args[start + 1..]
        .iter()
        .take_while(|a| !a.starts_with("--"))
        .map(|a| a.parse::<Market>())
        .collect::<Result<Vec<_>, _>>()?;

    if markets.is_empty() {
        anyhow::bail!("--markets needs at least one of gold, bonds, stocks, crypto");
    }
    Ok(markets)
}
