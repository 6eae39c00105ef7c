//! Download daily prices from Yahoo Finance and save them as CSV
//!
//! Usage: cargo run --bin fetch_prices -- --ticker AAPL --start 2022-01-03 --end 2023-12-29 --output aapl.csv

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use sentiment_direction::api::YahooClient;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch daily prices from Yahoo Finance")]
struct Args {
    /// Ticker symbol
    #[arg(short, long, default_value = "AAPL")]
    ticker: String,

    /// First day (YYYY-MM-DD), one year before the end when absent
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), today when absent
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sentiment_direction=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = args.start.unwrap_or(end - Duration::days(365));
    anyhow::ensure!(start <= end, "start {} is after end {}", start, end);

    info!("Fetching {} from {} to {}", args.ticker, start, end);

    let client = YahooClient::new(std::time::Duration::from_secs(args.timeout))?;
    let series = client
        .daily_history(&args.ticker, start, end)
        .await
        .with_context(|| format!("fetching {}", args.ticker))?;

    println!("\nFetched {} daily bars for {}", series.len(), series.ticker());
    println!(
        "\n{:<12} {:>12} {:>12} {:>12} {:>12} {:>15}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    println!("{}", "-".repeat(80));

    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
    for obs in series.observations().iter().rev().take(5).rev() {
        println!(
            "{:<12} {:>12} {:>12} {:>12} {:>12.2} {:>15}",
            obs.date.to_string(),
            fmt(obs.open),
            fmt(obs.high),
            fmt(obs.low),
            obs.close,
            obs.volume.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v))
        );
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}_daily.csv", args.ticker.to_lowercase())));
    series
        .save_csv(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("\nSaved to {}", output.display());

    Ok(())
}
