//! Compare saved runs of different model variants
//!
//! Usage: cargo run --bin compare_models -- baseline.json enhanced.json --output comparison.svg

use anyhow::{Context, Result};
use clap::Parser;
use sentiment_direction::report::{render_metric_bars, RunSummary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compare model variants from run summaries")]
struct Args {
    /// Run summary JSON files written by predict_direction --summary
    #[arg(required = true)]
    summaries: Vec<PathBuf>,

    /// Bar chart output (SVG)
    #[arg(short, long, default_value = "model_comparison.svg")]
    output: PathBuf,

    /// Chart title
    #[arg(long, default_value = "Model comparison")]
    title: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sentiment_direction=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let summaries = args
        .summaries
        .iter()
        .map(|path| {
            RunSummary::load_json(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    info!("Loaded {} run summaries", summaries.len());

    println!("\n=== Model Comparison ===\n");
    println!(
        "{:<20} {:<8} {:<18} {:>6} {:>9} {:>10} {:>8} {:>8}",
        "Variant",
        "Ticker",
        "Model",
        "Test",
        "Accuracy",
        "Precision",
        "Recall",
        "F1"
    );
    println!("{}", "-".repeat(93));

    let variants: Vec<_> = summaries.iter().map(RunSummary::variant_metrics).collect();
    for (summary, v) in summaries.iter().zip(&variants) {
        println!(
            "{:<20} {:<8} {:<18} {:>6} {:>9.4} {:>10.4} {:>8.4} {:>8.4}",
            v.name,
            summary.ticker,
            summary.model,
            summary.test_rows,
            v.accuracy,
            v.precision,
            v.recall,
            v.f1
        );
    }

    if let Some(best) = variants
        .iter()
        .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
    {
        println!("\nBest accuracy: {} ({:.2}%)", best.name, best.accuracy * 100.0);
    }

    let svg = render_metric_bars(&args.title, &variants)?;
    std::fs::write(&args.output, svg)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Chart saved to {}", args.output.display());

    Ok(())
}
