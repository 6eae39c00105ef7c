//! Train a direction classifier and report on the test period
//!
//! Usage: cargo run --bin predict_direction -- --ticker AAPL --model soft_voting --chart aapl.svg

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sentiment_direction::api::{NewsApiSource, YahooClient};
use sentiment_direction::config::{load_config, PipelineConfig, PriceSourceKind, SentimentModeName};
use sentiment_direction::data::{CsvPriceSource, PriceSource};
use sentiment_direction::models::ModelKind;
use sentiment_direction::pipeline::{Pipeline, PipelineOutcome};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Predict next-day stock direction from indicators and headline sentiment")]
struct Args {
    /// Config file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticker symbol
    #[arg(short, long)]
    ticker: Option<String>,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Price source: yahoo, csv or synthetic
    #[arg(long, value_parser = parse_source)]
    source: Option<PriceSourceKind>,

    /// Price CSV for the csv source
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Model: gradient_boosting, soft_voting or random_forest
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Sentiment mode: daily, batch or constant
    #[arg(long, value_parser = parse_sentiment_mode)]
    sentiment: Option<SentimentModeName>,

    /// Value broadcast in constant sentiment mode
    #[arg(long, allow_hyphen_values = true)]
    sentiment_value: Option<f64>,

    /// Skip the live headline request
    #[arg(long)]
    offline: bool,

    /// Train fraction of the chronological split
    #[arg(long)]
    train_fraction: Option<f64>,

    /// NewsAPI key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write the price chart (SVG)
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Write the run summary (JSON) for compare_models
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write the feature table (CSV)
    #[arg(long)]
    features: Option<PathBuf>,

    /// Run label used in comparisons
    #[arg(long)]
    label: Option<String>,
}

fn parse_source(s: &str) -> std::result::Result<PriceSourceKind, String> {
    match s.to_lowercase().as_str() {
        "yahoo" => Ok(PriceSourceKind::Yahoo),
        "csv" => Ok(PriceSourceKind::Csv),
        "synthetic" => Ok(PriceSourceKind::Synthetic),
        other => Err(format!("unknown price source '{}'", other)),
    }
}

fn parse_sentiment_mode(s: &str) -> std::result::Result<SentimentModeName, String> {
    match s.to_lowercase().as_str() {
        "daily" => Ok(SentimentModeName::Daily),
        "batch" => Ok(SentimentModeName::Batch),
        "constant" => Ok(SentimentModeName::Constant),
        other => Err(format!("unknown sentiment mode '{}'", other)),
    }
}

impl Args {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(ticker) = self.ticker {
            config.data.ticker = ticker;
        }
        if let Some(start) = self.start {
            config.data.start = start;
        }
        if let Some(end) = self.end {
            config.data.end = end;
        }
        if let Some(source) = self.source {
            config.data.source = source;
        }
        if let Some(csv) = self.csv {
            config.data.csv_path = Some(csv);
            if self.source.is_none() {
                config.data.source = PriceSourceKind::Csv;
            }
        }
        if let Some(model) = self.model {
            config.model.kind = model;
        }
        if let Some(mode) = self.sentiment {
            config.sentiment.mode = mode;
        }
        if let Some(value) = self.sentiment_value {
            config.sentiment.constant_value = value;
            if self.sentiment.is_none() {
                config.sentiment.mode = SentimentModeName::Constant;
            }
        }
        if self.offline {
            config.news.enabled = false;
        }
        if let Some(fraction) = self.train_fraction {
            config.split.train_fraction = fraction;
        }
        if self.api_key.is_some() {
            config.news.api_key = self.api_key;
        }
        if self.chart.is_some() {
            config.output.chart_path = self.chart;
        }
        if self.summary.is_some() {
            config.output.summary_path = self.summary;
        }
        if self.features.is_some() {
            config.output.features_path = self.features;
        }
        if self.label.is_some() {
            config.output.run_label = self.label;
        }
    }
}

fn price_source(config: &PipelineConfig) -> Result<Box<dyn PriceSource>> {
    let data = &config.data;
    let source: Box<dyn PriceSource> = match data.source {
        PriceSourceKind::Yahoo => Box::new(YahooClient::new(data.timeout())?),
        PriceSourceKind::Csv => {
            let path = data
                .csv_path
                .clone()
                .context("csv source selected without a csv path")?;
            Box::new(CsvPriceSource::new(path))
        }
        PriceSourceKind::Synthetic => Box::new(data.synthetic.clone()),
    };
    Ok(source)
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("\n=== {} on {} ===\n", outcome.model_name, outcome.ticker);
    println!("Sentiment: {}", outcome.sentiment);
    if let Some(origin) = outcome.headline_origin {
        println!("Headlines: {}", origin);
    }
    println!(
        "Rows: {} (train {}, test {})\n",
        outcome.table.len(),
        outcome.train_rows(),
        outcome.test_rows()
    );

    println!("{}", outcome.report);

    if let Some(importances) = &outcome.feature_importances {
        println!("=== Feature Importance ===\n");
        for (i, (name, imp)) in importances.iter().enumerate() {
            let bar = "█".repeat((imp * 40.0) as usize);
            println!("{:2}. {:12} {:.4} {}", i + 1, name, imp, bar);
        }
        println!();
    }

    let up_days = outcome.predicted_up_dates();
    println!(
        "Predicted up on {} of {} test days",
        up_days.len(),
        outcome.test_rows()
    );
    for (date, p) in outcome.test_dates().iter().zip(&outcome.probabilities).take(10) {
        println!("  {}  P(up) = {:.3}", date, p);
    }
    if outcome.test_rows() > 10 {
        println!("  ...");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("===========================================");
    println!("  Next-Day Direction - Sentiment + Technicals");
    println!("===========================================\n");

    let prices = price_source(&config)?;
    let news = NewsApiSource::new(config.news.get_api_key(), config.news.timeout())?
        .with_page_size(config.news.page_size)
        .with_language(config.news.language.clone());

    let pipeline = Pipeline::new(config.clone());
    let outcome = pipeline
        .run(prices.as_ref(), &news)
        .await
        .context("pipeline run failed")?;

    print_outcome(&outcome);

    let output = &config.output;
    if let Some(path) = &output.chart_path {
        let svg = outcome.render_chart()?;
        std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
        info!("Chart written to {}", path.display());
    }
    if let Some(path) = &output.summary_path {
        outcome
            .summary(output.run_label.as_deref())
            .save_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }
    if let Some(path) = &output.features_path {
        outcome
            .table
            .save_csv(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Features written to {}", path.display());
    }

    Ok(())
}
