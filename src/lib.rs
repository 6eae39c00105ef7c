//! # Sentiment Direction
//!
//! Predicts whether a stock closes higher tomorrow from moving averages,
//! RSI and news-headline sentiment.
//!
//! ## Modules
//!
//! - `api` - Yahoo Finance prices and NewsAPI headlines with a fallback set
//! - `data` - Price series, datasets and the chronological splitter
//! - `sentiment` - Lexicon headline scoring and daily/batch aggregation
//! - `features` - SMA/RSI indicators and the labelled feature table
//! - `models` - Decision tree, random forest, gradient boosting, soft voting
//! - `report` - Classification report and SVG charts
//! - `pipeline` - The end-to-end run
//! - `config` - TOML/JSON configuration

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sentiment;

pub use api::{HeadlineBatch, HeadlineOrigin, NewsApiSource, YahooClient};
pub use config::{load_config, PipelineConfig};
pub use data::{Dataset, PriceSeries, PriceSource, SyntheticPrices};
pub use error::{Error, Result};
pub use features::{FeatureBuilder, FeatureTable};
pub use models::{Classifier, GradientBoosting, ModelKind, RandomForest, SoftVoting};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use report::{ClassificationReport, RunSummary};
pub use sentiment::{LexiconAnalyzer, SentimentAggregator, SentimentSeries};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{
        collect_headlines, Headline, HeadlineBatch, HeadlineOrigin, HeadlineSource,
        NewsApiSource, StaticHeadlines, YahooClient,
    };
    pub use crate::config::{load_config, PipelineConfig, PriceSourceKind};
    pub use crate::data::{CsvPriceSource, Dataset, PriceSeries, PriceSource, Split, SyntheticPrices};
    pub use crate::error::{Error, Result};
    pub use crate::features::{FeatureBuilder, FeatureRow, FeatureTable};
    pub use crate::models::{
        build_classifier, BoostingConfig, Classifier, DecisionTree, ForestConfig,
        GradientBoosting, ModelKind, ModelParams, RandomForest, SoftVoting,
    };
    pub use crate::pipeline::{Pipeline, PipelineOutcome};
    pub use crate::report::{ClassificationReport, RunSummary, VariantMetrics};
    pub use crate::sentiment::{
        LexiconAnalyzer, SentimentAggregator, SentimentMode, SentimentScorer, SentimentSeries,
    };
}
