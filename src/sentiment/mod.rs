//! Headline sentiment scoring and aggregation

mod aggregator;
mod analyzer;

pub use aggregator::{SentimentAggregator, SentimentMode, SentimentSeries, SentimentSummary};
pub use analyzer::{FixedScorer, LexiconAnalyzer, SentimentScore, SentimentScorer};
