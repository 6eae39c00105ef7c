//! Headline score aggregation
//!
//! Turns a batch of headlines into the sentiment column of the feature table:
//! either one value per publication day or one value for every row.

use super::analyzer::{LexiconAnalyzer, SentimentScorer};
use crate::api::{Headline, HeadlineBatch, HeadlineOrigin};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How headline scores become a per-row sentiment value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMode {
    /// Mean score per publication day; days without headlines are neutral
    Daily,
    /// Mean over the whole batch, broadcast to every row
    Batch,
    /// Fixed value broadcast to every row
    Constant(f64),
}

/// Sentiment value attached to each trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SentimentSeries {
    Constant(f64),
    Daily(BTreeMap<NaiveDate, f64>),
}

impl SentimentSeries {
    /// Sentiment for `date`, `0.0` for days without headlines
    pub fn value_for(&self, date: NaiveDate) -> f64 {
        match self {
            SentimentSeries::Constant(v) => *v,
            SentimentSeries::Daily(scores) => scores.get(&date).copied().unwrap_or(0.0),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SentimentSeries::Constant(v) => format!("constant {:.4}", v),
            SentimentSeries::Daily(scores) => format!("daily ({} days with headlines)", scores.len()),
        }
    }
}

/// Aggregated sentiment plus where its headlines came from
#[derive(Debug, Clone)]
pub struct SentimentSummary {
    pub series: SentimentSeries,
    /// `None` when no headlines were used
    pub origin: Option<HeadlineOrigin>,
    pub headlines_scored: usize,
}

/// Scores headlines and aggregates them per day or per batch
pub struct SentimentAggregator {
    scorer: Box<dyn SentimentScorer>,
}

impl Default for SentimentAggregator {
    fn default() -> Self {
        Self::new(Box::new(LexiconAnalyzer::new()))
    }
}

impl SentimentAggregator {
    pub fn new(scorer: Box<dyn SentimentScorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Mean score of all headlines, `0.0` when there are none
    pub fn batch_score(&self, headlines: &[Headline]) -> f64 {
        if headlines.is_empty() {
            return 0.0;
        }
        let total: f64 = headlines.iter().map(|h| self.scorer.score(&h.text)).sum();
        (total / headlines.len() as f64).clamp(-1.0, 1.0)
    }

    /// Mean score per publication day; undated headlines are ignored
    pub fn daily_scores(&self, headlines: &[Headline]) -> BTreeMap<NaiveDate, f64> {
        let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        for headline in headlines {
            if let Some(date) = headline.date {
                let entry = sums.entry(date).or_insert((0.0, 0));
                entry.0 += self.scorer.score(&headline.text);
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(date, (sum, n))| (date, (sum / n as f64).clamp(-1.0, 1.0)))
            .collect()
    }

    /// Build the sentiment column for `mode`
    pub fn summarize(&self, mode: SentimentMode, batch: &HeadlineBatch) -> SentimentSummary {
        let series = match mode {
            SentimentMode::Constant(value) => {
                return SentimentSummary {
                    series: SentimentSeries::Constant(value),
                    origin: None,
                    headlines_scored: 0,
                };
            }
            SentimentMode::Batch => SentimentSeries::Constant(self.batch_score(&batch.headlines)),
            SentimentMode::Daily => {
                let daily = self.daily_scores(&batch.headlines);
                if daily.is_empty() {
                    debug!("No dated headlines; using one batch score for every day");
                    SentimentSeries::Constant(self.batch_score(&batch.headlines))
                } else {
                    SentimentSeries::Daily(daily)
                }
            }
        };

        info!(
            "Scored {} {} headlines with {}: {}",
            batch.len(),
            batch.origin,
            self.scorer.name(),
            series.describe()
        );

        SentimentSummary {
            series,
            origin: Some(batch.origin),
            headlines_scored: batch.len(),
        }
    }
}
