//! Feature table construction
//!
//! Joins moving averages, RSI and the sentiment column into one row per
//! trading day, with the next-day direction label.

use super::indicators::{rsi, sma};
use crate::data::{Dataset, PriceSeries};
use crate::error::{Error, Result};
use crate::sentiment::SentimentSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Indicator windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureBuilder {
    pub ma_short: usize,
    pub ma_long: usize,
    pub rsi_period: usize,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self {
            ma_short: 20,
            ma_long: 50,
            rsi_period: 14,
        }
    }
}

/// One modelling row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub rsi: f64,
    pub sentiment: f64,
    /// 1 if the next close is higher
    pub label: u8,
}

impl FeatureRow {
    /// Feature values in column order
    pub fn values(&self) -> Vec<f64> {
        vec![self.close, self.ma_short, self.ma_long, self.rsi, self.sentiment]
    }
}

/// Ordered feature rows with column names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub feature_names: Vec<String>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.label).collect()
    }

    /// Convert to a model dataset
    pub fn to_dataset(&self) -> Result<Dataset> {
        let mut dataset = Dataset::new(self.feature_names.clone());
        for row in &self.rows {
            dataset.add_sample(row.values(), row.label, row.date)?;
        }
        Ok(dataset)
    }

    /// Write rows to CSV
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl FeatureBuilder {
    pub fn new(ma_short: usize, ma_long: usize, rsi_period: usize) -> Self {
        Self {
            ma_short,
            ma_long,
            rsi_period,
        }
    }

    /// Column names, e.g. `close, ma20, ma50, rsi14, sentiment`
    pub fn feature_names(&self) -> Vec<String> {
        vec![
            "close".to_string(),
            format!("ma{}", self.ma_short),
            format!("ma{}", self.ma_long),
            format!("rsi{}", self.rsi_period),
            "sentiment".to_string(),
        ]
    }

    /// Index of the first row where every indicator is defined
    pub fn warmup(&self) -> usize {
        (self.ma_short.max(self.ma_long).saturating_sub(1)).max(self.rsi_period)
    }

    /// Observations needed for at least one labelled row
    pub fn required_history(&self) -> usize {
        self.warmup() + 2
    }

    /// Build the feature table
    ///
    /// Rows without every indicator defined are dropped, as is the final row
    /// whose label would need a future close.
    pub fn build(&self, series: &PriceSeries, sentiment: &SentimentSeries) -> Result<FeatureTable> {
        if self.ma_short == 0 || self.ma_long == 0 || self.rsi_period == 0 {
            return Err(Error::InvalidInput("indicator windows must be positive".to_string()));
        }

        let closes = series.closes();
        let dates = series.dates();
        let n = closes.len();

        let ma_short = sma(&closes, self.ma_short);
        let ma_long = sma(&closes, self.ma_long);
        let rsi_values = rsi(&closes, self.rsi_period);

        let names = self.feature_names();
        let mut rows = Vec::with_capacity(n.saturating_sub(self.warmup() + 1));

        for i in 0..n.saturating_sub(1) {
            let (Some(ma_s), Some(ma_l), Some(rsi)) = (ma_short[i], ma_long[i], rsi_values[i]) else {
                continue;
            };

            let sentiment_value = sentiment.value_for(dates[i]);
            if sentiment_value.is_finite() && !(-1.0..=1.0).contains(&sentiment_value) {
                return Err(Error::InvalidInput(format!(
                    "sentiment {} on {} is outside [-1, 1]",
                    sentiment_value, dates[i]
                )));
            }

            let row = FeatureRow {
                date: dates[i],
                close: closes[i],
                ma_short: ma_s,
                ma_long: ma_l,
                rsi,
                sentiment: sentiment_value,
                label: u8::from(closes[i + 1] > closes[i]),
            };

            if let Some(pos) = row.values().iter().position(|v| !v.is_finite()) {
                return Err(Error::NonFiniteFeature {
                    feature: names[pos].clone(),
                    date: dates[i].to_string(),
                });
            }

            rows.push(row);
        }

        if rows.is_empty() {
            return Err(Error::InsufficientHistory {
                required: self.required_history(),
                available: n,
            });
        }

        debug!(
            "Built {} feature rows from {} observations ({} warm-up rows dropped)",
            rows.len(),
            n,
            n - 1 - rows.len()
        );

        Ok(FeatureTable {
            rows,
            feature_names: names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceSeries::from_closes("TEST", &dates, closes).unwrap()
    }

    #[test]
    fn test_row_count_and_names() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let table = FeatureBuilder::default()
            .build(&series(&closes), &SentimentSeries::Constant(0.1))
            .unwrap();

        // rows 49..=118 survive
        assert_eq!(table.len(), 120 - 50);
        assert_eq!(
            table.feature_names,
            vec!["close", "ma20", "ma50", "rsi14", "sentiment"]
        );
        assert!(table.rows.iter().all(|r| r.values().iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_labels_follow_next_close() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 50.0 + ((i * 7919) % 13) as f64)
            .collect();
        let s = series(&closes);
        let table = FeatureBuilder::default()
            .build(&s, &SentimentSeries::Constant(0.0))
            .unwrap();

        for row in &table.rows {
            let i = s.dates().iter().position(|&d| d == row.date).unwrap();
            assert_eq!(row.label == 1, closes[i + 1] > closes[i]);
        }
    }

    #[test]
    fn test_monotone_series_labels() {
        let rising: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let table = FeatureBuilder::default()
            .build(&series(&rising), &SentimentSeries::Constant(0.0))
            .unwrap();
        assert!(table.labels().iter().all(|&l| l == 1));

        let falling: Vec<f64> = (0..60).map(|i| 100.0 - i as f64).collect();
        let table = FeatureBuilder::default()
            .build(&series(&falling), &SentimentSeries::Constant(0.0))
            .unwrap();
        assert!(table.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_constant_series() {
        let table = FeatureBuilder::default()
            .build(&series(&[25.0; 70]), &SentimentSeries::Constant(0.0))
            .unwrap();
        for row in &table.rows {
            assert_eq!(row.rsi, 50.0);
            assert_relative_eq!(row.ma_short, 25.0);
            assert_relative_eq!(row.ma_long, 25.0);
            assert_eq!(row.label, 0);
        }
    }

    #[test]
    fn test_insufficient_history() {
        let closes: Vec<f64> = (0..50).map(|i| 10.0 + i as f64).collect();
        let err = FeatureBuilder::default()
            .build(&series(&closes), &SentimentSeries::Constant(0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientHistory {
                required: 51,
                available: 50
            }
        ));

        let closes: Vec<f64> = (0..51).map(|i| 10.0 + i as f64).collect();
        let table = FeatureBuilder::default()
            .build(&series(&closes), &SentimentSeries::Constant(0.0))
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_daily_sentiment_joined_by_date() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let s = series(&closes);
        let target = s.dates()[55];
        let mut scores = BTreeMap::new();
        scores.insert(target, -0.7);

        let table = FeatureBuilder::default()
            .build(&s, &SentimentSeries::Daily(scores))
            .unwrap();
        for row in &table.rows {
            let expected = if row.date == target { -0.7 } else { 0.0 };
            assert_eq!(row.sentiment, expected);
        }
    }

    #[test]
    fn test_bad_sentiment_rejected() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let builder = FeatureBuilder::default();

        let err = builder
            .build(&series(&closes), &SentimentSeries::Constant(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, Error::NonFiniteFeature { ref feature, .. } if feature == "sentiment"));

        assert!(builder
            .build(&series(&closes), &SentimentSeries::Constant(1.5))
            .is_err());
    }

    #[test]
    fn test_to_dataset() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let table = FeatureBuilder::default()
            .build(&series(&closes), &SentimentSeries::Constant(0.2))
            .unwrap();
        let dataset = table.to_dataset().unwrap();

        assert_eq!(dataset.n_samples(), table.len());
        assert_eq!(dataset.n_features(), 5);
        assert_eq!(dataset.features[0], table.rows[0].values());
        assert_eq!(dataset.dates, table.dates());
    }
}
