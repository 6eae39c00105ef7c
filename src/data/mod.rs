//! Data structures and price loading
//!
//! Provides the price series, the ML dataset with its chronological splitter,
//! and price sources (CSV file and synthetic generator; the Yahoo client lives
//! in [`crate::api`]).

mod dataset;
mod price;
mod synthetic;

pub use dataset::{Dataset, Split};
pub use price::{PriceObservation, PriceSeries};
pub use synthetic::SyntheticPrices;

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Anything that can deliver daily prices for a ticker
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch daily observations with dates in `[start, end]`
    async fn fetch_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries>;

    /// Short name for logs
    fn source_name(&self) -> &str;
}

/// Prices read from a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn fetch_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let series = PriceSeries::load_csv(ticker, &self.path)?.within(start, end);
        tracing::debug!(
            "Loaded {} rows for {} from {}",
            series.len(),
            ticker,
            self.path.display()
        );

        if series.is_empty() {
            return Err(Error::MalformedPrices(format!(
                "{} has no rows between {} and {}",
                self.path.display(),
                start,
                end
            )));
        }
        Ok(series)
    }

    fn source_name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_csv_source_filters_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spy.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-02,,,,470.1,\n\
             2024-01-03,,,,467.3,\n\
             2024-01-04,,,,466.0,\n",
        )
        .unwrap();

        let source = CsvPriceSource::new(&path);
        let start = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let series = source.fetch_prices("SPY", start, end).await.unwrap();

        assert_eq!(series.closes(), vec![467.3, 466.0]);

        let late = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(source.fetch_prices("SPY", late, late).await.is_err());
    }
}
