//! Daily price observations

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One trading day of market data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Trading day
    pub date: NaiveDate,
    /// Opening price
    pub open: Option<f64>,
    /// Highest price
    pub high: Option<f64>,
    /// Lowest price
    pub low: Option<f64>,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: Option<f64>,
}

impl PriceObservation {
    /// Observation carrying only a close price
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// Full OHLCV observation
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
            volume: Some(volume),
        }
    }
}

/// Date-ordered price history for a single ticker
///
/// Construction validates that dates are strictly increasing and that every
/// close is a finite positive number, so downstream indicator code never has
/// to deal with out-of-order or degenerate rows.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    ticker: String,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    /// Create a validated series
    pub fn new(ticker: impl Into<String>, observations: Vec<PriceObservation>) -> Result<Self> {
        let ticker = ticker.into();

        for (i, obs) in observations.iter().enumerate() {
            if !obs.close.is_finite() || obs.close <= 0.0 {
                return Err(Error::MalformedPrices(format!(
                    "{}: close {} on {} is not a positive finite number",
                    ticker, obs.close, obs.date
                )));
            }
            if i > 0 && observations[i - 1].date >= obs.date {
                return Err(Error::MalformedPrices(format!(
                    "{}: dates not strictly increasing at {} -> {}",
                    ticker,
                    observations[i - 1].date,
                    obs.date
                )));
            }
        }

        Ok(Self {
            ticker,
            observations,
        })
    }

    /// Build a close-only series from parallel date/close slices
    pub fn from_closes(ticker: impl Into<String>, dates: &[NaiveDate], closes: &[f64]) -> Result<Self> {
        if dates.len() != closes.len() {
            return Err(Error::InvalidInput(format!(
                "{} dates but {} closes",
                dates.len(),
                closes.len()
            )));
        }

        let observations = dates
            .iter()
            .zip(closes)
            .map(|(&d, &c)| PriceObservation::from_close(d, c))
            .collect();

        Self::new(ticker, observations)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Dates in order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Keep observations within `[start, end]`
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            observations: self
                .observations
                .iter()
                .filter(|o| o.date >= start && o.date <= end)
                .cloned()
                .collect(),
        }
    }

    /// Save to CSV with a `date,open,high,low,close,volume` header
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for obs in &self.observations {
            writer.serialize(obs)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load from CSV written by [`PriceSeries::save_csv`] or any file with
    /// the same header. Empty open/high/low/volume cells are allowed.
    pub fn load_csv(ticker: impl Into<String>, path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let observations = reader
            .deserialize()
            .collect::<std::result::Result<Vec<PriceObservation>, csv::Error>>()?;

        Self::new(ticker, observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let result = PriceSeries::from_closes("AAPL", &[day(3), day(2)], &[10.0, 11.0]);
        assert!(matches!(result, Err(Error::MalformedPrices(_))));

        let result = PriceSeries::from_closes("AAPL", &[day(2), day(2)], &[10.0, 11.0]);
        assert!(matches!(result, Err(Error::MalformedPrices(_))));
    }

    #[test]
    fn test_rejects_bad_close() {
        let result = PriceSeries::from_closes("AAPL", &[day(2), day(3)], &[10.0, f64::NAN]);
        assert!(matches!(result, Err(Error::MalformedPrices(_))));

        let result = PriceSeries::from_closes("AAPL", &[day(2)], &[0.0]);
        assert!(matches!(result, Err(Error::MalformedPrices(_))));
    }

    #[test]
    fn test_within_range() {
        let series =
            PriceSeries::from_closes("AAPL", &[day(2), day(3), day(4), day(5)], &[1.0, 2.0, 3.0, 4.0])
                .unwrap();
        let sub = series.within(day(3), day(4));
        assert_eq!(sub.closes(), vec![2.0, 3.0]);
        assert_eq!(sub.ticker(), "AAPL");
    }

    #[test]
    fn test_csv_file_with_partial_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-02,185.0,186.1,183.9,185.6,82488700\n\
             2024-01-03,,,,184.2,\n",
        )
        .unwrap();

        let series = PriceSeries::load_csv("AAPL", &path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[0].volume, Some(82_488_700.0));
        assert_eq!(series.observations()[1].open, None);
        assert_eq!(series.last_date(), Some(day(3)));
    }
}
