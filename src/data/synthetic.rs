//! Deterministic synthetic price generator

use super::{PriceObservation, PriceSeries, PriceSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Lowest close the generator will emit
const MIN_PRICE: f64 = 0.01;

/// Linear trend plus Gaussian noise on business days
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPrices {
    /// Number of business days
    pub days: usize,
    /// Trend value on the first day
    pub start_price: f64,
    /// Trend value on the last day
    pub end_price: f64,
    /// Standard deviation of the additive noise
    pub noise_std: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for SyntheticPrices {
    fn default() -> Self {
        Self {
            days: 200,
            start_price: 100.0,
            end_price: 150.0,
            noise_std: 2.0,
            seed: 42,
        }
    }
}

impl SyntheticPrices {
    /// Generate the series starting at the first business day on or after `start`
    pub fn generate(&self, ticker: &str, start: NaiveDate) -> Result<PriceSeries> {
        let normal = Normal::new(0.0, self.noise_std).map_err(|e| {
            Error::InvalidInput(format!("noise_std {}: {}", self.noise_std, e))
        })?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let step = if self.days > 1 {
            (self.end_price - self.start_price) / (self.days - 1) as f64
        } else {
            0.0
        };

        let observations = business_days(start)
            .take(self.days)
            .enumerate()
            .map(|(i, date)| {
                let trend = self.start_price + step * i as f64;
                let close = (trend + normal.sample(&mut rng)).max(MIN_PRICE);
                PriceObservation::from_close(date, close)
            })
            .collect();

        PriceSeries::new(ticker, observations)
    }
}

/// Infinite iterator of weekdays from `start`
fn business_days(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..)
        .map(move |offset| start + Duration::days(offset))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}

#[async_trait]
impl PriceSource for SyntheticPrices {
    async fn fetch_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let series = self.generate(ticker, start)?;
        if series.last_date().map_or(false, |last| last > end) {
            tracing::debug!(
                "Synthetic series for {} runs past {}; keeping all {} days",
                ticker,
                end,
                self.days
            );
        }
        Ok(series)
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}
