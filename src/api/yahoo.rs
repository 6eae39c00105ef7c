//! Yahoo Finance daily price client

use super::types::ChartResponse;
use crate::data::{PriceObservation, PriceSeries, PriceSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::Client;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; sentiment_direction/0.1)";

/// Client for the Yahoo Finance chart endpoint
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client with an explicit request timeout
    pub fn new(timeout: StdDuration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a client against another host (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>, timeout: StdDuration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch daily bars with dates in `[start, end]`
    pub async fn daily_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, ticker, period1, period2
        );
        debug!("Fetching daily history from: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Yahoo reports unknown tickers as a 404 with a JSON error payload
        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if !status.is_success() => {
                return Err(Error::ApiError(format!("HTTP {} for {}: {}", status, ticker, e)));
            }
            Err(e) => return Err(e.into()),
        };
        if !status.is_success() && parsed.chart.error.is_none() {
            return Err(Error::ApiError(format!("HTTP {} for {}", status, ticker)));
        }

        let series = parse_chart(ticker, parsed)?.within(start, end);
        info!(
            "Fetched {} daily bars for {} ({} to {})",
            series.len(),
            ticker,
            start,
            end
        );
        Ok(series)
    }
}

/// Convert a chart payload into a validated series
///
/// Bars with a null close are skipped, as are bars whose date does not
/// advance past the previous one (Yahoo repeats the live bar at times).
pub fn parse_chart(ticker: &str, response: ChartResponse) -> Result<PriceSeries> {
    if let Some(err) = response.chart.error {
        return Err(Error::ApiError(format!("{}: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| Error::ApiError(format!("no chart result for {}", ticker)))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut observations: Vec<PriceObservation> = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(close), Some(dt)) = (at(&quote.close, i), DateTime::from_timestamp(ts, 0)) else {
            skipped += 1;
            continue;
        };
        let date = dt.date_naive();
        if observations.last().map_or(false, |prev| prev.date >= date) {
            skipped += 1;
            continue;
        }

        observations.push(PriceObservation {
            date,
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close,
            volume: at(&quote.volume, i),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} incomplete or repeated bars for {}", skipped, ticker);
    }

    PriceSeries::new(ticker, observations)
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn fetch_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        self.daily_history(ticker, start, end).await
    }

    fn source_name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(body: &str) -> ChartResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_parse_chart_skips_null_close() {
        let response = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{"quote":[{
                    "open":[187.1,184.2,null],
                    "high":[188.4,185.9,null],
                    "low":[183.9,183.4,null],
                    "close":[185.6,184.3,null],
                    "volume":[82488700,58414500,null]
                }]}
            }],"error":null}}"#,
        );

        let series = parse_chart("AAPL", response).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![185.6, 184.3]);
        assert_eq!(
            series.first_date(),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(series.observations()[1].volume, Some(58_414_500.0));
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let response = chart(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        let err = parse_chart("NOPE", response).unwrap_err();
        assert!(matches!(err, Error::ApiError(_)));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_chart_drops_repeated_day() {
        let response = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704222000],
                "indicators":{"quote":[{"close":[185.6,185.9]}]}
            }],"error":null}}"#,
        );
        let series = parse_chart("AAPL", response).unwrap();
        assert_eq!(series.closes(), vec![185.6]);
    }
}
