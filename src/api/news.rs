//! Headline retrieval
//!
//! Sources never fail: anything that goes wrong while talking to a provider
//! is logged and reported as "no headlines". [`collect_headlines`] then
//! substitutes the fallback set so the pipeline always has text to score.

use super::types::NewsApiResponse;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const NEWS_API_URL: &str = "https://newsapi.org";

/// Built-in demonstration headlines used when no live headlines are available
pub const DEFAULT_HEADLINES: &[&str] = &[
    "Company beats earnings expectations as revenue grows strongly",
    "Analysts upgrade the stock after record quarterly profit",
    "Shares rally on optimistic guidance and robust demand",
    "Regulators open investigation into accounting practices",
    "Supply chain concerns weigh on outlook despite solid sales",
];

/// A short news headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub text: String,
    /// Publication day, when the provider reports one
    pub date: Option<NaiveDate>,
    pub source: Option<String>,
}

impl Headline {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date: None,
            source: None,
        }
    }

    pub fn dated(text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            text: text.into(),
            date: Some(date),
            source: None,
        }
    }
}

/// Where a batch of headlines came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineOrigin {
    Live,
    Fallback,
}

impl std::fmt::Display for HeadlineOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadlineOrigin::Live => write!(f, "live"),
            HeadlineOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Headlines plus their origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineBatch {
    pub headlines: Vec<Headline>,
    pub origin: HeadlineOrigin,
}

impl HeadlineBatch {
    /// Undated fallback batch from plain texts
    pub fn fallback<S: AsRef<str>>(texts: &[S]) -> Self {
        Self {
            headlines: texts.iter().map(|t| Headline::new(t.as_ref())).collect(),
            origin: HeadlineOrigin::Fallback,
        }
    }

    /// Batch made of [`DEFAULT_HEADLINES`]
    pub fn default_fallback() -> Self {
        Self::fallback(DEFAULT_HEADLINES)
    }

    pub fn len(&self) -> usize {
        self.headlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headlines.is_empty()
    }
}

/// Provider of headlines for a query and date range
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Headlines matching `query` published in `[start, end]`; empty on failure
    async fn fetch(&self, query: &str, start: NaiveDate, end: NaiveDate) -> Vec<Headline>;

    /// Short name for logs
    fn source_name(&self) -> &str;
}

/// Fetch live headlines, or fall back to `fallback` when none arrive
pub async fn collect_headlines<S: AsRef<str>>(
    source: &dyn HeadlineSource,
    query: &str,
    start: NaiveDate,
    end: NaiveDate,
    fallback: &[S],
) -> HeadlineBatch {
    let headlines = source.fetch(query, start, end).await;

    if headlines.is_empty() {
        warn!(
            "No headlines from {} for '{}', using {} fallback headlines",
            source.source_name(),
            query,
            fallback.len()
        );
        return HeadlineBatch::fallback(fallback);
    }

    info!(
        "Collected {} live headlines from {} for '{}'",
        headlines.len(),
        source.source_name(),
        query
    );
    HeadlineBatch {
        headlines,
        origin: HeadlineOrigin::Live,
    }
}

/// Fixed list of headlines
#[derive(Debug, Clone, Default)]
pub struct StaticHeadlines {
    headlines: Vec<Headline>,
}

impl StaticHeadlines {
    pub fn new(headlines: Vec<Headline>) -> Self {
        Self { headlines }
    }

    /// Source that always comes back empty
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeadlineSource for StaticHeadlines {
    async fn fetch(&self, _query: &str, start: NaiveDate, end: NaiveDate) -> Vec<Headline> {
        self.headlines
            .iter()
            .filter(|h| h.date.map_or(true, |d| d >= start && d <= end))
            .cloned()
            .collect()
    }

    fn source_name(&self) -> &str {
        "static"
    }
}

/// NewsAPI.org `everything` endpoint
pub struct NewsApiSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    language: String,
}

impl NewsApiSource {
    /// Create a source; a missing key makes every fetch come back empty
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(NEWS_API_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            page_size: 100,
            language: "en".to_string(),
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn request(&self, api_key: &str, query: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Headline>> {
        let url = format!("{}/v2/everything", self.base_url);
        let from = start.to_string();
        let to = end.to_string();
        let page_size = self.page_size.to_string();

        debug!("Requesting headlines for '{}' from {} to {}", query, from, to);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", self.language.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ApiError(format!("NewsAPI returned HTTP {}", status)));
        }

        let body: NewsApiResponse = response.json().await?;
        parse_articles(body)
    }
}

/// Extract headlines from a NewsAPI payload
pub fn parse_articles(response: NewsApiResponse) -> Result<Vec<Headline>> {
    if response.status != "ok" {
        return Err(Error::ApiError(format!(
            "NewsAPI status '{}': {}",
            response.status,
            response.message.unwrap_or_default()
        )));
    }

    let headlines = response
        .articles
        .into_iter()
        .filter_map(|article| {
            let text = article.title?.trim().to_string();
            // Withdrawn articles keep a placeholder title
            if text.is_empty() || text == "[Removed]" {
                return None;
            }
            let date = article
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.date_naive());

            Some(Headline {
                text,
                date,
                source: article.source.and_then(|s| s.name),
            })
        })
        .collect();

    Ok(headlines)
}

#[async_trait]
impl HeadlineSource for NewsApiSource {
    async fn fetch(&self, query: &str, start: NaiveDate, end: NaiveDate) -> Vec<Headline> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("No NewsAPI key configured; skipping headline request");
            return Vec::new();
        };

        match self.request(api_key, query, start, end).await {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!("Failed to fetch headlines for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    fn source_name(&self) -> &str {
        "newsapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_empty_source_falls_back() {
        let batch = collect_headlines(&StaticHeadlines::empty(), "AAPL", day(1), day(31), DEFAULT_HEADLINES).await;
        assert_eq!(batch.origin, HeadlineOrigin::Fallback);
        assert_eq!(batch.len(), DEFAULT_HEADLINES.len());
        assert!(batch.headlines.iter().all(|h| h.date.is_none()));
    }

    #[tokio::test]
    async fn test_live_headlines_kept() {
        let source = StaticHeadlines::new(vec![
            Headline::dated("Apple shares surge", day(4)),
            Headline::dated("Old news", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
        ]);
        let batch = collect_headlines(&source, "AAPL", day(1), day(31), DEFAULT_HEADLINES).await;
        assert_eq!(batch.origin, HeadlineOrigin::Live);
        assert_eq!(batch.headlines, vec![Headline::dated("Apple shares surge", day(4))]);
    }

    #[tokio::test]
    async fn test_missing_key_yields_nothing() {
        let source = NewsApiSource::new(None, Duration::from_secs(1)).unwrap();
        assert!(source.fetch("AAPL", day(1), day(31)).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_nothing() {
        let source = NewsApiSource::with_base_url(
            "http://127.0.0.1:9",
            Some("key".to_string()),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(source.fetch("AAPL", day(1), day(31)).await.is_empty());
    }

    #[test]
    fn test_parse_articles() {
        let body: NewsApiResponse = serde_json::from_str(
            r#"{"status":"ok","totalResults":3,"articles":[
                {"title":"Apple unveils new chips","publishedAt":"2024-03-04T14:05:00Z","source":{"id":null,"name":"Reuters"}},
                {"title":"[Removed]","publishedAt":"2024-03-04T10:00:00Z","source":{"name":"[Removed]"}},
                {"title":"Apple faces antitrust suit","publishedAt":null,"source":null}
            ]}"#,
        )
        .unwrap();

        let headlines = parse_articles(body).unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].date, Some(day(4)));
        assert_eq!(headlines[0].source.as_deref(), Some("Reuters"));
        assert_eq!(headlines[1].date, None);
    }

    #[test]
    fn test_parse_error_status() {
        let body: NewsApiResponse = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )
        .unwrap();
        assert!(parse_articles(body).is_err());
    }
}
