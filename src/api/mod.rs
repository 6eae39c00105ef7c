//! Remote data sources
//!
//! - `yahoo` - daily price history from the Yahoo Finance chart endpoint
//! - `news` - headline retrieval with a fixed fallback set

mod news;
mod types;
mod yahoo;

pub use news::{
    collect_headlines, Headline, HeadlineBatch, HeadlineOrigin, HeadlineSource, NewsApiSource,
    StaticHeadlines, DEFAULT_HEADLINES,
};
pub use news::parse_articles;
pub use types::{ChartResponse, NewsApiResponse, NewsArticle};
pub use yahoo::parse_chart;
pub use yahoo::YahooClient;
