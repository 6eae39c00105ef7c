//! Pipeline configuration
//!
//! Every section has defaults, so a config file only needs the fields it
//! changes. Files are read as TOML or JSON depending on the extension.

use crate::api::DEFAULT_HEADLINES;
use crate::data::SyntheticPrices;
use crate::error::{Error, Result};
use crate::features::FeatureBuilder;
use crate::models::ModelParams;
use crate::sentiment::SentimentMode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataSettings,
    pub news: NewsSettings,
    pub sentiment: SentimentSettings,
    pub features: FeatureBuilder,
    pub split: SplitSettings,
    pub model: ModelParams,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// Where prices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    Yahoo,
    Csv,
    Synthetic,
}

/// Price data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: PriceSourceKind,
    /// Required for the CSV source
    pub csv_path: Option<PathBuf>,
    pub synthetic: SyntheticPrices,
    /// Price request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            start: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2023, 12, 29).unwrap_or(NaiveDate::MIN),
            source: PriceSourceKind::Yahoo,
            csv_path: None,
            synthetic: SyntheticPrices::default(),
            timeout_secs: 30,
        }
    }
}

impl DataSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Headline retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    /// Query live headlines; when off the fallback set is used directly
    pub enabled: bool,
    /// Search query, the ticker when absent
    pub query: Option<String>,
    /// API key (can be loaded from env)
    pub api_key: Option<String>,
    /// API key environment variable name
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub page_size: u32,
    pub language: String,
    /// Headlines used when retrieval yields nothing
    pub fallback_headlines: Vec<String>,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            query: None,
            api_key: None,
            api_key_env: "NEWS_API_KEY".to_string(),
            timeout_secs: 10,
            page_size: 100,
            language: "en".to_string(),
            fallback_headlines: DEFAULT_HEADLINES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NewsSettings {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn query_for(&self, ticker: &str) -> String {
        self.query.clone().unwrap_or_else(|| ticker.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Named sentiment modes as they appear in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentModeName {
    Daily,
    Batch,
    Constant,
}

/// Sentiment aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    pub mode: SentimentModeName,
    /// Value broadcast in `constant` mode
    pub constant_value: f64,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            mode: SentimentModeName::Batch,
            constant_value: 0.0,
        }
    }
}

impl SentimentSettings {
    pub fn mode(&self) -> SentimentMode {
        match self.mode {
            SentimentModeName::Daily => SentimentMode::Daily,
            SentimentModeName::Batch => SentimentMode::Batch,
            SentimentModeName::Constant => SentimentMode::Constant(self.constant_value),
        }
    }
}

/// Train/test split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    pub train_fraction: f64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self { train_fraction: 0.8 }
    }
}

/// Optional output files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// SVG price chart with predicted-up markers
    pub chart_path: Option<PathBuf>,
    /// JSON run summary for `compare_models`
    pub summary_path: Option<PathBuf>,
    /// CSV dump of the feature table
    pub features_path: Option<PathBuf>,
    /// Name of this run in comparisons, the model name when absent
    pub run_label: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.data.ticker.trim().is_empty() {
            return Err(Error::ConfigError("ticker is empty".to_string()));
        }
        if self.data.start > self.data.end {
            return Err(Error::ConfigError(format!(
                "start {} is after end {}",
                self.data.start, self.data.end
            )));
        }
        if self.data.source == PriceSourceKind::Csv && self.data.csv_path.is_none() {
            return Err(Error::ConfigError("csv source needs data.csv_path".to_string()));
        }
        if self.data.source == PriceSourceKind::Synthetic {
            let s = &self.data.synthetic;
            if s.days == 0 || s.start_price <= 0.0 || s.end_price <= 0.0 || !(s.noise_std >= 0.0) {
                return Err(Error::ConfigError(
                    "synthetic prices need days > 0, positive prices and noise_std >= 0".to_string(),
                ));
            }
        }
        if self.data.timeout_secs == 0 || self.news.timeout_secs == 0 {
            return Err(Error::ConfigError("timeouts must be positive".to_string()));
        }

        let f = &self.features;
        if f.ma_short == 0 || f.ma_long == 0 || f.rsi_period == 0 {
            return Err(Error::ConfigError("indicator windows must be positive".to_string()));
        }

        let fraction = self.split.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::ConfigError(format!(
                "train_fraction must be in (0, 1), got {}",
                fraction
            )));
        }

        if self.sentiment.mode == SentimentModeName::Constant {
            let v = self.sentiment.constant_value;
            if !v.is_finite() || !(-1.0..=1.0).contains(&v) {
                return Err(Error::ConfigError(format!(
                    "constant sentiment must be within [-1, 1], got {}",
                    v
                )));
            }
        }

        self.model.validate()
    }
}

/// Load configuration from file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let config: PipelineConfig = match ext {
        "json" => serde_json::from_str(&content).map_err(|e| Error::ConfigError(e.to_string()))?,
        "toml" => toml::from_str(&content).map_err(|e| Error::ConfigError(e.to_string()))?,
        _ => {
            return Err(Error::ConfigError(format!(
                "unsupported config format '{}'",
                ext
            )))
        }
    };

    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let content = match ext {
        "json" => serde_json::to_string_pretty(config)?,
        "toml" => toml::to_string_pretty(config).map_err(|e| Error::ConfigError(e.to_string()))?,
        _ => {
            return Err(Error::ConfigError(format!(
                "unsupported config format '{}'",
                ext
            )))
        }
    };

    std::fs::write(path, content)?;
    Ok(())
}
