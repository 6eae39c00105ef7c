//! Evaluation reports and charts
//!
//! - `metrics` - accuracy, per-class precision/recall/F1, confusion matrix
//! - `chart` - SVG price chart with predicted-up markers and metric bars

mod chart;
mod metrics;

pub use chart::{render_metric_bars, render_price_chart, VariantMetrics};
pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport};

use crate::api::HeadlineOrigin;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable outcome of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Name shown when comparing runs
    pub label: String,
    pub ticker: String,
    pub model: String,
    /// `None` when sentiment was a fixed constant
    pub headline_origin: Option<HeadlineOrigin>,
    pub sentiment: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_start: Option<NaiveDate>,
    pub test_end: Option<NaiveDate>,
    pub report: ClassificationReport,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    /// Write as pretty JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a summary written by [`RunSummary::save_json`]
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let summary: Self = serde_json::from_str(&content)?;
        if summary.report.classes.len() != 2 {
            return Err(Error::InvalidInput(format!(
                "{}: report has {} classes, expected down and up",
                path.display(),
                summary.report.classes.len()
            )));
        }
        Ok(summary)
    }

    /// Accuracy and "up"-class metrics for the comparison chart
    pub fn variant_metrics(&self) -> VariantMetrics {
        let up = self.report.up();
        VariantMetrics {
            name: self.label.clone(),
            accuracy: self.report.accuracy,
            precision: up.precision,
            recall: up.recall,
            f1: up.f1,
        }
    }
}
