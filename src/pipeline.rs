//! End-to-end direction classification run
//!
//! prices -> headlines -> sentiment -> features -> chronological split ->
//! classifier -> report

use crate::api::{collect_headlines, HeadlineBatch, HeadlineOrigin, HeadlineSource};
use crate::config::PipelineConfig;
use crate::data::{PriceSeries, PriceSource};
use crate::error::Result;
use crate::features::FeatureTable;
use crate::models::build_classifier;
use crate::report::{render_price_chart, ClassificationReport, RunSummary};
use crate::sentiment::{SentimentAggregator, SentimentMode, SentimentSeries};
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub ticker: String,
    pub table: FeatureTable,
    /// First test row in `table`
    pub split_index: usize,
    pub test_labels: Vec<u8>,
    pub predictions: Vec<u8>,
    /// Probability of "up" for each test row
    pub probabilities: Vec<f64>,
    pub report: ClassificationReport,
    pub model_name: String,
    /// Feature name with normalized importance, highest first
    pub feature_importances: Option<Vec<(String, f64)>>,
    /// Description of the sentiment column
    pub sentiment: String,
    /// `None` when no headlines were used
    pub headline_origin: Option<HeadlineOrigin>,
}

impl PipelineOutcome {
    pub fn train_rows(&self) -> usize {
        self.split_index
    }

    pub fn test_rows(&self) -> usize {
        self.table.len() - self.split_index
    }

    pub fn test_dates(&self) -> Vec<NaiveDate> {
        self.table.rows[self.split_index..].iter().map(|r| r.date).collect()
    }

    /// Test days predicted "up"
    pub fn predicted_up_dates(&self) -> Vec<NaiveDate> {
        self.table.rows[self.split_index..]
            .iter()
            .zip(&self.predictions)
            .filter(|(_, &p)| p == 1)
            .map(|(r, _)| r.date)
            .collect()
    }

    /// SVG of the closing price with predicted-up test days marked
    pub fn render_chart(&self) -> Result<String> {
        let title = format!(
            "{} close with predicted up days ({}, test from {})",
            self.ticker,
            self.model_name,
            self.test_dates().first().map_or_else(String::new, |d| d.to_string())
        );
        render_price_chart(
            &title,
            &self.table.dates(),
            &self.table.closes(),
            &self.predicted_up_dates(),
        )
    }

    pub fn summary(&self, label: Option<&str>) -> RunSummary {
        let test_dates = self.test_dates();
        RunSummary {
            label: label.unwrap_or(&self.model_name).to_string(),
            ticker: self.ticker.clone(),
            model: self.model_name.clone(),
            headline_origin: self.headline_origin,
            sentiment: self.sentiment.clone(),
            train_rows: self.train_rows(),
            test_rows: self.test_rows(),
            test_start: test_dates.first().copied(),
            test_end: test_dates.last().copied(),
            report: self.report.clone(),
            generated_at: Utc::now(),
        }
    }
}

/// Configured pipeline
pub struct Pipeline {
    config: PipelineConfig,
    aggregator: SentimentAggregator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            aggregator: SentimentAggregator::default(),
        }
    }

    /// Replace the headline scorer
    pub fn with_aggregator(mut self, aggregator: SentimentAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch prices and headlines, then evaluate
    pub async fn run(
        &self,
        prices: &dyn PriceSource,
        headlines: &dyn HeadlineSource,
    ) -> Result<PipelineOutcome> {
        let data = &self.config.data;
        info!(
            "Loading {} prices from {} ({} to {})",
            data.ticker,
            prices.source_name(),
            data.start,
            data.end
        );
        let series = prices.fetch_prices(&data.ticker, data.start, data.end).await?;
        info!("Loaded {} daily observations", series.len());

        let mode = self.config.sentiment.mode();
        let batch = match mode {
            SentimentMode::Constant(_) => HeadlineBatch::fallback::<&str>(&[]),
            _ if !self.config.news.enabled => {
                HeadlineBatch::fallback(&self.config.news.fallback_headlines)
            }
            _ => {
                collect_headlines(
                    headlines,
                    &self.config.news.query_for(&data.ticker),
                    data.start,
                    data.end,
                    &self.config.news.fallback_headlines,
                )
                .await
            }
        };

        self.evaluate_headlines(&series, &batch)
    }

    /// Score `batch` with the configured sentiment mode, then evaluate
    pub fn evaluate_headlines(&self, series: &PriceSeries, batch: &HeadlineBatch) -> Result<PipelineOutcome> {
        let summary = self.aggregator.summarize(self.config.sentiment.mode(), batch);
        let mut outcome = self.evaluate(series, &summary.series)?;
        outcome.headline_origin = summary.origin;
        Ok(outcome)
    }

    /// Build features, split, train and report
    pub fn evaluate(&self, series: &PriceSeries, sentiment: &SentimentSeries) -> Result<PipelineOutcome> {
        let table = self.config.features.build(series, sentiment)?;
        let dataset = table.to_dataset()?;
        let split = dataset.chronological_split(self.config.split.train_fraction)?;

        let [down, up] = split.train.class_counts();
        info!(
            "Features: {} rows; train {} (up {}, down {}), test {}",
            table.len(),
            split.train.n_samples(),
            up,
            down,
            split.test.n_samples()
        );

        let mut model = build_classifier(&self.config.model);
        debug!("Training {}", model.name());
        model.fit(&split.train)?;

        let probabilities = model.predict_proba(&split.test)?;
        let predictions = model.predict(&split.test)?;
        let report = ClassificationReport::from_labels(&split.test.labels, &predictions)?;
        info!(
            "{} test accuracy {:.4} on {} rows",
            model.name(),
            report.accuracy,
            split.test.n_samples()
        );

        let feature_importances = model.feature_importances().map(|imps| {
            let mut ranked: Vec<(String, f64)> =
                dataset.feature_names.iter().cloned().zip(imps).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked
        });

        Ok(PipelineOutcome {
            ticker: series.ticker().to_string(),
            split_index: split.train.n_samples(),
            test_labels: split.test.labels.clone(),
            predictions,
            probabilities,
            report,
            model_name: model.name().to_string(),
            feature_importances,
            sentiment: sentiment.describe(),
            headline_origin: None,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Headline, StaticHeadlines};
    use crate::config::{PriceSourceKind, SentimentModeName};
    use crate::data::SyntheticPrices;
    use crate::models::{BoostingConfig, ModelKind};

    fn quick_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.data.source = PriceSourceKind::Synthetic;
        config.data.start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        config.model.boosting = BoostingConfig {
            n_estimators: 20,
            ..Default::default()
        };
        config
    }

    #[tokio::test]
    async fn test_run_falls_back_without_headlines() {
        let pipeline = Pipeline::new(quick_config());
        let outcome = pipeline
            .run(&SyntheticPrices::default(), &StaticHeadlines::empty())
            .await
            .unwrap();

        assert_eq!(outcome.headline_origin, Some(HeadlineOrigin::Fallback));
        assert_eq!(outcome.table.len(), 150);
        assert_eq!(outcome.train_rows(), 120);
        assert_eq!(outcome.test_rows(), 30);
        assert_eq!(outcome.predictions.len(), 30);
        assert_eq!(outcome.model_name, "gradient_boosting");
    }

    #[tokio::test]
    async fn test_run_with_live_daily_headlines() {
        let mut config = quick_config();
        config.sentiment.mode = SentimentModeName::Daily;
        config.model.kind = ModelKind::RandomForest;
        config.model.forest.n_trees = 10;

        let day = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let source = StaticHeadlines::new(vec![Headline::dated("Shares surge on record profit", day)]);

        let outcome = Pipeline::new(config)
            .run(&SyntheticPrices::default(), &source)
            .await
            .unwrap();

        assert_eq!(outcome.headline_origin, Some(HeadlineOrigin::Live));
        let row = outcome.table.rows.iter().find(|r| r.date == day).unwrap();
        assert!(row.sentiment > 0.0);
        assert!(outcome
            .table
            .rows
            .iter()
            .filter(|r| r.date != day)
            .all(|r| r.sentiment == 0.0));
    }

    #[test]
    fn test_outcome_summary_and_chart() {
        let series = SyntheticPrices::default()
            .generate("SYN", NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
            .unwrap();
        let outcome = Pipeline::new(quick_config())
            .evaluate(&series, &SentimentSeries::Constant(0.45))
            .unwrap();

        assert_eq!(outcome.headline_origin, None);
        let summary = outcome.summary(Some("baseline"));
        assert_eq!(summary.label, "baseline");
        assert_eq!(summary.test_rows, 30);
        assert_eq!(summary.test_start, outcome.test_dates().first().copied());

        let svg = outcome.render_chart().unwrap();
        assert!(svg.contains("SYN close"));
        assert_eq!(
            svg.matches("<circle").count(),
            outcome.predicted_up_dates().len() + 1
        );
    }
}
