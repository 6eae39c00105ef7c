//! Machine learning models module
//!
//! Binary classifiers that estimate the probability of an "up" day:
//! a CART decision tree, a random forest, gradient-boosted trees, and a
//! soft-voting ensemble over any of them.

mod decision_tree;
mod gradient_boosting;
mod random_forest;
mod voting;

pub use decision_tree::{DecisionTree, SplitCriterion, TreeConfig, TreeNode};
pub use gradient_boosting::{BoostingConfig, GradientBoosting};
pub use random_forest::{ForestConfig, RandomForest};
pub use voting::SoftVoting;

use crate::data::Dataset;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probabilities strictly above this predict "up"
pub const DECISION_THRESHOLD: f64 = 0.5;

/// A fitted-then-queried binary classifier
pub trait Classifier: Send + Sync {
    /// Train on the dataset
    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// Probability that the sample is class 1
    fn predict_proba_one(&self, features: &[f64]) -> Result<f64>;

    /// Probabilities for every row
    fn predict_proba(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset
            .features
            .iter()
            .map(|f| self.predict_proba_one(f))
            .collect()
    }

    /// Class labels for every row
    fn predict(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(dataset)?
            .into_iter()
            .map(|p| u8::from(p > DECISION_THRESHOLD))
            .collect())
    }

    fn name(&self) -> &str;

    /// Normalized per-feature importances, when the model has them
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Check that a dataset can train a binary classifier
pub fn ensure_trainable(dataset: &Dataset) -> Result<()> {
    if dataset.is_empty() {
        return Err(Error::InvalidInput("training set is empty".to_string()));
    }

    for (row, features) in dataset.features.iter().enumerate() {
        check_features(features, dataset.n_features())?;
        if let Some(col) = features.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteFeature {
                feature: dataset.feature_names[col].clone(),
                date: dataset
                    .dates
                    .get(row)
                    .map_or_else(|| format!("row {}", row), |d| d.to_string()),
            });
        }
    }

    if let Some(&bad) = dataset.labels.iter().find(|&&l| l > 1) {
        return Err(Error::InvalidInput(format!("label {} is not binary", bad)));
    }

    match dataset.class_counts() {
        [0, _] => Err(Error::SingleClassLabels { class: 1 }),
        [_, 0] => Err(Error::SingleClassLabels { class: 0 }),
        _ => Ok(()),
    }
}

pub(crate) fn check_features(features: &[f64], expected: usize) -> Result<()> {
    if features.len() != expected {
        return Err(Error::InvalidInput(format!(
            "expected {} features, got {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

/// Which classifier the pipeline trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    GradientBoosting,
    SoftVoting,
    RandomForest,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::SoftVoting => "soft_voting",
            ModelKind::RandomForest => "random_forest",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "gradient_boosting" | "gbt" | "gbm" | "xgboost" => Ok(ModelKind::GradientBoosting),
            "soft_voting" | "voting" | "ensemble" => Ok(ModelKind::SoftVoting),
            "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            other => Err(format!(
                "unknown model '{}', expected gradient_boosting, soft_voting or random_forest",
                other
            )),
        }
    }
}

/// Hyperparameters for every model kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub kind: ModelKind,
    pub forest: ForestConfig,
    pub boosting: BoostingConfig,
    /// Member weights for soft voting (forest, boosting); equal when absent
    pub voting_weights: Option<Vec<f64>>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            kind: ModelKind::GradientBoosting,
            forest: ForestConfig::default(),
            boosting: BoostingConfig::default(),
            voting_weights: None,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<()> {
        self.forest.validate()?;
        self.boosting.validate()?;
        if let Some(weights) = &self.voting_weights {
            SoftVoting::check_weights(weights, 2)?;
        }
        Ok(())
    }
}

/// Create an untrained classifier of the configured kind
pub fn build_classifier(params: &ModelParams) -> Box<dyn Classifier> {
    match params.kind {
        ModelKind::GradientBoosting => Box::new(GradientBoosting::new(params.boosting.clone())),
        ModelKind::RandomForest => Box::new(RandomForest::new(params.forest.clone())),
        ModelKind::SoftVoting => {
            let voting = SoftVoting::forest_and_boosting(params.forest.clone(), params.boosting.clone());
            match &params.voting_weights {
                Some(weights) => Box::new(voting.with_weights(weights.clone())),
                None => Box::new(voting),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::Dataset;
    use chrono::{Duration, NaiveDate};

    /// Two features; label is 1 when `x0 + 0.5 * x1 > 1`, with a few flipped rows
    pub fn separable(n: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let mut dataset = Dataset::new(vec!["x0".to_string(), "x1".to_string()]);
        for i in 0..n {
            let x0 = ((i * 17) % 100) as f64 / 50.0;
            let x1 = ((i * 29) % 100) as f64 / 50.0;
            let mut label = u8::from(x0 + 0.5 * x1 > 1.0);
            if i % 23 == 0 {
                label = 1 - label;
            }
            dataset
                .add_sample(vec![x0, x1], label, start + Duration::days(i as i64))
                .unwrap();
        }
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_ensure_trainable() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut dataset = Dataset::new(vec!["a".to_string()]);
        assert!(matches!(ensure_trainable(&dataset), Err(Error::InvalidInput(_))));

        dataset.add_sample(vec![1.0], 1, day).unwrap();
        dataset.add_sample(vec![2.0], 1, day).unwrap();
        assert!(matches!(
            ensure_trainable(&dataset),
            Err(Error::SingleClassLabels { class: 1 })
        ));

        dataset.add_sample(vec![f64::INFINITY], 0, day).unwrap();
        assert!(matches!(
            ensure_trainable(&dataset),
            Err(Error::NonFiniteFeature { .. })
        ));
    }

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("gbt".parse::<ModelKind>(), Ok(ModelKind::GradientBoosting));
        assert_eq!("soft-voting".parse::<ModelKind>(), Ok(ModelKind::SoftVoting));
        assert_eq!("RF".parse::<ModelKind>(), Ok(ModelKind::RandomForest));
        assert!("svm".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::SoftVoting.to_string(), "soft_voting");
    }

    #[test]
    fn test_build_classifier_names() {
        let mut params = ModelParams::default();
        assert_eq!(build_classifier(&params).name(), "gradient_boosting");
        params.kind = ModelKind::RandomForest;
        assert_eq!(build_classifier(&params).name(), "random_forest");
        params.kind = ModelKind::SoftVoting;
        assert_eq!(build_classifier(&params).name(), "soft_voting");
    }

    #[test]
    fn test_threshold_is_strict() {
        struct Half;
        impl Classifier for Half {
            fn fit(&mut self, _dataset: &Dataset) -> Result<()> {
                Ok(())
            }
            fn predict_proba_one(&self, _features: &[f64]) -> Result<f64> {
                Ok(0.5)
            }
            fn name(&self) -> &str {
                "half"
            }
        }

        let dataset = test_support::separable(5);
        assert_eq!(Half.predict(&dataset).unwrap(), vec![0; 5]);
    }
}
