//! Gradient Boosting Machine implementation
//!
//! Binary log-loss boosting: each stage fits a regression tree to the
//! residuals `y - p` and sets leaf outputs with one Newton step,
//! `sum(r) / sum(p * (1 - p))`, over the rows in the leaf.

use super::decision_tree::{DecisionTree, SplitCriterion, TreeConfig};
use super::{check_features, ensure_trainable, Classifier};
use crate::data::Dataset;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Probabilities are kept this far from 0 and 1
const PROBA_EPS: f64 = 1e-12;

/// GBM hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl BoostingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::ConfigError("boosting needs at least one estimator".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::ConfigError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::ConfigError("boosting max_depth must be positive".to_string()));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(Error::ConfigError(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Gradient-boosted trees for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: BoostingConfig,
    /// Log-odds of the training class prior
    init_score: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
    /// Training log-loss after each stage
    train_loss: Vec<f64>,
}

impl GradientBoosting {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            init_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
            train_loss: Vec::new(),
        }
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn init_score(&self) -> f64 {
        self.init_score
    }

    /// Training log-loss per boosting stage
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    /// Raw additive score (log-odds) for a sample
    pub fn decision_function(&self, features: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::NotTrained("gradient_boosting".to_string()));
        }
        check_features(features, self.n_features)?;

        let mut raw = self.init_score;
        for tree in &self.trees {
            raw += self.config.learning_rate * tree.predict_value(features)?;
        }
        Ok(raw)
    }

    fn stage_rows(&self, n: usize, stage: usize) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..n).collect();
        if self.config.subsample < 1.0 {
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(stage as u64));
            rows.shuffle(&mut rng);
            let keep = ((n as f64 * self.config.subsample).round() as usize).clamp(1, n);
            rows.truncate(keep);
            rows.sort_unstable();
        }
        rows
    }
}

fn log_loss(labels: &[f64], raw: &[f64]) -> f64 {
    let total: f64 = labels
        .iter()
        .zip(raw)
        .map(|(&y, &f)| {
            let p = sigmoid(f).clamp(PROBA_EPS, 1.0 - PROBA_EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / labels.len().max(1) as f64
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        ensure_trainable(dataset)?;
        self.config.validate()?;

        let n = dataset.n_samples();
        self.n_features = dataset.n_features();
        self.trees.clear();
        self.train_loss.clear();

        let labels: Vec<f64> = dataset.labels.iter().map(|&l| f64::from(l)).collect();
        let prior = (labels.iter().sum::<f64>() / n as f64).clamp(PROBA_EPS, 1.0 - PROBA_EPS);
        self.init_score = (prior / (1.0 - prior)).ln();

        let mut raw = vec![self.init_score; n];

        for stage in 0..self.config.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&f| sigmoid(f)).collect();
            let residuals: Vec<f64> = labels.iter().zip(&probs).map(|(y, p)| y - p).collect();
            let rows = self.stage_rows(n, stage);

            let mut tree = DecisionTree::new(TreeConfig {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                min_samples_leaf: self.config.min_samples_leaf,
                max_features: None,
                seed: self.config.seed.wrapping_add(stage as u64),
                criterion: SplitCriterion::Mse,
            });
            tree.fit_targets(dataset, &residuals, &rows, |leaf_rows| {
                let numerator: f64 = leaf_rows.iter().map(|&i| residuals[i]).sum();
                let denominator: f64 = leaf_rows.iter().map(|&i| probs[i] * (1.0 - probs[i])).sum();
                if denominator.abs() < 1e-12 {
                    0.0
                } else {
                    numerator / denominator
                }
            });

            for (i, features) in dataset.features.iter().enumerate() {
                raw[i] += self.config.learning_rate * tree.predict_value(features)?;
            }
            self.trees.push(tree);
            self.train_loss.push(log_loss(&labels, &raw));
        }

        self.feature_importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(importances) = tree.feature_importances() {
                for (total, imp) in self.feature_importances.iter_mut().zip(importances) {
                    *total += imp;
                }
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        debug!(
            "Gradient boosting: {} stages, prior log-odds {:.4}, final train log-loss {:.4}",
            self.trees.len(),
            self.init_score,
            self.train_loss.last().copied().unwrap_or(f64::NAN)
        );
        Ok(())
    }

    fn predict_proba_one(&self, features: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.decision_function(features)?))
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        (!self.trees.is_empty()).then(|| self.feature_importances.clone())
    }
}
