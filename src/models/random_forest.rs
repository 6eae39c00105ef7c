//! Random Forest implementation

use super::decision_tree::{mean_of, DecisionTree, SplitCriterion, TreeConfig};
use super::{check_features, ensure_trainable, Classifier, DECISION_THRESHOLD};
use crate::data::Dataset;
use crate::error::{Error, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (sqrt of total if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::ConfigError("forest needs at least one tree".to_string()));
        }
        if self.max_depth == 0 {
            return Err(Error::ConfigError("forest max_depth must be positive".to_string()));
        }
        if self.max_features == Some(0) {
            return Err(Error::ConfigError("forest max_features must be positive".to_string()));
        }
        Ok(())
    }
}

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
    oob_score_value: Option<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Out-of-bag accuracy, available after fitting with bootstrap
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    }

    /// Out-of-bag accuracy from per-tree in-bag masks
    fn calculate_oob_score(&self, dataset: &Dataset, in_bag: &[Vec<bool>]) -> Option<f64> {
        let mut correct = 0usize;
        let mut total = 0usize;

        for (i, features) in dataset.features.iter().enumerate() {
            let votes: Vec<f64> = self
                .trees
                .iter()
                .zip(in_bag)
                .filter(|(_, mask)| !mask[i])
                .filter_map(|(tree, _)| tree.predict_value(features).ok())
                .collect();

            if votes.is_empty() {
                continue;
            }
            let proba = votes.iter().sum::<f64>() / votes.len() as f64;
            if u8::from(proba > DECISION_THRESHOLD) == dataset.labels[i] {
                correct += 1;
            }
            total += 1;
        }

        (total > 0).then(|| correct as f64 / total as f64)
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        ensure_trainable(dataset)?;
        self.config.validate()?;

        let n_samples = dataset.n_samples();
        let n_features = dataset.n_features();
        self.n_features = n_features;

        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features);

        let targets: Vec<f64> = dataset.labels.iter().map(|&l| f64::from(l)).collect();
        let config = &self.config;

        // Build trees in parallel; every tree owns its seed so the result
        // does not depend on scheduling
        let grown: Vec<(DecisionTree, Vec<bool>)> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let indices = if config.bootstrap {
                    Self::bootstrap_indices(n_samples, seed)
                } else {
                    (0..n_samples).collect()
                };

                let mut in_bag = vec![false; n_samples];
                for &idx in &indices {
                    in_bag[idx] = true;
                }

                let mut tree = DecisionTree::new(TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed,
                    criterion: SplitCriterion::Gini,
                });
                tree.fit_targets(dataset, &targets, &indices, |rows| mean_of(&targets, rows));

                (tree, in_bag)
            })
            .collect();

        let (trees, in_bag): (Vec<DecisionTree>, Vec<Vec<bool>>) = grown.into_iter().unzip();
        self.trees = trees;

        // Aggregate feature importances
        self.feature_importances = vec![0.0; n_features];
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

        self.oob_score_value = if self.config.bootstrap {
            self.calculate_oob_score(dataset, &in_bag)
        } else {
            None
        };

        debug!(
            "Random forest: {} trees, max_features={}, oob={:?}",
            self.trees.len(),
            max_features,
            self.oob_score_value
        );
        Ok(())
    }

    fn predict_proba_one(&self, features: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::NotTrained("random_forest".to_string()));
        }
        check_features(features, self.n_features)?;

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict_value(features)?;
        }
        Ok((total / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    fn predict_proba(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset
            .features
            .par_iter()
            .map(|f| self.predict_proba_one(f))
            .collect()
    }

    fn name(&self) -> &str {
        "random_forest"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        (!self.trees.is_empty()).then(|| self.feature_importances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::separable;

    fn small_forest(seed: u64) -> RandomForest {
        RandomForest::new(ForestConfig {
            n_trees: 15,
            max_depth: 5,
            seed,
            ..Default::default()
        })
    }

    #[test]
    fn test_random_forest_classification() {
        let dataset = separable(300);
        let mut forest = small_forest(42);
        forest.fit(&dataset).unwrap();

        assert_eq!(forest.n_trees(), 15);
        let predictions = forest.predict(&dataset).unwrap();
        let correct = predictions
            .iter()
            .zip(&dataset.labels)
            .filter(|(p, l)| p == l)
            .count();
        assert!(correct as f64 / 300.0 > 0.85);

        let oob = forest.oob_score().unwrap();
        assert!(oob > 0.7, "oob accuracy {}", oob);
        assert_eq!(forest.feature_importances().unwrap().len(), 2);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let dataset = separable(120);
        let mut forest = small_forest(1);
        forest.fit(&dataset).unwrap();

        for p in forest.predict_proba(&dataset).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let dataset = separable(150);

        let mut a = small_forest(9);
        let mut b = small_forest(9);
        a.fit(&dataset).unwrap();
        b.fit(&dataset).unwrap();
        assert_eq!(a.predict_proba(&dataset).unwrap(), b.predict_proba(&dataset).unwrap());
    }

    #[test]
    fn test_not_trained() {
        let forest = small_forest(0);
        assert!(matches!(forest.predict_proba_one(&[0.0, 0.0]), Err(Error::NotTrained(_))));
    }
}
