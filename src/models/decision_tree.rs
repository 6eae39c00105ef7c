//! Decision Tree implementation

use super::{check_features, ensure_trainable, Classifier};
use crate::data::Dataset;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Impurity measure used to pick splits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitCriterion {
    /// Gini impurity on 0/1 targets
    Gini,
    /// Mean squared error on real-valued targets
    Mse,
}

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
    pub criterion: SplitCriterion,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
            criterion: SplitCriterion::Gini,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index for split
    pub feature_idx: Option<usize>,
    /// Threshold for split; values `<=` go left
    pub threshold: Option<f64>,
    /// Prediction value: P(up) for Gini trees, leaf output otherwise
    pub value: f64,
    /// Number of samples in this node
    pub n_samples: usize,
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
    /// Impurity at this node
    pub impurity: f64,
}

impl TreeNode {
    fn leaf(value: f64, n_samples: usize, impurity: f64) -> Self {
        Self {
            feature_idx: None,
            threshold: None,
            value,
            n_samples,
            left: None,
            right: None,
            impurity,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |n| n.depth());
        let right = self.right.as_ref().map_or(0, |n| n.depth());
        1 + left.max(right)
    }

    pub fn n_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.left.as_ref().map_or(0, |n| n.n_leaves())
                + self.right.as_ref().map_or(0, |n| n.n_leaves())
        }
    }
}

/// Winning split for a node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision Tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Create a new decision tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Grow the tree on `indices` rows of `dataset` against `targets`
    ///
    /// `leaf_value` computes the output of a leaf from the rows that reach
    /// it. Neither class balance nor the dataset labels are checked here, so
    /// ensembles can grow trees on bootstrap draws and residuals.
    pub fn fit_targets<F>(&mut self, dataset: &Dataset, targets: &[f64], indices: &[usize], leaf_value: F)
    where
        F: Fn(&[usize]) -> f64,
    {
        self.n_features = dataset.n_features();
        self.feature_importances = vec![0.0; self.n_features];

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut grower = Grower {
            config: &self.config,
            dataset,
            targets,
            leaf_value: &leaf_value,
            importances: &mut self.feature_importances,
        };
        let root = grower.build(indices, 0, &mut rng);
        self.root = Some(root);

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    /// Output of the leaf reached by `features`
    pub fn predict_value(&self, features: &[f64]) -> Result<f64> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::NotTrained("decision_tree".to_string()))?;
        check_features(features, self.n_features)?;

        let mut node = root;
        loop {
            match (node.feature_idx, node.threshold, &node.left, &node.right) {
                (Some(idx), Some(threshold), Some(left), Some(right)) => {
                    node = if features[idx] <= threshold { left } else { right };
                }
                _ => return Ok(node.value),
            }
        }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.depth())
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.n_leaves())
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        ensure_trainable(dataset)?;
        let targets: Vec<f64> = dataset.labels.iter().map(|&l| f64::from(l)).collect();
        let indices: Vec<usize> = (0..dataset.n_samples()).collect();
        self.fit_targets(dataset, &targets, &indices, |rows| mean_of(&targets, rows));
        Ok(())
    }

    fn predict_proba_one(&self, features: &[f64]) -> Result<f64> {
        Ok(self.predict_value(features)?.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "decision_tree"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.root.as_ref().map(|_| self.feature_importances.clone())
    }
}

/// Recursive tree builder over a borrowed dataset
struct Grower<'a, F> {
    config: &'a TreeConfig,
    dataset: &'a Dataset,
    targets: &'a [f64],
    leaf_value: &'a F,
    importances: &'a mut Vec<f64>,
}

impl<'a, F> Grower<'a, F>
where
    F: Fn(&[usize]) -> f64,
{
    fn build(&mut self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
            let t = self.targets[i];
            (s + t, q + t * t)
        });
        let impurity = self.impurity(sum, sum_sq, n as f64);

        // Check stopping conditions
        if depth >= self.config.max_depth
            || n < self.config.min_samples_split.max(2)
            || impurity < 1e-12
        {
            return TreeNode::leaf((self.leaf_value)(indices), n, impurity);
        }

        let Some(split) = self.find_best_split(indices, impurity, rng) else {
            return TreeNode::leaf((self.leaf_value)(indices), n, impurity);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.dataset.features[i][split.feature_idx] <= split.threshold);

        self.importances[split.feature_idx] += split.gain * n as f64;

        let left = self.build(&left_idx, depth + 1, rng);
        let right = self.build(&right_idx, depth + 1, rng);

        TreeNode {
            feature_idx: Some(split.feature_idx),
            threshold: Some(split.threshold),
            value: (self.leaf_value)(indices),
            n_samples: n,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            impurity,
        }
    }

    fn impurity(&self, sum: f64, sum_sq: f64, n: f64) -> f64 {
        if n == 0.0 {
            return 0.0;
        }
        let mean = sum / n;
        match self.config.criterion {
            SplitCriterion::Gini => {
                let p = mean.clamp(0.0, 1.0);
                2.0 * p * (1.0 - p)
            }
            SplitCriterion::Mse => (sum_sq / n - mean * mean).max(0.0),
        }
    }

    /// Sweep sorted feature values, keeping running target sums on each side
    fn find_best_split(
        &self,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.dataset.n_features();
        let max_features = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        // Select features to consider
        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let (total, total_sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
            let t = self.targets[i];
            (s + t, q + t * t)
        });

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature_idx in &feature_indices {
            pairs.clear();
            pairs.extend(
                indices
                    .iter()
                    .map(|&i| (self.dataset.features[i][feature_idx], self.targets[i])),
            );
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 0..n - 1 {
                let (value, target) = pairs[k];
                left_sum += target;
                left_sq += target * target;

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let next = pairs[k + 1].0;
                if next <= value {
                    continue;
                }

                let left_imp = self.impurity(left_sum, left_sq, n_left as f64);
                let right_imp = self.impurity(total - left_sum, total_sq - left_sq, n_right as f64);
                let weighted = (n_left as f64 * left_imp + n_right as f64 * right_imp) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: (value + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Mean of `values` over `rows`
pub(crate) fn mean_of(values: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&i| values[i]).sum::<f64>() / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn threshold_dataset(n: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut dataset = Dataset::new(vec!["x".to_string(), "noise".to_string()]);
        for i in 0..n {
            let x = i as f64 / 10.0;
            let label = u8::from(x > 5.0);
            let noise = ((i * 37) % 11) as f64;
            dataset
                .add_sample(vec![x, noise], label, start + Duration::days(i as i64))
                .unwrap();
        }
        dataset
    }

    #[test]
    fn test_decision_tree_classification() {
        let dataset = threshold_dataset(100);
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&dataset).unwrap();

        let predictions = tree.predict(&dataset).unwrap();
        let correct = predictions
            .iter()
            .zip(&dataset.labels)
            .filter(|(p, l)| p == l)
            .count();
        assert_eq!(correct, 100);

        let importances = tree.feature_importances().unwrap();
        assert!(importances[0] > 0.99);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_regression_targets_with_custom_leaves() {
        let dataset = threshold_dataset(40);
        let targets: Vec<f64> = dataset.features.iter().map(|f| 2.0 * f[0] + 1.0).collect();
        let indices: Vec<usize> = (0..40).collect();

        let mut tree = DecisionTree::new(TreeConfig {
            criterion: SplitCriterion::Mse,
            max_depth: 1,
            min_samples_leaf: 1,
            ..Default::default()
        });
        tree.fit_targets(&dataset, &targets, &indices, |rows| rows.len() as f64);

        // one split, each leaf reports its row count
        let left = tree.predict_value(&[0.0, 0.0]).unwrap();
        let right = tree.predict_value(&[3.9, 0.0]).unwrap();
        assert_eq!(left + right, 40.0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let dataset = threshold_dataset(60);
        let mut tree = DecisionTree::new(TreeConfig {
            min_samples_leaf: 25,
            ..Default::default()
        });
        tree.fit(&dataset).unwrap();

        fn check(node: &TreeNode, min: usize) {
            assert!(node.n_samples >= min);
            if let (Some(l), Some(r)) = (&node.left, &node.right) {
                check(l, min);
                check(r, min);
            }
        }
        check(tree.root().unwrap(), 25);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new(TreeConfig::default());
        assert!(matches!(tree.predict_proba_one(&[1.0, 2.0]), Err(Error::NotTrained(_))));
    }

    #[test]
    fn test_wrong_feature_count() {
        let dataset = threshold_dataset(100);
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&dataset).unwrap();
        assert!(matches!(tree.predict_proba_one(&[1.0]), Err(Error::InvalidInput(_))));
    }
}
