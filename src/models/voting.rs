//! Soft-voting ensemble

use super::{
    check_features, ensure_trainable, BoostingConfig, Classifier, ForestConfig, GradientBoosting,
    RandomForest,
};
use crate::data::Dataset;
use crate::error::{Error, Result};
use tracing::debug;

/// Averages member probabilities, optionally weighted
pub struct SoftVoting {
    members: Vec<Box<dyn Classifier>>,
    weights: Option<Vec<f64>>,
    n_features: Option<usize>,
}

impl SoftVoting {
    pub fn new(members: Vec<Box<dyn Classifier>>) -> Self {
        Self {
            members,
            weights: None,
            n_features: None,
        }
    }

    /// Random forest and gradient boosting with equal weight
    pub fn forest_and_boosting(forest: ForestConfig, boosting: BoostingConfig) -> Self {
        Self::new(vec![
            Box::new(RandomForest::new(forest)),
            Box::new(GradientBoosting::new(boosting)),
        ])
    }

    /// Per-member weights, checked when fitting
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    pub(crate) fn check_weights(weights: &[f64], n_members: usize) -> Result<()> {
        if weights.len() != n_members {
            return Err(Error::ConfigError(format!(
                "{} voting weights for {} members",
                weights.len(),
                n_members
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(Error::ConfigError(
                "voting weights must be non-negative with a positive sum".to_string(),
            ));
        }
        Ok(())
    }

    fn normalized_weights(&self) -> Vec<f64> {
        match &self.weights {
            Some(w) => {
                let sum: f64 = w.iter().sum();
                w.iter().map(|x| x / sum).collect()
            }
            None => vec![1.0 / self.members.len() as f64; self.members.len()],
        }
    }
}

impl Classifier for SoftVoting {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if self.members.is_empty() {
            return Err(Error::InvalidInput("soft voting needs at least one member".to_string()));
        }
        if let Some(weights) = &self.weights {
            Self::check_weights(weights, self.members.len())?;
        }
        ensure_trainable(dataset)?;

        for member in &mut self.members {
            debug!("Fitting voting member {}", member.name());
            member.fit(dataset)?;
        }
        self.n_features = Some(dataset.n_features());
        Ok(())
    }

    fn predict_proba_one(&self, features: &[f64]) -> Result<f64> {
        let n_features = self
            .n_features
            .ok_or_else(|| Error::NotTrained("soft_voting".to_string()))?;
        check_features(features, n_features)?;

        let mut proba = 0.0;
        for (member, weight) in self.members.iter().zip(self.normalized_weights()) {
            proba += weight * member.predict_proba_one(features)?;
        }
        Ok(proba.clamp(0.0, 1.0))
    }

    fn predict_proba(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        if self.n_features.is_none() {
            return Err(Error::NotTrained("soft_voting".to_string()));
        }

        let mut combined = vec![0.0; dataset.n_samples()];
        for (member, weight) in self.members.iter().zip(self.normalized_weights()) {
            for (total, p) in combined.iter_mut().zip(member.predict_proba(dataset)?) {
                *total += weight * p;
            }
        }
        Ok(combined.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }

    fn name(&self) -> &str {
        "soft_voting"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.n_features?;
        let mut combined: Option<Vec<f64>> = None;
        let mut used = 0.0;

        for (member, weight) in self.members.iter().zip(self.normalized_weights()) {
            if let Some(importances) = member.feature_importances() {
                let acc = combined.get_or_insert_with(|| vec![0.0; importances.len()]);
                for (a, imp) in acc.iter_mut().zip(importances) {
                    *a += weight * imp;
                }
                used += weight;
            }
        }

        combined.map(|c| {
            if used > 0.0 {
                c.into_iter().map(|v| v / used).collect()
            } else {
                c
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::separable;
    use approx::assert_relative_eq;

    /// Member that always answers the same probability
    struct Fixed(f64);

    impl Classifier for Fixed {
        fn fit(&mut self, _dataset: &Dataset) -> Result<()> {
            Ok(())
        }
        fn predict_proba_one(&self, _features: &[f64]) -> Result<f64> {
            Ok(self.0)
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_average_of_members() {
        let dataset = separable(20);
        let mut voting = SoftVoting::new(vec![Box::new(Fixed(0.8)), Box::new(Fixed(0.3))]);
        voting.fit(&dataset).unwrap();

        assert_relative_eq!(voting.predict_proba_one(&[0.1, 0.2]).unwrap(), 0.55);
        assert_eq!(voting.predict(&dataset).unwrap(), vec![1; 20]);
    }

    #[test]
    fn test_weighted_average() {
        let dataset = separable(20);
        let mut voting = SoftVoting::new(vec![Box::new(Fixed(0.8)), Box::new(Fixed(0.3))])
            .with_weights(vec![1.0, 3.0]);
        voting.fit(&dataset).unwrap();

        assert_relative_eq!(voting.predict_proba_one(&[0.1, 0.2]).unwrap(), 0.425);
        assert_eq!(voting.predict(&dataset).unwrap(), vec![0; 20]);
    }

    #[test]
    fn test_bad_weights() {
        let dataset = separable(20);
        let mut voting =
            SoftVoting::new(vec![Box::new(Fixed(0.8)), Box::new(Fixed(0.3))]).with_weights(vec![1.0]);
        assert!(matches!(voting.fit(&dataset), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_forest_and_boosting_members() {
        let dataset = separable(160);
        let mut voting = SoftVoting::forest_and_boosting(
            ForestConfig {
                n_trees: 10,
                ..Default::default()
            },
            BoostingConfig {
                n_estimators: 20,
                ..Default::default()
            },
        );
        voting.fit(&dataset).unwrap();

        assert_eq!(voting.member_names(), vec!["random_forest", "gradient_boosting"]);

        let batch = voting.predict_proba(&dataset).unwrap();
        for (row, p) in dataset.features.iter().zip(&batch) {
            assert_relative_eq!(voting.predict_proba_one(row).unwrap(), *p, epsilon = 1e-12);
        }

        let importances = voting.feature_importances().unwrap();
        assert_relative_eq!(importances.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let voting = SoftVoting::forest_and_boosting(ForestConfig::default(), BoostingConfig::default());
        assert!(matches!(voting.predict_proba_one(&[0.0, 0.0]), Err(Error::NotTrained(_))));
    }
}
