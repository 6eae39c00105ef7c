//! Dataset structure for machine learning

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dataset for binary classification with features, labels and dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Feature matrix (n_samples x n_features)
    pub features: Vec<Vec<f64>>,
    /// Binary labels (1 = next close higher)
    pub labels: Vec<u8>,
    /// Feature names
    pub feature_names: Vec<String>,
    /// Trading day of each sample
    pub dates: Vec<NaiveDate>,
}

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            features: Vec::new(),
            labels: Vec::new(),
            feature_names,
            dates: Vec::new(),
        }
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Add a sample
    pub fn add_sample(&mut self, features: Vec<f64>, label: u8, date: NaiveDate) -> Result<()> {
        if features.len() != self.feature_names.len() {
            return Err(Error::InvalidInput(format!(
                "sample has {} features, dataset expects {}",
                features.len(),
                self.feature_names.len()
            )));
        }
        self.features.push(features);
        self.labels.push(label);
        self.dates.push(date);
        Ok(())
    }

    /// Count of samples per class `[down, up]`
    pub fn class_counts(&self) -> [usize; 2] {
        let up = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - up, up]
    }

    /// Split into train and test sets by time
    ///
    /// The first `floor(n * train_fraction)` rows train, the rest test.
    /// Rows are never shuffled, so every test date is later than every
    /// train date.
    pub fn chronological_split(&self, train_fraction: f64) -> Result<Split> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "train fraction must be in (0, 1), got {}",
                train_fraction
            )));
        }

        let n = self.n_samples();
        let train_size = (train_fraction * n as f64).floor() as usize;

        if train_size >= n {
            return Err(Error::EmptyPartition {
                partition: "test",
                rows: n,
                fraction: train_fraction,
            });
        }
        if train_size == 0 {
            return Err(Error::EmptyPartition {
                partition: "train",
                rows: n,
                fraction: train_fraction,
            });
        }

        Ok(Split {
            train: self.slice(0, train_size),
            test: self.slice(train_size, n),
        })
    }

    /// Contiguous row range `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Dataset {
        Dataset {
            features: self.features[start..end].to_vec(),
            labels: self.labels[start..end].to_vec(),
            feature_names: self.feature_names.clone(),
            dates: self.dates[start..end].to_vec(),
        }
    }

    /// Create a subset of the dataset by indices
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
            dates: indices.iter().map(|&i| self.dates[i]).collect(),
        }
    }
}
