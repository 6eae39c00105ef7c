//! Classification metrics

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Binary classification report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Class 0 ("down") then class 1 ("up")
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Rows are true classes, columns predicted classes
    pub confusion: Array2<usize>,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl ClassificationReport {
    /// Compare true and predicted labels
    ///
    /// Precision, recall or F1 with a zero denominator are reported as 0.
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(Error::InvalidInput(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(Error::InvalidInput("no labels to evaluate".to_string()));
        }

        let mut confusion = Array2::<usize>::zeros((2, 2));
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t > 1 || p > 1 {
                return Err(Error::InvalidInput(format!(
                    "labels must be 0 or 1, got true={} predicted={}",
                    t, p
                )));
            }
            confusion[[t as usize, p as usize]] += 1;
        }

        let total = y_true.len();
        let correct = confusion[[0, 0]] + confusion[[1, 1]];

        let classes: Vec<ClassMetrics> = (0..2)
            .map(|c| {
                let tp = confusion[[c, c]];
                let predicted = confusion.column(c).sum();
                let support = confusion.row(c).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                ClassMetrics {
                    label: c as u8,
                    precision,
                    recall,
                    f1: f1_score(precision, recall),
                    support,
                }
            })
            .collect();

        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
        };

        let weight = |c: &ClassMetrics| c.support as f64 / total as f64;
        let weighted_avg = AverageMetrics {
            precision: classes.iter().map(|c| weight(c) * c.precision).sum(),
            recall: classes.iter().map(|c| weight(c) * c.recall).sum(),
            f1: classes.iter().map(|c| weight(c) * c.f1).sum(),
        };

        Ok(Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
            confusion,
            total,
        })
    }

    /// Metrics of the "up" class
    pub fn up(&self) -> &ClassMetrics {
        &self.classes[1]
    }

    /// Metrics of the "down" class
    pub fn down(&self) -> &ClassMetrics {
        &self.classes[0]
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class.label, class.precision, class.recall, class.f1, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = actual, cols = predicted):")?;
        for (label, row) in self.confusion.rows().into_iter().enumerate() {
            writeln!(f, "{:>12} {:>10} {:>10}", label, row[0], row[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_report_values() {
        let y_true = [1, 1, 1, 0, 0, 1, 0, 1];
        let y_pred = [1, 0, 1, 0, 1, 1, 0, 1];
        let report = ClassificationReport::from_labels(&y_true, &y_pred).unwrap();

        assert_relative_eq!(report.accuracy, 6.0 / 8.0);
        assert_eq!(report.confusion[[1, 1]], 4);
        assert_eq!(report.confusion[[1, 0]], 1);
        assert_eq!(report.confusion[[0, 1]], 1);

        let up = report.up();
        assert_relative_eq!(up.precision, 4.0 / 5.0);
        assert_relative_eq!(up.recall, 4.0 / 5.0);
        assert_eq!(up.support, 5);

        let down = report.down();
        assert_relative_eq!(down.precision, 2.0 / 3.0);
        assert_relative_eq!(down.recall, 2.0 / 3.0);

        assert_relative_eq!(report.macro_avg.f1, (0.8 + 2.0 / 3.0) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(report.weighted_avg.recall, report.accuracy, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let report = ClassificationReport::from_labels(&[1, 1, 0], &[0, 0, 0]).unwrap();
        let up = report.up();
        assert_eq!(up.precision, 0.0);
        assert_eq!(up.recall, 0.0);
        assert_eq!(up.f1, 0.0);
        assert!(report.accuracy.is_finite());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(ClassificationReport::from_labels(&[1, 0], &[1]).is_err());
        assert!(ClassificationReport::from_labels(&[], &[]).is_err());
        assert!(ClassificationReport::from_labels(&[2], &[1]).is_err());
    }

    #[test]
    fn test_display() {
        let report = ClassificationReport::from_labels(&[1, 0, 1], &[1, 0, 0]).unwrap();
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.67"));
    }
}
