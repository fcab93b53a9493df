//! Model evaluation
//!
//! Exact-match accuracy, per-class precision/recall/F1 with support-weighted
//! averages, a confusion matrix, and k-fold selection of the naive Bayes
//! smoothing parameter.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{Classifier, MultinomialNb};
use crate::error::{Result, SentimentError};
use crate::sentiment::{NUM_CLASSES, Sentiment};
use crate::vectorizer::SparseVector;

pub const DEFAULT_ALPHA_GRID: [f64; 6] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Fraction of predictions equal to the truth; `0.0` for empty input.
pub fn accuracy(truth: &[Sentiment], predicted: &[Sentiment]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

/// Predicts every row, propagating the first scoring error.
pub fn predict_all<C: Classifier + ?Sized>(model: &C, x: &[SparseVector]) -> Result<Vec<Sentiment>> {
    x.iter().map(|row| model.predict(row)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Indexed by label code.
    pub per_class: [ClassMetrics; NUM_CLASSES],
    pub weighted: ClassMetrics,
    /// `confusion[truth][predicted]`
    pub confusion: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

impl ClassificationReport {
    pub fn new(truth: &[Sentiment], predicted: &[Sentiment]) -> Self {
        let mut confusion = [[0usize; NUM_CLASSES]; NUM_CLASSES];
        for (t, p) in truth.iter().zip(predicted) {
            confusion[t.index()][p.index()] += 1;
        }

        let mut per_class = [ClassMetrics::default(); NUM_CLASSES];
        for (c, metrics) in per_class.iter_mut().enumerate() {
            let tp = confusion[c][c] as f64;
            let predicted_c: usize = (0..NUM_CLASSES).map(|t| confusion[t][c]).sum();
            let support: usize = confusion[c].iter().sum();
            let precision = ratio(tp, predicted_c as f64);
            let recall = ratio(tp, support as f64);
            *metrics = ClassMetrics {
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            };
        }

        let total: usize = per_class.iter().map(|m| m.support).sum();
        let weighted_mean = |f: fn(&ClassMetrics) -> f64| {
            ratio(
                per_class.iter().map(|m| f(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted = ClassMetrics {
            precision: weighted_mean(|m| m.precision),
            recall: weighted_mean(|m| m.recall),
            f1: weighted_mean(|m| m.f1),
            support: total,
        };

        Self {
            accuracy: accuracy(truth, predicted),
            per_class,
            weighted,
            confusion,
        }
    }

    pub fn class(&self, sentiment: Sentiment) -> &ClassMetrics {
        &self.per_class[sentiment.index()]
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for sentiment in Sentiment::ALL {
            let m = self.class(sentiment);
            writeln!(
                f,
                "{:>14} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                sentiment.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.4} {:>9}",
            "accuracy", "", "", self.accuracy, self.weighted.support
        )?;
        writeln!(
            f,
            "{:>14} {:>9.4} {:>9.4} {:>9.4} {:>9}",
            "weighted avg",
            self.weighted.precision,
            self.weighted.recall,
            self.weighted.f1,
            self.weighted.support
        )?;
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows = truth, columns = predicted)")?;
        write!(f, "{:>14}", "")?;
        for sentiment in Sentiment::ALL {
            write!(f, " {:>9}", sentiment.as_str())?;
        }
        writeln!(f)?;
        for truth in Sentiment::ALL {
            write!(f, "{:>14}", truth.as_str())?;
            for count in self.confusion[truth.index()] {
                write!(f, " {:>9}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Picks the multinomial NB smoothing with the strictly highest mean k-fold
/// accuracy; earlier grid entries win ties.
pub fn cross_validate_alpha(
    x: &[SparseVector],
    y: &[Sentiment],
    grid: &[f64],
    folds: usize,
    seed: u64,
) -> Result<(f64, f64)> {
    if folds < 2 || folds > x.len() {
        return Err(SentimentError::InvalidParameter {
            name: "folds".to_string(),
            value: folds.to_string(),
            reason: format!("expected 2..={} for {} samples", x.len(), x.len()),
        });
    }
    if grid.is_empty() {
        return Err(SentimentError::InvalidParameter {
            name: "grid".to_string(),
            value: "[]".to_string(),
            reason: "at least one alpha is required".to_string(),
        });
    }

    let mut order: Vec<usize> = (0..x.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut best: Option<(f64, f64)> = None;
    for &alpha in grid {
        let mut total = 0.0;
        for fold in 0..folds {
            let (mut train_x, mut train_y, mut test_x, mut test_y) =
                (Vec::new(), Vec::new(), Vec::new(), Vec::new());
            for (position, &i) in order.iter().enumerate() {
                if position % folds == fold {
                    test_x.push(x[i].clone());
                    test_y.push(y[i]);
                } else {
                    train_x.push(x[i].clone());
                    train_y.push(y[i]);
                }
            }
            let mut model = MultinomialNb::new(alpha);
            model.fit(&train_x, &train_y)?;
            total += accuracy(&test_y, &predict_all(&model, &test_x)?);
        }
        let mean = total / folds as f64;
        debug!(alpha, mean_accuracy = mean, "Cross-validated alpha");
        if best.is_none_or(|(_, score)| mean > score) {
            best = Some((alpha, mean));
        }
    }

    best.ok_or(SentimentError::EmptyTrainingSet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::toy_data;
    use crate::sentiment::Sentiment::*;

    #[test]
    fn accuracy_counts_exact_matches() {
        assert_eq!(accuracy(&[Positive, Negative], &[Positive, Neutral]), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn report_matches_hand_computed_metrics() {
        let truth = [Positive, Positive, Negative, Negative, Neutral];
        let predicted = [Positive, Negative, Negative, Negative, Positive];
        let report = ClassificationReport::new(&truth, &predicted);

        assert_eq!(report.accuracy, 0.6);
        assert_eq!(report.confusion[Positive.index()], [1, 1, 0]);
        assert_eq!(report.confusion[Neutral.index()], [0, 1, 0]);

        let pos = report.class(Positive);
        assert_eq!((pos.precision, pos.recall, pos.support), (0.5, 0.5, 2));
        let neg = report.class(Negative);
        assert!((neg.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(neg.recall, 1.0);
        assert!((neg.f1 - 0.8).abs() < 1e-12);
        let neu = report.class(Neutral);
        assert_eq!((neu.precision, neu.recall, neu.f1), (0.0, 0.0, 0.0));

        let expected_recall = (0.5 * 2.0 + 1.0 * 2.0) / 5.0;
        assert!((report.weighted.recall - expected_recall).abs() < 1e-12);
    }

    #[test]
    fn report_renders_every_class() {
        let report = ClassificationReport::new(&[Positive], &[Positive]);
        let text = report.to_string();
        for name in ["negative", "positive", "neutral", "weighted avg", "confusion matrix"] {
            assert!(text.contains(name), "missing {name}");
        }
    }

    #[test]
    fn cross_validation_returns_grid_member() {
        let (x, y) = toy_data();
        let (alpha, score) = cross_validate_alpha(&x, &y, &DEFAULT_ALPHA_GRID, 3, 42).unwrap();
        assert!(DEFAULT_ALPHA_GRID.contains(&alpha));
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn cross_validation_rejects_bad_folds() {
        let (x, y) = toy_data();
        assert!(cross_validate_alpha(&x, &y, &DEFAULT_ALPHA_GRID, 1, 42).is_err());
        assert!(cross_validate_alpha(&x, &y, &DEFAULT_ALPHA_GRID, 50, 42).is_err());
        assert!(cross_validate_alpha(&x, &y, &[], 3, 42).is_err());
    }
}
