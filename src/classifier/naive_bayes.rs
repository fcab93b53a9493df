//! Naive Bayes classifiers for TF-IDF features
//!
//! Both variants estimate per-class feature weights from smoothed feature
//! totals. Multinomial NB scores a document by the likelihood of its features
//! under each class plus the class prior; complement NB scores it against the
//! feature distribution of all *other* classes, which is less sensitive to
//! class imbalance.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{Classifier, check_dimension, check_training_data, class_counts};
use crate::error::{Result, SentimentError};
use crate::sentiment::{NUM_CLASSES, Posterior, Sentiment};
use crate::vectorizer::SparseVector;

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(SentimentError::InvalidParameter {
            name: "alpha".to_string(),
            value: alpha.to_string(),
            reason: "smoothing must be positive".to_string(),
        })
    }
}

/// Weight matrix must cover every class; the fitted dimension is its width.
fn check_weights(weights: Option<&Array2<f64>>) -> Result<()> {
    let weights = weights.ok_or(SentimentError::ModelNotFitted)?;
    if weights.nrows() != NUM_CLASSES {
        return Err(SentimentError::DimensionMismatch {
            expected: NUM_CLASSES,
            actual: weights.nrows(),
        });
    }
    Ok(())
}

/// Summed feature values per class, shape `(NUM_CLASSES, n_features)`.
fn feature_totals(x: &[SparseVector], y: &[Sentiment], n_features: usize) -> Array2<f64> {
    let mut totals = Array2::zeros((NUM_CLASSES, n_features));
    for (row, label) in x.iter().zip(y) {
        for (j, value) in row.iter() {
            totals[[label.index(), j]] += value;
        }
    }
    totals
}

/// Joint log-likelihood `x · weights[c] + offset[c]`, `-inf` for classes not seen in training.
fn joint_log_likelihood(
    weights: &Array2<f64>,
    offset: &[f64; NUM_CLASSES],
    present: &[bool; NUM_CLASSES],
    x: &SparseVector,
) -> [f64; NUM_CLASSES] {
    let mut scores = [f64::NEG_INFINITY; NUM_CLASSES];
    for c in 0..NUM_CLASSES {
        if !present[c] {
            continue;
        }
        let row = weights.row(c);
        scores[c] = offset[c] + x.iter().map(|(j, v)| v * row[j]).sum::<f64>();
    }
    scores
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    alpha: f64,
    feature_log_prob: Option<Array2<f64>>,
    class_log_prior: [f64; NUM_CLASSES],
    present: [bool; NUM_CLASSES],
}

impl MultinomialNb {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            feature_log_prob: None,
            class_log_prior: [f64::NEG_INFINITY; NUM_CLASSES],
            present: [false; NUM_CLASSES],
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Classifier for MultinomialNb {
    fn name(&self) -> &'static str {
        "MultinomialNB"
    }

    fn fit(&mut self, x: &[SparseVector], y: &[Sentiment]) -> Result<()> {
        check_alpha(self.alpha)?;
        let n_features = check_training_data(x, y)?;
        let counts = class_counts(y);
        let totals = feature_totals(x, y, n_features);

        let mut feature_log_prob = Array2::zeros((NUM_CLASSES, n_features));
        for c in 0..NUM_CLASSES {
            self.present[c] = counts[c] > 0;
            if !self.present[c] {
                self.class_log_prior[c] = f64::NEG_INFINITY;
                continue;
            }
            let smoothed: Array1<f64> = totals.row(c).mapv(|v| v + self.alpha);
            let denom = smoothed.sum();
            feature_log_prob
                .row_mut(c)
                .assign(&smoothed.mapv(|v| (v / denom).ln()));
            self.class_log_prior[c] = (counts[c] as f64 / y.len() as f64).ln();
        }

        self.feature_log_prob = Some(feature_log_prob);
        Ok(())
    }

    fn n_features(&self) -> Option<usize> {
        self.feature_log_prob.as_ref().map(|w| w.ncols())
    }

    fn check_parameters(&self) -> Result<()> {
        check_weights(self.feature_log_prob.as_ref())
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Posterior> {
        check_dimension(self.n_features(), x)?;
        check_weights(self.feature_log_prob.as_ref())?;
        let weights = self
            .feature_log_prob
            .as_ref()
            .ok_or(SentimentError::ModelNotFitted)?;
        let scores = joint_log_likelihood(weights, &self.class_log_prior, &self.present, x);
        Ok(Posterior::from_log_scores(scores))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplementNb {
    alpha: f64,
    feature_log_prob: Option<Array2<f64>>,
    class_log_prior: [f64; NUM_CLASSES],
    present: [bool; NUM_CLASSES],
}

impl ComplementNb {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            feature_log_prob: None,
            class_log_prior: [f64::NEG_INFINITY; NUM_CLASSES],
            present: [false; NUM_CLASSES],
        }
    }
}

impl Classifier for ComplementNb {
    fn name(&self) -> &'static str {
        "ComplementNB"
    }

    fn fit(&mut self, x: &[SparseVector], y: &[Sentiment]) -> Result<()> {
        check_alpha(self.alpha)?;
        let n_features = check_training_data(x, y)?;
        let counts = class_counts(y);
        let totals = feature_totals(x, y, n_features);
        let all_classes = totals.sum_axis(Axis(0));

        let mut feature_log_prob = Array2::zeros((NUM_CLASSES, n_features));
        for c in 0..NUM_CLASSES {
            self.present[c] = counts[c] > 0;
            if !self.present[c] {
                self.class_log_prior[c] = f64::NEG_INFINITY;
                continue;
            }
            let complement: Array1<f64> = &all_classes - &totals.row(c) + self.alpha;
            let denom = complement.sum();
            feature_log_prob
                .row_mut(c)
                .assign(&complement.mapv(|v| -(v / denom).ln()));
            self.class_log_prior[c] = (counts[c] as f64 / y.len() as f64).ln();
        }

        self.feature_log_prob = Some(feature_log_prob);
        Ok(())
    }

    fn n_features(&self) -> Option<usize> {
        self.feature_log_prob.as_ref().map(|w| w.ncols())
    }

    fn check_parameters(&self) -> Result<()> {
        check_weights(self.feature_log_prob.as_ref())
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Posterior> {
        check_dimension(self.n_features(), x)?;
        check_weights(self.feature_log_prob.as_ref())?;
        let weights = self
            .feature_log_prob
            .as_ref()
            .ok_or(SentimentError::ModelNotFitted)?;
        // the prior only breaks the tie when a single class was seen
        let offset = if self.present.iter().filter(|&&p| p).count() == 1 {
            self.class_log_prior
        } else {
            [0.0; NUM_CLASSES]
        };
        let scores = joint_log_likelihood(weights, &offset, &self.present, x);
        Ok(Posterior::from_log_scores(scores))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{toy_data, vector};
    use super::*;

    #[test]
    fn multinomial_matches_closed_form() {
        // one feature per class, one document each
        let x = vec![
            SparseVector::from_pairs(2, [(0, 1.0)]).unwrap(),
            SparseVector::from_pairs(2, [(1, 1.0)]).unwrap(),
        ];
        let y = vec![Sentiment::Negative, Sentiment::Positive];
        let mut model = MultinomialNb::new(1.0);
        model.fit(&x, &y).unwrap();

        // negative: theta = [2/3, 1/3]; positive: [1/3, 2/3]; equal priors
        let posterior = model.predict_proba(&x[0]).unwrap();
        let p_neg = (2.0f64 / 3.0).ln();
        let p_pos = (1.0f64 / 3.0).ln();
        let expected = 1.0 / (1.0 + (p_pos - p_neg).exp());
        assert!((posterior.get(Sentiment::Negative) - expected).abs() < 1e-12);
        assert_eq!(posterior.get(Sentiment::Neutral), 0.0);
    }

    #[test]
    fn empty_document_falls_back_to_priors() {
        let (x, mut y) = toy_data();
        // skew the prior toward positive
        y[4] = Sentiment::Positive;
        let mut model = MultinomialNb::new(0.5);
        model.fit(&x, &y).unwrap();
        let posterior = model.predict_proba(&vector(&[])).unwrap();
        assert!((posterior.get(Sentiment::Positive) - 5.0 / 12.0).abs() < 1e-12);
        assert_eq!(posterior.best().0, Sentiment::Positive);
    }

    #[test]
    fn complement_ignores_priors_with_several_classes() {
        let (x, mut y) = toy_data();
        y[4] = Sentiment::Positive;
        let mut model = ComplementNb::new(0.5);
        model.fit(&x, &y).unwrap();
        let posterior = model.predict_proba(&vector(&[])).unwrap();
        for p in posterior.0 {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn non_positive_alpha_is_rejected() {
        let (x, y) = toy_data();
        assert!(MultinomialNb::new(0.0).fit(&x, &y).is_err());
        assert!(ComplementNb::new(-1.0).fit(&x, &y).is_err());
    }

    #[test]
    fn single_class_training_predicts_that_class() {
        let x = vec![SparseVector::from_pairs(2, [(0, 1.0)]).unwrap()];
        let y = vec![Sentiment::Neutral];
        let mut model = ComplementNb::new(1.0);
        model.fit(&x, &y).unwrap();
        let (label, posterior) = model.predict_confidence(&x[0]).unwrap();
        assert_eq!(label, Sentiment::Neutral);
        assert_eq!(posterior.get(Sentiment::Neutral), 1.0);
    }
}
