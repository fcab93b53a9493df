//! Sentiment classifiers
//!
//! Every model exposes the same [`Classifier`] capability so the training
//! pipeline can fit several candidates on identical data and keep the best.
//! [`TrainedModel`] is the closed set of models that can be persisted.

mod forest;
mod naive_bayes;

pub use forest::RandomForest;
pub use naive_bayes::{ComplementNb, MultinomialNb};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentimentError};
use crate::sentiment::{NUM_CLASSES, Posterior, Sentiment};
use crate::vectorizer::SparseVector;

pub trait Classifier {
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &[SparseVector], y: &[Sentiment]) -> Result<()>;

    /// Feature dimension the model was fitted on, `None` before fitting.
    fn n_features(&self) -> Option<usize>;

    /// Checks that fitted parameters are complete enough to score with.
    /// Deserialised models are not guaranteed to be.
    fn check_parameters(&self) -> Result<()>;

    fn predict_proba(&self, x: &SparseVector) -> Result<Posterior>;

    fn predict(&self, x: &SparseVector) -> Result<Sentiment> {
        Ok(self.predict_proba(x)?.best().0)
    }

    /// Predicted label plus the full posterior it was taken from.
    fn predict_confidence(&self, x: &SparseVector) -> Result<(Sentiment, Posterior)> {
        let posterior = self.predict_proba(x)?;
        Ok((posterior.best().0, posterior))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    ComplementNb(ComplementNb),
    RandomForest(RandomForest),
    MultinomialNb(MultinomialNb),
}

impl TrainedModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::ComplementNb(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::MultinomialNb(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::ComplementNb(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::MultinomialNb(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, x: &[SparseVector], y: &[Sentiment]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn check_parameters(&self) -> Result<()> {
        self.inner().check_parameters()
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Posterior> {
        self.inner().predict_proba(x)
    }
}

/// Shared input checks for `fit`. Returns the feature dimension.
pub(crate) fn check_training_data(x: &[SparseVector], y: &[Sentiment]) -> Result<usize> {
    if x.is_empty() {
        return Err(SentimentError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(SentimentError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let dim = x[0].dim();
    if let Some(bad) = x.iter().find(|row| row.dim() != dim) {
        return Err(SentimentError::DimensionMismatch {
            expected: dim,
            actual: bad.dim(),
        });
    }
    Ok(dim)
}

pub(crate) fn check_dimension(expected: Option<usize>, x: &SparseVector) -> Result<()> {
    let expected = expected.ok_or(SentimentError::ModelNotFitted)?;
    if x.dim() != expected {
        return Err(SentimentError::DimensionMismatch {
            expected,
            actual: x.dim(),
        });
    }
    Ok(())
}

pub(crate) fn class_counts(y: &[Sentiment]) -> [usize; NUM_CLASSES] {
    let mut counts = [0; NUM_CLASSES];
    for label in y {
        counts[label.index()] += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Three well separated classes over six features.
    pub fn toy_data() -> (Vec<SparseVector>, Vec<Sentiment>) {
        let rows = [
            (vec![(0, 0.9), (1, 0.4)], Sentiment::Positive),
            (vec![(0, 0.7), (1, 0.7)], Sentiment::Positive),
            (vec![(1, 1.0)], Sentiment::Positive),
            (vec![(0, 0.8)], Sentiment::Positive),
            (vec![(2, 0.9), (3, 0.4)], Sentiment::Negative),
            (vec![(2, 0.6), (3, 0.8)], Sentiment::Negative),
            (vec![(3, 1.0)], Sentiment::Negative),
            (vec![(2, 1.0)], Sentiment::Negative),
            (vec![(4, 0.9), (5, 0.4)], Sentiment::Neutral),
            (vec![(4, 0.5), (5, 0.9)], Sentiment::Neutral),
            (vec![(5, 1.0)], Sentiment::Neutral),
            (vec![(4, 1.0)], Sentiment::Neutral),
        ];
        rows.into_iter()
            .map(|(pairs, label)| (SparseVector::from_pairs(6, pairs).unwrap(), label))
            .unzip()
    }

    pub fn vector(pairs: &[(usize, f64)]) -> SparseVector {
        SparseVector::from_pairs(6, pairs.iter().copied()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{toy_data, vector};
    use super::*;

    fn candidates() -> Vec<TrainedModel> {
        vec![
            TrainedModel::ComplementNb(ComplementNb::new(0.5)),
            TrainedModel::RandomForest(RandomForest::new(25).with_seed(3)),
            TrainedModel::MultinomialNb(MultinomialNb::new(0.5)),
        ]
    }

    #[test]
    fn every_candidate_separates_toy_classes() {
        let (x, y) = toy_data();
        for mut model in candidates() {
            model.fit(&x, &y).unwrap();
            assert_eq!(model.n_features(), Some(6));
            assert_eq!(
                model.predict(&vector(&[(0, 1.0)])).unwrap(),
                Sentiment::Positive,
                "{}",
                model.name()
            );
            assert_eq!(
                model.predict(&vector(&[(3, 1.0)])).unwrap(),
                Sentiment::Negative,
                "{}",
                model.name()
            );
            assert_eq!(
                model.predict(&vector(&[(4, 0.7), (5, 0.7)])).unwrap(),
                Sentiment::Neutral,
                "{}",
                model.name()
            );
        }
    }

    #[test]
    fn posteriors_are_probabilities() {
        let (x, y) = toy_data();
        for mut model in candidates() {
            model.fit(&x, &y).unwrap();
            for row in &x {
                let (label, posterior) = model.predict_confidence(row).unwrap();
                let sum: f64 = posterior.0.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "{}", model.name());
                assert!(posterior.0.iter().all(|p| (0.0..=1.0).contains(p)));
                assert_eq!(posterior.best().0, label);
            }
        }
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        for model in candidates() {
            let err = model.predict(&vector(&[(0, 1.0)])).unwrap_err();
            assert!(matches!(err, SentimentError::ModelNotFitted));
        }
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let (x, y) = toy_data();
        for mut model in candidates() {
            model.fit(&x, &y).unwrap();
            let other = SparseVector::from_pairs(7, [(6, 1.0)]).unwrap();
            let err = model.predict_proba(&other).unwrap_err();
            assert!(matches!(
                err,
                SentimentError::DimensionMismatch {
                    expected: 6,
                    actual: 7
                }
            ));
        }
    }

    #[test]
    fn mismatched_labels_fail_fit() {
        let (x, mut y) = toy_data();
        y.pop();
        for mut model in candidates() {
            assert!(model.fit(&x, &y).is_err());
            assert!(model.fit(&[], &[]).is_err());
        }
    }

    #[test]
    fn trained_model_round_trips_through_bincode() {
        let (x, y) = toy_data();
        for mut model in candidates() {
            model.fit(&x, &y).unwrap();
            let bytes = bincode::serialize(&model).unwrap();
            let restored: TrainedModel = bincode::deserialize(&bytes).unwrap();
            assert_eq!(restored.name(), model.name());
            for row in &x {
                assert_eq!(
                    restored.predict_proba(row).unwrap(),
                    model.predict_proba(row).unwrap()
                );
            }
        }
    }
}
