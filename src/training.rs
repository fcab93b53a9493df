//! Offline training pipeline
//!
//! Normalise, split, vectorise, balance, then fit every candidate model on
//! the same balanced rows and keep the one with the best held-out accuracy.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifacts::ModelBundle;
use crate::balance::{ClassBalancer, class_counts, stratified_split};
use crate::classifier::{Classifier, ComplementNb, MultinomialNb, RandomForest, TrainedModel};
use crate::dataset;
use crate::error::{Result, SentimentError};
use crate::evaluation::{
    ClassificationReport, DEFAULT_ALPHA_GRID, accuracy, cross_validate_alpha, predict_all,
};
use crate::sentiment::Review;
use crate::synth;
use crate::tokenizer::{NormalizerMode, Tokenizer, TokenizerConfig};
use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub test_size: f64,
    pub seed: u64,
    pub max_features: Option<usize>,
    pub ngram_range: (usize, usize),
    pub min_df: usize,
    pub max_df: f64,
    pub sublinear_tf: bool,
    pub alpha: f64,
    pub forest_trees: usize,
    pub forest_max_depth: Option<usize>,
    pub forest_min_samples_split: usize,
    pub forest_min_samples_leaf: usize,
    pub augment_short: bool,
    /// Replace `alpha` for multinomial NB with the cross-validated best.
    pub tune_alpha: bool,
    pub cv_folds: usize,
    pub tokenizer: NormalizerMode,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            max_features: Some(15_000),
            ngram_range: (1, 3),
            min_df: 1,
            max_df: 0.95,
            sublinear_tf: true,
            alpha: 0.5,
            forest_trees: 200,
            forest_max_depth: Some(15),
            forest_min_samples_split: 5,
            forest_min_samples_leaf: 2,
            augment_short: true,
            tune_alpha: false,
            cv_folds: 5,
            tokenizer: NormalizerMode::Standard,
        }
    }
}

impl TrainConfig {
    fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SentimentError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "expected a fraction in (0, 1)".to_string(),
            });
        }
        if self.forest_trees == 0 {
            return Err(SentimentError::InvalidParameter {
                name: "forest_trees".to_string(),
                value: "0".to_string(),
                reason: "at least one tree is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn vectorizer_config(&self) -> VectorizerConfig {
        VectorizerConfig {
            max_features: self.max_features,
            ngram_range: self.ngram_range,
            min_df: self.min_df,
            max_df: self.max_df,
            sublinear_tf: self.sublinear_tf,
        }
    }

    fn forest(&self) -> RandomForest {
        let forest = RandomForest::new(self.forest_trees)
            .with_min_samples_split(self.forest_min_samples_split)
            .with_min_samples_leaf(self.forest_min_samples_leaf)
            .with_balanced_class_weight(true)
            .with_seed(self.seed);
        match self.forest_max_depth {
            Some(depth) => forest.with_max_depth(depth),
            None => forest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub accuracy: f64,
}

/// Summary persisted next to the model and served as its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_model: String,
    pub accuracy: f64,
    /// Support-weighted averages over the test split.
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Balanced training rows.
    pub training_samples: usize,
    pub testing_samples: usize,
    /// Usable reviews before splitting.
    pub total_samples: usize,
    pub candidates: Vec<CandidateScore>,
    pub multinomial_alpha: f64,
    pub config: TrainConfig,
    pub last_updated: DateTime<Utc>,
}

pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub evaluation: ClassificationReport,
    pub report: TrainingReport,
}

/// Trains on `reviews` without touching the filesystem.
pub fn train(reviews: Vec<Review>, config: &TrainConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    let tokenizer = Tokenizer::new(TokenizerConfig::new(config.tokenizer));

    let mut reviews = reviews;
    if config.augment_short {
        reviews.extend(synth::short_positive_reviews());
    }
    let loaded = reviews.len();
    let rows: Vec<(Vec<String>, _)> = reviews
        .into_iter()
        .map(|review| (tokenizer.normalize(&review.text), review.sentiment))
        .filter(|(tokens, _)| !tokens.is_empty())
        .collect();
    if rows.is_empty() {
        return Err(SentimentError::EmptyTrainingSet);
    }
    let total_samples = rows.len();
    info!(
        loaded,
        usable = total_samples,
        counts = ?class_counts(&rows),
        "Prepared training corpus"
    );

    let (train_rows, test_rows) = stratified_split(rows, config.test_size, config.seed);
    let (train_docs, train_y): (Vec<Vec<String>>, Vec<_>) = train_rows.into_iter().unzip();
    let (test_docs, test_y): (Vec<Vec<String>>, Vec<_>) = test_rows.into_iter().unzip();

    let vectorizer = TfidfVectorizer::fit(config.vectorizer_config(), tokenizer.config(), &train_docs)?;
    info!(features = vectorizer.n_features(), "Fitted vectorizer");
    let train_x = vectorizer.transform_all(&train_docs);
    let test_x = vectorizer.transform_all(&test_docs);

    let balanced = ClassBalancer::new(config.seed).resample(train_x.into_iter().zip(train_y).collect());
    info!(counts = ?class_counts(&balanced), "Balanced training split");
    let (train_x, train_y): (Vec<_>, Vec<_>) = balanced.into_iter().unzip();

    let multinomial_alpha = if config.tune_alpha {
        let (alpha, score) = cross_validate_alpha(
            &train_x,
            &train_y,
            &DEFAULT_ALPHA_GRID,
            config.cv_folds,
            config.seed,
        )?;
        info!(alpha, mean_accuracy = score, "Selected smoothing by cross-validation");
        alpha
    } else {
        config.alpha
    };

    let candidates = vec![
        TrainedModel::ComplementNb(ComplementNb::new(config.alpha)),
        TrainedModel::RandomForest(config.forest()),
        TrainedModel::MultinomialNb(MultinomialNb::new(multinomial_alpha)),
    ];

    let mut scores = Vec::with_capacity(candidates.len());
    let mut best: Option<(TrainedModel, Vec<_>, f64)> = None;
    for mut model in candidates {
        model.fit(&train_x, &train_y)?;
        let predicted = predict_all(&model, &test_x)?;
        let score = accuracy(&test_y, &predicted);
        info!(model = model.name(), accuracy = score, "Evaluated candidate");
        scores.push(CandidateScore {
            name: model.name().to_string(),
            accuracy: score,
        });
        if best.as_ref().is_none_or(|(_, _, top)| score > *top) {
            best = Some((model, predicted, score));
        }
    }
    let (model, predicted, _) = best.ok_or(SentimentError::EmptyTrainingSet)?;

    let evaluation = ClassificationReport::new(&test_y, &predicted);
    debug!("\n{evaluation}");
    let report = TrainingReport {
        best_model: model.name().to_string(),
        accuracy: evaluation.accuracy,
        precision: evaluation.weighted.precision,
        recall: evaluation.weighted.recall,
        f1_score: evaluation.weighted.f1,
        training_samples: train_y.len(),
        testing_samples: test_y.len(),
        total_samples,
        candidates: scores,
        multinomial_alpha,
        config: config.clone(),
        last_updated: Utc::now(),
    };
    info!(best = %report.best_model, accuracy = report.accuracy, "Selected model");

    Ok(TrainingOutcome {
        bundle: ModelBundle::new(vectorizer, model)?,
        evaluation,
        report,
    })
}

/// Loads the corpora, trains, and persists the artifacts into `model_dir`.
/// Nothing is written unless every step succeeds.
pub fn train_from_files<P: AsRef<Path>>(
    data: &[P],
    model_dir: &Path,
    config: &TrainConfig,
) -> Result<TrainingOutcome> {
    let reviews = dataset::load_labeled_many(data)?;
    let outcome = train(reviews, config)?;
    outcome.bundle.save(model_dir, &outcome.report)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::Sentiment;

    fn small_config() -> TrainConfig {
        TrainConfig {
            forest_trees: 10,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn picks_a_candidate_and_reports_it() {
        let outcome = train(synth::generate(150, 1), &small_config()).unwrap();
        let report = &outcome.report;

        assert_eq!(report.candidates.len(), 3);
        assert_eq!(report.candidates[0].name, "ComplementNB");
        let top = report
            .candidates
            .iter()
            .map(|c| c.accuracy)
            .fold(f64::MIN, f64::max);
        assert_eq!(report.accuracy, top);
        // the first candidate reaching the top score wins
        let first_top = report.candidates.iter().find(|c| c.accuracy == top).unwrap();
        assert_eq!(report.best_model, first_top.name);
        assert_eq!(outcome.bundle.model().name(), report.best_model);
        assert!(report.training_samples >= report.testing_samples);
    }

    #[test]
    fn training_is_deterministic() {
        let config = small_config();
        let a = train(synth::generate(90, 5), &config).unwrap();
        let b = train(synth::generate(90, 5), &config).unwrap();
        assert_eq!(a.bundle.vectorizer(), b.bundle.vectorizer());
        assert_eq!(
            bincode::serialize(a.bundle.model()).unwrap(),
            bincode::serialize(b.bundle.model()).unwrap()
        );
    }

    #[test]
    fn tuned_alpha_comes_from_the_grid() {
        let config = TrainConfig {
            tune_alpha: true,
            cv_folds: 3,
            ..small_config()
        };
        let outcome = train(synth::generate(90, 2), &config).unwrap();
        assert!(DEFAULT_ALPHA_GRID.contains(&outcome.report.multinomial_alpha));
    }

    #[test]
    fn rejects_unusable_input() {
        let config = TrainConfig {
            augment_short: false,
            ..small_config()
        };
        assert!(matches!(
            train(Vec::new(), &config),
            Err(SentimentError::EmptyTrainingSet)
        ));
        let stopwords_only = vec![Review::new("it was the", Sentiment::Neutral)];
        assert!(train(stopwords_only, &config).is_err());

        let bad = TrainConfig {
            test_size: 1.5,
            ..small_config()
        };
        assert!(train(synth::generate(30, 1), &bad).is_err());
    }

    #[test]
    fn missing_dataset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let result = train_from_files(&[dir.path().join("absent.csv")], dir.path(), &small_config());
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn balancing_only_touches_the_training_split() {
        let config = TrainConfig {
            augment_short: false,
            ..small_config()
        };
        let mut kept = [0usize; 3];
        let reviews: Vec<Review> = synth::generate(300, 8)
            .into_iter()
            .filter(|review| {
                let limit = match review.sentiment {
                    Sentiment::Positive => 30,
                    Sentiment::Negative => 12,
                    Sentiment::Neutral => 6,
                };
                let count = &mut kept[review.sentiment.index()];
                *count += 1;
                *count <= limit
            })
            .collect();

        // the same split the pipeline makes, rebuilt by hand
        let tokenizer = Tokenizer::new(TokenizerConfig::new(config.tokenizer));
        let rows: Vec<(Vec<String>, Sentiment)> = reviews
            .iter()
            .map(|review| (tokenizer.normalize(&review.text), review.sentiment))
            .filter(|(tokens, _)| !tokens.is_empty())
            .collect();
        let (train_rows, test_rows) = stratified_split(rows, config.test_size, config.seed);
        let train_counts = class_counts(&train_rows);
        let test_counts = class_counts(&test_rows);
        assert!(test_counts[Sentiment::Positive.index()] > test_counts[Sentiment::Neutral.index()]);

        let outcome = train(reviews, &config).unwrap();
        let report = &outcome.report;
        assert_eq!(report.testing_samples, test_rows.len());
        for label in Sentiment::ALL {
            assert_eq!(
                outcome.evaluation.per_class[label.index()].support,
                test_counts[label.index()],
                "{label}"
            );
        }
        let majority = train_counts.iter().copied().max().unwrap();
        assert_eq!(report.training_samples, 3 * majority);

        // document frequencies come from the unbalanced training rows
        let train_docs: Vec<Vec<String>> = train_rows.into_iter().map(|(doc, _)| doc).collect();
        let expected =
            TfidfVectorizer::fit(config.vectorizer_config(), tokenizer.config(), &train_docs).unwrap();
        assert_eq!(outcome.bundle.vectorizer(), &expected);
    }
}
