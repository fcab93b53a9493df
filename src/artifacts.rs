//! Persisted model artifacts
//!
//! A model directory holds the fitted vectorizer and classifier as bincode
//! blobs plus a JSON training report. The two blobs are only usable as a
//! pair: the classifier must have been fitted on the vectorizer's feature
//! dimension.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::classifier::{Classifier, TrainedModel};
use crate::error::{Result, SentimentError};
use crate::training::TrainingReport;
use crate::vectorizer::TfidfVectorizer;

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.bin";
pub const MODEL_FILE: &str = "sentiment_model.bin";
pub const REPORT_FILE: &str = "training_report.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub vectorizer: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            vectorizer: dir.join(VECTORIZER_FILE),
            model: dir.join(MODEL_FILE),
            report: dir.join(REPORT_FILE),
        }
    }
}

/// A vectorizer and the classifier fitted on its features.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    vectorizer: TfidfVectorizer,
    model: TrainedModel,
}

impl ModelBundle {
    /// Pairs a vectorizer with its model after checking that each is
    /// internally consistent and that both share a feature dimension.
    pub fn new(vectorizer: TfidfVectorizer, model: TrainedModel) -> Result<Self> {
        vectorizer.check_consistency()?;
        if model.n_features().is_some() {
            model.check_parameters()?;
        }
        let expected = vectorizer.n_features();
        match model.n_features() {
            None => Err(SentimentError::ModelNotFitted),
            Some(actual) if actual != expected => {
                Err(SentimentError::DimensionMismatch { expected, actual })
            }
            Some(_) => Ok(Self { vectorizer, model }),
        }
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let paths = ArtifactPaths::in_dir(dir);
        for path in [&paths.vectorizer, &paths.model] {
            if !path.exists() {
                return Err(SentimentError::ArtifactMissing(path.clone()));
            }
        }
        let vectorizer: TfidfVectorizer = bincode::deserialize(&fs::read(&paths.vectorizer)?)?;
        let model: TrainedModel = bincode::deserialize(&fs::read(&paths.model)?)?;
        let bundle = Self::new(vectorizer, model)?;
        info!(
            dir = %dir.display(),
            model = bundle.model.name(),
            features = bundle.vectorizer.n_features(),
            "Loaded model artifacts"
        );
        Ok(bundle)
    }

    /// Writes all three artifacts. Everything is serialised before the first
    /// write and each file is renamed into place from a temporary sibling.
    /// Replaced files are kept as backups until every rename succeeded, so a
    /// failure restores the previous set instead of mixing old and new.
    pub fn save(&self, dir: &Path, report: &TrainingReport) -> Result<()> {
        let paths = ArtifactPaths::in_dir(dir);
        let files = [
            (paths.vectorizer, bincode::serialize(&self.vectorizer)?),
            (paths.model, bincode::serialize(&self.model)?),
            (paths.report, serde_json::to_vec_pretty(report)?),
        ];

        fs::create_dir_all(dir)?;
        let mut staged = Vec::with_capacity(files.len());
        for (path, bytes) in &files {
            let tmp = path.with_extension("tmp");
            if let Err(e) = fs::write(&tmp, bytes) {
                for tmp in staged.iter().chain([&tmp]) {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            staged.push(tmp);
        }
        let pairs: Vec<(&Path, &Path)> = staged
            .iter()
            .zip(&files)
            .map(|(tmp, (path, _))| (tmp.as_path(), path.as_path()))
            .collect();
        swap_in(&pairs)?;

        info!(dir = %dir.display(), model = self.model.name(), "Saved model artifacts");
        Ok(())
    }
}

/// Moves each staged file onto its target, in order.
fn swap_in(pairs: &[(&Path, &Path)]) -> std::io::Result<()> {
    let mut installed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(pairs.len());
    for (i, (tmp, target)) in pairs.iter().enumerate() {
        match install(tmp, target) {
            Ok(backup) => installed.push((*target, backup)),
            Err(e) => {
                for (target, backup) in installed.iter().rev() {
                    let _ = match backup {
                        Some(backup) => fs::rename(backup, target),
                        None => fs::remove_file(target),
                    };
                }
                for (tmp, _) in &pairs[i..] {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e);
            }
        }
    }
    for backup in installed.into_iter().filter_map(|(_, backup)| backup) {
        let _ = fs::remove_file(backup);
    }
    Ok(())
}

/// Renames `tmp` onto `target`, first moving an existing target aside.
/// Returns the backup path, if any.
fn install(tmp: &Path, target: &Path) -> std::io::Result<Option<PathBuf>> {
    let backup = if target.exists() {
        let backup = target.with_extension("bak");
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };
    if let Err(e) = fs::rename(tmp, target) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, target);
        }
        return Err(e);
    }
    Ok(backup)
}

/// The training report in `dir`, `None` when no model has been trained there.
pub fn load_report(dir: &Path) -> Result<Option<TrainingReport>> {
    let path = ArtifactPaths::in_dir(dir).report;
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ComplementNb, MultinomialNb};
    use crate::synth;
    use crate::training::{TrainConfig, train};

    fn trained() -> (ModelBundle, TrainingReport) {
        let config = TrainConfig {
            forest_trees: 5,
            ..TrainConfig::default()
        };
        let outcome = train(synth::generate(60, 4), &config).unwrap();
        (outcome.bundle, outcome.report)
    }

    #[test]
    fn save_then_load_restores_the_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (bundle, report) = trained();
        bundle.save(dir.path(), &report).unwrap();

        let loaded = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.vectorizer(), bundle.vectorizer());
        assert_eq!(loaded.model().name(), bundle.model().name());
        let restored = load_report(dir.path()).unwrap().unwrap();
        assert_eq!(restored.best_model, report.best_model);
        assert_eq!(restored.config, report.config);
        assert_eq!(restored.training_samples, report.training_samples);
        assert!((restored.accuracy - report.accuracy).abs() < 1e-12);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_artifacts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, SentimentError::ArtifactMissing(_)));
        assert_eq!(load_report(dir.path()).unwrap(), None);
    }

    #[test]
    fn corrupt_artifacts_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        fs::write(&paths.vectorizer, b"not a vectorizer").unwrap();
        fs::write(&paths.model, b"not a model").unwrap();
        assert!(ModelBundle::load(dir.path()).is_err());
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let (bundle, _) = trained();
        let dim = bundle.vectorizer().n_features();

        let other = crate::vectorizer::SparseVector::from_pairs(dim + 1, [(0, 1.0)]).unwrap();
        let mut model = TrainedModel::MultinomialNb(MultinomialNb::new(1.0));
        model
            .fit(&[other], &[crate::sentiment::Sentiment::Positive])
            .unwrap();
        let err = ModelBundle::new(bundle.vectorizer().clone(), model).unwrap_err();
        assert!(matches!(err, SentimentError::DimensionMismatch { .. }));

        let unfitted = TrainedModel::ComplementNb(ComplementNb::new(0.5));
        assert!(matches!(
            ModelBundle::new(bundle.vectorizer().clone(), unfitted),
            Err(SentimentError::ModelNotFitted)
        ));
    }

    #[test]
    fn inconsistent_vectorizer_falls_back_to_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let (bundle, report) = trained();
        bundle.save(dir.path(), &report).unwrap();

        // same field layout as the vectorizer, with a single idf weight
        let vectorizer = bundle.vectorizer();
        let crafted = (
            vectorizer.config().clone(),
            vectorizer.tokenizer_config(),
            vectorizer.vocabulary().terms().to_vec(),
            vec![1.0f64],
        );
        let paths = ArtifactPaths::in_dir(dir.path());
        fs::write(&paths.vectorizer, bincode::serialize(&crafted).unwrap()).unwrap();

        assert!(matches!(
            ModelBundle::load(dir.path()),
            Err(SentimentError::DimensionMismatch { actual: 1, .. })
        ));
        let analyzer = crate::SentimentAnalyzer::load(dir.path());
        assert!(!analyzer.has_model());
        let p = analyzer.predict("Terrible service, long wait and rude staff");
        assert_eq!(p.source, crate::ModelSource::KeywordFallback);
    }

    #[test]
    fn forest_without_trees_falls_back_to_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let (bundle, report) = trained();
        bundle.save(dir.path(), &report).unwrap();

        // TrainedModel::RandomForest with a fitted dimension and no trees
        let dim = bundle.vectorizer().n_features();
        let crafted = (
            1u32,
            (200usize, Some(15usize), 5usize, 2usize, true, 42u64, Some(dim), Vec::<u8>::new()),
        );
        let paths = ArtifactPaths::in_dir(dir.path());
        fs::write(&paths.model, bincode::serialize(&crafted).unwrap()).unwrap();

        assert!(matches!(
            ModelBundle::load(dir.path()),
            Err(SentimentError::ModelNotFitted)
        ));
        let analyzer = crate::SentimentAnalyzer::load(dir.path());
        assert!(!analyzer.has_model());
        let p = analyzer.predict("Excellent care from a friendly doctor");
        assert!((0.0..=1.0).contains(&p.confidence));
        assert_eq!(p.source, crate::ModelSource::KeywordFallback);
    }

    #[test]
    fn failed_save_keeps_the_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (bundle, report) = trained();
        bundle.save(dir.path(), &report).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let before = (
            fs::read(&paths.vectorizer).unwrap(),
            fs::read(&paths.model).unwrap(),
        );

        // the model's backup slot is a non-empty directory, so its swap fails
        // after the new vectorizer is already in place
        let blocker = paths.model.with_extension("bak");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let config = TrainConfig {
            forest_trees: 5,
            ..TrainConfig::default()
        };
        let other = train(synth::generate(90, 17), &config).unwrap();
        assert!(other.bundle.save(dir.path(), &other.report).is_err());

        assert_eq!(fs::read(&paths.vectorizer).unwrap(), before.0);
        assert_eq!(fs::read(&paths.model).unwrap(), before.1);
        assert!(!paths.vectorizer.with_extension("bak").exists());
        assert!(!paths.vectorizer.with_extension("tmp").exists());
        assert!(!paths.model.with_extension("tmp").exists());
        assert!(ModelBundle::load(dir.path()).is_ok());
    }
}
