//! Inference facade
//!
//! [`SentimentAnalyzer`] is built once and only read afterwards, so a single
//! instance can be shared across threads. Scoring goes through the trained
//! pair when one was loaded and through the keyword heuristic otherwise or
//! whenever model scoring fails.

use std::path::Path;

use tracing::{debug, warn};

use crate::artifacts::ModelBundle;
use crate::classifier::Classifier;
use crate::error::{Result, SentimentError};
use crate::fallback::keyword_sentiment;
use crate::sentiment::{ModelSource, Prediction};
use crate::tokenizer::Tokenizer;

pub struct SentimentAnalyzer {
    tokenizer: Tokenizer,
    bundle: Option<ModelBundle>,
}

impl SentimentAnalyzer {
    pub fn new(bundle: Option<ModelBundle>) -> Self {
        let tokenizer = match &bundle {
            Some(bundle) => Tokenizer::new(bundle.vectorizer().tokenizer_config()),
            None => Tokenizer::default(),
        };
        Self { tokenizer, bundle }
    }

    /// An analyzer that always uses the keyword heuristic.
    pub fn keyword_only() -> Self {
        Self::new(None)
    }

    /// Loads the artifacts in `dir`. Missing or unreadable artifacts are
    /// logged and leave the analyzer on the keyword heuristic.
    pub fn load(dir: &Path) -> Self {
        match ModelBundle::load(dir) {
            Ok(bundle) => Self::new(Some(bundle)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Model unavailable, using keyword fallback");
                Self::keyword_only()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn model_source(&self) -> ModelSource {
        if self.has_model() {
            ModelSource::TrainedModel
        } else {
            ModelSource::KeywordFallback
        }
    }

    pub fn model_name(&self) -> Option<&'static str> {
        self.bundle.as_ref().map(|b| b.model().name())
    }

    /// Scores `text`. Never fails.
    pub fn predict(&self, text: &str) -> Prediction {
        let Some(bundle) = &self.bundle else {
            return keyword_sentiment(text);
        };
        match self.score(bundle, text) {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(error = %e, "Model scoring failed, using keyword fallback");
                keyword_sentiment(text)
            }
        }
    }

    /// Like [`predict`](Self::predict), but rejects text that is empty after trimming.
    pub fn analyze(&self, text: &str) -> Result<Prediction> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SentimentError::EmptyText);
        }
        Ok(self.predict(text))
    }

    fn score(&self, bundle: &ModelBundle, text: &str) -> Result<Prediction> {
        let tokens = self.tokenizer.normalize(text);
        let features = bundle.vectorizer().transform(&tokens);
        let (sentiment, posterior) = bundle.model().predict_confidence(&features)?;
        let confidence = posterior.get(sentiment);
        debug!(
            tokens = tokens.len(),
            features = features.nnz(),
            %sentiment,
            confidence,
            "Scored with trained model"
        );
        Ok(Prediction::new(sentiment, confidence, ModelSource::TrainedModel))
    }
}
