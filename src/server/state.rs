use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::analyzer::SentimentAnalyzer;
use crate::artifacts;
use crate::training::TrainingReport;

/// Shared by every request; nothing in it changes after startup.
pub struct AppState {
    pub analyzer: Arc<SentimentAnalyzer>,
    pub report: Option<TrainingReport>,
}

impl AppState {
    pub fn new(analyzer: SentimentAnalyzer, report: Option<TrainingReport>) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            report,
        }
    }

    /// Loads the analyzer and its training report from `model_dir`.
    pub fn load(model_dir: &Path) -> Self {
        let analyzer = SentimentAnalyzer::load(model_dir);
        let report = if analyzer.has_model() {
            artifacts::load_report(model_dir).unwrap_or_else(|e| {
                warn!(error = %e, "Could not read training report");
                None
            })
        } else {
            None
        };
        Self::new(analyzer, report)
    }
}
