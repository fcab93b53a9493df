//! Error types for the sentiment pipeline

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentimentError>;

#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Text cannot be empty")]
    EmptyText,

    #[error("CSV must contain a 'text', 'review', 'comment', 'feedback', or 'processed_review' column")]
    MissingTextColumn,

    #[error("CSV must contain a '{0}' column")]
    MissingColumn(String),

    /// Carries the rejected file name.
    #[error("Only CSV files are supported")]
    UnsupportedFile(String),

    #[error("After pruning, no terms remain. Try a lower min_df or a higher max_df")]
    EmptyVocabulary,

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SentimentError {
    /// Whether the error was caused by caller input rather than by the service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SentimentError::EmptyText
                | SentimentError::MissingTextColumn
                | SentimentError::MissingColumn(_)
                | SentimentError::UnsupportedFile(_)
                | SentimentError::Csv(_)
        )
    }
}
