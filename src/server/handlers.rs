use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::analyzer::SentimentAnalyzer;
use crate::dataset;
use crate::error::SentimentError;
use crate::sentiment::{ModelSource, Sentiment};
use crate::synth::SAMPLE_REVIEWS;
use crate::training::TrainingReport;

/// Confidence as sent over the wire.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    text: String,
    sentiment: Sentiment,
    confidence: f64,
    timestamp: DateTime<Utc>,
    model_used: ModelSource,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let text = request
        .text
        .ok_or_else(|| ServerError::BadRequest("Text is required".to_string()))?;

    let prediction = state.analyzer.analyze(&text)?;
    Ok(Json(AnalyzeResponse {
        text: text.trim().to_string(),
        sentiment: prediction.sentiment,
        confidence: round3(prediction.confidence),
        timestamp: Utc::now(),
        model_used: prediction.source,
    }))
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    id: usize,
    text: String,
    sentiment: Sentiment,
    confidence: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    total: usize,
    positive: usize,
    negative: usize,
    neutral: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    results: Vec<BatchItem>,
    summary: BatchSummary,
    timestamp: DateTime<Utc>,
    model_used: ModelSource,
}

fn score_csv(analyzer: &SentimentAnalyzer, data: &[u8]) -> crate::error::Result<Vec<BatchItem>> {
    let rows = dataset::load_texts(data)?;
    Ok(rows
        .into_iter()
        .map(|(id, text)| {
            let prediction = analyzer.predict(&text);
            BatchItem {
                id,
                text,
                sentiment: prediction.sentiment,
                confidence: round3(prediction.confidence),
            }
        })
        .collect())
}

fn summarize(results: &[BatchItem]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: results.len(),
        ..BatchSummary::default()
    };
    for item in results {
        match item.sentiment {
            Sentiment::Positive => summary.positive += 1,
            Sentiment::Negative => summary.negative += 1,
            Sentiment::Neutral => summary.neutral += 1,
        }
    }
    summary
}

pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ServerError::BadRequest("No file uploaded".to_string()))?;
    if file_name.is_empty() {
        return Err(ServerError::BadRequest("No file selected".to_string()));
    }
    if !file_name.ends_with(".csv") {
        return Err(SentimentError::UnsupportedFile(file_name).into());
    }

    let analyzer = Arc::clone(&state.analyzer);
    let results = tokio::task::spawn_blocking(move || score_csv(&analyzer, &data))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    let summary = summarize(&results);
    info!(file = %file_name, rows = summary.total, "Scored batch upload");

    Ok(Json(BatchResponse {
        results,
        summary,
        timestamp: Utc::now(),
        model_used: state.analyzer.model_source(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    models_loaded: bool,
    model_type: ModelSource,
    model_name: Option<&'static str>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        models_loaded: state.analyzer.has_model(),
        model_type: state.analyzer.model_source(),
        model_name: state.analyzer.model_name(),
    })
}

/// Headline numbers of the loaded model; zeroed when none was trained.
#[derive(Debug, Default, Serialize)]
pub struct MetricsResponse {
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1_score: f64,
    last_updated: Option<DateTime<Utc>>,
    training_samples: usize,
    testing_samples: usize,
    total_samples: usize,
    best_model: Option<String>,
}

impl From<&TrainingReport> for MetricsResponse {
    fn from(report: &TrainingReport) -> Self {
        Self {
            accuracy: report.accuracy,
            precision: report.precision,
            recall: report.recall,
            f1_score: report.f1_score,
            last_updated: Some(report.last_updated),
            training_samples: report.training_samples,
            testing_samples: report.testing_samples,
            total_samples: report.total_samples,
            best_model: Some(report.best_model.clone()),
        }
    }
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(
        state
            .report
            .as_ref()
            .map(MetricsResponse::from)
            .unwrap_or_default(),
    )
}

#[derive(Debug, Serialize)]
pub struct SampleReviewsResponse {
    sample_reviews: &'static [&'static str],
    count: usize,
}

pub async fn sample_reviews() -> Json<SampleReviewsResponse> {
    Json(SampleReviewsResponse {
        sample_reviews: &SAMPLE_REVIEWS,
        count: SAMPLE_REVIEWS.len(),
    })
}
