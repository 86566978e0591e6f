//! HTTP routes and handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sentiment_core::{FeedbackRecord, FeedbackSubmission};
use serde_json::json;

use crate::error::AppError;
use crate::service::{AnalyzeRequest, DetailedSentimentAnalysis, SentimentAnalysis};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/feedback", post(submit_feedback).get(list_feedback))
        .route("/analyze-sentiment", post(analyze_sentiment))
        .route("/analyze-sentiment-detailed", post(analyze_sentiment_detailed))
        .fallback(fallback)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.analyzer.local().is_loaded(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(submission): Json<FeedbackSubmission>,
) -> Result<Json<FeedbackRecord>, AppError> {
    metrics::counter!("sentiment_requests_total", "endpoint" => "submit_feedback").increment(1);
    tracing::debug!(
        "Feedback from '{}' on '{}' ({} chars)",
        submission.customer,
        submission.product,
        submission.feedback.len()
    );

    let record = state.feedback.submit(submission).await?;
    Ok(Json(record))
}

async fn list_feedback(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackRecord>>, AppError> {
    metrics::counter!("sentiment_requests_total", "endpoint" => "list_feedback").increment(1);

    let records = state.feedback.list_all().await?;
    tracing::debug!("Listing {} feedback records", records.len());
    Ok(Json(records))
}

async fn analyze_sentiment(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<SentimentAnalysis>, AppError> {
    metrics::counter!("sentiment_requests_total", "endpoint" => "analyze_sentiment").increment(1);

    let analysis = state.sentiment.analyze(request).await?;
    Ok(Json(analysis))
}

async fn analyze_sentiment_detailed(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<DetailedSentimentAnalysis>, AppError> {
    metrics::counter!("sentiment_requests_total", "endpoint" => "analyze_sentiment_detailed")
        .increment(1);

    let analysis = state.sentiment.analyze_detailed(request).await?;
    Ok(Json(analysis))
}

async fn fallback() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "message": "Not found",
                "type": "not_found",
            }
        })),
    )
}
