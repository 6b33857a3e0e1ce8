use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::service::PredictionResponse;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
    pub labels: Vec<String>,
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
    pub n_features: Option<usize>,
    pub holdout_accuracy: Option<f64>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let info = state.predictor.model_info();
    let model_loaded = info.is_some();
    let info = info.unwrap_or_default();

    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" }.to_string(),
        model_loaded,
        version: env!("CARGO_PKG_VERSION").to_string(),
        labels: info.labels,
        trained_at: info.trained_at,
        n_features: info.n_features,
        holdout_accuracy: info.holdout_accuracy,
    })
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// A missing field behaves like an empty string
    #[serde(default)]
    pub text: String,
}

/// Classify a statement
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::MalformedRequest(rejection.body_text())
    })?;

    let response = state.predictor.predict(&request.text)?;

    Ok(Json(response))
}
