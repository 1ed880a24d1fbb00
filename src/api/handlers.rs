use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::{ModelMetadata, PredictionResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name reported by the health endpoint
pub const MODEL_NAME: &str = "KNN App Success Predictor";

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: MODEL_NAME.to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

/// Vocabularies, accuracy and K of the loaded model
pub async fn get_metadata(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.predictor.metadata().clone())
}

/// Predict success for one application.
///
/// The body is taken as raw JSON so that field-level validation can report
/// the first problem in a fixed order.
pub async fn predict(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(body) = body.map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;
    let response = state.predictor.handle(&body)?;
    Ok(Json(response))
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
