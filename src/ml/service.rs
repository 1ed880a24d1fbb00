use crate::error::{AppError, Result};
use crate::metrics::{PREDICTIONS_TOTAL, PREDICTION_DURATION_SECONDS};
use crate::ml::artifacts::ModelArtifacts;
use crate::ml::features::EncodedFeatures;
use crate::ml::message::PredictionMessage;
use crate::ml::models::{AppFeatures, ModelMetadata, Prediction};
use crate::ml::validation::validate_request;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Body returned by a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// "Hit" or "Flop"
    pub prediction: String,
    pub success: bool,
    /// Success probability as a percentage, one decimal
    pub confidence: f64,
    pub message: String,
    /// Validated input echoed back
    pub details: AppFeatures,
}

/// Result of scoring one validated input
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub features: AppFeatures,
    pub encoded: EncodedFeatures,
    pub prediction: Prediction,
    pub message: PredictionMessage,
}

impl PredictionOutcome {
    pub fn into_response(self) -> PredictionResponse {
        PredictionResponse {
            prediction: self.prediction.outcome().to_string(),
            success: self.prediction.is_hit(),
            confidence: self.prediction.confidence_percent(),
            message: self.message.text().to_string(),
            details: self.features,
        }
    }
}

/// Answers prediction requests from one immutable artifact set.
///
/// Cloning is cheap and every clone shares the same artifacts, so a single
/// instance can serve concurrent requests without locking.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifacts: Arc<ModelArtifacts>,
}

impl PredictionService {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        crate::metrics::record_model_info(
            &artifacts.model_version().to_string(),
            artifacts.metadata().best_k,
        );
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    /// Load the artifact set from disk
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        info!(artifact_dir = %dir.display(), "Loading model artifacts");
        Ok(Self::new(ModelArtifacts::load(dir)?))
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.artifacts.metadata()
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// Score already-validated features
    pub fn predict(&self, features: &AppFeatures) -> Result<PredictionOutcome> {
        let encoded = self.artifacts.encode(features).map_err(|e| match e {
            // Validation checks the same vocabularies, so this means the set is inconsistent
            AppError::UnknownCategoryValue { field, value, .. } => AppError::InternalPrediction(
                format!("Encoder rejected validated {} value '{}'", field, value),
            ),
            other => other,
        })?;

        if encoded.scaled.iter().any(|v| !v.is_finite()) {
            return Err(AppError::InternalPrediction(
                "Scaled feature vector is not finite".to_string(),
            ));
        }

        let prediction = self.artifacts.classifier().predict(encoded.scaled.view())?;
        let message = PredictionMessage::select(prediction.label, prediction.probability);

        Ok(PredictionOutcome {
            features: features.clone(),
            encoded,
            prediction,
            message,
        })
    }

    /// Validate a raw request body and produce the response document
    pub fn handle(&self, body: &Value) -> Result<PredictionResponse> {
        let start = Instant::now();

        let features = validate_request(body, self.metadata())?;
        let outcome = self.predict(&features)?;

        let elapsed = start.elapsed().as_secs_f64();
        PREDICTION_DURATION_SECONDS.observe(elapsed);
        PREDICTIONS_TOTAL
            .with_label_values(&[outcome.prediction.outcome()])
            .inc();

        debug!(
            category = %features.category,
            prediction = outcome.prediction.outcome(),
            probability = outcome.prediction.probability,
            elapsed_ms = elapsed * 1000.0,
            "Prediction served"
        );

        Ok(outcome.into_response())
    }
}
