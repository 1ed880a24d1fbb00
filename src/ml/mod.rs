/// Machine learning pipeline for application success prediction
///
/// This module provides:
/// - Category-relative success labelling and K selection (trainer)
/// - Categorical encoding and feature standardization
/// - A deterministic K-nearest-neighbor classifier
/// - Versioned artifact persistence
/// - Request validation, message selection and the prediction service

pub mod artifacts;
pub mod classifier;
pub mod features;
pub mod inspect;
pub mod message;
pub mod models;
pub mod service;
pub mod trainer;
pub mod validation;

pub use artifacts::ModelArtifacts;
pub use classifier::KnnClassifier;
pub use features::{CategoryEncoder, EncodedFeatures, FeatureCodec, FeatureEncoders, FeatureScaler};
pub use inspect::{default_cases, inspect, InspectionReport, DEFAULT_INSPECT_NEIGHBORS};
pub use message::PredictionMessage;
pub use models::{
    AppFeatures, CategoricalField, KScore, ModelMetadata, Neighbor, Prediction, TrainingRecord,
    TrainingReport,
};
pub use service::{PredictionOutcome, PredictionResponse, PredictionService};
pub use trainer::{Trainer, TrainingOutcome};
pub use validation::validate_request;
