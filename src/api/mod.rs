pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::PredictionService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictionService>,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(predictor: Arc<PredictionService>) -> Self {
        Self {
            predictor,
            metrics_enabled: true,
        }
    }

    /// Toggle the `/metrics` endpoint
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
