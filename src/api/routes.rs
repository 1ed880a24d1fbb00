use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Model
        .route("/api/metadata", get(handlers::get_metadata))
        .route("/api/predict", post(handlers::predict));

    if state.metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
