use anyhow::Context;
use app_success_predictor::{
    api::{build_router, AppState},
    config::Config,
    logging::init_tracing,
    ml::PredictionService,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config.observability);

    tracing::info!("Starting App Success Predictor v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = app_success_predictor::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Artifacts are loaded once; the server refuses to start without them
    let predictor = match PredictionService::from_dir(&config.model.artifact_dir) {
        Ok(predictor) => predictor,
        Err(e) => {
            tracing::error!(
                artifact_dir = %config.model.artifact_dir.display(),
                error = %e,
                "Failed to load model artifacts"
            );
            tracing::error!("Run `asp-cli train` to produce them");
            return Err(e.into());
        }
    };

    let metadata = predictor.metadata();
    tracing::info!(
        model_version = %metadata.model_version,
        best_k = metadata.best_k,
        accuracy = metadata.accuracy,
        categories = metadata.categories.len(),
        "Model ready"
    );

    let state = AppState::new(Arc::new(predictor))
        .with_metrics(config.observability.prometheus_enabled);
    let app = build_router(state);

    let http_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Received shutdown signal");
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
