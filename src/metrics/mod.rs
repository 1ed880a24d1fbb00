/// Prometheus metrics for the prediction service.
///
/// All series live in a process-wide registry and are exposed in text format
/// on `GET /metrics`.
///
/// # Example
/// ```no_run
/// use app_success_predictor::metrics::PREDICTIONS_TOTAL;
///
/// PREDICTIONS_TOTAL.with_label_values(&["Hit"]).inc();
/// ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "app_success_predictor";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Served predictions
    ///
    /// Labels: prediction ("Hit" | "Flop")
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of predictions served")
            .namespace(NAMESPACE),
        &["prediction"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Rejected or failed requests
    ///
    /// Labels: code
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Total number of failed prediction requests")
            .namespace(NAMESPACE),
        &["code"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// Validation, encoding and neighbor search time per request
    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Prediction latency in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5]),
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Always 1 for the loaded model
    ///
    /// Labels: model_version, best_k
    pub static ref MODEL_INFO: GaugeVec = GaugeVec::new(
        Opts::new("model_info", "Currently loaded model")
            .namespace(NAMESPACE),
        &["model_version", "best_k"]
    ).expect("Failed to create MODEL_INFO metric");
}

/// Register every metric with the global registry.
///
/// Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PREDICTIONS_TOTAL.clone()),
        Box::new(PREDICTION_ERRORS_TOTAL.clone()),
        Box::new(PREDICTION_DURATION_SECONDS.clone()),
        Box::new(MODEL_INFO.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Publish the identity of the model being served
pub fn record_model_info(model_version: &str, best_k: usize) {
    let best_k = best_k.to_string();
    MODEL_INFO.reset();
    MODEL_INFO
        .with_label_values(&[model_version, best_k.as_str()])
        .set(1.0);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
