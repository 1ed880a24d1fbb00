use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Fitted artifact location
    pub model: ModelConfig,

    /// Training job parameters
    pub training: TrainingConfig,

    /// Dataset extraction parameters
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ASP_)
            .add_source(
                config::Environment::with_prefix("ASP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            dataset: DatasetConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding encoders, scaler, classifier and metadata
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Cleaned dataset consumed by the trainer
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Held-out fraction
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Shuffle seed for the train/test split
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Smallest neighbor count tried
    #[serde(default = "default_k_min")]
    pub k_min: usize,

    /// Largest neighbor count tried (inclusive)
    #[serde(default = "default_k_max")]
    pub k_max: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            test_size: default_test_size(),
            seed: default_seed(),
            k_min: default_k_min(),
            k_max: default_k_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Paths probed, in order, for the raw export
    #[serde(default = "default_candidates")]
    pub candidates: Vec<PathBuf>,

    /// Where the deduplicated dataset is written
    #[serde(default = "default_dataset_path")]
    pub output: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            output: default_dataset_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("google_play_store_dataset.csv")
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_k_min() -> usize {
    1
}

fn default_k_max() -> usize {
    20
}

fn default_candidates() -> Vec<PathBuf> {
    [
        "../google_play_store_dataset.csv",
        "./google_play_store_dataset.csv",
        "./googleplaystore.csv",
        "../googleplaystore.csv",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
