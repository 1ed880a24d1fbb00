use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Why a numeric request field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberIssue {
    /// Value could not be read as a number
    NotNumeric,
    /// Value parsed but is below zero
    Negative,
}

impl fmt::Display for NumberIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberIssue::NotNumeric => write!(f, "must be a number"),
            NumberIssue::Negative => write!(f, "must be positive"),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Required request field absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Numeric request field not coercible or negative
    #[error("Invalid value for {field}: {issue}")]
    InvalidNumber { field: String, issue: NumberIssue },

    /// Categorical value outside the fitted vocabulary
    #[error("Invalid {field}: '{value}'. Must be one of: [{}]", .allowed.join(", "))]
    UnknownCategoryValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Request body is not a JSON object
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Fitted artifacts missing, corrupt or mismatched
    #[error("Artifact load failure: {0}")]
    ArtifactLoad(String),

    /// Unexpected failure while computing a prediction
    #[error("Prediction failed: {0}")]
    InternalPrediction(String),

    /// Training table lacks required columns
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Dataset discovery or parsing errors
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Training could not produce a model
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidNumber { .. }
            | AppError::UnknownCategoryValue { .. }
            | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::ArtifactLoad(_)
            | AppError::InternalPrediction(_)
            | AppError::MissingColumns(_)
            | AppError::Dataset(_)
            | AppError::Training(_)
            | AppError::Configuration(_)
            | AppError::Io(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::MissingField(_) => "MISSING_FIELD",
            AppError::InvalidNumber { .. } => "INVALID_NUMBER",
            AppError::UnknownCategoryValue { .. } => "UNKNOWN_CATEGORY_VALUE",
            AppError::MalformedBody(_) => "MALFORMED_BODY",
            AppError::ArtifactLoad(_) => "ARTIFACT_LOAD_FAILURE",
            AppError::InternalPrediction(_) => "INTERNAL_PREDICTION_FAILURE",
            AppError::MissingColumns(_) => "MISSING_COLUMNS",
            AppError::Dataset(_) => "DATASET_ERROR",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to hand back to an HTTP caller
    pub fn public_message(&self) -> String {
        match self {
            AppError::InternalPrediction(_) => "Prediction failed".to_string(),
            _ if self.is_client_error() => self.to_string(),
            _ => "Internal error".to_string(),
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();

        if self.is_client_error() {
            tracing::debug!(
                error_code = %error_code,
                status_code = status.as_u16(),
                message = %self,
                "Rejected request"
            );
        } else {
            tracing::error!(
                error_code = %error_code,
                status_code = status.as_u16(),
                message = %self,
                "Request error"
            );
        }

        crate::metrics::PREDICTION_ERRORS_TOTAL
            .with_label_values(&[&error_code])
            .inc();

        let body = Json(json!({
            "error": self.public_message(),
            "code": error_code,
        }));

        (status, body).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Dataset(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::MissingField("size".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidNumber {
                field: "price".to_string(),
                issue: NumberIssue::Negative,
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ArtifactLoad("gone".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InternalPrediction("nan".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::MissingField("type".to_string()).error_code(),
            "MISSING_FIELD"
        );
        assert_eq!(
            AppError::UnknownCategoryValue {
                field: "category".to_string(),
                value: "NOPE".to_string(),
                allowed: vec!["GAME".to_string()],
            }
            .error_code(),
            "UNKNOWN_CATEGORY_VALUE"
        );
        assert_eq!(
            AppError::MissingColumns(vec!["Installs".to_string()]).error_code(),
            "MISSING_COLUMNS"
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = AppError::InternalPrediction("index 7 out of bounds".to_string());
        assert_eq!(err.public_message(), "Prediction failed");

        let err = AppError::ArtifactLoad("/srv/models/knn_model.bin".to_string());
        assert_eq!(err.public_message(), "Internal error");

        let err = AppError::MissingField("price".to_string());
        assert_eq!(err.public_message(), "Missing required field: price");
    }

    #[test]
    fn test_number_issue_messages() {
        let err = AppError::InvalidNumber {
            field: "size".to_string(),
            issue: NumberIssue::Negative,
        };
        assert_eq!(err.to_string(), "Invalid value for size: must be positive");
    }
}
