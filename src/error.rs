use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied unusable input (e.g. blank text)
    #[error("{0}")]
    InvalidInput(String),

    /// Predictor is running without a loaded pipeline
    #[error("Model is not loaded")]
    ModelNotLoaded,

    /// Pipeline failed while classifying a request
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Request body could not be interpreted
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Dataset could not be read or does not have the expected shape
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Fitting or evaluating the pipeline failed
    #[error("Training error: {0}")]
    Training(String),

    /// Artifact could not be written, read or decoded
    #[error("Artifact error: {0}")]
    Artifact(String),

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
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ModelNotLoaded => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Dataset(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Artifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::ModelNotLoaded => "MODEL_NOT_LOADED",
            AppError::Inference(_) => "INFERENCE_ERROR",
            AppError::MalformedRequest(_) => "MALFORMED_REQUEST",
            AppError::Dataset(_) => "DATASET_ERROR",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::Artifact(_) => "ARTIFACT_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
///
/// The body only carries the message; the code is for server-side logs.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                error = ?self,
                message = %message,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request rejected"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
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
        AppError::Artifact(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Conversion from calamine::Error
impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::Dataset(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Dataset(err.to_string())
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
            AppError::InvalidInput("No text provided".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ModelNotLoaded.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Inference("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MalformedRequest("bad json".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::ModelNotLoaded.error_code(), "MODEL_NOT_LOADED");
        assert_eq!(
            AppError::InvalidInput("x".to_string()).error_code(),
            "INVALID_INPUT"
        );
        assert_eq!(
            AppError::Artifact("x".to_string()).error_code(),
            "ARTIFACT_ERROR"
        );
    }

    #[test]
    fn test_invalid_input_message_is_verbatim() {
        let err = AppError::InvalidInput("No text provided".to_string());
        assert_eq!(err.to_string(), "No text provided");
        assert!(!AppError::ModelNotLoaded.to_string().is_empty());
    }
}
