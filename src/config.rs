use crate::error::{AppError, Result};
use crate::ml::ClassWeight;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Model loading configuration for the predictor service
    #[serde(default)]
    pub model: ModelConfig,

    /// Offline training configuration
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: SC_)
            .add_source(
                config::Environment::with_prefix("SC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject values that would only fail later, in the middle of a run
    pub fn validate(&self) -> Result<()> {
        self.training.validate()?;

        if self.server.host.trim().is_empty() {
            return Err(AppError::Configuration(
                "server.host must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Verbose request and inference logging
    #[serde(default = "default_true")]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Artifact loaded by the predictor service at startup
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Labeled spreadsheet or CSV file
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Where the fitted pipeline is written
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// Header of the free-text column. Auto-detected when both columns are unset.
    #[serde(default)]
    pub statement_column: Option<String>,

    /// Header of the label column. Auto-detected when both columns are unset.
    #[serde(default)]
    pub status_column: Option<String>,

    /// Held-out fraction for evaluation
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,

    /// Split seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Vocabulary cap
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Optimizer iteration bound
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Inverse L2 regularization strength
    #[serde(default = "default_regularization")]
    pub regularization: f64,

    /// Gradient tolerance for early stopping
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default)]
    pub class_weight: ClassWeight,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            artifact_path: default_artifact_path(),
            statement_column: None,
            status_column: None,
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            max_features: default_max_features(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            max_iter: default_max_iter(),
            regularization: default_regularization(),
            tolerance: default_tolerance(),
            class_weight: ClassWeight::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(AppError::Configuration(format!(
                "training.test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.max_features == 0 {
            return Err(AppError::Configuration(
                "training.max_features must be positive".to_string(),
            ));
        }
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(AppError::Configuration(format!(
                "training n-gram range ({}, {}) is invalid",
                self.ngram_min, self.ngram_max
            )));
        }
        if self.max_iter == 0 {
            return Err(AppError::Configuration(
                "training.max_iter must be positive".to_string(),
            ));
        }
        if self.regularization <= 0.0 {
            return Err(AppError::Configuration(
                "training.regularization must be positive".to_string(),
            ));
        }
        if self.statement_column.is_some() != self.status_column.is_some() {
            return Err(AppError::Configuration(
                "training.statement_column and training.status_column must be set together"
                    .to_string(),
            ));
        }
        Ok(())
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

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("model.bin")
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("combined_data_2_cleaned.xlsx")
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_max_features() -> usize {
    20_000
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    2
}

fn default_max_iter() -> usize {
    1000
}

fn default_regularization() -> f64 {
    1.0
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "statement-classifier".to_string()
}
