use crate::config::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-class weighting applied to the training loss
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// `n_samples / (n_classes * n_class_samples)`, counteracts label imbalance
    #[default]
    Balanced,

    /// Every sample counts once
    #[serde(alias = "none")]
    Uniform,
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Maximum vocabulary size, most frequent terms first
    pub max_features: usize,

    /// N-gram range (min, max)
    pub ngram_range: (usize, usize),
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 20_000,
            ngram_range: (1, 2), // Unigrams and bigrams
        }
    }
}

/// Logistic regression solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionParams {
    /// Inverse L2 regularization strength
    pub c: f64,

    /// Iteration bound for the optimizer
    pub max_iter: usize,

    /// Stop once every gradient component is below this value
    pub tolerance: f64,

    pub class_weight: ClassWeight,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
            class_weight: ClassWeight::Balanced,
        }
    }
}

/// Everything needed to fit a [`TextPipeline`](crate::ml::TextPipeline)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub features: FeatureConfig,
    pub regression: RegressionParams,
}

impl From<&TrainingConfig> for PipelineParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            features: FeatureConfig {
                max_features: config.max_features,
                ngram_range: (config.ngram_min, config.ngram_max),
            },
            regression: RegressionParams {
                c: config.regularization,
                max_iter: config.max_iter,
                tolerance: config.tolerance,
                class_weight: config.class_weight,
            },
        }
    }
}

/// Prediction result with confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class label
    pub label: String,

    /// Probability of the predicted label (0.0 - 1.0)
    pub confidence: f64,

    /// All class probabilities
    pub probabilities: BTreeMap<String, f64>,
}

/// Outcome of an optimizer run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
}

/// Model metadata stored alongside the fitted pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Crate version that produced the artifact
    pub version: String,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Optimizer outcome
    pub fit: FitSummary,

    /// Accuracy on the held-out subset, once evaluated
    pub holdout_accuracy: Option<f64>,

    /// Number of held-out samples behind `holdout_accuracy`
    pub n_holdout_samples: usize,

    /// Hyperparameters used
    pub hyperparameters: HashMap<String, String>,
}

impl ModelMetadata {
    pub fn new(params: &PipelineParams) -> Self {
        let hyperparameters = [
            ("max_features", params.features.max_features.to_string()),
            (
                "ngram_range",
                format!(
                    "({}, {})",
                    params.features.ngram_range.0, params.features.ngram_range.1
                ),
            ),
            ("C", params.regression.c.to_string()),
            ("max_iter", params.regression.max_iter.to_string()),
            ("tol", params.regression.tolerance.to_string()),
            (
                "class_weight",
                format!("{:?}", params.regression.class_weight).to_lowercase(),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            name: "TF-IDF + Logistic Regression".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_features: 0,
            fit: FitSummary {
                iterations: 0,
                converged: false,
            },
            holdout_accuracy: None,
            n_holdout_samples: 0,
            hyperparameters,
        }
    }
}
