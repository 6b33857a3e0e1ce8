use crate::error::{AppError, Result};
use crate::ml::{artifact, ModelMetadata, TextClassifier};
use crate::sentiment::{self, Sentiment};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Message returned when the submitted text is blank
pub const NO_TEXT_PROVIDED: &str = "No text provided";

/// Successful prediction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Label from the trained classifier
    pub label: String,

    /// Maximum class probability
    pub confidence: f64,

    /// Keyword heuristic, independent of `label`
    pub sentiment: Sentiment,
}

/// What the service knows about its loaded model
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelInfo {
    pub labels: Vec<String>,
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
    pub n_features: Option<usize>,
    pub holdout_accuracy: Option<f64>,
}

/// Predictor service
///
/// Owns the loaded pipeline for the lifetime of the process. A service
/// without a pipeline is in degraded mode: it keeps answering, and every
/// prediction fails with [`AppError::ModelNotLoaded`].
#[derive(Clone)]
pub struct PredictorService {
    classifier: Option<Arc<dyn TextClassifier>>,
}

impl PredictorService {
    /// Load the artifact at `path`, falling back to degraded mode on failure
    pub fn load(path: &Path) -> Self {
        match artifact::load(path) {
            Ok(pipeline) => {
                info!(
                    path = %path.display(),
                    labels = ?pipeline.labels(),
                    "✅ Loaded model"
                );
                Self::with_classifier(Arc::new(pipeline))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "❌ Failed to load model");
                warn!("Continuing without a model; predictions will fail until restart");
                Self::degraded()
            }
        }
    }

    /// Service backed by an already constructed classifier
    pub fn with_classifier(classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    /// Service without a model
    pub fn degraded() -> Self {
        Self { classifier: None }
    }

    /// Check if a model is loaded
    pub fn is_ready(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.classifier.as_ref().map(|classifier| {
            let metadata: Option<&ModelMetadata> = classifier.metadata();
            ModelInfo {
                labels: classifier.labels().to_vec(),
                trained_at: metadata.map(|m| m.trained_at),
                n_features: metadata.map(|m| m.n_features),
                holdout_accuracy: metadata.and_then(|m| m.holdout_accuracy),
            }
        })
    }

    /// Classify a text and attach the keyword sentiment
    pub fn predict(&self, text: &str) -> Result<PredictionResponse> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(NO_TEXT_PROVIDED.to_string()));
        }

        let classifier = self.classifier.as_ref().ok_or(AppError::ModelNotLoaded)?;

        let prediction = classifier.classify(text).map_err(|e| match e {
            AppError::Inference(_) => e,
            other => AppError::Inference(other.to_string()),
        })?;

        let sentiment = sentiment::assess(text);

        debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            sentiment = %sentiment,
            chars = text.chars().count(),
            "Prediction served"
        );

        Ok(PredictionResponse {
            label: prediction.label,
            confidence: prediction.confidence,
            sentiment,
        })
    }
}
