//! Machine Learning module for statement classification
//!
//! This module provides:
//! - TF-IDF feature extraction over word unigrams and bigrams
//! - Multinomial logistic regression with class-balanced weighting
//! - The fitted two-stage pipeline and its on-disk artifact
//! - Held-out evaluation metrics

pub mod artifact;
pub mod classifier;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;

pub use classifier::SoftmaxRegression;
pub use features::TfidfVectorizer;
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport};
pub use models::{
    ClassWeight, FeatureConfig, FitSummary, ModelMetadata, PipelineParams, Prediction,
    RegressionParams,
};
pub use pipeline::{TextClassifier, TextPipeline};
