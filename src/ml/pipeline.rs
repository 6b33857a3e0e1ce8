use crate::error::{AppError, Result};
use crate::ml::classifier::{argmax, SoftmaxRegression};
use crate::ml::features::TfidfVectorizer;
use crate::ml::models::{ModelMetadata, PipelineParams, Prediction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Anything that can turn a text into a labelled prediction
///
/// The predictor service only depends on this trait, so a fitted
/// [`TextPipeline`] and a test double are interchangeable.
pub trait TextClassifier: Send + Sync {
    /// Classify one text
    fn classify(&self, text: &str) -> Result<Prediction>;

    /// Class labels in index order
    fn labels(&self) -> &[String];

    /// Training metadata, when the classifier carries any
    fn metadata(&self) -> Option<&ModelMetadata> {
        None
    }
}

/// Fitted two-stage pipeline: TF-IDF vectorizer followed by a multinomial
/// logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPipeline {
    vectorizer: TfidfVectorizer,
    classifier: SoftmaxRegression,
    labels: Vec<String>,
    metadata: ModelMetadata,
}

impl TextPipeline {
    /// Fit both stages on parallel slices of statements and status labels
    pub fn fit<S: AsRef<str>>(
        statements: &[S],
        statuses: &[String],
        params: &PipelineParams,
    ) -> Result<Self> {
        if statements.len() != statuses.len() {
            return Err(AppError::Training(format!(
                "{} statements but {} status labels",
                statements.len(),
                statuses.len()
            )));
        }

        let labels: Vec<String> = statuses
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if labels.len() < 2 {
            return Err(AppError::Training(format!(
                "need at least 2 distinct labels, found {}",
                labels.len()
            )));
        }

        let targets: Vec<usize> = statuses
            .iter()
            .map(|status| labels.binary_search(status).unwrap_or_default())
            .collect();

        let mut vectorizer = TfidfVectorizer::new(params.features.clone());
        let features = vectorizer.fit_transform(statements)?;

        tracing::info!(
            samples = statements.len(),
            features = features.cols(),
            classes = labels.len(),
            "Fitting logistic regression"
        );

        let mut classifier = SoftmaxRegression::new(params.regression.clone());
        let fit = classifier.fit(&features, &targets, labels.len())?;

        tracing::info!(
            iterations = fit.iterations,
            converged = fit.converged,
            "Logistic regression fitted"
        );

        let mut metadata = ModelMetadata::new(params);
        metadata.n_training_samples = statements.len();
        metadata.n_features = features.cols();
        metadata.fit = fit;

        Ok(Self {
            vectorizer,
            classifier,
            labels,
            metadata,
        })
    }

    /// Predicted class indices for a batch of texts
    pub fn predict_indices<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<usize>> {
        let features = self.vectorizer.transform(texts)?;
        self.classifier.predict(&features)
    }

    /// Index of a label, if the pipeline was trained on it
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Attach held-out accuracy to the metadata
    pub fn record_evaluation(&mut self, accuracy: f64, n_holdout_samples: usize) {
        self.metadata.holdout_accuracy = Some(accuracy);
        self.metadata.n_holdout_samples = n_holdout_samples;
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Check that the stages agree with each other, e.g. after decoding
    pub fn validate(&self) -> Result<()> {
        if !self.vectorizer.is_fitted() || !self.classifier.is_trained() {
            return Err(AppError::Artifact("pipeline is not fitted".to_string()));
        }
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        if self.vectorizer.n_features() != self.classifier.n_features() {
            return Err(AppError::Artifact(format!(
                "vectorizer has {} features but classifier expects {}",
                self.vectorizer.n_features(),
                self.classifier.n_features()
            )));
        }
        if self.labels.len() != self.classifier.n_classes() {
            return Err(AppError::Artifact(format!(
                "{} labels for {} classifier classes",
                self.labels.len(),
                self.classifier.n_classes()
            )));
        }
        Ok(())
    }
}

impl TextClassifier for TextPipeline {
    fn classify(&self, text: &str) -> Result<Prediction> {
        let features = self.vectorizer.transform_one(text)?;
        let proba = self.classifier.predict_proba_one(&features)?;

        let best = argmax(proba.view());
        let label = self
            .labels
            .get(best)
            .cloned()
            .ok_or_else(|| AppError::Inference(format!("no label for class index {}", best)))?;

        Ok(Prediction {
            label,
            confidence: proba[best],
            probabilities: self
                .labels
                .iter()
                .cloned()
                .zip(proba.iter().copied())
                .collect(),
        })
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn metadata(&self) -> Option<&ModelMetadata> {
        Some(&self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> (Vec<&'static str>, Vec<String>) {
        let anxious = [
            "I am so anxious about tomorrow",
            "my heart races and I panic",
            "constant worry and panic attacks",
            "anxious thoughts keep me up",
        ];
        let normal = [
            "had a lovely lunch with friends",
            "the weather is nice today",
            "went for a walk in the park",
            "enjoyed a good book this evening",
        ];

        let mut texts = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..3 {
            for text in anxious {
                texts.push(text);
                labels.push("Anxiety".to_string());
            }
            for text in normal {
                texts.push(text);
                labels.push("Normal".to_string());
            }
        }
        (texts, labels)
    }

    fn fitted() -> TextPipeline {
        let (texts, labels) = training_data();
        TextPipeline::fit(&texts, &labels, &PipelineParams::default()).unwrap()
    }

    #[test]
    fn test_labels_are_sorted_and_unique() {
        let pipeline = fitted();
        assert_eq!(pipeline.labels(), &["Anxiety".to_string(), "Normal".to_string()]);
        assert_eq!(pipeline.label_index("Normal"), Some(1));
        assert_eq!(pipeline.label_index("Stress"), None);
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_classify_learns_training_vocabulary() {
        let pipeline = fitted();
        let anxious = pipeline.classify("panic and worry").unwrap();
        assert_eq!(anxious.label, "Anxiety");

        let normal = pipeline.classify("a walk in the park with friends").unwrap();
        assert_eq!(normal.label, "Normal");
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let pipeline = fitted();
        let prediction = pipeline.classify("anxious walk").unwrap();

        let max = prediction
            .probabilities
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(prediction.confidence, max);
        assert_eq!(prediction.probabilities[&prediction.label], max);
        assert!((0.0..=1.0).contains(&prediction.confidence));
    }

    #[test]
    fn test_unseen_text_still_classified() {
        let pipeline = fitted();
        let prediction = pipeline.classify("zzz qqq").unwrap();
        assert!(pipeline.labels().contains(&prediction.label));
        assert_eq!(prediction.probabilities.len(), 2);
    }

    #[test]
    fn test_single_label_rejected() {
        let texts = vec!["one text", "another text"];
        let labels = vec!["Normal".to_string(), "Normal".to_string()];
        assert!(matches!(
            TextPipeline::fit(&texts, &labels, &PipelineParams::default()),
            Err(AppError::Training(_))
        ));
    }

    #[test]
    fn test_inconsistent_pipeline_fails_validation_and_loading() {
        let mut pipeline = fitted();

        // a vocabulary column past the end of the IDF weights
        let mut encoded = serde_json::to_value(&pipeline.vectorizer).unwrap();
        encoded["vocabulary"]["panic"] = serde_json::json!(1_000_000);
        pipeline.vectorizer = serde_json::from_value(encoded).unwrap();

        assert!(matches!(pipeline.validate(), Err(AppError::Artifact(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        crate::ml::artifact::save(&pipeline, &path).unwrap();
        assert!(matches!(
            crate::ml::artifact::load(&path),
            Err(AppError::Artifact(_))
        ));
        assert!(!crate::service::PredictorService::load(&path).is_ready());
    }

    #[test]
    fn test_metadata_filled_after_fit() {
        let mut pipeline = fitted();
        let metadata = pipeline.metadata().unwrap();
        assert_eq!(metadata.n_training_samples, 24);
        assert_eq!(metadata.n_features, pipeline.vectorizer().n_features());

        pipeline.record_evaluation(0.75, 8);
        assert_eq!(pipeline.metadata().unwrap().holdout_accuracy, Some(0.75));
    }
}
