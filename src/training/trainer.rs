use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::{artifact, ClassificationReport, PipelineParams, TextClassifier, TextPipeline};
use crate::training::dataset::{load_dataset, LabeledExample};
use crate::training::split::stratified_split;
use std::path::PathBuf;
use tracing::info;

/// Summary of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub statement_column: String,
    pub status_column: String,
    pub n_examples: usize,
    pub n_dropped: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub labels: Vec<String>,
    pub converged: bool,
    pub iterations: usize,
    pub evaluation: ClassificationReport,
    pub artifact_path: PathBuf,
}

impl TrainingReport {
    pub fn accuracy(&self) -> f64 {
        self.evaluation.accuracy
    }
}

/// Fitted pipeline together with its held-out evaluation
pub struct Evaluated {
    pub pipeline: TextPipeline,
    pub evaluation: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
}

/// Offline trainer: dataset → split → fit → evaluate → artifact
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Run every stage and write the artifact
    pub fn run(&self) -> Result<TrainingReport> {
        self.config.validate()?;

        info!(
            dataset = %self.config.dataset_path.display(),
            artifact = %self.config.artifact_path.display(),
            "Starting training run"
        );

        let dataset = load_dataset(
            &self.config.dataset_path,
            self.config.statement_column.as_deref(),
            self.config.status_column.as_deref(),
        )?;

        let evaluated = self.fit_and_evaluate(&dataset.examples)?;

        artifact::save(&evaluated.pipeline, &self.config.artifact_path)?;

        let (converged, iterations) = evaluated
            .pipeline
            .metadata()
            .map(|m| (m.fit.converged, m.fit.iterations))
            .unwrap_or((false, 0));

        Ok(TrainingReport {
            statement_column: dataset.statement_column,
            status_column: dataset.status_column,
            n_examples: dataset.examples.len(),
            n_dropped: dataset.dropped,
            n_train: evaluated.n_train,
            n_test: evaluated.n_test,
            labels: evaluated.pipeline.labels().to_vec(),
            converged,
            iterations,
            evaluation: evaluated.evaluation,
            artifact_path: self.config.artifact_path.clone(),
        })
    }

    /// Split, fit on the training subset and score the held-out subset
    pub fn fit_and_evaluate(&self, examples: &[LabeledExample]) -> Result<Evaluated> {
        let statuses: Vec<&str> = examples.iter().map(|e| e.status.as_str()).collect();
        let split = stratified_split(&statuses, self.config.test_ratio, self.config.seed)?;

        let (train_texts, train_labels) = gather(examples, &split.train);
        let (test_texts, test_labels) = gather(examples, &split.test);

        info!(
            train = train_texts.len(),
            test = test_texts.len(),
            "Training model"
        );

        let params = PipelineParams::from(&self.config);
        let mut pipeline = TextPipeline::fit(&train_texts, &train_labels, &params)?;

        let predicted = pipeline.predict_indices(&test_texts)?;
        let truth = test_labels
            .iter()
            .map(|label| {
                pipeline.label_index(label).ok_or_else(|| {
                    AppError::Training(format!("held-out label '{}' unseen in training", label))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let evaluation = ClassificationReport::compute(&truth, &predicted, pipeline.labels())?;
        pipeline.record_evaluation(evaluation.accuracy, test_texts.len());

        info!(accuracy = evaluation.accuracy, "Held-out evaluation complete");

        Ok(Evaluated {
            pipeline,
            evaluation,
            n_train: train_texts.len(),
            n_test: test_texts.len(),
        })
    }
}

fn gather<'a>(examples: &'a [LabeledExample], indices: &[usize]) -> (Vec<&'a str>, Vec<String>) {
    indices
        .iter()
        .map(|&i| (examples[i].statement.as_str(), examples[i].status.clone()))
        .unzip()
}
