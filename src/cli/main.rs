use anyhow::Context;
use clap::{Parser, Subcommand};
use statement_classifier::{
    config::Config, ml::artifact, ml::TextClassifier, service::PredictorService,
    telemetry::init_tracing, training::Trainer,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sc-cli")]
#[command(about = "Statement classifier training and inspection CLI", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a labelled dataset and write the artifact
    Train {
        /// Dataset file (.xlsx, .xls, .ods or .csv)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Statement column name (requires --status-column)
        #[arg(long, requires = "status_column")]
        statement_column: Option<String>,

        /// Status column name (requires --statement-column)
        #[arg(long, requires = "statement_column")]
        status_column: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        test_ratio: Option<f64>,

        #[arg(long)]
        max_features: Option<usize>,
    },

    /// Classify a single text with a trained artifact
    Predict {
        #[arg(short, long)]
        model: Option<PathBuf>,

        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Show the metadata stored in an artifact
    Inspect {
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    init_tracing(&config.observability, cli.verbose);

    match cli.command {
        Commands::Train {
            data,
            output,
            statement_column,
            status_column,
            seed,
            test_ratio,
            max_features,
        } => {
            let mut training = config.training.clone();
            if let Some(data) = data {
                training.dataset_path = data;
            }
            if let Some(output) = output {
                training.artifact_path = output;
            }
            if statement_column.is_some() {
                training.statement_column = statement_column;
                training.status_column = status_column;
            }
            if let Some(seed) = seed {
                training.seed = seed;
            }
            if let Some(test_ratio) = test_ratio {
                training.test_ratio = test_ratio;
            }
            if let Some(max_features) = max_features {
                training.max_features = max_features;
            }

            let report = Trainer::new(training)
                .run()
                .context("training run failed")?;

            println!(
                "Columns: statement='{}' status='{}'",
                report.statement_column, report.status_column
            );
            println!(
                "Rows: {} kept, {} dropped ({} train / {} test)",
                report.n_examples, report.n_dropped, report.n_train, report.n_test
            );
            if !report.converged {
                println!(
                    "Warning: optimiser stopped after {} iterations without converging",
                    report.iterations
                );
            }
            println!("Accuracy: {:.4}", report.accuracy());
            println!();
            println!("{}", report.evaluation);
            println!("Model saved to {}", report.artifact_path.display());
        }

        Commands::Predict { model, text } => {
            let path = model.unwrap_or(config.model.artifact_path);
            let pipeline = artifact::load(&path)
                .with_context(|| format!("failed to load model from {}", path.display()))?;
            let service = PredictorService::with_classifier(Arc::new(pipeline));

            let response = service.predict(&text)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Inspect { model } => {
            let path = model.unwrap_or(config.model.artifact_path);
            let pipeline = artifact::load(&path)
                .with_context(|| format!("failed to load model from {}", path.display()))?;

            println!("Artifact: {}", path.display());
            println!("Format version: {}", artifact::FORMAT_VERSION);
            println!("Labels: {}", pipeline.labels().join(", "));
            if let Some(metadata) = pipeline.metadata() {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            }
        }
    }

    Ok(())
}
