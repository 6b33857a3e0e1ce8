use rust_xlsxwriter::Workbook;
use statement_classifier::{
    config::TrainingConfig,
    ml::{artifact, TextClassifier},
    sentiment::Sentiment,
    service::PredictorService,
    training::{load_dataset, Trainer},
    AppError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ANXIETY: [&str; 6] = [
    "I keep worrying about everything at work",
    "panic attack again before the meeting",
    "my heart races and I cannot calm down",
    "constant worry keeps me awake",
    "nervous about tomorrow and restless",
    "anxious thoughts all day long",
];

const DEPRESSION: [&str; 6] = [
    "I feel empty and hopeless",
    "nothing matters anymore and I am sad",
    "I cannot get out of bed for days",
    "everything feels pointless and dark",
    "so tired of feeling worthless",
    "crying alone every night",
];

const NORMAL: [&str; 6] = [
    "had a great lunch with friends",
    "the weather is lovely this afternoon",
    "finished my project and went for a walk",
    "watching a film with the family tonight",
    "cooked pasta for dinner",
    "looking forward to the weekend trip",
];

fn rows() -> Vec<(String, &'static str)> {
    let mut rows = Vec::new();
    for round in 0..3 {
        for (texts, label) in [(ANXIETY, "Anxiety"), (DEPRESSION, "Depression"), (NORMAL, "Normal")] {
            for text in texts {
                rows.push((format!("{} {}", text, round), label));
            }
        }
    }
    rows
}

fn write_csv(path: &Path, header: &str, lines: impl IntoIterator<Item = String>) {
    let mut contents = String::from(header);
    contents.push('\n');
    for line in lines {
        contents.push_str(&line);
        contents.push('\n');
    }
    std::fs::write(path, contents).unwrap();
}

fn config_for(dir: &Path, dataset: PathBuf) -> TrainingConfig {
    TrainingConfig {
        dataset_path: dataset,
        artifact_path: dir.join("artifacts").join("model.bin"),
        ..TrainingConfig::default()
    }
}

#[test]
fn test_train_then_serve_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("statements.csv");
    write_csv(
        &dataset,
        "statement,status",
        rows()
            .into_iter()
            .map(|(text, label)| format!("{},{}", text, label)),
    );

    let config = config_for(dir.path(), dataset);
    let report = Trainer::new(config.clone()).run().unwrap();

    assert_eq!(report.statement_column, "statement");
    assert_eq!(report.status_column, "status");
    assert_eq!(report.n_examples, 54);
    assert_eq!(report.n_dropped, 0);
    assert_eq!(report.n_train + report.n_test, 54);
    assert_eq!(report.labels, vec!["Anxiety", "Depression", "Normal"]);
    assert!((0.0..=1.0).contains(&report.accuracy()));
    assert!(config.artifact_path.exists());

    let pipeline = artifact::load(&config.artifact_path).unwrap();
    assert_eq!(pipeline.labels(), report.labels.as_slice());
    let metadata = pipeline.metadata().unwrap();
    assert_eq!(metadata.holdout_accuracy, Some(report.accuracy()));

    let service = PredictorService::with_classifier(Arc::new(pipeline));
    let response = service.predict("I feel hopeless today").unwrap();
    assert!(report.labels.contains(&response.label));
    assert!(response.confidence > 0.0 && response.confidence <= 1.0);
    assert_eq!(response.sentiment, Sentiment::Negative);

    // confidence is the largest probability, so with 3 labels it is at least 1/3
    assert!(response.confidence >= 1.0 / 3.0 - 1e-9);

    let again = service.predict("I feel hopeless today").unwrap();
    assert_eq!(response, again);
}

#[test]
fn test_train_from_xlsx_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("combined_data.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "statement").unwrap();
    sheet.write_string(0, 1, "status").unwrap();
    let mut row = 1;
    for (i, (text, label)) in rows().into_iter().enumerate() {
        sheet.write_string(row, 0, &text).unwrap();
        sheet.write_string(row, 1, label).unwrap();
        row += 1;
        if i == 10 {
            // blank status cell
            sheet.write_string(row, 0, "a statement nobody labelled").unwrap();
            row += 1;
        }
    }
    workbook.save(&dataset).unwrap();

    let loaded = load_dataset(&dataset, None, None).unwrap();
    assert_eq!(loaded.statement_column, "statement");
    assert_eq!(loaded.status_column, "status");
    assert_eq!(loaded.examples.len(), 54);
    assert_eq!(loaded.dropped, 1);

    let config = config_for(dir.path(), dataset);
    let report = Trainer::new(config.clone()).run().unwrap();
    assert_eq!(report.n_examples, 54);
    assert_eq!(report.n_dropped, 1);
    assert_eq!(report.labels, vec!["Anxiety", "Depression", "Normal"]);
    assert!(artifact::load(&config.artifact_path).is_ok());
}

#[test]
fn test_service_loads_trained_artifact_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("statements.csv");
    write_csv(
        &dataset,
        "statement,status",
        rows()
            .into_iter()
            .map(|(text, label)| format!("{},{}", text, label)),
    );

    let config = config_for(dir.path(), dataset);
    Trainer::new(config.clone()).run().unwrap();

    let service = PredictorService::load(&config.artifact_path);
    assert!(service.is_ready());
    let info = service.model_info().unwrap();
    assert_eq!(info.labels.len(), 3);
    assert!(info.n_features.unwrap() > 0);

    let response = service.predict("Lunch with friends was lovely").unwrap();
    assert_eq!(response.sentiment, Sentiment::Neutral);
}

#[test]
fn test_explicit_columns_and_incomplete_rows() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("survey.csv");

    let mut lines: Vec<String> = rows()
        .into_iter()
        .enumerate()
        .map(|(i, (text, label))| format!("{},{},note {},{}", i, label, i, text))
        .collect();
    // missing statement and missing status are both dropped
    lines.push("900,Normal,note,".to_string());
    lines.push("901,,note,some text without a label".to_string());

    write_csv(&dataset, "id,condition,notes,text", lines);

    let mut config = config_for(dir.path(), dataset);
    config.statement_column = Some("text".to_string());
    config.status_column = Some("condition".to_string());

    let report = Trainer::new(config).run().unwrap();
    assert_eq!(report.statement_column, "text");
    assert_eq!(report.status_column, "condition");
    assert_eq!(report.n_examples, 54);
    assert_eq!(report.n_dropped, 2);
}

#[test]
fn test_unknown_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("statements.csv");
    write_csv(
        &dataset,
        "statement,status",
        rows()
            .into_iter()
            .map(|(text, label)| format!("{},{}", text, label)),
    );

    let mut config = config_for(dir.path(), dataset);
    config.statement_column = Some("body".to_string());
    config.status_column = Some("status".to_string());

    let result = Trainer::new(config.clone()).run();
    assert!(matches!(result, Err(AppError::Dataset(_))));
    assert!(!config.artifact_path.exists());
}

#[test]
fn test_single_label_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("statements.csv");
    write_csv(
        &dataset,
        "statement,status",
        NORMAL.iter().map(|text| format!("{},Normal", text)),
    );

    let config = config_for(dir.path(), dataset);
    assert!(Trainer::new(config.clone()).run().is_err());
    assert!(!config.artifact_path.exists());
}
