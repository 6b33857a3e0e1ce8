//! Labeled dataset loading.
//!
//! Reads the first worksheet of a spreadsheet (or a CSV file) into a
//! [`Table`], resolves which columns hold the statement and the status, and
//! projects the table into clean [`LabeledExample`]s.

use crate::error::{AppError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(s) if !s.trim().is_empty())
    }

    /// String form of a present value; integral numbers drop the fraction
    pub fn render(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Empty => None,
        }
    }
}

/// In-memory table: one header row plus data rows padded to the header width
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// A column counts as free text when any present value is non-numeric
    pub fn is_text_column(&self, index: usize) -> bool {
        self.rows.iter().any(|row| row[index].is_text())
    }
}

/// Read a dataset file, dispatching on its extension
pub fn load_table(path: &Path) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => read_csv(path),
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => read_workbook(path),
        _ => Err(AppError::Dataset(format!(
            "unsupported dataset format: {}",
            path.display()
        ))),
    }
}

fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Dataset(format!("{} has no worksheets", path.display())))??;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(header_row)
        .ok_or_else(|| AppError::Dataset(format!("{} is empty", path.display())))?;
    let data = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(Table::new(headers, data))
}

fn header_row(row: &[Data]) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", idx),
            other => other.to_string(),
        })
        .collect()
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(cell_from_str).collect());
    }

    Ok(Table::new(headers, rows))
}

fn cell_from_str(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Cell::Empty
    } else if let Ok(number) = trimmed.parse::<f64>() {
        Cell::Number(number)
    } else {
        Cell::Text(raw.to_string())
    }
}

/// Which columns hold the statement and the status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub statement: usize,
    pub status: usize,
}

impl ColumnMapping {
    /// Use configured header names when present, otherwise auto-detect
    pub fn resolve(table: &Table, statement: Option<&str>, status: Option<&str>) -> Result<Self> {
        match (statement, status) {
            (Some(statement), Some(status)) => Self::explicit(table, statement, status),
            (None, None) => {
                let mapping = Self::detect(table)?;
                tracing::warn!(
                    statement = %table.headers()[mapping.statement],
                    status = %table.headers()[mapping.status],
                    "Columns auto-detected; set training.statement_column and \
                     training.status_column to pin them"
                );
                Ok(mapping)
            }
            _ => Err(AppError::Configuration(
                "statement and status columns must be configured together".to_string(),
            )),
        }
    }

    /// Look both columns up by header name
    pub fn explicit(table: &Table, statement: &str, status: &str) -> Result<Self> {
        let find = |name: &str| {
            table.column_index(name).ok_or_else(|| {
                AppError::Dataset(format!(
                    "column '{}' not found; available columns: {}",
                    name,
                    table.headers().join(", ")
                ))
            })
        };

        let mapping = Self {
            statement: find(statement)?,
            status: find(status)?,
        };
        if mapping.statement == mapping.status {
            return Err(AppError::Configuration(format!(
                "statement and status both point at column '{}'",
                statement
            )));
        }
        Ok(mapping)
    }

    /// Statement is the first free-text column, status is the second column
    pub fn detect(table: &Table) -> Result<Self> {
        if table.headers().len() < 2 {
            return Err(AppError::Dataset(format!(
                "dataset needs at least 2 columns, found {}",
                table.headers().len()
            )));
        }

        let statement = (0..table.headers().len())
            .find(|&idx| table.is_text_column(idx))
            .ok_or_else(|| AppError::Dataset("no free-text column found".to_string()))?;
        let status = 1;

        if statement == status {
            return Err(AppError::Dataset(format!(
                "detected statement column '{}' is also the positional status column; \
                 configure the columns explicitly",
                table.headers()[statement]
            )));
        }

        Ok(Self { statement, status })
    }
}

/// One cleaned (statement, status) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub statement: String,
    pub status: String,
}

/// Cleaned examples plus where they came from
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub statement_column: String,
    pub status_column: String,
    pub examples: Vec<LabeledExample>,
    /// Rows discarded for a missing statement or status
    pub dropped: usize,
}

/// Project the table to (statement, status), dropping incomplete rows
pub fn clean(table: &Table, mapping: &ColumnMapping) -> LabeledDataset {
    let mut examples = Vec::with_capacity(table.len());
    let mut dropped = 0;

    for row in table.rows() {
        match (row[mapping.statement].render(), row[mapping.status].render()) {
            (Some(statement), Some(status)) => examples.push(LabeledExample { statement, status }),
            _ => dropped += 1,
        }
    }

    LabeledDataset {
        statement_column: table.headers()[mapping.statement].clone(),
        status_column: table.headers()[mapping.status].clone(),
        examples,
        dropped,
    }
}

/// Load, resolve columns and clean in one step
pub fn load_dataset(
    path: &Path,
    statement_column: Option<&str>,
    status_column: Option<&str>,
) -> Result<LabeledDataset> {
    let table = load_table(path)?;
    let mapping = ColumnMapping::resolve(&table, statement_column, status_column)?;
    let dataset = clean(&table, &mapping);

    tracing::info!(
        path = %path.display(),
        statement_column = %dataset.statement_column,
        status_column = %dataset.status_column,
        rows = table.len(),
        kept = dataset.examples.len(),
        dropped = dataset.dropped,
        "Dataset loaded"
    );

    if dataset.examples.is_empty() {
        return Err(AppError::Dataset(format!(
            "{} has no complete (statement, status) rows",
            path.display()
        )));
    }

    Ok(dataset)
}
