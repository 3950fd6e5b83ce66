//! CSV Import
//!
//! Loads dated observation series (earnings, expenses, fees) and labeled
//! training examples for the categorizer from CSV files.
//! Supports flexible column mapping and multiple date formats.

use crate::categorizer::TrainingExample;
use crate::series::{start_of_day, Observation};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while importing CSV data
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

/// Result type alias for imports
pub type ImportResult<T> = Result<T, ImportError>;

/// Per-row error messages kept in an import report
const MAX_REPORTED_ERRORS: usize = 100;

const COMMON_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Outcome of an import: parsed records plus per-row failures
#[derive(Debug)]
pub struct ImportReport<T> {
    pub records: Vec<T>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl<T> ImportReport<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            rows_processed: 0,
            rows_failed: 0,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, line: usize, message: impl std::fmt::Display) {
        self.errors.push(format!("Line {}: {}", line, message));
        self.rows_failed += 1;
    }

    fn finish(mut self) -> Self {
        if self.errors.len() > MAX_REPORTED_ERRORS {
            let total = self.errors.len();
            self.errors.truncate(MAX_REPORTED_ERRORS);
            self.errors
                .push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }
        self
    }
}

/// Importer for `date,value` series with configurable column mapping
#[derive(Debug, Clone)]
pub struct ObservationImporter {
    /// Column index for dates (0-indexed)
    date_column: usize,
    /// Column index for values
    value_column: usize,
    /// Format string tried first when parsing dates
    date_format: String,
    /// Whether the CSV has a header row
    has_header: bool,
}

impl Default for ObservationImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationImporter {
    pub fn new() -> Self {
        Self {
            date_column: 0,
            value_column: 1,
            date_format: "%Y-%m-%d".to_string(),
            has_header: true,
        }
    }

    pub fn with_date_column(mut self, column: usize) -> Self {
        self.date_column = column;
        self
    }

    pub fn with_value_column(mut self, column: usize) -> Self {
        self.value_column = column;
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Pick the date and value columns from a header row
    ///
    /// The first header mentioning a date or time becomes the date column;
    /// the first header naming an amount or value becomes the value column.
    pub fn auto_detect_columns(&mut self, headers: &csv::StringRecord) {
        let mut date_found = false;
        let mut value_found = false;

        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim().to_lowercase();
            if !date_found && (header.contains("date") || header.contains("time")) {
                self.date_column = idx;
                date_found = true;
            } else if !value_found
                && ["value", "amount", "total", "earnings", "expense", "fee"]
                    .iter()
                    .any(|k| header.contains(k))
            {
                self.value_column = idx;
                value_found = true;
            }
        }
    }

    /// Detect columns from the header row of the file at `path`
    pub fn with_detected_columns(mut self, path: &Path) -> ImportResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        self.auto_detect_columns(&headers);
        Ok(self)
    }

    /// Import observations from a CSV file
    pub fn import(&self, path: &Path) -> ImportResult<ImportReport<Observation>> {
        let file = std::fs::File::open(path)?;
        self.import_reader(file)
    }

    /// Import from a CSV string
    pub fn import_str(&self, csv_data: &str) -> ImportResult<ImportReport<Observation>> {
        self.import_reader(csv_data.as_bytes())
    }

    fn import_reader<R: Read>(&self, source: R) -> ImportResult<ImportReport<Observation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut report = ImportReport::new();
        let first_line = if self.has_header { 2 } else { 1 };

        for (offset, result) in reader.records().enumerate() {
            let line = first_line + offset;
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    report.fail(line, e);
                    continue;
                }
            };

            let Some(date_str) = record.get(self.date_column) else {
                report.fail(line, "missing date column");
                continue;
            };
            let date = match parse_date(date_str, &self.date_format) {
                Ok(d) => d,
                Err(e) => {
                    report.fail(line, e);
                    continue;
                }
            };

            let value_str = record.get(self.value_column).unwrap_or("");
            if value_str.is_empty() {
                // Blank cell: nothing recorded that day
                continue;
            }
            match parse_amount(value_str) {
                Ok(value) => {
                    report.records.push(Observation::new(date, value));
                    report.rows_processed += 1;
                }
                Err(e) => report.fail(line, e),
            }
        }

        tracing::debug!(
            imported = report.rows_processed,
            failed = report.rows_failed,
            "Imported observations"
        );
        Ok(report.finish())
    }
}

/// Import a series, detecting columns from the header row
pub fn import_observations(path: &Path) -> ImportResult<ImportReport<Observation>> {
    ObservationImporter::new()
        .with_detected_columns(path)?
        .import(path)
}

/// Import labeled training examples from a CSV file
///
/// Columns are matched by header name: `description`, `amount` and
/// `category` are required; `merchant` (or `merchant_name`) and `date` (or
/// `timestamp`) are optional. Rows without a date are stamped with the
/// current time.
pub fn import_training_examples(path: &Path) -> ImportResult<ImportReport<TrainingExample>> {
    let file = std::fs::File::open(path)?;
    import_training_reader(file)
}

/// Import labeled training examples from a CSV string
pub fn import_training_str(csv_data: &str) -> ImportResult<ImportReport<TrainingExample>> {
    import_training_reader(csv_data.as_bytes())
}

fn import_training_reader<R: Read>(source: R) -> ImportResult<ImportReport<TrainingExample>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let require = |name: &str| {
        find(&[name]).ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    };

    let description_col = require("description")?;
    let amount_col = require("amount")?;
    let category_col = require("category")?;
    let merchant_col = find(&["merchant", "merchant_name"]);
    let date_col = find(&["date", "timestamp"]);

    let mut report = ImportReport::new();
    for (offset, result) in reader.records().enumerate() {
        let line = offset + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                report.fail(line, e);
                continue;
            }
        };

        let field = |col: usize| record.get(col).unwrap_or("");
        let description = field(description_col);
        let category = field(category_col);
        if description.is_empty() || category.is_empty() {
            report.fail(line, "description and category are required");
            continue;
        }

        let amount = match parse_amount(field(amount_col)) {
            Ok(a) => a,
            Err(e) => {
                report.fail(line, e);
                continue;
            }
        };

        let mut example = TrainingExample::new(description, amount, category);
        if let Some(merchant) = merchant_col.map(field).filter(|m| !m.is_empty()) {
            example = example.with_merchant(merchant);
        }
        if let Some(raw) = date_col.map(field).filter(|d| !d.is_empty()) {
            match parse_timestamp(raw) {
                Ok(ts) => example = example.with_timestamp(ts),
                Err(e) => {
                    report.fail(line, e);
                    continue;
                }
            }
        }

        report.records.push(example);
        report.rows_processed += 1;
    }

    tracing::debug!(
        imported = report.rows_processed,
        failed = report.rows_failed,
        "Imported training examples"
    );
    Ok(report.finish())
}

/// Numeric cell, tolerating currency symbols and thousands separators
fn parse_amount(raw: &str) -> ImportResult<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '€' | '£'))
        .collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ImportError::Parse(format!("Could not parse amount: {}", raw)))
}

/// Calendar day of a date or timestamp string
fn parse_date(raw: &str, preferred_format: &str) -> ImportResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, preferred_format) {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, preferred_format) {
        return Ok(dt.date());
    }
    parse_timestamp(raw).map(start_of_day)
}

fn parse_timestamp(raw: &str) -> ImportResult<DateTime<Utc>> {
    for fmt in COMMON_DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            if let Some(noon) = date.and_hms_opt(12, 0, 0) {
                return Ok(noon.and_utc());
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(ImportError::Parse(format!("Could not parse date: {}", raw)))
}
