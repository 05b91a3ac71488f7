//! Delimited source reader
//!
//! Maps the file's fields onto a `TableSpec` and converts each record into
//! typed SQLite values. Rows that cannot be converted come back as
//! `SourceRow::Malformed` so the caller decides the policy.

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;

use crate::ImportError;
use crate::table::{ColumnSpec, ColumnType, TableSpec};
use super::LoadOptions;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y", "%d-%b-%Y"];

/// Storage format of timestamp columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One record of the source, after conversion
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    Valid { line: u64, values: Vec<Value> },
    Malformed { line: u64, reason: String },
}

impl SourceRow {
    pub fn line(&self) -> u64 {
        match self {
            SourceRow::Valid { line, .. } | SourceRow::Malformed { line, .. } => *line,
        }
    }
}

/// A delimited file bound to a table definition
pub struct DelimitedSource {
    reader: csv::Reader<File>,
    record: csv::StringRecord,
    columns: Vec<ColumnSpec>,
    /// For each table column, the field index in the record (None: not in file)
    mapping: Vec<Option<usize>>,
    expected_fields: usize,
    null_values: Vec<String>,
}

impl DelimitedSource {
    /// Open `path` and resolve its header against `spec`.
    ///
    /// Fails with `SourceUnreadable` if the file cannot be opened and with
    /// `Header` if the header does not fit the table.
    pub fn open(path: &Path, spec: &TableSpec, options: &LoadOptions) -> Result<Self, ImportError> {
        let unreadable = |source: std::io::Error| ImportError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let metadata = file.metadata().map_err(unreadable)?;
        if metadata.is_dir() {
            return Err(unreadable(std::io::Error::other("path is a directory")));
        }

        let delimiter = options.delimiter_for(path)?;
        let quoting = options.quoting_for(delimiter);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quoting(quoting)
            .has_headers(options.has_header)
            .flexible(true)
            .from_reader(file);

        let (mapping, expected_fields) = if options.has_header {
            let header = reader.headers().map_err(read_error)?.clone();
            map_header(&header, spec)?
        } else {
            let mapping = (0..spec.columns.len()).map(Some).collect();
            (mapping, spec.columns.len())
        };

        tracing::debug!(
            "Opened {} (delimiter {:?}, quoting {}, {} fields per row)",
            path.display(),
            delimiter as char,
            quoting,
            expected_fields
        );

        Ok(Self {
            reader,
            record: csv::StringRecord::new(),
            columns: spec.columns.clone(),
            mapping,
            expected_fields,
            null_values: options.null_values.clone(),
        })
    }

    /// Read and convert the next record; `None` at end of file
    pub fn next_row(&mut self) -> Option<Result<SourceRow, ImportError>> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map(|p| p.line()).unwrap_or(0);
                Some(Ok(self.convert_record(line)))
            }
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => Some(Err(read_error(e))),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                Some(Ok(SourceRow::Malformed {
                    line,
                    reason: e.to_string(),
                }))
            }
        }
    }

    fn convert_record(&self, line: u64) -> SourceRow {
        if self.record.len() != self.expected_fields {
            return SourceRow::Malformed {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    self.expected_fields,
                    self.record.len()
                ),
            };
        }

        let mut values = Vec::with_capacity(self.columns.len());
        for (column, field) in self.columns.iter().zip(&self.mapping) {
            let raw = field.and_then(|i| self.record.get(i));
            match convert_field(column, raw, &self.null_values) {
                Ok(value) => values.push(value),
                Err(reason) => return SourceRow::Malformed { line, reason },
            }
        }
        SourceRow::Valid { line, values }
    }
}

impl Iterator for DelimitedSource {
    type Item = Result<SourceRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

fn read_error(e: csv::Error) -> ImportError {
    ImportError::Read(e)
}

/// Resolve header names to table columns
fn map_header(
    header: &csv::StringRecord,
    spec: &TableSpec,
) -> Result<(Vec<Option<usize>>, usize), ImportError> {
    let names: Vec<&str> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();

    if names.is_empty() || names.iter().all(|n| n.is_empty()) {
        return Err(ImportError::Header("source file has no header row".to_string()));
    }

    let mut mapping = vec![None; spec.columns.len()];
    for (field, name) in names.iter().enumerate() {
        let column = spec.column_index(name).ok_or_else(|| {
            ImportError::Header(format!(
                "column {:?} is not in table {} (columns: {})",
                name,
                spec.name,
                spec.column_names().join(", ")
            ))
        })?;
        if mapping[column].is_some() {
            return Err(ImportError::Header(format!("column {:?} appears twice", name)));
        }
        mapping[column] = Some(field);
    }

    for (column, field) in spec.columns.iter().zip(&mapping) {
        if field.is_none() && !column.accepts_missing() {
            return Err(ImportError::Header(format!(
                "required column {} is missing",
                column.name
            )));
        }
    }

    Ok((mapping, names.len()))
}

fn is_null(raw: &str, kind: ColumnType, null_values: &[String]) -> bool {
    let probe = if kind == ColumnType::Text { raw } else { raw.trim() };
    null_values.iter().any(|n| n == probe)
}

/// Convert one field, applying null markers and the column default
pub fn convert_field(
    column: &ColumnSpec,
    raw: Option<&str>,
    null_values: &[String],
) -> Result<Value, String> {
    let present = raw.filter(|v| !is_null(v, column.kind, null_values));
    let raw = match present.or(column.default.as_deref()) {
        Some(v) => v,
        None if column.nullable => return Ok(Value::Null),
        None => return Err(format!("column {} must not be null", column.name)),
    };

    parse_value(column.kind, raw).map_err(|e| format!("column {}: {}", column.name, e))
}

/// Parse a raw field as the given column type
pub fn parse_value(kind: ColumnType, raw: &str) -> Result<Value, String> {
    match kind {
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("{:?} is not an integer", raw)),
        ColumnType::Real => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Value::Real(v)),
            _ => Err(format!("{:?} is not a finite number", raw)),
        },
        ColumnType::Text => Ok(Value::Text(raw.to_string())),
        ColumnType::Timestamp => parse_timestamp(raw.trim())
            .map(|ts| Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            .ok_or_else(|| format!("{:?} is not a recognised date or timestamp", raw)),
    }
}

/// Parse the date and date-time layouts found in fact exports
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
