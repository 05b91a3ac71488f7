//! Importers - delimited files into store tables
//!
//! Every importer implements `TableImporter`. `TableLoader` is driven entirely
//! by a `TableSpec` and `LoadOptions`; `ObservationLoader` is the same loader
//! bound to the observation-fact table.

pub mod loader;
pub mod observation;
pub mod reader;

pub use loader::TableLoader;
pub use observation::ObservationLoader;
pub use reader::{DelimitedSource, SourceRow};

use crate::ImportError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Capability to load an external source into one store table.
///
/// `load()` either commits every accepted row or leaves the store untouched.
pub trait TableImporter {
    /// Name of the table this importer writes to
    fn target_table(&self) -> &str;

    /// Read the bound source and write it into the bound store
    fn load(&mut self) -> Result<ImportReport, ImportError>;
}

/// What to do with a row that cannot be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowPolicy {
    /// Abort the whole load on the first malformed row
    #[default]
    RejectAll,
    /// Leave the row out, record it in the report and keep going
    SkipRow,
}

impl RowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowPolicy::RejectAll => "reject-all",
            RowPolicy::SkipRow => "skip-row",
        }
    }
}

impl std::str::FromStr for RowPolicy {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject-all" | "reject" | "strict" => Ok(RowPolicy::RejectAll),
            "skip-row" | "skip" | "lenient" => Ok(RowPolicy::SkipRow),
            other => Err(ImportError::Options(format!("unknown row policy: {}", other))),
        }
    }
}

impl std::fmt::Display for RowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a source file is read and written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field separator; inferred from the file extension when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// Honour `"` quoting; off by default for tab-delimited sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoting: Option<bool>,
    pub has_header: bool,
    pub policy: RowPolicy,
    /// Abort a skip-row load once more rows than this were rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rejected: Option<usize>,
    /// Field values treated as NULL
    pub null_values: Vec<String>,
    /// Create the target table when it does not exist yet
    pub create_table: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            quoting: None,
            has_header: true,
            policy: RowPolicy::RejectAll,
            max_rejected: None,
            null_values: vec![String::new()],
            create_table: true,
        }
    }
}

impl LoadOptions {
    /// Delimiter byte for `path`: the configured one, else by extension
    /// (`.txt`/`.tsv`/`.tab` tab, `.psv` pipe, anything else comma).
    pub fn delimiter_for(&self, path: &Path) -> Result<u8, ImportError> {
        if let Some(c) = self.delimiter {
            if !c.is_ascii() || c == '"' || c == '\n' || c == '\r' {
                return Err(ImportError::Options(format!(
                    "delimiter {:?} must be a single ASCII character other than a quote or newline",
                    c
                )));
            }
            return Ok(c as u8);
        }

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        Ok(match ext.as_str() {
            "txt" | "tsv" | "tab" => b'\t',
            "psv" => b'|',
            _ => b',',
        })
    }

    /// Whether `"` starts a quoted field for this delimiter.
    ///
    /// Tab-separated exports carry free text with stray quotes, so quoting is
    /// off for tab unless configured.
    pub fn quoting_for(&self, delimiter: u8) -> bool {
        self.quoting.unwrap_or(delimiter != b'\t')
    }
}

/// A row left out under `RowPolicy::SkipRow`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the source file
    pub line: u64,
    pub reason: String,
}

/// Outcome of one `load()`
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub table: String,
    pub source: PathBuf,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    pub fn new(table: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            source: source.into(),
            rows_read: 0,
            rows_inserted: 0,
            rejected: Vec::new(),
        }
    }

    pub fn rows_rejected(&self) -> usize {
        self.rejected.len()
    }
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Import Report:")?;
        writeln!(f, "  Table: {}", self.table)?;
        writeln!(f, "  Source: {}", self.source.display())?;
        writeln!(f, "  Rows read: {}", self.rows_read)?;
        writeln!(f, "  Rows inserted: {}", self.rows_inserted)?;
        write!(f, "  Rows rejected: {}", self.rows_rejected())?;
        for row in &self.rejected {
            write!(f, "\n    line {}: {}", row.line, row.reason)?;
        }
        writeln!(f)
    }
}
