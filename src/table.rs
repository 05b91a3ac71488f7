//! Table definitions - what a delimited file is loaded into
//!
//! A `TableSpec` names the target table and lists its columns in order.
//! Column types are limited to four storage kinds:
//! - `Integer`: 64-bit signed integer
//! - `Real`: 64-bit float
//! - `Text`: verbatim text
//! - `Timestamp`: date or date-time, stored as `YYYY-MM-DD HH:MM:SS`

use crate::ImportError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "int", alias = "bigint")]
    Integer,
    #[serde(alias = "float", alias = "double", alias = "numeric")]
    Real,
    #[serde(alias = "varchar", alias = "string")]
    Text,
    #[serde(alias = "date", alias = "datetime")]
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
        }
    }

    /// Declared SQLite type used in generated DDL
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "DATETIME",
        }
    }

    pub fn all() -> &'static [ColumnType] {
        &[
            ColumnType::Integer,
            ColumnType::Real,
            ColumnType::Text,
            ColumnType::Timestamp,
        ]
    }
}

impl FromStr for ColumnType {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "integer" | "int" | "bigint" => Ok(ColumnType::Integer),
            "real" | "float" | "double" | "numeric" => Ok(ColumnType::Real),
            "text" | "varchar" | "string" => Ok(ColumnType::Text),
            "timestamp" | "date" | "datetime" => Ok(ColumnType::Timestamp),
            other => Err(ImportError::Schema(format!("Unknown column type: {}", other))),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_nullable() -> bool {
    true
}

/// One column of a target table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Raw value used when the field is null or the column is absent from the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnSpec {
    /// A nullable column with no default
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// True when a missing value can still be written
    pub fn accepts_missing(&self) -> bool {
        self.nullable || self.default.is_some()
    }
}

/// Target table: name plus ordered columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// The i2b2 `observation_fact` layout.
    ///
    /// This is only the default for `ObservationLoader`; a `[table]` section in
    /// the configuration file replaces it.
    pub fn observation_fact() -> Self {
        use ColumnType::*;
        Self::new(
            "observation_fact",
            vec![
                ColumnSpec::new("encounter_num", Integer).not_null(),
                ColumnSpec::new("patient_num", Integer).not_null(),
                ColumnSpec::new("concept_cd", Text).not_null(),
                ColumnSpec::new("provider_id", Text).not_null().with_default("@"),
                ColumnSpec::new("start_date", Timestamp).not_null(),
                ColumnSpec::new("modifier_cd", Text).not_null().with_default("@"),
                ColumnSpec::new("instance_num", Integer).not_null().with_default("1"),
                ColumnSpec::new("valtype_cd", Text),
                ColumnSpec::new("tval_char", Text),
                ColumnSpec::new("nval_num", Real),
                ColumnSpec::new("valueflag_cd", Text),
                ColumnSpec::new("quantity_num", Real),
                ColumnSpec::new("units_cd", Text),
                ColumnSpec::new("end_date", Timestamp),
                ColumnSpec::new("location_cd", Text),
                ColumnSpec::new("observation_blob", Text),
                ColumnSpec::new("confidence_num", Real),
                ColumnSpec::new("update_date", Timestamp),
                ColumnSpec::new("download_date", Timestamp),
                ColumnSpec::new("import_date", Timestamp),
                ColumnSpec::new("sourcesystem_cd", Text),
                ColumnSpec::new("upload_id", Integer),
                ColumnSpec::new("text_search_index", Integer),
            ],
        )
    }

    /// Find a column index by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Reject definitions that cannot be turned into a table
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.name.trim().is_empty() {
            return Err(ImportError::Schema("table name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(ImportError::Schema(format!("table {} has no columns", self.name)));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ImportError::Schema(format!(
                    "table {} has a column with an empty name",
                    self.name
                )));
            }
            if !seen.insert(column.name.to_lowercase()) {
                return Err(ImportError::Schema(format!(
                    "table {} declares column {} twice",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for TableSpec {
    fn default() -> Self {
        Self::observation_fact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_roundtrip() {
        for kind in ColumnType::all() {
            let parsed: ColumnType = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_column_type_aliases() {
        assert_eq!(ColumnType::from_str("INT").unwrap(), ColumnType::Integer);
        assert_eq!(ColumnType::from_str("double").unwrap(), ColumnType::Real);
        assert_eq!(ColumnType::from_str("varchar").unwrap(), ColumnType::Text);
        assert_eq!(ColumnType::from_str("date").unwrap(), ColumnType::Timestamp);
        assert!(ColumnType::from_str("blob").is_err());
    }

    #[test]
    fn test_observation_preset_is_valid() {
        let spec = TableSpec::observation_fact();
        spec.validate().unwrap();
        assert_eq!(spec.name, "observation_fact");
        assert_eq!(spec.column_index("PATIENT_NUM"), Some(1));
        assert!(!spec.columns[0].accepts_missing());
        assert!(spec.columns[5].accepts_missing());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let spec = TableSpec::new(
            "t",
            vec![
                ColumnSpec::new("a", ColumnType::Text),
                ColumnSpec::new("A", ColumnType::Integer),
            ],
        );
        assert!(matches!(spec.validate(), Err(ImportError::Schema(_))));

        let empty = TableSpec::new("t", vec![]);
        assert!(matches!(empty.validate(), Err(ImportError::Schema(_))));
    }

    #[test]
    fn test_table_spec_from_toml() {
        let spec: TableSpec = toml::from_str(
            r#"
            name = "patients"

            [[columns]]
            name = "patient_num"
            type = "integer"
            nullable = false

            [[columns]]
            name = "sex_cd"
            type = "varchar"
            default = "U"
            "#,
        )
        .unwrap();

        assert_eq!(spec.columns.len(), 2);
        assert_eq!(spec.columns[0].kind, ColumnType::Integer);
        assert!(!spec.columns[0].nullable);
        assert_eq!(spec.columns[1].kind, ColumnType::Text);
        assert!(spec.columns[1].nullable);
        assert_eq!(spec.columns[1].default.as_deref(), Some("U"));
    }
}
