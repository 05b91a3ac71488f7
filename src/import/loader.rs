//! Config-driven table loader

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::params_from_iter;

use crate::storage::StoreConnection;
use crate::storage::schema;
use crate::table::TableSpec;
use crate::{ConnectionError, ImportError};
use super::reader::{DelimitedSource, SourceRow};
use super::{ImportReport, LoadOptions, RejectedRow, RowPolicy, TableImporter};

const PROGRESS_EVERY: usize = 100_000;

/// Loads one delimited file into the table described by a `TableSpec`.
///
/// The whole load runs in one transaction, table creation included, so a
/// failed load leaves the store as it found it.
pub struct TableLoader<'c> {
    store: &'c mut StoreConnection,
    source: PathBuf,
    spec: TableSpec,
    options: LoadOptions,
}

impl<'c> TableLoader<'c> {
    pub fn new(store: &'c mut StoreConnection, source: impl Into<PathBuf>, spec: TableSpec) -> Self {
        Self {
            store,
            source: source.into(),
            spec,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_table(mut self, spec: TableSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn table(&self) -> &TableSpec {
        &self.spec
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }
}

impl TableImporter for TableLoader<'_> {
    fn target_table(&self) -> &str {
        &self.spec.name
    }

    fn load(&mut self) -> Result<ImportReport, ImportError> {
        if self.store.is_closed() {
            return Err(ConnectionError::Closed.into());
        }
        self.spec.validate()?;

        let started = Instant::now();
        let mut source = DelimitedSource::open(&self.source, &self.spec, &self.options)?;
        let mut report = ImportReport::new(&self.spec.name, &self.source);

        tracing::info!(
            "Loading {} into {} ({})",
            self.source.display(),
            self.spec.name,
            self.options.policy
        );

        let tx = self.store.connection_mut()?.transaction()?;

        if self.options.create_table {
            tx.execute(&schema::create_table_sql(&self.spec), [])?;
        }

        {
            let mut stmt = tx.prepare(&schema::insert_sql(&self.spec))?;

            while let Some(row) = source.next_row() {
                report.rows_read += 1;
                match row? {
                    SourceRow::Valid { values, .. } => {
                        stmt.execute(params_from_iter(values.iter()))?;
                        report.rows_inserted += 1;
                        if report.rows_inserted % PROGRESS_EVERY == 0 {
                            tracing::debug!("{} rows inserted into {}", report.rows_inserted, self.spec.name);
                        }
                    }
                    SourceRow::Malformed { line, reason } => match self.options.policy {
                        RowPolicy::RejectAll => {
                            return Err(ImportError::MalformedRow { line, reason });
                        }
                        RowPolicy::SkipRow => {
                            skip_row(&self.options, &self.source, &mut report, line, reason)?
                        }
                    },
                }
            }
        }

        tx.commit()?;

        tracing::info!(
            "Loaded {} rows into {} in {:?} ({} rejected)",
            report.rows_inserted,
            report.table,
            started.elapsed(),
            report.rows_rejected()
        );
        Ok(report)
    }
}

/// Record a skipped row, enforcing `max_rejected`
fn skip_row(
    options: &LoadOptions,
    source: &Path,
    report: &mut ImportReport,
    line: u64,
    reason: String,
) -> Result<(), ImportError> {
    tracing::warn!("Skipping line {} of {}: {}", line, source.display(), reason);
    report.rejected.push(RejectedRow { line, reason });

    match options.max_rejected {
        Some(limit) if report.rejected.len() > limit => Err(ImportError::TooManyRejected { limit }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnSpec, ColumnType};
    use std::io::Write;

    fn facts_spec() -> TableSpec {
        TableSpec::new(
            "facts",
            vec![
                ColumnSpec::new("id", ColumnType::Integer).not_null(),
                ColumnSpec::new("label", ColumnType::Text),
            ],
        )
    }

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn labels(store: &StoreConnection) -> Vec<String> {
        let conn = store.connection().unwrap();
        let mut stmt = conn.prepare("SELECT label FROM facts ORDER BY rowid").unwrap();
        let labels = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        labels
    }

    #[test]
    fn test_load_appends_rows_in_order() {
        let file = write_source("id,label\n1,a\n2,b\n3,c\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();

        let report = TableLoader::new(&mut store, file.path(), facts_spec())
            .load()
            .unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_inserted, 3);
        assert!(report.rejected.is_empty());
        assert_eq!(labels(&store), vec!["a", "b", "c"]);

        // A second load appends to the existing table
        TableLoader::new(&mut store, file.path(), facts_spec())
            .load()
            .unwrap();
        assert_eq!(store.count_rows("facts").unwrap(), 6);
    }

    #[test]
    fn test_reject_all_rolls_back() {
        let file = write_source("id,label\n1,a\nx,b\n3,c\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();

        let result = TableLoader::new(&mut store, file.path(), facts_spec()).load();
        assert!(matches!(result, Err(ImportError::MalformedRow { line: 3, .. })));
        assert!(!store.table_exists("facts").unwrap());
    }

    #[test]
    fn test_skip_row_keeps_good_rows() {
        let file = write_source("id,label\n1,a\nx,b\n3,c\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();
        let options = LoadOptions {
            policy: RowPolicy::SkipRow,
            ..LoadOptions::default()
        };

        let report = TableLoader::new(&mut store, file.path(), facts_spec())
            .with_options(options)
            .load()
            .unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_inserted, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(labels(&store), vec!["a", "c"]);
    }

    #[test]
    fn test_max_rejected_aborts() {
        let file = write_source("id,label\nx,a\ny,b\n3,c\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();
        let options = LoadOptions {
            policy: RowPolicy::SkipRow,
            max_rejected: Some(1),
            ..LoadOptions::default()
        };

        let result = TableLoader::new(&mut store, file.path(), facts_spec())
            .with_options(options)
            .load();
        assert!(matches!(result, Err(ImportError::TooManyRejected { limit: 1 })));
        assert!(!store.table_exists("facts").unwrap());
    }

    #[test]
    fn test_invalid_utf8_row_follows_policy() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"id,label\n1,a\n2,\xff\xfe\n3,c\n").unwrap();
        file.flush().unwrap();

        let mut store = StoreConnection::connect(":memory:").unwrap();
        let result = TableLoader::new(&mut store, file.path(), facts_spec()).load();
        assert!(matches!(result, Err(ImportError::MalformedRow { line: 3, .. })));
        assert!(!store.table_exists("facts").unwrap());

        let options = LoadOptions {
            policy: RowPolicy::SkipRow,
            ..LoadOptions::default()
        };
        let report = TableLoader::new(&mut store, file.path(), facts_spec())
            .with_options(options)
            .load()
            .unwrap();
        assert_eq!(report.rows_inserted, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(labels(&store), vec!["a", "c"]);
    }

    #[test]
    fn test_stray_quote_does_not_swallow_rows() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"id\tlabel\n1\t\"said hi\n2\tb\n3\tc\n").unwrap();
        file.flush().unwrap();

        let mut store = StoreConnection::connect(":memory:").unwrap();
        let options = LoadOptions {
            policy: RowPolicy::SkipRow,
            ..LoadOptions::default()
        };
        let report = TableLoader::new(&mut store, file.path(), facts_spec())
            .with_options(options)
            .load()
            .unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_inserted, 3);
        assert!(report.rejected.is_empty());
        assert_eq!(labels(&store), vec!["\"said hi", "b", "c"]);
    }

    #[test]
    fn test_missing_table_without_create() {
        let file = write_source("id,label\n1,a\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();
        let options = LoadOptions {
            create_table: false,
            ..LoadOptions::default()
        };

        let result = TableLoader::new(&mut store, file.path(), facts_spec())
            .with_options(options)
            .load();
        assert!(matches!(result, Err(ImportError::Write(_))));
    }

    #[test]
    fn test_load_on_closed_store() {
        let file = write_source("id,label\n1,a\n");
        let mut store = StoreConnection::connect(":memory:").unwrap();
        store.close().unwrap();

        let result = TableLoader::new(&mut store, file.path(), facts_spec()).load();
        assert!(matches!(
            result,
            Err(ImportError::Connection(ConnectionError::Closed))
        ));
    }

    #[test]
    fn test_invalid_spec_is_rejected_before_reading() {
        let mut store = StoreConnection::connect(":memory:").unwrap();
        let result = TableLoader::new(&mut store, "does-not-matter.csv", TableSpec::new("", vec![])).load();
        assert!(matches!(result, Err(ImportError::Schema(_))));
    }

    #[test]
    fn test_target_table_and_accessors() {
        let mut store = StoreConnection::connect(":memory:").unwrap();
        let loader = TableLoader::new(&mut store, "facts.csv", facts_spec())
            .with_table(TableSpec::observation_fact());
        assert_eq!(loader.target_table(), "observation_fact");
        assert_eq!(loader.source(), Path::new("facts.csv"));
        assert_eq!(loader.options().policy, RowPolicy::RejectAll);
    }
}
