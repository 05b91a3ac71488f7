//! Observation fact loader

use std::path::{Path, PathBuf};

use crate::ImportError;
use crate::storage::StoreConnection;
use crate::table::TableSpec;
use super::{ImportReport, LoadOptions, TableImporter, TableLoader};

/// Loads an observation fact file (e.g. `OBSERVATION_FACT.txt`).
///
/// Defaults to the i2b2 `observation_fact` layout; `with_table` swaps in a
/// definition from configuration.
pub struct ObservationLoader<'c> {
    inner: TableLoader<'c>,
}

impl<'c> ObservationLoader<'c> {
    pub const TABLE: &'static str = "observation_fact";

    pub fn new(store: &'c mut StoreConnection, source: impl Into<PathBuf>) -> Self {
        Self {
            inner: TableLoader::new(store, source, TableSpec::observation_fact()),
        }
    }

    pub fn with_table(self, spec: TableSpec) -> Self {
        Self {
            inner: self.inner.with_table(spec),
        }
    }

    pub fn with_options(self, options: LoadOptions) -> Self {
        Self {
            inner: self.inner.with_options(options),
        }
    }

    pub fn source(&self) -> &Path {
        self.inner.source()
    }
}

impl TableImporter for ObservationLoader<'_> {
    fn target_table(&self) -> &str {
        self.inner.target_table()
    }

    fn load(&mut self) -> Result<ImportReport, ImportError> {
        self.inner.load()
    }
}
