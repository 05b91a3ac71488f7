use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::import::LoadOptions;
use crate::table::TableSpec;

/// Contents of `factload.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactloadConfig {
    /// Store location (`jdbc:sqlite:...`, `sqlite:...` or a path)
    pub database: Option<String>,
    /// Default source file for `load`
    pub source: Option<String>,
    #[serde(default)]
    pub load: LoadOptions,
    /// Target table; the observation-fact layout when absent
    pub table: Option<TableSpec>,
}

impl FactloadConfig {
    /// The configured table, or the observation-fact preset
    pub fn table_spec(&self) -> TableSpec {
        self.table.clone().unwrap_or_else(TableSpec::observation_fact)
    }

    pub fn database_location(&self) -> String {
        self.database
            .clone()
            .unwrap_or_else(|| default_database_path_in(Path::new(".")).display().to_string())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("factload.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".factload").join("factload.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FactloadConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FactloadConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &FactloadConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Create the parent directory of a file-backed store location
pub fn ensure_db_dir(location: &str) -> anyhow::Result<()> {
    let target = crate::storage::StoreLocation::parse(location)?;
    if let Some(parent) = target.path().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnType, RowPolicy};

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("factload.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factload.toml");
        std::fs::write(
            &path,
            r#"
database = "jdbc:sqlite:/data/HUSH+_UNC_JAX.sqlite"
source = "OBSERVATION_FACT.txt"

[load]
delimiter = "\t"
policy = "skip-row"
null_values = ["", "NULL"]

[table]
name = "observation_fact"

[[table.columns]]
name = "patient_num"
type = "integer"
nullable = false

[[table.columns]]
name = "start_date"
type = "date"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database_location(), "jdbc:sqlite:/data/HUSH+_UNC_JAX.sqlite");
        assert_eq!(config.load.delimiter, Some('\t'));
        assert_eq!(config.load.policy, RowPolicy::SkipRow);
        let spec = config.table_spec();
        assert_eq!(spec.columns.len(), 2);
        assert_eq!(spec.columns[1].kind, ColumnType::Timestamp);
    }

    #[test]
    fn test_defaults_without_sections() {
        let config: FactloadConfig = toml::from_str("").unwrap();
        assert_eq!(config.table_spec(), TableSpec::observation_fact());
        assert_eq!(config.load, LoadOptions::default());
        assert!(config.database_location().ends_with("factload.db"));
    }

    #[test]
    fn test_write_config_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factload.toml");
        let config = FactloadConfig {
            database: Some("facts.db".to_string()),
            table: Some(TableSpec::observation_fact()),
            ..FactloadConfig::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let reloaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(reloaded.database.as_deref(), Some("facts.db"));
        assert_eq!(reloaded.table_spec(), TableSpec::observation_fact());
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("store.db");
        ensure_db_dir(&format!("jdbc:sqlite:{}", db.display())).unwrap();
        assert!(db.parent().unwrap().exists());
        ensure_db_dir(":memory:").unwrap();
    }
}
