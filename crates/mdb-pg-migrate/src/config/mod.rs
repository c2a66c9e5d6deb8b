//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source:").unwrap();
        writeln!(file, "  file: data.mdb").unwrap();
        writeln!(file, "target:").unwrap();
        writeln!(file, "  host: localhost").unwrap();
        writeln!(file, "  database: inventory").unwrap();
        writeln!(file, "  user: postgres").unwrap();
        writeln!(file, "  password: secret").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.source.file.to_str().unwrap(), "data.mdb");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("no_such_config.yaml").unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
source:
  file: legacy/inventory.mdb
target:
  host: localhost
  database: inventory
  user: postgres
  password: secret
migration:
  target_mode: truncate
  create_indexes: false
  exclude_tables:
    - TempImport
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.file.to_str().unwrap(), "legacy/inventory.mdb");
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.schema, "public");
        assert_eq!(config.migration.target_mode, TargetMode::Truncate);
        assert!(!config.migration.create_indexes);
        assert_eq!(config.migration.exclude_tables, vec!["TempImport"]);
        assert_eq!(config.migration.chunk_bytes, 64 * 1024);
    }

    #[test]
    fn test_from_yaml_defaults() {
        let yaml = r#"
source:
  file: data.mdb
target:
  host: db.internal
  database: xopti
  user: marche
  password: pw
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.target_mode, TargetMode::DropRecreate);
        assert!(config.migration.create_indexes);
        assert!(config.migration.exclude_tables.is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_bad_mode() {
        let yaml = r#"
source:
  file: data.mdb
target:
  host: db.internal
  database: xopti
  user: marche
  password: pw
migration:
  target_mode: upsert
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }
}
