//! Migrator configuration.
//!
//! Defines the YAML-serializable settings that tell the migrator which
//! database to open and where its SQL sources live. Every field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! database: ./data/app.db
//! sql_folder: ./sql/
//! schema_file: schema.sql
//! migrations_dir: migrations
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sql_migrator_core::{DEFAULT_MIGRATIONS_DIR, DEFAULT_SCHEMA_FILE, SqlLayout};

use crate::error::{ConfigError, Result};

/// Default SQL root folder.
pub const DEFAULT_SQL_FOLDER: &str = "./sql/";

/// Top-level migrator configuration.
///
/// Loaded from a YAML file (typically `.migrator.yml`), then overridden by
/// command-line flags or environment variables.
///
/// # Examples
///
/// ```
/// use sql_migrator_config::MigratorConfig;
///
/// let config: MigratorConfig = serde_yaml::from_str("database: app.db\n").unwrap();
/// assert_eq!(config.sql_folder.to_str(), Some("./sql/"));
/// assert!(config.layout().schema_file().ends_with("schema.sql"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    /// SQLite database file to migrate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// SQL root folder holding the schema file and migrations directory.
    pub sql_folder: PathBuf,
    /// Schema file name, relative to `sql_folder`.
    pub schema_file: String,
    /// Migrations directory name, relative to `sql_folder`.
    pub migrations_dir: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            database: None,
            sql_folder: PathBuf::from(DEFAULT_SQL_FOLDER),
            schema_file: DEFAULT_SCHEMA_FILE.to_string(),
            migrations_dir: DEFAULT_MIGRATIONS_DIR.to_string(),
        }
    }
}

impl MigratorConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be read,
    /// or [`YamlError`](ConfigError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        // An empty document deserializes to `None` rather than an empty map.
        let config: Option<Self> = serde_yaml::from_reader(reader)?;
        Ok(config.unwrap_or_default())
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Replaces the database path when `database` is `Some`.
    pub fn with_database(mut self, database: Option<PathBuf>) -> Self {
        if database.is_some() {
            self.database = database;
        }
        self
    }

    /// Replaces the SQL folder when `sql_folder` is `Some`.
    pub fn with_sql_folder(mut self, sql_folder: Option<PathBuf>) -> Self {
        if let Some(sql_folder) = sql_folder {
            self.sql_folder = sql_folder;
        }
        self
    }

    /// Returns the configured database path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabase`] if none is set.
    pub fn database_path(&self) -> Result<&Path> {
        self.database.as_deref().ok_or(ConfigError::MissingDatabase)
    }

    /// Builds the (unvalidated) SQL layout described by this configuration.
    pub fn layout(&self) -> SqlLayout {
        SqlLayout::with_names(&self.sql_folder, &self.schema_file, &self.migrations_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
database: /var/lib/app/app.db
sql_folder: /srv/app/sql
schema_file: db.sql
migrations_dir: changes
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: MigratorConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/var/lib/app/app.db")));
        assert_eq!(config.sql_folder, PathBuf::from("/srv/app/sql"));
        assert_eq!(config.schema_file, "db.sql");
        assert_eq!(config.migrations_dir, "changes");

        let layout = config.layout();
        assert_eq!(layout.schema_file(), Path::new("/srv/app/sql/db.sql"));
        assert_eq!(layout.migrations_dir(), Path::new("/srv/app/sql/changes"));
    }

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: MigratorConfig = serde_yaml::from_str("database: app.db\n").unwrap();
        assert_eq!(config.sql_folder, PathBuf::from(DEFAULT_SQL_FOLDER));
        assert_eq!(config.schema_file, "schema.sql");
        assert_eq!(config.migrations_dir, "migrations");
    }

    #[test]
    fn test_database_path_required() {
        let config = MigratorConfig::default();
        assert!(matches!(
            config.database_path(),
            Err(ConfigError::MissingDatabase)
        ));

        let config = config.with_database(Some(PathBuf::from("app.db")));
        assert_eq!(config.database_path().unwrap(), Path::new("app.db"));
    }

    #[test]
    fn test_overrides_only_replace_when_present() {
        let config: MigratorConfig = serde_yaml::from_str(sample_yaml()).unwrap();

        let unchanged = config.clone().with_database(None).with_sql_folder(None);
        assert_eq!(unchanged, config);

        let changed = config
            .with_database(Some(PathBuf::from("other.db")))
            .with_sql_folder(Some(PathBuf::from("other/sql")));
        assert_eq!(changed.database, Some(PathBuf::from("other.db")));
        assert_eq!(changed.sql_folder, PathBuf::from("other/sql"));
        assert_eq!(changed.schema_file, "db.sql");
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrator.yml");

        let original: MigratorConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = MigratorConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrator.yml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(MigratorConfig::load(&path).unwrap(), MigratorConfig::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MigratorConfig::load(dir.path().join("missing.yml")),
            Err(ConfigError::IoError(_))
        ));

        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "sql_folder: [unclosed\n").unwrap();
        assert!(matches!(
            MigratorConfig::load(&path),
            Err(ConfigError::YamlError(_))
        ));
    }
}
