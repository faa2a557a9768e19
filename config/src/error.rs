//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while loading or saving a [`MigratorConfig`](crate::MigratorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No database path was configured.
    #[error("no database configured: set `database` in the config file, pass --db, or set MIGRATOR_DB_PATH")]
    MissingDatabase,
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
