//! Configuration for the SQL migrator.
//!
//! A [`MigratorConfig`] names the SQLite database and the SQL folder layout.
//! It is usually loaded from YAML and then overridden by flags:
//!
//! ```no_run
//! use std::path::PathBuf;
//! use sql_migrator_config::MigratorConfig;
//!
//! let config = MigratorConfig::load(".migrator.yml")
//!     .unwrap()
//!     .with_database(Some(PathBuf::from("app.db")));
//!
//! let layout = config.layout();
//! layout.validate().unwrap();
//! println!("migrating {}", config.database_path().unwrap().display());
//! ```

mod config;
mod error;

pub use config::{DEFAULT_SQL_FOLDER, MigratorConfig};
pub use error::{ConfigError, Result};
