//! Versioned SQL migrations for SQLite.
//!
//! This crate applies a directory of numbered SQL files to a SQLite
//! database and tracks the applied level in a single-row `migrations`
//! table. It also bootstraps and tears down the base schema from named
//! scripts, and runs ad hoc named scripts outside the migration sequence.
//!
//! # Architecture
//!
//! - **`migrator`**: the [`Migrator`] engine and its report types
//! - **`version`**: the version marker table (create/read/upsert/drop)
//!
//! SQL sources (layout, script catalog, migration discovery) come from
//! [`sql_migrator_core`].
//!
//! # Quick start
//!
//! ```no_run
//! use sql_migrator_sqlite::Migrator;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("app.db").unwrap();
//! let mut migrator = Migrator::new(conn, "./sql").unwrap();
//!
//! migrator.apply_schema_up().unwrap();
//! let report = migrator.apply_migrations().unwrap();
//! for level in &report.applied {
//!     println!("applied {level}");
//! }
//!
//! migrator.run_script_with_params("rename_user", rusqlite::params![1, "ada"]).unwrap();
//! ```
//!
//! # Concurrency
//!
//! Every transaction is opened with `BEGIN IMMEDIATE`, and each level
//! re-reads the version inside its own transaction before running, so two
//! processes migrating the same database file do not apply a level twice.
//! This is not a general locking scheme; callers are still expected to run
//! one migrator at a time.

mod error;
mod migrator;
mod version;

pub use error::{MigratorError, Result};
pub use migrator::{MigrationReport, MigrationStatus, Migrator};
pub use version::VERSION_TABLE;
