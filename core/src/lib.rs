//! On-disk SQL sources for the migrator.
//!
//! This crate knows nothing about databases. It covers the three things a
//! migrator reads from disk:
//!
//! - [`SqlLayout`]: the SQL root folder, its schema file, and its
//!   migrations directory, with fail-fast validation.
//! - [`ScriptCatalog`]: the named scripts (`schema_up`, `schema_down`, and
//!   any custom ones) parsed from the schema file.
//! - [`discover_migrations`]: the numbered `<level>.sql` files, validated
//!   and sorted by level.
//!
//! # Example
//!
//! ```no_run
//! use sql_migrator_core::{discover_migrations, ScriptCatalog, SqlLayout};
//!
//! let layout = SqlLayout::new("./sql");
//! layout.validate().unwrap();
//!
//! let catalog = ScriptCatalog::from_file(layout.schema_file()).unwrap();
//! assert!(catalog.contains("schema_up"));
//!
//! for migration in discover_migrations(layout.migrations_dir()).unwrap() {
//!     println!("{} -> {}", migration.level, migration.path.display());
//! }
//! ```

mod catalog;
mod discovery;
mod error;
mod layout;

pub use catalog::{SCHEMA_DOWN, SCHEMA_UP, ScriptCatalog};
pub use discovery::{
    MigrationFile, count_migration_files, discover_migrations, is_migration_name, parse_level,
};
pub use error::{Result, SourceError};
pub use layout::{DEFAULT_MIGRATIONS_DIR, DEFAULT_SCHEMA_FILE, SqlLayout};
