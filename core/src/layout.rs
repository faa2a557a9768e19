//! SQL folder layout validation.
//!
//! A migrator works against a single SQL root folder holding a named-script
//! schema file and a directory of numbered migration files:
//!
//! ```text
//! <root>/schema.sql
//! <root>/migrations/1.sql
//! <root>/migrations/2.sql
//! ```
//!
//! [`SqlLayout::validate`] checks that this shape exists before any database
//! work is attempted.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SourceError};

/// Default name of the named-script schema file.
pub const DEFAULT_SCHEMA_FILE: &str = "schema.sql";

/// Default name of the migrations directory.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Paths making up a SQL root folder.
///
/// Construction does not touch the filesystem; call
/// [`validate`](Self::validate) to check the paths.
///
/// # Examples
///
/// ```
/// use sql_migrator_core::SqlLayout;
///
/// let layout = SqlLayout::new("./sql");
/// assert!(layout.schema_file().ends_with("schema.sql"));
/// assert!(layout.migrations_dir().ends_with("migrations"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLayout {
    root: PathBuf,
    schema_file: PathBuf,
    migrations_dir: PathBuf,
}

impl SqlLayout {
    /// Creates a layout with the default `schema.sql` and `migrations/` names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_names(root, DEFAULT_SCHEMA_FILE, DEFAULT_MIGRATIONS_DIR)
    }

    /// Creates a layout with custom schema file and migrations directory names,
    /// both relative to `root`.
    pub fn with_names(
        root: impl Into<PathBuf>,
        schema_file: impl AsRef<Path>,
        migrations_dir: impl AsRef<Path>,
    ) -> Self {
        let root = root.into();
        Self {
            schema_file: root.join(schema_file),
            migrations_dir: root.join(migrations_dir),
            root,
        }
    }

    /// The SQL root folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the schema file.
    pub fn schema_file(&self) -> &Path {
        &self.schema_file
    }

    /// Full path of the migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Checks that the root and migrations directory are directories and the
    /// schema file is a regular file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Layout`] naming the first path that is missing
    /// or has the wrong type.
    pub fn validate(&self) -> Result<()> {
        expect_dir(&self.root, "SQL folder")?;
        expect_file(&self.schema_file, "schema file")?;
        expect_dir(&self.migrations_dir, "migrations directory")?;
        Ok(())
    }
}

fn expect_dir(path: &Path, what: &str) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SourceError::Layout(format!(
            "{what} '{}' is not a directory",
            path.display()
        ))),
        Err(e) => Err(SourceError::Layout(format!(
            "{what} '{}' is not accessible: {e}",
            path.display()
        ))),
    }
}

fn expect_file(path: &Path, what: &str) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(SourceError::Layout(format!(
            "{what} '{}' is not a regular file",
            path.display()
        ))),
        Err(e) => Err(SourceError::Layout(format!(
            "{what} '{}' is not accessible: {e}",
            path.display()
        ))),
    }
}
