//! Error types for reading the on-disk SQL sources.
//!
//! Covers layout validation, schema file parsing, and migration file
//! discovery. None of these touch the database.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading SQL sources from disk.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The SQL folder, schema file, or migrations directory is missing or
    /// has the wrong file type.
    #[error("invalid SQL folder layout: {0}")]
    Layout(String),

    /// The named-script schema file is malformed.
    #[error("failed to parse schema file at line {line}: {message}")]
    CatalogParse {
        /// 1-based line number of the offending line.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// A `*.sql` entry in the migrations directory does not carry a valid
    /// positive integer level.
    #[error("invalid migration filename '{0}': expected '<positive integer>.sql'")]
    FilenameParse(String),

    /// Two migration files resolve to the same level.
    #[error("duplicate migration level {level}: '{}' and '{}'", first.display(), second.display())]
    DuplicateLevel {
        level: u64,
        first: PathBuf,
        second: PathBuf,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results with [`SourceError`].
pub type Result<T> = std::result::Result<T, SourceError>;
