//! Error types for migrator operations.
//!
//! Provides a unified error type covering SQL source problems, lifecycle
//! state errors, and database failures. Database failures always carry the
//! step, migration level, or script name they happened in.

use sql_migrator_core::SourceError;
use thiserror::Error;

/// Errors that can occur during migrator operations.
#[derive(Debug, Error)]
pub enum MigratorError {
    /// Layout, schema file, or migration file problem.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// `schema up` was attempted on a database that already has a
    /// version table.
    #[error("schema is already initialised (the migrations table exists)")]
    AlreadyInitialised,

    /// The version table or its row is missing; run `schema up` first.
    #[error("schema is not initialised (no migrations version found); apply the schema first")]
    NotInitialised,

    /// Named script is not present in the schema file.
    #[error("SQL script '{0}' not found in schema file")]
    ScriptNotFound(String),

    /// A named lifecycle step failed.
    #[error("failed to {step}: {source}")]
    StepFailed {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Applying a single migration level failed; earlier levels remain
    /// committed.
    #[error("migration {level} failed: {source}")]
    MigrationFailed {
        level: u64,
        #[source]
        source: Box<MigratorError>,
    },

    /// Executing a named script failed.
    #[error("script '{name}' failed: {source}")]
    ScriptFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl MigratorError {
    /// Returns the migration level this error is attributed to, if any.
    pub fn failed_level(&self) -> Option<u64> {
        match self {
            Self::MigrationFailed { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub(crate) fn step(step: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::StepFailed { step, source }
    }
}

/// Convenience alias for results with [`MigratorError`].
pub type Result<T> = std::result::Result<T, MigratorError>;
