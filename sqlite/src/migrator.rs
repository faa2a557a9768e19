//! The migration engine.
//!
//! [`Migrator`] ties a SQLite connection to a validated SQL folder and
//! drives the schema lifecycle:
//!
//! - [`apply_schema_up`](Migrator::apply_schema_up) builds the schema from
//!   the `schema_up` script and seeds the version marker,
//! - [`apply_migrations`](Migrator::apply_migrations) applies every
//!   `<level>.sql` above the marker, one transaction per level,
//! - [`apply_schema_down`](Migrator::apply_schema_down) tears the schema
//!   down and drops the marker,
//! - [`run_script`](Migrator::run_script) runs any other named script.
//!
//! # Example
//!
//! ```no_run
//! use sql_migrator_sqlite::Migrator;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("app.db").unwrap();
//! let mut migrator = Migrator::new(conn, "./sql").unwrap();
//!
//! if !migrator.is_initialised().unwrap() {
//!     migrator.apply_schema_up().unwrap();
//! }
//!
//! let report = migrator.apply_migrations().unwrap();
//! println!("now at version {}", report.final_version());
//! ```

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Params, TransactionBehavior};
use serde::Serialize;
use sql_migrator_core::{
    MigrationFile, SCHEMA_DOWN, SCHEMA_UP, ScriptCatalog, SqlLayout, count_migration_files,
    discover_migrations,
};
use tracing::{debug, info, warn};

use crate::error::{MigratorError, Result};
use crate::version;

/// Applies versioned SQL migrations to a SQLite database.
///
/// Owns the connection, the SQL folder layout, and the script catalog parsed
/// from the schema file at construction. Mutating operations take
/// `&mut self`; each one runs inside its own transaction and either commits
/// in full or leaves the database untouched. The exception is
/// [`apply_migrations`](Self::apply_migrations), which commits level by
/// level and stops at the first failure.
///
/// # Examples
///
/// ```no_run
/// use sql_migrator_core::SqlLayout;
/// use sql_migrator_sqlite::Migrator;
///
/// let layout = SqlLayout::with_names("./db", "scripts.sql", "versions");
/// let migrator = Migrator::open("app.db", layout).unwrap();
///
/// let status = migrator.status().unwrap();
/// println!("pending: {:?}", status.pending);
/// ```
pub struct Migrator {
    conn: Connection,
    layout: SqlLayout,
    catalog: ScriptCatalog,
}

impl Migrator {
    /// Creates a migrator for a SQL folder with the default layout
    /// (`schema.sql` and `migrations/`).
    ///
    /// # Errors
    ///
    /// Returns [`MigratorError::Source`] if the layout is invalid or the
    /// schema file cannot be parsed.
    pub fn new(conn: Connection, sql_folder: impl Into<PathBuf>) -> Result<Self> {
        Self::with_layout(conn, SqlLayout::new(sql_folder))
    }

    /// Creates a migrator for an explicit layout.
    ///
    /// # Errors
    ///
    /// Returns [`MigratorError::Source`] if the layout is invalid or the
    /// schema file cannot be parsed.
    pub fn with_layout(conn: Connection, layout: SqlLayout) -> Result<Self> {
        let catalog = load_catalog(&layout)?;
        Ok(Self {
            conn,
            layout,
            catalog,
        })
    }

    /// Opens (or creates) the SQLite database at `path` and creates a
    /// migrator for `layout`.
    ///
    /// The layout is validated before the database is opened, so a bad SQL
    /// folder never leaves an empty database file behind.
    pub fn open(path: impl AsRef<Path>, layout: SqlLayout) -> Result<Self> {
        let catalog = load_catalog(&layout)?;
        let conn = Connection::open(path.as_ref())
            .map_err(MigratorError::step("open the database"))?;
        Ok(Self {
            conn,
            layout,
            catalog,
        })
    }

    /// Returns `true` if the version table exists.
    pub fn is_initialised(&self) -> Result<bool> {
        version::table_exists(&self.conn)
            .map_err(MigratorError::step("check for the migrations table"))
    }

    /// Counts `<level>.sql` files in the migrations directory.
    pub fn count_migrations(&self) -> Result<usize> {
        Ok(count_migration_files(self.layout.migrations_dir())?)
    }

    /// Reads the applied schema version.
    ///
    /// # Errors
    ///
    /// Returns [`MigratorError::NotInitialised`] if the version table or its
    /// row is missing.
    pub fn current_version(&self) -> Result<u64> {
        read_version(&self.conn)?.ok_or(MigratorError::NotInitialised)
    }

    /// Builds the schema from the `schema_up` script and creates the version
    /// marker, seeded with the number of migration files (the same value as
    /// [`count_migrations`](Self::count_migrations) once discovery accepts
    /// the directory).
    ///
    /// Migration files already present are treated as part of the base
    /// schema, so bootstrapping next to `N` migration files records version
    /// `N` and those files are not applied again. Returns the seeded version.
    ///
    /// # Errors
    ///
    /// - [`MigratorError::ScriptNotFound`] if `schema_up` is missing (no
    ///   database access happens),
    /// - [`MigratorError::Source`] for a malformed or duplicate migration
    ///   file name, raised before the transaction is opened,
    /// - [`MigratorError::AlreadyInitialised`] if the version table exists
    ///   (nothing is changed),
    /// - [`MigratorError::StepFailed`] for a failing step, after which the
    ///   whole transaction is rolled back.
    pub fn apply_schema_up(&mut self) -> Result<u64> {
        let Self {
            conn,
            layout,
            catalog,
        } = self;
        let sql = lookup(catalog, SCHEMA_UP)?;
        // The seed must describe a directory `apply_migrations` will accept.
        let seed = discover_migrations(layout.migrations_dir())?.len() as u64;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(MigratorError::step("begin the schema up transaction"))?;

        if version::table_exists(&tx)
            .map_err(MigratorError::step("check for the migrations table"))?
        {
            return Err(MigratorError::AlreadyInitialised);
        }

        debug!("Executing schema_up");
        tx.execute_batch(sql)
            .map_err(MigratorError::step("execute schema_up"))?;
        version::create_table(&tx).map_err(MigratorError::step("create the migrations table"))?;
        version::write(&tx, seed).map_err(MigratorError::step("seed the schema version"))?;

        tx.commit()
            .map_err(MigratorError::step("commit the schema up transaction"))?;
        info!(version = seed, "Applied schema up");
        Ok(seed)
    }

    /// Runs the `schema_down` script and drops the version table.
    ///
    /// Does not check whether the schema is initialised; dropping a missing
    /// version table is a no-op, but the script itself may fail if it
    /// expects objects to exist.
    ///
    /// # Errors
    ///
    /// Returns [`MigratorError::ScriptNotFound`] if `schema_down` is missing,
    /// or [`MigratorError::StepFailed`] after rolling back.
    pub fn apply_schema_down(&mut self) -> Result<()> {
        let Self { conn, catalog, .. } = self;
        let sql = lookup(catalog, SCHEMA_DOWN)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(MigratorError::step("begin the schema down transaction"))?;

        debug!("Executing schema_down");
        tx.execute_batch(sql)
            .map_err(MigratorError::step("execute schema_down"))?;
        version::drop_table(&tx).map_err(MigratorError::step("drop the migrations table"))?;

        tx.commit()
            .map_err(MigratorError::step("commit the schema down transaction"))?;
        info!("Applied schema down");
        Ok(())
    }

    /// Tears the schema down and builds it up again.
    ///
    /// Equivalent to [`apply_schema_down`](Self::apply_schema_down) followed
    /// by [`apply_schema_up`](Self::apply_schema_up). Returns the seeded
    /// version.
    pub fn reload_schema(&mut self) -> Result<u64> {
        self.apply_schema_down()?;
        self.apply_schema_up()
    }

    /// Applies every migration above the current version, in ascending
    /// numeric order.
    ///
    /// Each level runs in its own transaction together with the version
    /// update, so the marker always names the last fully committed level.
    /// The first failure stops the run; levels committed before it stay
    /// applied and a re-run resumes at the failed level.
    ///
    /// # Errors
    ///
    /// - [`MigratorError::NotInitialised`] if there is no version marker,
    /// - [`MigratorError::Source`] for a malformed or duplicate migration
    ///   file name (raised before any transaction is opened),
    /// - [`MigratorError::MigrationFailed`] naming the level that failed.
    pub fn apply_migrations(&mut self) -> Result<MigrationReport> {
        let starting_version = self.current_version()?;
        info!(version = starting_version, "Current migration level");

        let pending: Vec<MigrationFile> = discover_migrations(self.layout.migrations_dir())?
            .into_iter()
            .filter(|migration| migration.level > starting_version)
            .collect();

        let mut report = MigrationReport {
            starting_version,
            applied: Vec::new(),
        };

        if pending.is_empty() {
            info!("No new migrations");
            return Ok(report);
        }

        for migration in &pending {
            let level = migration.level;
            match self.apply_level(migration) {
                Ok(true) => {
                    info!(level, "Applied migration");
                    report.applied.push(level);
                }
                Ok(false) => {
                    warn!(level, "Migration already applied by a concurrent run, skipping");
                }
                Err(source) => {
                    return Err(MigratorError::MigrationFailed {
                        level,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Applies a single level. Returns `false` if the version moved past
    /// the level since the run started.
    fn apply_level(&mut self, migration: &MigrationFile) -> Result<bool> {
        let sql = migration.read_sql().map_err(MigratorError::Source)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(MigratorError::step("begin the migration transaction"))?;

        let current = read_version(&tx)?.ok_or(MigratorError::NotInitialised)?;
        if current >= migration.level {
            return Ok(false);
        }

        debug!(level = migration.level, path = %migration.path.display(), "Executing migration");
        tx.execute_batch(&sql)
            .map_err(MigratorError::step("execute the migration SQL"))?;
        version::write(&tx, migration.level)
            .map_err(MigratorError::step("update the schema version"))?;
        tx.commit()
            .map_err(MigratorError::step("commit the migration transaction"))?;
        Ok(true)
    }

    /// Runs a named script with no parameters.
    ///
    /// The script may contain several statements.
    ///
    /// # Errors
    ///
    /// Returns [`MigratorError::ScriptNotFound`] if the name is not in the
    /// catalog (the database is not touched), or
    /// [`MigratorError::ScriptFailed`] if execution fails.
    pub fn run_script(&self, name: &str) -> Result<()> {
        let sql = lookup(&self.catalog, name)?;
        debug!(script = name, "Running script");
        self.conn
            .execute_batch(sql)
            .map_err(|source| MigratorError::ScriptFailed {
                name: name.to_string(),
                source,
            })
    }

    /// Runs a named single-statement script, binding `params` positionally
    /// (`?1`, `?2`, …). Returns the number of affected rows.
    ///
    /// An empty parameter list is still a parameterized call: the script must
    /// be a single statement without placeholders.
    ///
    /// # Errors
    ///
    /// Same as [`run_script`](Self::run_script).
    pub fn run_script_with_params<P: Params>(&self, name: &str, params: P) -> Result<usize> {
        let sql = lookup(&self.catalog, name)?;
        debug!(script = name, "Running script with parameters");
        self.conn
            .execute(sql, params)
            .map_err(|source| MigratorError::ScriptFailed {
                name: name.to_string(),
                source,
            })
    }

    /// Levels above the current version, ascending.
    pub fn pending_levels(&self) -> Result<Vec<u64>> {
        let current = self.current_version()?;
        Ok(discover_migrations(self.layout.migrations_dir())?
            .into_iter()
            .map(|migration| migration.level)
            .filter(|level| *level > current)
            .collect())
    }

    /// Returns a snapshot of the migration state.
    ///
    /// Works on an uninitialised database, where every discovered level is
    /// reported as pending.
    pub fn status(&self) -> Result<MigrationStatus> {
        let initialised = self.is_initialised()?;
        let current_version = read_version(&self.conn)?;
        let levels: Vec<u64> = discover_migrations(self.layout.migrations_dir())?
            .into_iter()
            .map(|migration| migration.level)
            .collect();

        let floor = current_version.unwrap_or(0);
        Ok(MigrationStatus {
            initialised,
            current_version,
            migration_files: levels.len(),
            latest_level: levels.last().copied(),
            pending: levels.into_iter().filter(|level| *level > floor).collect(),
        })
    }

    /// The parsed script catalog.
    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    /// The validated SQL folder layout.
    pub fn layout(&self) -> &SqlLayout {
        &self.layout
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migrator and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

fn load_catalog(layout: &SqlLayout) -> Result<ScriptCatalog> {
    layout.validate()?;
    Ok(ScriptCatalog::from_file(layout.schema_file())?)
}

fn lookup<'a>(catalog: &'a ScriptCatalog, name: &str) -> Result<&'a str> {
    catalog
        .get(name)
        .ok_or_else(|| MigratorError::ScriptNotFound(name.to_string()))
}

fn read_version(conn: &Connection) -> Result<Option<u64>> {
    version::read(conn).map_err(MigratorError::step("read the schema version"))
}

/// Outcome of [`Migrator::apply_migrations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Version recorded before the run.
    pub starting_version: u64,
    /// Levels committed during the run, ascending.
    pub applied: Vec<u64>,
}

impl MigrationReport {
    /// Version recorded after the run.
    pub fn final_version(&self) -> u64 {
        self.applied.last().copied().unwrap_or(self.starting_version)
    }

    /// Returns `true` if nothing was applied.
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Snapshot of the migration state.
///
/// Returned by [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Whether the version table exists.
    pub initialised: bool,
    /// Recorded version, if the marker row exists.
    pub current_version: Option<u64>,
    /// Number of migration files found.
    pub migration_files: usize,
    /// Highest level found on disk.
    pub latest_level: Option<u64>,
    /// Levels above the recorded version, ascending.
    pub pending: Vec<u64>,
}
