//! Version marker storage.
//!
//! The applied schema version lives in a single-row table:
//!
//! ```sql
//! CREATE TABLE migrations (id INTEGER PRIMARY KEY, version INTEGER NOT NULL);
//! ```
//!
//! The row always has `id = 1` and is only ever written through an upsert,
//! so the table never holds more than one row. Writers pass a
//! [`Transaction`](rusqlite::Transaction) (which derefs to [`Connection`]) so
//! the marker moves together with the SQL it describes.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

/// Name of the version marker table.
pub const VERSION_TABLE: &str = "migrations";

const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
);";

const UPSERT_SQL: &str = "INSERT INTO migrations (id, version) VALUES (1, ?1)
ON CONFLICT (id) DO UPDATE SET version = excluded.version;";

const DROP_SQL: &str = "DROP TABLE IF EXISTS migrations;";

/// Returns `true` if the version table exists.
pub(crate) fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [VERSION_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Reads the current version, or `None` when the table or its row is missing.
///
/// A negative stored version is a conversion error, never a version.
pub(crate) fn read(conn: &Connection) -> rusqlite::Result<Option<u64>> {
    if !table_exists(conn)? {
        return Ok(None);
    }
    let version: Option<i64> = conn
        .query_row("SELECT version FROM migrations WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    version
        .map(|v| {
            u64::try_from(v)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
        })
        .transpose()
}

pub(crate) fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_SQL)
}

/// Sets the version, inserting the row if it does not exist yet.
pub(crate) fn write(conn: &Connection, version: u64) -> rusqlite::Result<()> {
    let version = i64::try_from(version).map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(e))
    })?;
    conn.execute(UPSERT_SQL, params![version])?;
    Ok(())
}

pub(crate) fn drop_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(DROP_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!table_exists(&conn).unwrap());
        assert_eq!(read(&conn).unwrap(), None);
    }

    #[test]
    fn test_read_missing_row() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        assert!(table_exists(&conn).unwrap());
        assert_eq!(read(&conn).unwrap(), None);
    }

    #[test]
    fn test_upsert_keeps_single_row() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        write(&conn, 3).unwrap();
        write(&conn, 7).unwrap();
        assert_eq!(read(&conn).unwrap(), Some(7));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_create_and_drop_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        create_table(&conn).unwrap();
        drop_table(&conn).unwrap();
        drop_table(&conn).unwrap();
        assert!(!table_exists(&conn).unwrap());
    }

    #[test]
    fn test_write_rolls_back_with_transaction() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        write(&conn, 1).unwrap();

        let tx = conn.transaction().unwrap();
        write(&tx, 2).unwrap();
        drop(tx);

        assert_eq!(read(&conn).unwrap(), Some(1));
    }

    #[test]
    fn test_read_rejects_negative_version() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        conn.execute("INSERT INTO migrations (id, version) VALUES (1, -1)", [])
            .unwrap();

        let err = read(&conn).unwrap_err();
        assert!(matches!(
            err,
            rusqlite::Error::FromSqlConversionFailure(_, Type::Integer, _)
        ));
    }

    #[test]
    fn test_write_rejects_out_of_range() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        assert!(write(&conn, u64::MAX).is_err());
    }
}
