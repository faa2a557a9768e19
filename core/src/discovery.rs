//! Migration file discovery.
//!
//! Lists a migrations directory and turns every `<level>.sql` file into a
//! [`MigrationFile`]. Discovery is strict: a `*.sql` name whose stem is not a
//! positive integer aborts the scan instead of being skipped, so a typo can
//! never silently leave a gap in the applied sequence. Names with additional
//! dot-separated segments (`3.down.sql`, `notes.v2.sql`) are not migrations
//! and are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Result, SourceError};

static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.sql$").expect("static regex must compile"));

/// A numbered migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Migration ordinal parsed from the file name.
    pub level: u64,
    /// Full path of the file.
    pub path: PathBuf,
}

impl MigrationFile {
    /// Reads the file's SQL.
    pub fn read_sql(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// Parses the level out of a migration file name.
///
/// Returns `Ok(None)` for names that are not migration candidates (no `.sql`
/// suffix, or extra dot-separated segments).
///
/// # Errors
///
/// Returns [`SourceError::FilenameParse`] when the name is a candidate
/// (`<stem>.sql` with a dot-free stem) but the stem is not a positive integer.
///
/// # Examples
///
/// ```
/// use sql_migrator_core::parse_level;
///
/// assert_eq!(parse_level("12.sql").unwrap(), Some(12));
/// assert_eq!(parse_level("README.md").unwrap(), None);
/// assert_eq!(parse_level("3.down.sql").unwrap(), None);
/// assert!(parse_level("abc.sql").is_err());
/// ```
pub fn parse_level(file_name: &str) -> Result<Option<u64>> {
    let Some(stem) = file_name.strip_suffix(".sql") else {
        return Ok(None);
    };
    if stem.contains('.') {
        return Ok(None);
    }

    let level = LEVEL_RE
        .captures(file_name)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .filter(|level| *level > 0)
        .ok_or_else(|| SourceError::FilenameParse(file_name.to_string()))?;
    Ok(Some(level))
}

/// Returns `true` if the name is `<level>.sql` with a valid positive level.
///
/// Agrees with [`parse_level`]: `0.sql` and names whose number overflows
/// `u64` are not migration names.
pub fn is_migration_name(file_name: &str) -> bool {
    matches!(parse_level(file_name), Ok(Some(_)))
}

/// Discovers all migration files in `dir`, sorted by ascending level.
///
/// Only regular files directly inside `dir` are considered.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be listed,
/// [`SourceError::FilenameParse`] for a malformed `*.sql` name, or
/// [`SourceError::DuplicateLevel`] when two files share a level
/// (e.g. `1.sql` and `01.sql`).
pub fn discover_migrations(dir: impl AsRef<Path>) -> Result<Vec<MigrationFile>> {
    let dir = dir.as_ref();
    let mut by_level: BTreeMap<u64, PathBuf> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(level) = parse_level(name)? else {
            continue;
        };

        let path = entry.path();
        if let Some(first) = by_level.get(&level) {
            let (first, second) = if first <= &path {
                (first.clone(), path)
            } else {
                (path, first.clone())
            };
            return Err(SourceError::DuplicateLevel {
                level,
                first,
                second,
            });
        }
        by_level.insert(level, path);
    }

    debug!(dir = %dir.display(), count = by_level.len(), "Discovered migrations");
    Ok(by_level
        .into_iter()
        .map(|(level, path)| MigrationFile { level, path })
        .collect())
}

/// Counts files in `dir` accepted by [`is_migration_name`].
///
/// Unlike [`discover_migrations`] this never fails on a malformed name or a
/// duplicate level; it only answers how many migration files are present.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be listed.
pub fn count_migration_files(dir: impl AsRef<Path>) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_migration_name) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, sql: &str) {
        fs::write(dir.join(name), sql).unwrap();
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("1.sql").unwrap(), Some(1));
        assert_eq!(parse_level("007.sql").unwrap(), Some(7));
        assert_eq!(parse_level("1.txt").unwrap(), None);
        assert_eq!(parse_level("1.sql.bak").unwrap(), None);
        assert_eq!(parse_level("1.up.sql").unwrap(), None);
    }

    #[test]
    fn test_parse_level_rejects_bad_stems() {
        for name in ["abc.sql", "1a.sql", "-1.sql", ".sql", "0.sql", " 1.sql", "99999999999999999999999.sql"] {
            let err = parse_level(name).unwrap_err();
            assert!(
                matches!(err, SourceError::FilenameParse(ref n) if n == name),
                "expected parse failure for {name}"
            );
        }
    }

    #[test]
    fn test_discover_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "10.sql", "SELECT 10;");
        touch(dir.path(), "2.sql", "SELECT 2;");
        touch(dir.path(), "1.sql", "SELECT 1;");
        touch(dir.path(), "README.md", "");
        touch(dir.path(), "2.down.sql", "");
        fs::create_dir(dir.path().join("3.sql")).unwrap();

        let files = discover_migrations(dir.path()).unwrap();
        let levels: Vec<u64> = files.iter().map(|f| f.level).collect();
        assert_eq!(levels, vec![1, 2, 10]);
        assert_eq!(files[2].read_sql().unwrap(), "SELECT 10;");
    }

    #[test]
    fn test_discover_aborts_on_bad_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1.sql", "");
        touch(dir.path(), "abc.sql", "");
        let err = discover_migrations(dir.path()).unwrap_err();
        assert!(matches!(err, SourceError::FilenameParse(ref n) if n == "abc.sql"));
    }

    #[test]
    fn test_discover_duplicate_level() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1.sql", "");
        touch(dir.path(), "01.sql", "");
        let err = discover_migrations(dir.path()).unwrap_err();
        match err {
            SourceError::DuplicateLevel { level, first, second } => {
                assert_eq!(level, 1);
                assert!(first.ends_with("01.sql"));
                assert!(second.ends_with("1.sql"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_migrations(dir.path()).unwrap().is_empty());
        let err = discover_migrations(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_is_migration_name_agrees_with_parse_level() {
        assert!(is_migration_name("1.sql"));
        assert!(is_migration_name("01.sql"));
        assert!(!is_migration_name("0.sql"));
        assert!(!is_migration_name("99999999999999999999999.sql"));
        assert!(!is_migration_name("abc.sql"));
        assert!(!is_migration_name("1.down.sql"));
    }

    #[test]
    fn test_count_ignores_non_migrations() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1.sql", "");
        touch(dir.path(), "2.sql", "");
        touch(dir.path(), "abc.sql", "");
        touch(dir.path(), "0.sql", "");
        touch(dir.path(), "99999999999999999999999.sql", "");
        touch(dir.path(), "3.down.sql", "");
        touch(dir.path(), "notes.txt", "");
        fs::create_dir(dir.path().join("4.sql")).unwrap();
        assert_eq!(count_migration_files(dir.path()).unwrap(), 2);
    }
}
