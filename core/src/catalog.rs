//! Named SQL script catalog.
//!
//! Parses a schema file made of `-- name: <identifier>` blocks into an
//! immutable name → SQL mapping. The bootstrap scripts `schema_up` and
//! `schema_down` live here next to any ad hoc maintenance scripts.
//!
//! # Format
//!
//! ```sql
//! -- name: schema_up
//! CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
//!
//! -- name: schema_down
//! DROP TABLE IF EXISTS users;
//!
//! -- name: rename_user
//! -- Takes the user id and the new name.
//! UPDATE users SET name = ?2 WHERE id = ?1;
//! ```
//!
//! A name tag opens a block that runs until the next name tag. Other tag
//! lines (`-- key: value`) and plain `--` comments are skipped.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Result, SourceError};

/// Script name used to bootstrap the schema.
pub const SCHEMA_UP: &str = "schema_up";

/// Script name used to tear the schema down.
pub const SCHEMA_DOWN: &str = "schema_down";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--\s*([A-Za-z][A-Za-z0-9_-]*)\s*:\s*(.*?)\s*$")
        .expect("static regex must compile")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex must compile"));

/// Immutable mapping from script name to raw SQL text.
///
/// # Examples
///
/// ```
/// use sql_migrator_core::ScriptCatalog;
///
/// let catalog = ScriptCatalog::parse(
///     "-- name: schema_up\nCREATE TABLE t (id INTEGER);\n\n-- name: schema_down\nDROP TABLE t;\n",
/// )
/// .unwrap();
///
/// assert_eq!(catalog.get("schema_down"), Some("DROP TABLE t;"));
/// assert!(catalog.get("missing").is_none());
/// assert_eq!(catalog.names().collect::<Vec<_>>(), ["schema_up", "schema_down"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptCatalog {
    scripts: HashMap<String, String>,
    order: Vec<String>,
}

impl ScriptCatalog {
    /// Reads and parses a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be read, or
    /// [`SourceError::CatalogParse`] if its contents are malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::parse(&raw)?;
        debug!(path = %path.display(), scripts = catalog.len(), "Loaded script catalog");
        Ok(catalog)
    }

    /// Parses schema file contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::CatalogParse`] for SQL outside of a named
    /// block, an empty or malformed name, a duplicate name, or a block
    /// without SQL.
    pub fn parse(source: &str) -> Result<Self> {
        let mut catalog = Self::default();
        // (name, line the tag was on, body lines)
        let mut current: Option<(String, usize, Vec<&str>)> = None;

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;

            if let Some(caps) = TAG_RE.captures(line) {
                if &caps[1] != "name" {
                    continue;
                }
                let name = &caps[2];
                if name.is_empty() {
                    return Err(parse_error(line_no, "name tag without a script name"));
                }
                if !NAME_RE.is_match(name) {
                    return Err(parse_error(
                        line_no,
                        format!("invalid script name '{name}'"),
                    ));
                }
                if let Some(done) = current.take() {
                    catalog.insert(done)?;
                }
                current = Some((name.to_string(), line_no, Vec::new()));
                continue;
            }

            let trimmed = line.trim();
            if trimmed.starts_with("--") {
                continue;
            }

            match current.as_mut() {
                Some((_, _, body)) => body.push(line),
                None if trimmed.is_empty() => {}
                None => {
                    return Err(parse_error(line_no, "SQL found before any '-- name:' tag"));
                }
            }
        }

        if let Some(done) = current.take() {
            catalog.insert(done)?;
        }

        Ok(catalog)
    }

    fn insert(&mut self, (name, line_no, body): (String, usize, Vec<&str>)) -> Result<()> {
        let sql = body.join("\n").trim().to_string();
        if sql.is_empty() {
            return Err(parse_error(line_no, format!("script '{name}' has no SQL")));
        }
        if self.scripts.contains_key(&name) {
            return Err(parse_error(line_no, format!("duplicate script name '{name}'")));
        }
        self.order.push(name.clone());
        self.scripts.insert(name, sql);
        Ok(())
    }

    /// Looks up a script by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    /// Returns `true` if a script with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Script names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> SourceError {
    SourceError::CatalogParse {
        line,
        message: message.into(),
    }
}
