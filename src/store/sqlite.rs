//! SQLite-backed store
//!
//! One table per store. Scalar tables key on a primary key and upsert; set
//! tables hold one row per (key, element) and only ever append. SQL `NULL`
//! in the value column is the null marker. Each mutation commits before
//! returning.

use crate::error::{CacheError, CacheResult};
use crate::store::Store;
use crate::value::{Shape, Value};
use rusqlite::{params, Connection, ErrorCode};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Table and column names of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table: String,
    pub key: String,
    pub value: String,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            table: "key2value".to_string(),
            key: "key".to_string(),
            value: "value".to_string(),
        }
    }
}

impl TableSpec {
    pub fn new(table: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Reject names that cannot be spliced into SQL verbatim
    fn validate(&self) -> CacheResult<()> {
        for ident in [&self.table, &self.key, &self.value] {
            if !is_identifier(ident) {
                return Err(CacheError::InvalidIdentifier(ident.clone()));
            }
        }
        if self.key == self.value {
            return Err(CacheError::InvalidIdentifier(format!(
                "{} (key and value columns must differ)",
                self.key
            )));
        }
        Ok(())
    }
}

fn is_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Store that keeps rows in a SQLite table
pub struct SqliteStore<V> {
    name: String,
    path: PathBuf,
    conn: Connection,
    spec: TableSpec,
    writable: bool,
    _shape: PhantomData<V>,
}

impl<V: Value> SqliteStore<V> {
    /// Open a database file, creating the file and table if absent
    pub fn open(path: impl AsRef<Path>, spec: TableSpec) -> CacheResult<Self> {
        let path = path.as_ref();
        spec.validate()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::io(format!("creating database directory {}", parent.display()), e)
            })?;
        }

        let conn = Connection::open(path).map_err(|e| classify(path, e))?;
        Self::with_connection(conn, path.to_path_buf(), spec)
    }

    /// Open a private in-memory database
    pub fn open_in_memory(spec: TableSpec) -> CacheResult<Self> {
        spec.validate()?;
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, PathBuf::from(":memory:"), spec)
    }

    fn with_connection(conn: Connection, path: PathBuf, spec: TableSpec) -> CacheResult<Self> {
        let store = Self {
            name: format!("sqlite:{}", spec.table),
            path,
            conn,
            spec,
            writable: true,
            _shape: PhantomData,
        };
        store.ensure_table()?;
        store.verify_layout()?;
        debug!("Opened {} table {} at {}", V::SHAPE, store.spec.table, store.path.display());
        Ok(store)
    }

    /// Refuse all later writes
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Close the connection, reporting any error
    pub fn close(self) -> CacheResult<()> {
        self.conn.close().map_err(|(_, e)| CacheError::Sqlite(e))
    }

    fn ensure_table(&self) -> CacheResult<()> {
        let TableSpec { table, key, value } = &self.spec;
        let sql = match V::SHAPE {
            Shape::Scalar => format!(
                "CREATE TABLE IF NOT EXISTS {table} ({key} TEXT PRIMARY KEY, {value} TEXT)"
            ),
            Shape::Set => format!(
                "CREATE TABLE IF NOT EXISTS {table} \
                 ({key} TEXT NOT NULL, {value} TEXT, UNIQUE({key}, {value}))"
            ),
        };
        self.conn
            .execute(&sql, [])
            .map(|_| ())
            .map_err(|e| classify(&self.path, e))
    }

    /// Check that an existing table has the columns and key layout of this shape
    fn verify_layout(&self) -> CacheResult<()> {
        let columns: Vec<(String, i64)> = {
            let mut stmt = self
                .conn
                .prepare(&format!("PRAGMA table_info({})", self.spec.table))?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(5)?)))?;
            rows.collect::<Result<_, _>>()?
        };

        let mismatch = |reason: &str| CacheError::ShapeMismatch {
            table: self.spec.table.clone(),
            expected: V::SHAPE.to_string(),
            reason: reason.to_string(),
        };

        let key_pk = columns
            .iter()
            .find(|(name, _)| name == &self.spec.key)
            .map(|(_, pk)| *pk > 0)
            .ok_or_else(|| mismatch("key column missing"))?;
        if !columns.iter().any(|(name, _)| name == &self.spec.value) {
            return Err(mismatch("value column missing"));
        }

        match (V::SHAPE, key_pk) {
            (Shape::Scalar, false) => Err(mismatch("key column is not a primary key")),
            (Shape::Set, true) => Err(mismatch("key column is a primary key")),
            _ => Ok(()),
        }
    }
}

impl<V: Value> Store<V> for SqliteStore<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn get(&self, key: &str) -> CacheResult<V> {
        let TableSpec { table, key: k, value: v } = &self.spec;
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {v} FROM {table} WHERE {k} = ?1 ORDER BY rowid"))?;
        let fields = stmt
            .query_map(params![key], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        V::from_fields(fields)
            .ok_or_else(|| CacheError::not_found(key, format!("absent from {}", self.name)))
    }

    fn put(&mut self, key: &str, value: &V) -> CacheResult<()> {
        if !self.writable {
            return Err(CacheError::not_writable(&self.name));
        }
        let TableSpec { table, key: k, value: v } = self.spec.clone();
        let fields = value.clone().normalized().to_fields();

        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare_cached(&match V::SHAPE {
                Shape::Scalar => format!(
                    "INSERT INTO {table} ({k}, {v}) VALUES (?1, ?2) \
                     ON CONFLICT({k}) DO UPDATE SET {v} = excluded.{v}"
                ),
                Shape::Set => format!("INSERT OR IGNORE INTO {table} ({k}, {v}) VALUES (?1, ?2)"),
            })?;
            // A null marker only goes in when the key has no rows yet
            let mut mark_null = tx.prepare_cached(&format!(
                "INSERT INTO {table} ({k}, {v}) SELECT ?1, NULL \
                 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {k} = ?1)"
            ))?;

            for field in fields {
                match (V::SHAPE, field) {
                    (Shape::Set, None) => mark_null.execute(params![key])?,
                    (_, field) => upsert.execute(params![key, field])?,
                };
            }
        }
        tx.commit()?;

        debug!("Stored '{}' in {}", key, self.name);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> CacheResult<()> {
        if !self.writable {
            return Err(CacheError::not_writable(&self.name));
        }
        let TableSpec { table, key: k, .. } = &self.spec;
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE {k} = ?1"), params![key])?;
        if removed == 0 {
            return Err(CacheError::not_found(key, format!("absent from {}", self.name)));
        }
        Ok(())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let TableSpec { table, key: k, .. } = &self.spec;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT DISTINCT {k} FROM {table} ORDER BY {k}"))?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn items(&self) -> CacheResult<Vec<(String, V)>> {
        let TableSpec { table, key: k, value: v } = &self.spec;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {k}, {v} FROM {table} ORDER BY {k}, rowid"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
        for (key, field) in rows {
            grouped.entry(key).or_default().push(field);
        }
        Ok(grouped
            .into_iter()
            .filter_map(|(key, fields)| V::from_fields(fields).map(|value| (key, value)))
            .collect())
    }

    fn extend(&mut self, entries: Vec<(String, V)>) -> CacheResult<()> {
        for (key, value) in &entries {
            self.put(key, value)?;
        }
        debug!("Seeded {} entries into {}", entries.len(), self.name);
        Ok(())
    }
}

/// Separate "not a database" from ordinary SQLite failures
fn classify(path: &Path, e: rusqlite::Error) -> CacheError {
    match e.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) => {
            CacheError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
        _ => CacheError::Sqlite(e),
    }
}
