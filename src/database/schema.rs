//! Schema versions and the migration runner
//!
//! A store is opened with an ordered list of [`SchemaVersion`]s. Each
//! version runs once, in its own transaction, and its id is recorded in
//! `settings_migrations` so reopening the file skips it.

use crate::error::{Error, Result};
use crate::record::{SettingsRecord, quote_ident};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::HashSet;
use std::marker::PhantomData;
use time::OffsetDateTime;

/// Bookkeeping table for applied versions
pub const MIGRATIONS_TABLE: &str = "settings_migrations";

/// One step of schema history
pub trait SchemaVersion: Send + Sync {
    /// Stable identifier, recorded once applied
    fn id(&self) -> &str;

    /// Apply this version
    ///
    /// # Errors
    ///
    /// Any SQLite error aborts the migration and the open.
    fn upgrade(&self, tx: &Transaction<'_>) -> rusqlite::Result<()>;
}

/// Creates the table of a record type from its declared columns.
///
/// Every column is nullable with no default, so rows written by older
/// versions decode through the record's `empty` value.
pub struct CreateTable<R> {
    id: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: SettingsRecord> CreateTable<R> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _record: PhantomData,
        }
    }

    /// The `CREATE TABLE` statement this version runs
    #[must_use]
    pub fn sql() -> String {
        let columns: Vec<String> = R::columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name), c.column_type.sql()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(R::TABLE),
            columns.join(", ")
        )
    }
}

impl<R: SettingsRecord> SchemaVersion for CreateTable<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(&self, tx: &Transaction<'_>) -> rusqlite::Result<()> {
        tx.execute_batch(&Self::sql())
    }
}

/// A version made of a raw SQL batch
#[derive(Debug, Clone)]
pub struct SqlVersion {
    id: String,
    sql: String,
}

impl SqlVersion {
    pub fn new(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
        }
    }
}

impl SchemaVersion for SqlVersion {
    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(&self, tx: &Transaction<'_>) -> rusqlite::Result<()> {
        tx.execute_batch(&self.sql)
    }
}

/// Apply every version not yet recorded, in list order
///
/// Returns the ids applied by this call.
///
/// # Errors
///
/// * `Error::DuplicateVersion` - If two versions share an id
/// * `Error::Migration` - If a version fails; earlier versions stay applied
pub fn migrate(conn: &mut Connection, versions: &[Box<dyn SchemaVersion>]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    for version in versions {
        if !seen.insert(version.id()) {
            return Err(Error::DuplicateVersion(version.id().to_string()));
        }
    }

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            identifier TEXT NOT NULL PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )"
    ))?;

    let mut applied = Vec::new();
    for version in versions {
        let id = version.id();
        let tx = conn.transaction()?;

        let done: Option<i64> = tx
            .query_row(
                &format!("SELECT 1 FROM {MIGRATIONS_TABLE} WHERE identifier = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        if done.is_some() {
            debug!("Schema version {id} already applied");
            continue;
        }

        version.upgrade(&tx).map_err(|e| Error::Migration {
            version: id.to_string(),
            source: e,
        })?;
        tx.execute(
            &format!("INSERT INTO {MIGRATIONS_TABLE} (identifier, applied_at) VALUES (?1, ?2)"),
            params![id, OffsetDateTime::now_utc().unix_timestamp()],
        )?;
        tx.commit().map_err(|e| Error::Migration {
            version: id.to_string(),
            source: e,
        })?;

        info!("Applied schema version {id}");
        applied.push(id.to_string());
    }

    Ok(applied)
}

/// Ids recorded as applied, oldest first
///
/// # Errors
///
/// Returns the SQLite error if the bookkeeping table cannot be read.
pub fn applied_versions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT identifier FROM {MIGRATIONS_TABLE} ORDER BY applied_at, rowid"
    ))?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}
