//! The record contract and the single-row table primitives built on it

use crate::row::{ColumnType, Row};
use rusqlite::{Connection, Transaction};

/// A column declared by a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl ColumnDef {
    #[must_use]
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

/// A value type that can be kept by a [`SettingsStore`](crate::SettingsStore).
///
/// The store holds exactly one instance in memory and at most one row in
/// [`TABLE`](Self::TABLE). Implement it by hand, or derive it:
///
/// ```rust
/// use settings_records::{Row, SettingsRecord, ColumnDef, ColumnType};
///
/// #[derive(Clone)]
/// struct Prefs {
///     dark_mode: bool,
/// }
///
/// impl SettingsRecord for Prefs {
///     const TABLE: &'static str = "prefs";
///
///     fn empty() -> Self {
///         Prefs { dark_mode: false }
///     }
///
///     fn columns() -> Vec<ColumnDef> {
///         vec![ColumnDef::new("dark_mode", ColumnType::Boolean)]
///     }
///
///     fn encode(&self) -> Row {
///         Row::new().with("dark_mode", &self.dark_mode)
///     }
///
///     fn decode(row: &Row) -> Self {
///         Prefs {
///             dark_mode: row.get("dark_mode").unwrap_or(Self::empty().dark_mode),
///         }
///     }
/// }
/// ```
pub trait SettingsRecord: Clone + Send + Sync + 'static {
    /// Table holding the single row
    const TABLE: &'static str;

    /// Canonical value used when no row exists and after `erase`
    fn empty() -> Self;

    /// Every column written by [`encode`](Self::encode)
    fn columns() -> Vec<ColumnDef>;

    /// Encode every persisted field
    fn encode(&self) -> Row;

    /// Decode a stored row. Absent or malformed columns take the
    /// corresponding field of [`empty`](Self::empty).
    fn decode(row: &Row) -> Self;
}

/// Quote an SQL identifier
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read the current row, or `R::empty()` if the table has none
///
/// # Errors
///
/// Returns the SQLite error if the table cannot be queried.
pub fn read_record<R: SettingsRecord>(conn: &Connection) -> rusqlite::Result<R> {
    let sql = format!("SELECT * FROM {} LIMIT 1", quote_ident(R::TABLE));
    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => Ok(R::decode(&Row::from_sqlite(row, &names)?)),
        None => Ok(R::empty()),
    }
}

/// Replace the table's contents with exactly one row
///
/// # Errors
///
/// Returns the SQLite error of the delete or the insert.
pub fn replace_single<R: SettingsRecord>(tx: &Transaction<'_>, record: &R) -> rusqlite::Result<()> {
    let table = quote_ident(R::TABLE);
    tx.execute(&format!("DELETE FROM {table}"), [])?;

    let row = record.encode();
    if row.is_empty() {
        tx.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
        return Ok(());
    }

    let columns: Vec<String> = row.columns().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    let values: Vec<&rusqlite::types::Value> = row.iter().map(|(_, v)| v).collect();
    tx.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(())
}
