//! Raw persisted rows and typed column conversions
//!
//! A [`Row`] is what actually travels between a record and SQLite: an owned
//! map of column name to [`Value`]. Record types never see `rusqlite` rows
//! directly; they go through [`ColumnValue`], which turns any stored value of
//! the wrong shape into `None` so decoding can fall back to the record's
//! `empty` value for that field.

use crate::error::Result;
use rusqlite::types::Value;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// SQLite declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Real,
    Text,
    Blob,
    /// Unix nanoseconds, stored as INTEGER
    Timestamp,
    /// serde_json document, stored as TEXT
    Json,
}

impl ColumnType {
    /// Type name used in `CREATE TABLE`
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer | ColumnType::Timestamp => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::Json => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// A value that can be stored in a single column
pub trait ColumnValue: Sized {
    /// Declared type used when a table is created from a record
    const COLUMN_TYPE: ColumnType;

    /// Convert into a SQLite value
    fn to_value(&self) -> Value;

    /// Convert from a SQLite value, `None` if the value has the wrong shape
    fn from_value(value: &Value) -> Option<Self>;
}

impl ColumnValue for bool {
    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }
}

macro_rules! integer_column {
    ($($ty:ty),*) => {
        $(
            impl ColumnValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::Integer;

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Integer(n) => <$ty>::try_from(*n).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_column!(i8, i16, i32, i64, u8, u16, u32);

// SQLite integers are i64; values beyond that range are stored as NULL
macro_rules! wide_integer_column {
    ($($ty:ty),*) => {
        $(
            impl ColumnValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::Integer;

                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(n) => Value::Integer(n),
                        Err(_) => {
                            log::warn!("Integer {self} does not fit in a SQLite column, storing NULL");
                            Value::Null
                        }
                    }
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Integer(n) => <$ty>::try_from(*n).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

wide_integer_column!(u64, usize, isize);

impl ColumnValue for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Real;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Real(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl ColumnValue for f32 {
    const COLUMN_TYPE: ColumnType = ColumnType::Real;

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl ColumnValue for String {
    const COLUMN_TYPE: ColumnType = ColumnType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl ColumnValue for Vec<u8> {
    const COLUMN_TYPE: ColumnType = ColumnType::Blob;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl ColumnValue for OffsetDateTime {
    const COLUMN_TYPE: ColumnType = ColumnType::Timestamp;

    /// Whole nanoseconds since the epoch. Instants outside the `i64` range
    /// (before 1677 or after 2262) are stored as NULL.
    fn to_value(&self) -> Value {
        match i64::try_from(self.unix_timestamp_nanos()) {
            Ok(nanos) => Value::Integer(nanos),
            Err(_) => {
                log::warn!("Timestamp {self} is outside the storable range, storing NULL");
                Value::Null
            }
        }
    }

    /// Integers are nanoseconds. Reals are read as seconds, for rows
    /// written by other tools.
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Option<Self> {
        let nanos = match value {
            Value::Integer(n) => i128::from(*n),
            Value::Real(seconds) if seconds.is_finite() => (seconds * 1e9).round() as i128,
            _ => return None,
        };
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

/// `NULL` maps to `Some(None)`; a non-null value of the wrong shape is still `None`
impl<T: ColumnValue> ColumnValue for Option<T> {
    const COLUMN_TYPE: ColumnType = T::COLUMN_TYPE;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Wrapper storing any serde type as a JSON text column
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> ColumnValue for Json<T> {
    const COLUMN_TYPE: ColumnType = ColumnType::Json;

    fn to_value(&self) -> Value {
        match serde_json::to_string(&self.0) {
            Ok(text) => Value::Text(text),
            Err(e) => {
                log::warn!("Failed to encode JSON column, storing NULL: {e}");
                Value::Null
            }
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => serde_json::from_str(text).ok().map(Json),
            _ => None,
        }
    }
}

/// One persisted row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed read of a column. `None` if absent or of the wrong shape.
    #[must_use]
    pub fn get<T: ColumnValue>(&self, column: &str) -> Option<T> {
        self.values.get(column).and_then(T::from_value)
    }

    /// Typed write of a column
    pub fn set<T: ColumnValue>(&mut self, column: impl Into<String>, value: &T) {
        self.values.insert(column.into(), value.to_value());
    }

    /// Chainable form of [`Row::set`]
    #[must_use]
    pub fn with<T: ColumnValue>(mut self, column: impl Into<String>, value: &T) -> Self {
        self.set(column, value);
        self
    }

    /// Store a raw SQLite value
    pub fn insert_raw(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    #[must_use]
    pub fn raw(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render the row as a JSON object, for logs and debugging.
    /// Blobs become arrays of bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut object = serde_json::Map::new();
        for (column, value) in &self.values {
            let json = match value {
                Value::Null => serde_json::Value::Null,
                Value::Integer(n) => serde_json::Value::from(*n),
                Value::Real(f) => serde_json::to_value(f)?,
                Value::Text(s) => serde_json::Value::from(s.as_str()),
                Value::Blob(b) => serde_json::to_value(b)?,
            };
            object.insert(column.clone(), json);
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Copy every column of a `rusqlite` result row
    pub(crate) fn from_sqlite(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<Self> {
        let mut values = BTreeMap::new();
        for (index, name) in names.iter().enumerate() {
            values.insert(name.clone(), row.get::<_, Value>(index)?);
        }
        Ok(Self { values })
    }
}

// =============================================================================
// Tests
// =============================================================================
