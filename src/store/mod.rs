//! The settings store
//!
//! This module contains [`SettingsStore`], the primary entry point: a typed
//! single-record cache backed by a SQLite table that holds at most one row.

mod builder;
mod cache;
mod operations;

pub use builder::SettingsStoreBuilder;

use crate::database::{Database, SchemaVersion};
use crate::record::SettingsRecord;
use cache::SettingsCache;
use log::error;
use std::path::{Path, PathBuf};

/// Typed settings record kept in memory and written through to SQLite.
///
/// - **Reads** come from the in-memory cache and never touch the database.
/// - **Writes** update the cache synchronously, then queue a durable
///   replace-the-single-row write on a background thread. Durable failures
///   are logged, never returned: the cache may run ahead of the file until
///   the next successful write.
/// - **Observation**: [`observe`](Self::observe) yields a snapshot of the
///   durable record after every detected change, including changes made by
///   other connections to the same file.
///
/// # Example
///
/// ```rust,no_run
/// use settings_records::{CreateTable, SettingsRecord, SettingsStore};
///
/// #[derive(Debug, Clone, Default, SettingsRecord)]
/// #[record(table = "settings")]
/// struct AppSettings {
///     dark_mode: bool,
///     api: Option<String>,
/// }
///
/// let store = SettingsStore::<AppSettings>::builder("settings")
///     .folder("~/.local/share/my-app")
///     .version(CreateTable::<AppSettings>::new("v01"))
///     .build()?;
///
/// store.set(|s| &mut s.dark_mode, true);
/// assert!(store.get(|s| s.dark_mode));
/// # Ok::<(), settings_records::Error>(())
/// ```
pub struct SettingsStore<R: SettingsRecord> {
    name: String,
    cache: SettingsCache<R>,
    database: Database,
}

impl<R: SettingsRecord> SettingsStore<R> {
    /// Create a builder for a store named `name`.
    ///
    /// This is the recommended way to create a store when the caller wants
    /// the open error.
    pub fn builder(name: impl Into<String>) -> SettingsStoreBuilder<R> {
        SettingsStoreBuilder::new(name)
    }

    /// Open `<folder>/<name>.sqlite`, apply `versions`, and load the stored
    /// record (or `R::empty()` if there is none).
    ///
    /// Returns `None` if the store cannot be opened or migrated; the cause
    /// is logged.
    pub fn open(
        name: impl Into<String>,
        folder: impl Into<PathBuf>,
        versions: Vec<Box<dyn SchemaVersion>>,
    ) -> Option<Self> {
        let name = name.into();
        match Self::builder(name.clone())
            .folder(folder)
            .versions(versions)
            .build()
        {
            Ok(store) => Some(store),
            Err(e) => {
                error!("[SettingsStore][open] {name}: {e}");
                None
            }
        }
    }

    /// Store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        self.database.path()
    }

    /// The underlying durable store
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl<R: SettingsRecord + std::fmt::Debug> std::fmt::Debug for SettingsStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("name", &self.name)
            .field("cached", &self.cache.snapshot())
            .field("database", &self.database)
            .finish()
    }
}
