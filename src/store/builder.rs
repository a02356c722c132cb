//! Builder for SettingsStore
//!
//! This module contains [`SettingsStoreBuilder`] which provides a fluent API
//! for creating a [`SettingsStore`](super::SettingsStore).

use crate::config::{JournalMode, StoreConfigBuilder};
use crate::database::{Database, SchemaVersion};
use crate::error::Result;
use crate::record::{SettingsRecord, read_record};
use log::{info, warn};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::{SettingsCache, SettingsStore};

/// Builder for creating a [`SettingsStore`] with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use settings_records::{CreateTable, SettingsRecord, SettingsStore, SqlVersion};
///
/// #[derive(Debug, Clone, Default, SettingsRecord)]
/// struct Prefs {
///     volume: u8,
///     muted: bool,
/// }
///
/// let store = SettingsStore::<Prefs>::builder("prefs")
///     .folder("/tmp/my-app")
///     .version(CreateTable::<Prefs>::new("v01"))
///     .version(SqlVersion::new("v02", "UPDATE prefs SET volume = 50 WHERE volume IS NULL"))
///     .build()
///     .unwrap();
/// ```
pub struct SettingsStoreBuilder<R> {
    config_builder: StoreConfigBuilder,
    versions: Vec<Box<dyn SchemaVersion>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: SettingsRecord> SettingsStoreBuilder<R> {
    /// Create a new builder with the required store name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config_builder: StoreConfigBuilder::new(name),
            versions: Vec::new(),
            _record: PhantomData,
        }
    }

    /// Set the folder holding the database file.
    ///
    /// Supports `~` expansion for home directory.
    pub fn folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.folder(path);
        self
    }

    /// Set the database file extension (default: "sqlite").
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.extension(extension);
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.config_builder = self.config_builder.journal_mode(mode);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.busy_timeout(timeout);
        self
    }

    /// Poll interval for noticing commits made by other connections.
    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.config_builder = self.config_builder.watch_interval(interval);
        self
    }

    /// Only report this store's own writes to observers.
    pub fn without_watcher(mut self) -> Self {
        self.config_builder = self.config_builder.without_watcher();
        self
    }

    /// Keep default permissions on the folder and database file.
    pub fn shared_permissions(mut self) -> Self {
        self.config_builder = self.config_builder.shared_permissions();
        self
    }

    /// Append a schema version. Versions run in the order they are added.
    pub fn version(mut self, version: impl SchemaVersion + 'static) -> Self {
        self.versions.push(Box::new(version));
        self
    }

    /// Append several schema versions.
    pub fn versions(mut self, versions: impl IntoIterator<Item = Box<dyn SchemaVersion>>) -> Self {
        self.versions.extend(versions);
        self
    }

    /// Build the [`SettingsStore`].
    ///
    /// Creates the folder and database if needed, applies pending schema
    /// versions, and fills the cache from the stored row. If the row cannot
    /// be read (for example, no version created the table), the cache starts
    /// from `R::empty()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened or migrated.
    pub fn build(self) -> Result<SettingsStore<R>> {
        let config = self.config_builder.build()?;
        let database = Database::open(&config, &self.versions)?;

        let initial = database.read(read_record::<R>).unwrap_or_else(|e| {
            warn!(
                "[SettingsStore][open] {}: could not read stored record, using empty: {e}",
                config.name
            );
            R::empty()
        });

        info!("Initialized SettingsStore '{}' with table {}", config.name, R::TABLE);

        Ok(SettingsStore {
            name: config.name,
            cache: SettingsCache::new(initial),
            database,
        })
    }
}
