//! Reads and writes on a [`SettingsStore`]
//!
//! Reads are served from the cache. Every write mutates the cache first and
//! queues the matching durable write while the cache guard is still held,
//! so the order of rows reaching the database is the order in which the
//! cache changed.

use crate::database::Subscription;
use crate::error::Result;
use crate::record::{SettingsRecord, read_record, replace_single};
use log::{debug, error};

use super::SettingsStore;

impl<R: SettingsRecord> SettingsStore<R> {
    /// Read a value out of the cached record.
    ///
    /// Never touches the database and never blocks on pending writes.
    pub fn get<T>(&self, field: impl FnOnce(&R) -> T) -> T {
        self.cache.read(field)
    }

    /// Copy of the whole cached record
    pub fn snapshot(&self) -> R {
        self.cache.snapshot()
    }

    /// Set a single field.
    ///
    /// The cache is updated before this returns; the whole record is then
    /// written in the background. A failed durable write is logged.
    ///
    /// ```rust,no_run
    /// # use settings_records::{SettingsRecord, SettingsStore};
    /// # #[derive(Clone, Default, SettingsRecord)]
    /// # struct Prefs { volume: u8 }
    /// # let store: SettingsStore<Prefs> = unimplemented!();
    /// store.set(|p| &mut p.volume, 80);
    /// assert_eq!(store.get(|p| p.volume), 80);
    /// ```
    pub fn set<T>(&self, field: impl FnOnce(&mut R) -> &mut T, value: T) {
        self.update(move |record| *field(record) = value);
    }

    /// Change several fields as one write
    pub fn update(&self, change: impl FnOnce(&mut R)) {
        self.cache
            .mutate_with(change, |record| self.persist("update", record.clone()));
    }

    /// Replace the whole record
    pub fn save(&self, record: R) {
        self.cache
            .replace_with(record, |record| self.persist("save", record.clone()));
    }

    /// Reset to `R::empty()`. The table keeps one row holding the empty
    /// record rather than being left without rows.
    pub fn erase(&self) {
        self.cache
            .replace_with(R::empty(), |record| self.persist("erase", record.clone()));
    }

    /// Subscribe to the durable record.
    ///
    /// The first element is the record as currently stored; a new element
    /// follows every committed change, including ones made by other
    /// connections when the watcher is enabled. Snapshots can repeat, and
    /// unread ones queue up; see [`Subscription`].
    pub fn observe(&self) -> Subscription<R> {
        self.database.subscribe(read_record::<R>)
    }

    /// Block until every write issued so far has been attempted.
    ///
    /// # Errors
    ///
    /// Returns `Error::WriterClosed` if the background writer has stopped.
    pub fn flush(&self) -> Result<()> {
        self.database.flush()
    }

    /// Discard the cache and load the record back from the database.
    ///
    /// Pending writes are flushed first, so after a failed durable write
    /// this brings the cache back in line with what is actually stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or the read fails; the cache is left
    /// unchanged in that case.
    pub fn reload(&self) -> Result<R> {
        self.flush()?;
        let stored = self.database.read(read_record::<R>)?;
        debug!("Reloaded SettingsStore '{}' from disk", self.name);
        Ok(self.cache.replace(stored))
    }

    /// Queue the durable replace of the single row with `record`
    fn persist(&self, operation: &'static str, record: R) {
        let name = self.name.clone();
        self.database.write(
            move |tx| replace_single(tx, &record),
            move |e| error!("[SettingsStore][{operation}] {name}: {e}"),
        );
    }
}
