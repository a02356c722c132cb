//! # settings-records - typed single-record settings
//!
//! A small store for application settings that live in one typed record:
//! reads come from memory, writes go through to a SQLite table holding at
//! most one row, and observers see every committed change.
//!
//! ## Features
//!
//! - **Cached reads**: `get` never touches the database
//! - **Write-through**: `set`, `update`, `save` and `erase` change the cache
//!   synchronously and persist the whole record in the background, in order
//! - **Observation**: subscribe to the durable record, including changes made
//!   by other processes to the same file
//! - **Migrations**: ordered, named schema versions applied once per file
//! - **Derive**: `#[derive(SettingsRecord)]` maps struct fields to columns
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use settings_records::{CreateTable, SettingsRecord, SettingsStore};
//! use time::OffsetDateTime;
//!
//! #[derive(Debug, Clone, SettingsRecord)]
//! #[record(table = "settings", empty = "Settings::factory")]
//! struct Settings {
//!     #[column(name = "isOn")]
//!     is_on: bool,
//!     api: Option<String>,
//!     #[column(name = "armedAt")]
//!     armed_at: OffsetDateTime,
//! }
//!
//! impl Settings {
//!     fn factory() -> Self {
//!         Settings {
//!             is_on: false,
//!             api: None,
//!             armed_at: OffsetDateTime::UNIX_EPOCH,
//!         }
//!     }
//! }
//!
//! let store = SettingsStore::<Settings>::open(
//!     "settings",
//!     "~/.local/share/my-app",
//!     vec![Box::new(CreateTable::<Settings>::new("v01"))],
//! )
//! .expect("settings store");
//!
//! store.set(|s| &mut s.is_on, true);
//! assert!(store.get(|s| s.is_on));
//!
//! for snapshot in store.observe().take(2) {
//!     println!("armed at {}", snapshot.armed_at);
//! }
//! ```
//!
//! ## Failure model
//!
//! Durable writes are fire-and-forget. A failed write is logged with the
//! `log` crate and the cache keeps the new value, so memory can run ahead of
//! disk until the next successful write. Call [`SettingsStore::flush`] to
//! wait for pending writes and [`SettingsStore::reload`] to resynchronize.

// Lets generated code name `::settings_records` from inside this crate too
extern crate self as settings_records;

mod config;
pub mod database;
mod error;
mod record;
mod row;
pub mod security;
mod store;
mod sync;

pub use config::{DEFAULT_WATCH_INTERVAL, JournalMode, StoreConfig, StoreConfigBuilder, validate_name};
pub use database::{CreateTable, Database, SchemaVersion, SqlVersion, Subscription};
pub use error::{Error, Result};
pub use record::{ColumnDef, SettingsRecord, read_record, replace_single};
pub use row::{ColumnType, ColumnValue, Json, Row};
pub use store::{SettingsStore, SettingsStoreBuilder};

// Derive macro re-export (requires `derive` feature)
/// Derive macro for `SettingsRecord`.
///
/// Every named field becomes a column; see the `settings-records-derive`
/// crate for the `#[record(...)]` and `#[column(...)]` attributes.
#[cfg(feature = "derive")]
pub use settings_records_derive::SettingsRecord;
