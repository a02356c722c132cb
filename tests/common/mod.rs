//! Common test utilities for settings-records integration tests
//!
//! Provides the shared example record, a per-test store fixture, and helpers
//! for inspecting the database file directly.

#![allow(dead_code)]

use rusqlite::Connection;
use settings_records::{CreateTable, SchemaVersion, SettingsRecord, SettingsStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;

pub const WAIT: Duration = Duration::from_secs(3);

// =============================================================================
// Test Record
// =============================================================================

/// The example record: a toggle, an optional endpoint and a timestamp
#[derive(Debug, Clone, PartialEq, SettingsRecord)]
#[record(table = "settings", empty = "Example::factory")]
pub struct Example {
    #[column(name = "isOn")]
    pub is_on: bool,
    pub api: Option<String>,
    #[column(name = "armedAt")]
    pub armed_at: OffsetDateTime,
}

impl Example {
    pub fn factory() -> Self {
        Self {
            is_on: false,
            api: None,
            armed_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// `t42`: 42 seconds after the epoch
pub fn t42() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(42)
}

pub fn versions() -> Vec<Box<dyn SchemaVersion>> {
    vec![Box::new(CreateTable::<Example>::new("v01"))]
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Test fixture owning a temporary folder and a store opened inside it
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub store: SettingsStore<Example>,
}

impl TestFixture {
    /// Fresh store on an empty folder, watcher polling quickly
    pub fn new() -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = open_in(temp_dir.path());
        Self { temp_dir, store }
    }

    /// Open another store on the same file
    pub fn reopen(&self) -> SettingsStore<Example> {
        open_in(self.temp_dir.path())
    }

    pub fn folder(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Direct connection to the database file, bypassing the store
    pub fn connection(&self) -> Connection {
        Connection::open(self.store.path()).expect("Failed to open database file")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

pub fn open_in(folder: &Path) -> SettingsStore<Example> {
    SettingsStore::<Example>::builder("settings")
        .folder(folder)
        .watch_interval(Duration::from_millis(20))
        .versions(versions())
        .build()
        .expect("Failed to open store")
}

/// Number of rows in the settings table
pub fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))
        .expect("Failed to count rows")
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
