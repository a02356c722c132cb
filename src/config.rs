//! Store configuration
//!
//! [`StoreConfig`] describes where a store lives and how its database is
//! opened. Build one with [`StoreConfig::builder`].

use crate::error::{Error, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// SQLite journal mode applied when the database is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Write-ahead log (default). Readers never block the background writer.
    #[default]
    Wal,
    Delete,
    Truncate,
}

impl JournalMode {
    /// Value for `PRAGMA journal_mode`
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
        }
    }
}

/// Configuration for opening a store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store name, also the database file stem
    pub name: String,

    /// Folder containing the database file
    pub folder: PathBuf,

    /// Database file extension (default: "sqlite")
    pub extension: String,

    /// Journal mode
    pub journal_mode: JournalMode,

    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,

    /// Poll interval for detecting commits made by other connections.
    /// `None` disables the watcher; subscribers then only see this store's writes.
    pub watch_interval: Option<Duration>,

    /// Restrict the folder and database file to the owner (Unix only)
    pub secure_permissions: bool,
}

impl StoreConfig {
    /// Create a new builder for `StoreConfig`
    ///
    /// # Example
    /// ```rust
    /// use settings_records::StoreConfig;
    ///
    /// let config = StoreConfig::builder("settings")
    ///     .folder("/tmp/my-app")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(config.database_path().ends_with("settings.sqlite"));
    /// ```
    pub fn builder(name: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(name)
    }

    /// Full path of the database file
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.folder.join(format!("{}.{}", self.name, self.extension))
    }
}

/// Builder for creating a [`StoreConfig`] with a fluent API
#[derive(Debug, Clone)]
pub struct StoreConfigBuilder {
    name: String,
    folder: Option<PathBuf>,
    extension: String,
    journal_mode: JournalMode,
    busy_timeout: Duration,
    watch_interval: Option<Duration>,
    secure_permissions: bool,
}

/// Default poll interval of the change watcher
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(200);

impl StoreConfigBuilder {
    /// Create a new builder with the required store name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: None,
            extension: "sqlite".into(),
            journal_mode: JournalMode::default(),
            busy_timeout: Duration::from_secs(5),
            watch_interval: Some(DEFAULT_WATCH_INTERVAL),
            secure_permissions: true,
        }
    }

    /// Set the folder holding the database file
    ///
    /// Supports `~` expansion for home directory.
    pub fn folder(mut self, path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let expanded = if path.starts_with("~") {
            if let Some(home) = dirs::home_dir() {
                home.join(path.strip_prefix("~").unwrap_or(&path))
            } else {
                path
            }
        } else {
            path
        };
        self.folder = Some(expanded);
        self
    }

    /// Set the database file extension (default: "sqlite")
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Poll interval for commits made outside this store
    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = Some(interval);
        self
    }

    /// Only report this store's own writes to subscribers
    pub fn without_watcher(mut self) -> Self {
        self.watch_interval = None;
        self
    }

    /// Keep default permissions on the folder and database file
    pub fn shared_permissions(mut self) -> Self {
        self.secure_permissions = false;
        self
    }

    /// Build the `StoreConfig`
    ///
    /// If no folder is set, uses the system data directory for the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or extension is not a plain file name
    /// component, or if the watch interval is zero.
    pub fn build(self) -> Result<StoreConfig> {
        validate_name(&self.name)?;
        if !self.extension.is_empty() && !name_pattern().is_match(&self.extension) {
            return Err(Error::Config(format!(
                "Invalid file extension '{}'",
                self.extension
            )));
        }
        if self.watch_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::Config("Watch interval must be greater than 0".into()));
        }

        let folder = self.folder.unwrap_or_else(|| {
            // Use system data dir if available, otherwise current dir
            dirs::data_local_dir()
                .map(|d| d.join(&self.name))
                .unwrap_or_else(|| PathBuf::from("."))
        });

        Ok(StoreConfig {
            name: self.name,
            folder,
            extension: self.extension,
            journal_mode: self.journal_mode,
            busy_timeout: self.busy_timeout,
            watch_interval: self.watch_interval,
            secure_permissions: self.secure_permissions,
        })
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("static pattern is valid")
    })
}

/// Check that a store name can be used as a file stem
///
/// # Errors
///
/// Returns `Error::InvalidName` for empty names, path separators, `..`, or
/// characters outside `[A-Za-z0-9_.-]`.
pub fn validate_name(name: &str) -> Result<()> {
    if !name_pattern().is_match(name) || name.contains("..") {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}
