//! File-backed SQLite database with a background writer
//!
//! [`Database`] is the durable half of a store. It owns three connections
//! to the same file:
//!
//! - a reader, guarded by a mutex, for [`Database::read`] and the first
//!   snapshot of each subscription
//! - a writer, owned by a dedicated thread that runs queued mutations in
//!   order, each in its own transaction
//! - a watcher (optional), owned by a thread polling `PRAGMA data_version`
//!   to notice commits made by other connections
//!
//! Writes never report back to the caller. A failing mutation invokes the
//! caller's error handler on the writer thread instead.

mod observer;
pub mod schema;

pub use observer::Subscription;
pub use schema::{CreateTable, SchemaVersion, SqlVersion};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::security;
use crate::sync::MutexExt;
use log::{debug, error, info, warn};
use observer::Observers;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Mutation = Box<dyn FnOnce(&Transaction<'_>) -> rusqlite::Result<()> + Send>;
type ErrorHandler = Box<dyn FnOnce(Error) + Send>;

enum Job {
    Write {
        mutation: Mutation,
        on_error: ErrorHandler,
    },
    Flush(Sender<()>),
}

struct Watcher {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Durable store over one SQLite file
pub struct Database {
    path: PathBuf,
    reader: Mutex<Connection>,
    jobs: Option<Sender<Job>>,
    observers: Arc<Observers>,
    writer: Option<JoinHandle<()>>,
    watcher: Option<Watcher>,
}

impl Database {
    /// Open (creating if needed) the database described by `config` and
    /// bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be prepared, the file cannot be
    /// opened, a schema version fails, or a background thread cannot start.
    pub fn open(config: &StoreConfig, versions: &[Box<dyn SchemaVersion>]) -> Result<Self> {
        security::prepare_folder(&config.folder, config.secure_permissions)?;
        let path = config.database_path();

        let mut writer = open_connection(&path, config)?;
        let applied = schema::migrate(&mut writer, versions)?;
        if !applied.is_empty() {
            info!("Migrated {} to {}", path.display(), applied.join(", "));
        }
        let reader = open_connection(&path, config)?;

        if config.secure_permissions {
            security::secure_database_files(&path)?;
        }

        let observers = Observers::new();

        let (jobs, queue) = mpsc::channel();
        let writer = {
            let observers = Arc::clone(&observers);
            thread::Builder::new()
                .name(format!("{}-writer", config.name))
                .spawn(move || run_writer(writer, &queue, &observers))
                .map_err(Error::Thread)?
        };

        let watcher = match config.watch_interval {
            Some(interval) => Some(spawn_watcher(&path, config, interval, &observers)?),
            None => None,
        };

        info!("Opened settings database at: {}", path.display());

        Ok(Self {
            path,
            reader: Mutex::new(reader),
            jobs: Some(jobs),
            observers,
            writer: Some(writer),
            watcher,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only query against the current durable state
    ///
    /// # Errors
    ///
    /// Returns the query's SQLite error.
    pub fn read<T>(&self, query: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.reader.lock_recovered();
        Ok(query(&*conn)?)
    }

    /// Queue a mutation for the background writer and return immediately.
    ///
    /// The mutation runs inside an immediate transaction. If it or the commit
    /// fails, or if the writer is gone, `on_error` is called instead of
    /// anything being returned. Mutations run in the order they were queued.
    pub fn write<M, E>(&self, mutation: M, on_error: E)
    where
        M: FnOnce(&Transaction<'_>) -> rusqlite::Result<()> + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let job = Job::Write {
            mutation: Box::new(mutation),
            on_error: Box::new(on_error),
        };
        if let Err(mpsc::SendError(Job::Write { on_error, .. })) = self.send(job) {
            on_error(Error::WriterClosed);
        }
    }

    /// Block until every write queued before this call has been attempted.
    ///
    /// Individual write failures are not reported here; they went to their
    /// own error handlers.
    ///
    /// # Errors
    ///
    /// Returns `Error::WriterClosed` if the writer thread has stopped.
    pub fn flush(&self) -> Result<()> {
        let (done, wait) = mpsc::channel();
        self.send(Job::Flush(done)).map_err(|_| Error::WriterClosed)?;
        wait.recv().map_err(|_| Error::WriterClosed)
    }

    /// Subscribe to the result of `query`, recomputed after every detected
    /// change. The first element is the current result.
    pub fn subscribe<T, Q>(&self, query: Q) -> Subscription<T>
    where
        T: Send + 'static,
        Q: Fn(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        self.observers.subscribe(query, |query| {
            let conn = self.reader.lock_recovered();
            match query(&*conn) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Initial subscription query failed: {e}");
                    None
                }
            }
        })
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    fn send(&self, job: Job) -> std::result::Result<(), mpsc::SendError<Job>> {
        match &self.jobs {
            Some(jobs) => jobs.send(job),
            None => Err(mpsc::SendError(job)),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Closing the queue lets the writer drain what is left and exit
        drop(self.jobs.take());
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("Writer thread for {} panicked", self.path.display());
            }
        }

        if let Some(watcher) = self.watcher.take() {
            drop(watcher.stop);
            if watcher.handle.join().is_err() {
                error!("Watcher thread for {} panicked", self.path.display());
            }
        }
        debug!("Closed settings database at: {}", self.path.display());
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("subscribers", &self.observers.len())
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Connections and background threads
// =============================================================================

fn open_connection(path: &Path, config: &StoreConfig) -> Result<Connection> {
    let open_error = |source| Error::Open {
        path: path.to_path_buf(),
        source,
    };

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(open_error)?;

    conn.busy_timeout(config.busy_timeout).map_err(open_error)?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.pragma_value(), |row| {
            row.get(0)
        })
        .map_err(open_error)?;
    if !mode.eq_ignore_ascii_case(config.journal_mode.pragma_value()) {
        warn!(
            "Requested journal mode {} for {}, got {mode}",
            config.journal_mode.pragma_value(),
            path.display()
        );
    }

    Ok(conn)
}

fn apply(conn: &mut Connection, mutation: Mutation) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    mutation(&tx)?;
    tx.commit()
}

fn run_writer(mut conn: Connection, queue: &Receiver<Job>, observers: &Observers) {
    for job in queue {
        match job {
            Job::Write { mutation, on_error } => match apply(&mut conn, mutation) {
                Ok(()) => observers.notify(&conn),
                Err(e) => on_error(Error::Sqlite(e)),
            },
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Writer thread finished");
}

fn data_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
}

fn spawn_watcher(
    path: &Path,
    config: &StoreConfig,
    interval: Duration,
    observers: &Arc<Observers>,
) -> Result<Watcher> {
    let conn = open_connection(path, config)?;
    let (stop, stopped) = mpsc::channel::<()>();
    let observers = Arc::clone(observers);

    let handle = thread::Builder::new()
        .name(format!("{}-watcher", config.name))
        .spawn(move || run_watcher(&conn, interval, &stopped, &observers))
        .map_err(Error::Thread)?;

    Ok(Watcher { stop, handle })
}

/// Poll `data_version`, which changes whenever another connection commits
fn run_watcher(conn: &Connection, interval: Duration, stopped: &Receiver<()>, observers: &Observers) {
    let mut last = data_version(conn).ok();
    while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
        match data_version(conn) {
            Ok(version) if Some(version) != last => {
                last = Some(version);
                if observers.len() > 0 {
                    debug!("External change detected (data_version {version})");
                    observers.notify(conn);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to poll data_version: {e}"),
        }
    }
    debug!("Watcher thread finished");
}
