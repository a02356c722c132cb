//! Change subscriptions
//!
//! Every subscription registers a refresh closure. When a change is
//! detected, each closure re-runs its query on the connection that saw the
//! change and pushes the result into the subscriber's channel. A closure
//! whose receiver is gone reports `false` and is dropped from the registry.

use crate::sync::MutexExt;
use log::{debug, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

type Refresh = Box<dyn FnMut(&Connection) -> bool + Send>;

/// Registry of live subscriptions
pub(crate) struct Observers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Refresh)>>,
}

impl Observers {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        })
    }

    /// Register a query and emit its first result.
    ///
    /// `initial` runs while the registry is locked, so no change notified
    /// concurrently can slip between the first snapshot and registration.
    pub(crate) fn subscribe<T, Q>(
        self: &Arc<Self>,
        query: Q,
        initial: impl FnOnce(&Q) -> Option<T>,
    ) -> Subscription<T>
    where
        T: Send + 'static,
        Q: Fn(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries.lock_recovered();
        if let Some(first) = initial(&query) {
            // Receiver is alive here, send cannot fail
            let _ = sender.send(first);
        }
        let refresh: Refresh = Box::new(move |conn: &Connection| match query(conn) {
            Ok(value) => sender.send(value).is_ok(),
            Err(e) => {
                warn!("Subscription {id} query failed: {e}");
                true
            }
        });
        entries.push((id, refresh));
        drop(entries);

        debug!("Subscription {id} registered");
        Subscription {
            id,
            receiver,
            observers: Arc::downgrade(self),
        }
    }

    /// Re-run every registered query against `conn`
    pub(crate) fn notify(&self, conn: &Connection) {
        let mut entries = self.entries.lock_recovered();
        entries.retain_mut(|(id, refresh)| {
            let alive = refresh(conn);
            if !alive {
                debug!("Subscription {id} dropped by its receiver");
            }
            alive
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock_recovered().len()
    }

    fn remove(&self, id: u64) {
        self.entries.lock_recovered().retain(|(entry, _)| *entry != id);
        debug!("Subscription {id} cancelled");
    }
}

/// A live sequence of query results, one per detected change.
///
/// The first element is the state at subscription time. Snapshots may
/// repeat. Dropping the subscription unregisters it; once the store is
/// dropped the sequence ends and `recv` returns `None`.
///
/// The queue is unbounded: every detected change adds one snapshot (a
/// commit by the owning store can add two, one from the writer and one
/// from the watcher) until it is received. A subscriber that only needs
/// the current state should call [`latest`](Self::latest), which drains
/// the backlog, or drop the subscription when it stops listening.
pub struct Subscription<T> {
    id: u64,
    receiver: Receiver<T>,
    observers: Weak<Observers>,
}

impl<T> Subscription<T> {
    /// Block until the next snapshot. `None` once the store is gone.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Block up to `timeout` for the next snapshot
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next snapshot if one is already queued
    pub fn try_recv(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drain every queued snapshot and keep only the newest
    pub fn latest(&self) -> Option<T> {
        let mut newest = None;
        while let Some(value) = self.try_recv() {
            newest = Some(value);
        }
        newest
    }
}

impl<T> Iterator for Subscription<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.recv()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.remove(self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
