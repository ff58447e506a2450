//! Durable on-device storage for cached guides and the pending-change queue.
//!
//! A single SQLite connection backs both tables. Every operation runs on the
//! blocking pool so callers suspend at the storage I/O boundary; the
//! connection mutex serializes physical writes.

mod guides;
mod queue;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

pub use guides::GuideCache;
pub use queue::{ChangeQueue, PendingChange};

/// Schema for the offline tables.
const SCHEMA: &str = r#"
-- One snapshot per guide (upsert by id)
CREATE TABLE IF NOT EXISTS cached_guides (
    guide_id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    cached_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cached_guides_cached_at
    ON cached_guides(cached_at);

-- Append-only log of mutations awaiting replay
CREATE TABLE IF NOT EXISTS pending_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    change_type TEXT NOT NULL,
    action TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_changes_created_at
    ON pending_changes(created_at, id);
"#;

/// Handle to the offline database.
///
/// Cloning shares the same connection.
#[derive(Clone)]
pub struct Database {
  conn: Arc<Mutex<Option<Connection>>>,
  clock: Arc<dyn Clock>,
}

impl Database {
  /// Open (or create) the database file at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!(
        "failed to open database at {}: {}",
        path.display(),
        e
      ))
    })?;
    debug!(path = %path.display(), "opened offline database");

    Ok(Self::from_connection(conn))
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::Storage(format!("failed to open in-memory database: {}", e)))?;
    Ok(Self::from_connection(conn))
  }

  fn from_connection(conn: Connection) -> Self {
    Self {
      conn: Arc::new(Mutex::new(Some(conn))),
      clock: Arc::new(SystemClock),
    }
  }

  /// Use `clock` for `cached_at` / `created_at` stamps.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Create the tables if they do not exist yet. Safe to call repeatedly.
  pub async fn initialize(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Release the connection. Later operations fail with [`Error::Closed`].
  pub async fn close(&self) -> Result<()> {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let mut guard = conn
        .lock()
        .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))?;
      match guard.take() {
        Some(conn) => conn.close().map_err(|(_, e)| Error::from(e)),
        None => Ok(()),
      }
    })
    .await
    .map_err(|e| Error::Storage(format!("storage task failed: {}", e)))?
  }

  pub fn is_closed(&self) -> bool {
    self.conn.lock().map(|guard| guard.is_none()).unwrap_or(true)
  }

  pub fn guides(&self) -> GuideCache {
    GuideCache::new(self.clone())
  }

  pub fn queue(&self) -> ChangeQueue {
    ChangeQueue::new(self.clone())
  }

  pub(crate) fn now_millis(&self) -> i64 {
    self.clock.now_millis()
  }

  /// Run `f` against the connection on the blocking pool.
  pub(crate) async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let mut guard = conn
        .lock()
        .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))?;
      let conn = guard.as_mut().ok_or(Error::Closed)?;
      f(conn)
    })
    .await
    .map_err(|e| Error::Storage(format!("storage task failed: {}", e)))?
  }
}
