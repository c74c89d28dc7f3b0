//! Durable cache of the remote posts collection.
//!
//! One table keyed by post id, mirrored into a `watch` channel so every
//! observer sees the current snapshot immediately on subscription and a
//! fresh one after each successful mutation. Failed mutations leave the
//! channel untouched.

mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::sync::watch;

use crate::error::StorageError;
use crate::posts::Post;

/// A post row as persisted in the cache table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
  pub id: i64,
  pub user_id: i64,
  pub title: String,
  pub body: String,
}

impl PostRecord {
  /// Convert into the domain representation.
  pub fn into_post(self) -> Post {
    Post {
      id: self.id,
      user_id: self.user_id,
      title: self.title,
      body: self.body,
    }
  }
}

struct Inner {
  conn: Mutex<Connection>,
  snapshot: watch::Sender<Vec<PostRecord>>,
}

/// Durable post cache with a live snapshot stream.
///
/// Cloning is cheap and shares the same connection and stream.
#[derive(Clone)]
pub struct PostStore {
  inner: Arc<Inner>,
}

impl PostStore {
  /// Open or create the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self, StorageError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    Self::from_connection(conn)
  }

  /// Open a private in-memory cache.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self, StorageError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self, StorageError> {
    conn.execute_batch(schema::SCHEMA)?;

    // Seed the stream with whatever survived the last run, so the first
    // subscriber starts from the durable contents.
    let initial = read_all(&conn)?;
    let (snapshot, _) = watch::channel(initial);

    Ok(Self {
      inner: Arc::new(Inner {
        conn: Mutex::new(conn),
        snapshot,
      }),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
    self.inner.conn.lock().map_err(|_| StorageError::LockPoisoned)
  }

  /// Replace each record by id: a new id inserts, an existing id is fully
  /// overwritten. The batch commits atomically, so observers never see a
  /// partially-applied list.
  pub fn upsert_all(&self, records: &[PostRecord]) -> Result<(), StorageError> {
    let mut conn = self.lock()?;

    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO posts (id, user_id, title, body, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
      )?;
      for record in records {
        stmt.execute(params![record.id, record.user_id, record.title, record.body])?;
      }
    }
    tx.commit()?;

    let rows = read_all(&conn)?;
    tracing::debug!(count = rows.len(), "cache updated");
    self.inner.snapshot.send_replace(rows);
    Ok(())
  }

  /// Empty the table. Observers see one empty snapshot.
  pub fn clear_all(&self) -> Result<(), StorageError> {
    let conn = self.lock()?;
    conn.execute("DELETE FROM posts", [])?;

    tracing::info!("cache cleared");
    self.inner.snapshot.send_replace(Vec::new());
    Ok(())
  }

  /// Current table contents, ordered by id.
  pub fn all(&self) -> Result<Vec<PostRecord>, StorageError> {
    let conn = self.lock()?;
    read_all(&conn)
  }

  /// When the cached contents were last written, if ever.
  pub fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
    let conn = self.lock()?;
    let max: Option<String> =
      conn.query_row("SELECT MAX(cached_at) FROM posts", [], |row| row.get(0))?;
    max.as_deref().map(parse_datetime).transpose()
  }

  /// Subscribe to the live snapshot stream.
  ///
  /// Each subscription is independent: it yields the current contents on
  /// its first `next()`, then one snapshot per successful mutation.
  pub fn subscribe(&self) -> StoreWatch {
    StoreWatch {
      rx: self.inner.snapshot.subscribe(),
      primed: false,
    }
  }
}

/// A live view of the cache contents.
///
/// The stream never ends on its own; `next()` returns `None` only once
/// every `PostStore` handle has been dropped.
pub struct StoreWatch {
  rx: watch::Receiver<Vec<PostRecord>>,
  primed: bool,
}

impl StoreWatch {
  /// Wait for the next snapshot. The first call resolves immediately with
  /// the current contents.
  pub async fn next(&mut self) -> Option<Vec<PostRecord>> {
    if self.primed {
      self.rx.changed().await.ok()?;
    }
    self.primed = true;
    Some(self.rx.borrow_and_update().clone())
  }
}

fn read_all(conn: &Connection) -> Result<Vec<PostRecord>, StorageError> {
  let mut stmt = conn.prepare("SELECT id, user_id, title, body FROM posts ORDER BY id")?;
  let rows = stmt
    .query_map([], |row| {
      Ok(PostRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
      })
    })?
    .collect::<Result<Vec<_>, _>>()?;
  Ok(rows)
}

/// Parse a datetime in SQLite's `datetime('now')` format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
  let dt = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")?;
  Ok(dt.and_utc())
}
