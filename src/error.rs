//! Failure taxonomy for the sync core.
//!
//! Remote and storage failures stay distinct so callers can tell a dead
//! network from a dead disk. `SyncError` wraps whichever side failed first
//! without adding message text of its own.

use thiserror::Error;

/// A failure reaching or decoding the remote collection.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// Network-level failure: unreachable host, timeout, TLS.
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The endpoint answered with a non-success status.
  #[error("unexpected status {0}")]
  Status(reqwest::StatusCode),

  /// The response body does not match the expected schema.
  #[error("malformed payload: {0}")]
  Decode(#[from] serde_json::Error),
}

/// A failure in the local cache store.
#[derive(Debug, Error)]
pub enum StorageError {
  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("unreadable timestamp: {0}")]
  Timestamp(#[from] chrono::ParseError),

  /// A thread panicked while holding the connection lock.
  #[error("connection lock poisoned")]
  LockPoisoned,
}

/// A failed sync attempt, carrying the side that failed first.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Remote(#[from] RemoteError),

  #[error(transparent)]
  Storage(#[from] StorageError),
}
