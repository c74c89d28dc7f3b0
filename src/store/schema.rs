//! SQLite schema for the local posts cache.

/// Cache table: one row per post, keyed by the remote id.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
