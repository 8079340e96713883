//! Draft store for tapeout
//!
//! Persists two tables: `designs` (last known location and run pointer per
//! design) and `posts` (generated drafts and their lifecycle). The store
//! enforces that at most one post per design is `pending` at any time.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tapeout_db::DraftDb;
//!
//! let db = DraftDb::open("~/.tapeout/tapeout.sqlite3").await?;
//!
//! db.save_pending("chip_a", "Draft 1", "80%").await?;
//! if let Some(draft) = db.get_latest_pending().await? {
//!     db.mark_published(draft.id, "1790000000000000000").await?;
//! }
//! ```
//!
//! # Atomicity
//!
//! Every mutating method runs inside one SQLite transaction and holds an
//! in-process write gate for its duration, so concurrent callers sharing a
//! `DraftDb` (it is cheap to clone) are serialized. There is no composition
//! across calls: "read latest pending, then publish it" is two operations.

mod error;
mod schema;
mod types;

mod designs;
mod posts;

pub use error::{DbError, Result};
pub use types::*;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Handle to the draft database.
///
/// This is the only way to touch the `designs` and `posts` tables.
#[derive(Clone)]
pub struct DraftDb {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl DraftDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Draft store opened");
        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl DraftDb {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}
