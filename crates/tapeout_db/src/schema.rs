//! Table creation for the draft store.
//!
//! All CREATE TABLE statements live here. Timestamps are INTEGER
//! milliseconds since the Unix epoch.

use crate::error::Result;
use crate::DraftDb;
use tracing::debug;

impl DraftDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // WAL lets readers proceed while a save/confirm transaction is open
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS designs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                last_run_id TEXT NOT NULL DEFAULT '',
                last_updated INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // No uniqueness constraint on pending posts: save_pending supersedes
        // older drafts inside the same transaction that inserts the new one.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                design_name TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'cancelled', 'published')),
                readiness_score TEXT NOT NULL DEFAULT '',
                external_id TEXT,
                created_at INTEGER NOT NULL,
                published_at INTEGER
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_status_created ON posts(status, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_design ON posts(design_name, status)")
            .execute(&self.pool)
            .await?;

        debug!("Draft store schema verified");
        Ok(())
    }
}
