//! Post lifecycle operations (pending -> cancelled | published)

use crate::error::{DbError, Result};
use crate::types::{PendingDraft, PostFilter, PostRecord, PostStatus, SavedDraft};
use crate::DraftDb;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

const POST_COLUMNS: &str =
    "id, design_name, content, status, readiness_score, external_id, created_at, published_at";

impl DraftDb {
    /// Save a new pending draft for `design_name`.
    ///
    /// Older pending drafts of the same design are cancelled first, in the
    /// same transaction, so the design never has two pending posts.
    pub async fn save_pending(
        &self,
        design_name: &str,
        content: &str,
        readiness_score: &str,
    ) -> Result<SavedDraft> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let superseded = sqlx::query(
            "UPDATE posts SET status = 'cancelled' WHERE design_name = ? AND status = 'pending'",
        )
        .bind(design_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let post_id = sqlx::query(
            r#"
            INSERT INTO posts (design_name, content, status, readiness_score, created_at)
            VALUES (?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(design_name)
        .bind(content)
        .bind(readiness_score)
        .bind(Self::now_millis())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(
            design = design_name,
            post_id,
            superseded,
            "Pending draft saved"
        );
        Ok(SavedDraft {
            post_id,
            superseded,
        })
    }

    /// The most recently created pending post across all designs.
    pub async fn get_latest_pending(&self) -> Result<Option<PendingDraft>> {
        let row = sqlx::query(
            r#"
            SELECT id, design_name, content, readiness_score, created_at
            FROM posts
            WHERE status = 'pending'
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PendingDraft {
            id: row.get("id"),
            design_name: row.get("design_name"),
            content: row.get("content"),
            readiness_score: row.get("readiness_score"),
            created_at: Self::millis_to_datetime(row.get::<i64, _>("created_at")),
        }))
    }

    /// Mark the pending post `post_id` as published.
    ///
    /// Returns `false` if the post exists but is no longer pending (it was
    /// superseded or already published); the row is left untouched.
    pub async fn mark_published(&self, post_id: i64, external_id: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let status: Option<String> = sqlx::query("SELECT status FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get("status"));

        let Some(status) = status else {
            tx.rollback().await?;
            return Err(DbError::not_found(format!("Post {} does not exist", post_id)));
        };
        if parse_status(&status)? != PostStatus::Pending {
            tx.rollback().await?;
            debug!(post_id, status = %status, "Post is not pending, publish not recorded");
            return Ok(false);
        }

        // Another handle on the same file does not share the write gate.
        let affected = sqlx::query(
            r#"
            UPDATE posts SET
                status = 'published',
                external_id = ?,
                published_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(external_id)
        .bind(Self::now_millis())
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if affected == 0 {
            debug!(post_id, "Post left pending state concurrently, publish not recorded");
            return Ok(false);
        }
        info!(post_id, external_id, "Post marked published");
        Ok(true)
    }

    /// Mark the newest pending post whose text equals `content` as published.
    ///
    /// Identical drafts are ambiguous here; only one row (the newest) moves.
    /// Prefer [`DraftDb::mark_published`] when the id is known.
    pub async fn mark_published_by_content(&self, content: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().await;

        let affected = sqlx::query(
            r#"
            UPDATE posts SET
                status = 'published',
                published_at = ?
            WHERE id = (
                SELECT id FROM posts
                WHERE content = ? AND status = 'pending'
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(Self::now_millis())
        .bind(content)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    /// Get a post by id.
    pub async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_post).transpose()
    }

    /// List posts, newest first.
    pub async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM posts WHERE 1=1", POST_COLUMNS));

        if let Some(design) = &filter.design_name {
            query.push(" AND design_name = ").push_bind(design.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_post).collect()
    }
}

fn parse_status(raw: &str) -> Result<PostStatus> {
    PostStatus::parse(raw)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown post status: {}", raw)))
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<PostRecord> {
    let status: String = row.get("status");
    Ok(PostRecord {
        id: row.get("id"),
        design_name: row.get("design_name"),
        content: row.get("content"),
        status: parse_status(&status)?,
        readiness_score: row.get("readiness_score"),
        external_id: row.get("external_id"),
        created_at: DraftDb::millis_to_datetime(row.get::<i64, _>("created_at")),
        published_at: row
            .get::<Option<i64>, _>("published_at")
            .map(DraftDb::millis_to_datetime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_temp() -> (TempDir, DraftDb) {
        let tmp = TempDir::new().unwrap();
        let db = DraftDb::open(tmp.path().join("drafts.sqlite3")).await.unwrap();
        (tmp, db)
    }

    async fn statuses(db: &DraftDb, design: &str) -> Vec<(String, PostStatus)> {
        let filter = PostFilter {
            design_name: Some(design.to_string()),
            ..Default::default()
        };
        db.list_posts(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.content, p.status))
            .collect()
    }

    #[tokio::test]
    async fn second_draft_supersedes_first() {
        let (_tmp, db) = open_temp().await;

        let first = db.save_pending("chip_a", "Draft 1", "80%").await.unwrap();
        let second = db.save_pending("chip_a", "Draft 2", "85%").await.unwrap();

        assert_eq!(first.superseded, 0);
        assert_eq!(second.superseded, 1);
        assert_eq!(
            statuses(&db, "chip_a").await,
            vec![
                ("Draft 2".to_string(), PostStatus::Pending),
                ("Draft 1".to_string(), PostStatus::Cancelled),
            ]
        );

        let latest = db.get_latest_pending().await.unwrap().unwrap();
        assert_eq!(latest.content, "Draft 2");
        assert_eq!(latest.design_name, "chip_a");
        assert_eq!(latest.readiness_score, "85%");
    }

    #[tokio::test]
    async fn other_designs_are_not_superseded() {
        let (_tmp, db) = open_temp().await;

        db.save_pending("chip_a", "A1", "70%").await.unwrap();
        let saved = db.save_pending("chip_b", "B1", "90%").await.unwrap();
        assert_eq!(saved.superseded, 0);

        let pending = PostFilter {
            status: Some(PostStatus::Pending),
            ..Default::default()
        };
        assert_eq!(db.list_posts(&pending).await.unwrap().len(), 2);

        // Global "one active draft": the newest pending wins regardless of design.
        let latest = db.get_latest_pending().await.unwrap().unwrap();
        assert_eq!(latest.design_name, "chip_b");
    }

    #[tokio::test]
    async fn mark_published_by_content_clears_pending() {
        let (_tmp, db) = open_temp().await;

        db.save_pending("chip_a", "Draft 1", "80%").await.unwrap();
        db.save_pending("chip_a", "Draft 2", "85%").await.unwrap();

        assert!(db.mark_published_by_content("Draft 2").await.unwrap());
        assert!(db.get_latest_pending().await.unwrap().is_none());
        assert_eq!(
            statuses(&db, "chip_a").await,
            vec![
                ("Draft 2".to_string(), PostStatus::Published),
                ("Draft 1".to_string(), PostStatus::Cancelled),
            ]
        );

        // Cancelled and published rows never move again.
        assert!(!db.mark_published_by_content("Draft 1").await.unwrap());
        assert!(!db.mark_published_by_content("Draft 2").await.unwrap());
    }

    #[tokio::test]
    async fn mark_published_by_id_records_external_id() {
        let (_tmp, db) = open_temp().await;

        let saved = db.save_pending("chip_a", "Draft", "80%").await.unwrap();
        assert!(db.mark_published(saved.post_id, "tw-123").await.unwrap());

        let post = db.get_post(saved.post_id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.external_id.as_deref(), Some("tw-123"));
        assert!(post.published_at.is_some());

        // Published is terminal.
        assert!(!db.mark_published(saved.post_id, "tw-456").await.unwrap());
        let post = db.get_post(saved.post_id).await.unwrap().unwrap();
        assert_eq!(post.external_id.as_deref(), Some("tw-123"));
    }

    #[tokio::test]
    async fn mark_published_on_superseded_draft_is_refused() {
        let (_tmp, db) = open_temp().await;

        let old = db.save_pending("chip_a", "Old", "50%").await.unwrap();
        db.save_pending("chip_a", "New", "60%").await.unwrap();

        assert!(!db.mark_published(old.post_id, "tw-1").await.unwrap());
        let post = db.get_post(old.post_id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Cancelled);
        assert!(post.external_id.is_none());
    }

    #[tokio::test]
    async fn mark_published_unknown_id_is_not_found() {
        let (_tmp, db) = open_temp().await;
        let err = db.mark_published(42, "x").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn identical_text_publishes_only_newest() {
        let (_tmp, db) = open_temp().await;

        let a = db.save_pending("chip_a", "", "0%").await.unwrap();
        let b = db.save_pending("chip_b", "", "0%").await.unwrap();

        assert!(db.mark_published_by_content("").await.unwrap());
        let a = db.get_post(a.post_id).await.unwrap().unwrap();
        let b = db.get_post(b.post_id).await.unwrap().unwrap();
        assert_eq!(a.status, PostStatus::Pending);
        assert_eq!(b.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn list_posts_applies_limit() {
        let (_tmp, db) = open_temp().await;
        for i in 0..5 {
            db.save_pending("chip_a", &format!("Draft {}", i), "1%")
                .await
                .unwrap();
        }

        let filter = PostFilter {
            limit: Some(2),
            ..Default::default()
        };
        let posts = db.list_posts(&filter).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].content, "Draft 4");
        assert_eq!(posts[1].content, "Draft 3");
    }
}
