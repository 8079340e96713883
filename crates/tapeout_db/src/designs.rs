//! Design pointer operations

use crate::error::Result;
use crate::types::DesignRecord;
use crate::DraftDb;
use sqlx::Row;
use tracing::debug;

impl DraftDb {
    /// Insert or replace the design named `name`, refreshing `last_updated`.
    pub async fn upsert_design(&self, name: &str, path: &str, last_run_id: &str) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let now = Self::now_millis();

        sqlx::query(
            r#"
            INSERT INTO designs (name, path, last_run_id, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                path = excluded.path,
                last_run_id = excluded.last_run_id,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(name)
        .bind(path)
        .bind(last_run_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(design = name, run = last_run_id, "Design upserted");
        Ok(())
    }

    /// Get a design by name.
    pub async fn get_design(&self, name: &str) -> Result<Option<DesignRecord>> {
        let row = sqlx::query(
            "SELECT name, path, last_run_id, last_updated FROM designs WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_design))
    }

    /// List all known designs, most recently updated first.
    pub async fn list_designs(&self) -> Result<Vec<DesignRecord>> {
        let rows = sqlx::query(
            "SELECT name, path, last_run_id, last_updated FROM designs ORDER BY last_updated DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_design).collect())
    }
}

fn row_to_design(row: &sqlx::sqlite::SqliteRow) -> DesignRecord {
    DesignRecord {
        name: row.get("name"),
        path: row.get("path"),
        last_run_id: row.get("last_run_id"),
        last_updated: DraftDb::millis_to_datetime(row.get::<i64, _>("last_updated")),
    }
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

    #[tokio::test]
    async fn upsert_inserts_then_replaces_by_name() {
        let (_tmp, db) = open_temp().await;

        db.upsert_design("chip_a", "/designs/chip_a", "RUN_1").await.unwrap();
        let first = db.get_design("chip_a").await.unwrap().unwrap();
        assert_eq!(first.last_run_id, "RUN_1");

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.upsert_design("chip_a", "/moved/chip_a", "RUN_2").await.unwrap();
        let second = db.get_design("chip_a").await.unwrap().unwrap();

        assert_eq!(second.path, "/moved/chip_a");
        assert_eq!(second.last_run_id, "RUN_2");
        assert!(second.last_updated > first.last_updated);
        assert_eq!(db.list_designs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_design_is_none() {
        let (_tmp, db) = open_temp().await;
        assert!(db.get_design("nope").await.unwrap().is_none());
        assert!(db.list_designs().await.unwrap().is_empty());
    }
}
