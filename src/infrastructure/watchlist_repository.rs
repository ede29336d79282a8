use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::domain::repositories::{PersistenceResult, WatchlistRepository};
use crate::domain::watchlist::WatchlistEntry;

/// Watchlist rows live in their own table and survive `clear_all` on videos
#[derive(Clone)]
pub struct SqliteWatchlistRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteWatchlistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl WatchlistRepository for SqliteWatchlistRepository {
    async fn add(&self, entry: &WatchlistEntry) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO watchlist (video_id, title, channel, views, niche, notes, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.video_id)
        .bind(&entry.title)
        .bind(&entry.channel)
        .bind(i64::try_from(entry.views).unwrap_or(i64::MAX))
        .bind(&entry.niche)
        .bind(&entry.notes)
        .bind(entry.added_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, video_id: &str) -> PersistenceResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE video_id = ?")
            .bind(video_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> PersistenceResult<Vec<WatchlistEntry>> {
        let rows = sqlx::query("SELECT * FROM watchlist ORDER BY added_at DESC")
            .fetch_all(&*self.pool)
            .await?;

        rows.iter()
            .map(|row| -> PersistenceResult<WatchlistEntry> {
                let views: i64 = row.try_get("views")?;
                Ok(WatchlistEntry {
                    video_id: row.try_get("video_id")?,
                    title: row.try_get("title")?,
                    channel: row.try_get("channel")?,
                    views: u64::try_from(views).unwrap_or_default(),
                    niche: row.try_get("niche")?,
                    notes: row.try_get("notes")?,
                    added_at: row.try_get("added_at")?,
                })
            })
            .collect()
    }

    async fn protected_ids(&self) -> PersistenceResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT video_id FROM watchlist")
            .fetch_all(&*self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }
}
