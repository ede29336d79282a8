//! SQLite-backed video repository
//!
//! Keywords are stored as a JSON array; every upsert also records a
//! `view_snapshots` observation so growth baselines can come from real data.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::domain::errors::PersistenceError;
use crate::domain::repositories::{BatchWriteReport, PersistenceResult, VideoQuery, VideoRepository};
use crate::domain::video::{TimePeriod, VideoRecord};

#[derive(Clone)]
pub struct SqliteVideoRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn row_to_video(row: &SqliteRow) -> PersistenceResult<VideoRecord> {
        let keywords: String = row.try_get("keywords")?;
        let views: i64 = row.try_get("views")?;
        let time_period: Option<String> = row.try_get("time_period")?;

        Ok(VideoRecord {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            channel: row.try_get("channel")?,
            views: u64::try_from(views).unwrap_or_default(),
            upload_date: row.try_get("upload_date")?,
            niche: row.try_get("niche")?,
            keywords: serde_json::from_str(&keywords)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            time_period: time_period.and_then(|p| p.parse::<TimePeriod>().ok()),
        })
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &VideoQuery) {
        builder.push(" WHERE 1 = 1");
        if let Some(niche) = &query.niche {
            builder.push(" AND niche = ").push_bind(niche.clone());
        }
        if let Some(after) = query.created_after {
            builder.push(" AND created_at >= ").push_bind(after);
        }
        if let Some(before) = query.created_before {
            builder.push(" AND created_at <= ").push_bind(before);
        }
        if let Some(period) = query.time_period {
            builder.push(" AND time_period = ").push_bind(period.as_str());
        }
    }
}

fn views_to_db(views: u64) -> i64 {
    i64::try_from(views).unwrap_or(i64::MAX)
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn upsert(&self, video: &VideoRecord) -> PersistenceResult<()> {
        video.validate()?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar("SELECT keywords FROM videos WHERE id = ?")
            .bind(&video.id)
            .fetch_optional(&mut *tx)
            .await?;

        // Re-scrapes never drop previously known keywords
        let mut merged = match existing {
            Some(json) => VideoRecord {
                keywords: serde_json::from_str(&json)?,
                ..video.clone()
            },
            None => video.clone(),
        };
        merged.merge_keywords(&video.keywords);
        let keywords = serde_json::to_string(&merged.keywords)?;

        sqlx::query(
            r#"
            INSERT INTO videos
            (id, title, channel, views, upload_date, niche, keywords, time_period, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                channel = excluded.channel,
                views = excluded.views,
                upload_date = excluded.upload_date,
                keywords = excluded.keywords,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&video.id)
        .bind(&video.title)
        .bind(&video.channel)
        .bind(views_to_db(video.views))
        .bind(&video.upload_date)
        .bind(&video.niche)
        .bind(&keywords)
        .bind(video.time_period.map(TimePeriod::as_str))
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO view_snapshots (video_id, views, captured_at) VALUES (?, ?, ?)")
            .bind(&video.id)
            .bind(views_to_db(video.views))
            .bind(video.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Upserted video {} ({} views)", video.id, video.views);
        Ok(())
    }

    async fn upsert_batch(&self, videos: &[VideoRecord]) -> BatchWriteReport {
        let mut report = BatchWriteReport::default();
        for video in videos {
            match self.upsert(video).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!("Failed to upsert video {}: {}", video.id, e);
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", video.id, e));
                }
            }
        }
        report
    }

    async fn find_by_id(&self, id: &str) -> PersistenceResult<Option<VideoRecord>> {
        let row = sqlx::query("SELECT * FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(Self::row_to_video).transpose()
    }

    async fn find(&self, query: &VideoQuery) -> PersistenceResult<Vec<VideoRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM videos");
        Self::push_filters(&mut builder, query);
        builder.push(" ORDER BY views DESC, id ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&*self.pool).await?;
        rows.iter().map(Self::row_to_video).collect()
    }

    async fn count(&self, query: &VideoQuery) -> PersistenceResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM videos");
        Self::push_filters(&mut builder, query);
        let count: i64 = builder.build_query_scalar().fetch_one(&*self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> PersistenceResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM videos WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&*self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn clear_all(&self) -> PersistenceResult<u64> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM videos").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM view_snapshots").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

/// Latest observed view count at or before `at`
pub(crate) async fn snapshot_at_or_before(
    pool: &SqlitePool,
    video_id: &str,
    at: DateTime<Utc>,
) -> PersistenceResult<Option<u64>> {
    let views: Option<i64> = sqlx::query_scalar(
        "SELECT views FROM view_snapshots WHERE video_id = ? AND captured_at <= ? ORDER BY captured_at DESC LIMIT 1",
    )
    .bind(video_id)
    .bind(at)
    .fetch_optional(pool)
    .await
    .map_err(PersistenceError::from)?;
    Ok(views.and_then(|v| u64::try_from(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use chrono::Duration;

    async fn repository() -> SqliteVideoRepository {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        SqliteVideoRepository::new(db.pool().clone())
    }

    fn video(id: &str, views: u64, niche: &str, keywords: &[&str]) -> VideoRecord {
        let now = Utc::now();
        VideoRecord {
            id: id.to_string(),
            title: format!("Video {id}"),
            channel: "Channel".to_string(),
            views,
            upload_date: "2 days ago".to_string(),
            niche: niche.to_string(),
            keywords: keywords.iter().map(ToString::to_string).collect(),
            created_at: now,
            updated_at: now,
            time_period: Some(TimePeriod::Day),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_views_and_unions_keywords() {
        let repo = repository().await;
        repo.upsert(&video("a", 100, "gaming", &["alpha", "beta"])).await.unwrap();
        repo.upsert(&video("a", 250, "gaming", &["beta", "gamma"])).await.unwrap();

        let stored = repo.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.views, 250);
        assert_eq!(stored.keywords, vec!["alpha", "beta", "gamma"]);
        assert_eq!(repo.count(&VideoQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_record() {
        let repo = repository().await;
        let mut bad = video("", 1, "gaming", &[]);
        bad.id = String::new();
        assert!(repo.upsert(&bad).await.is_err());

        let report = repo.upsert_batch(&[bad, video("ok", 1, "gaming", &[])]).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_find_filters_by_niche_and_created_range() {
        let repo = repository().await;
        let mut old = video("old", 10, "music", &[]);
        old.created_at = Utc::now() - Duration::days(40);
        repo.upsert(&old).await.unwrap();
        repo.upsert(&video("new", 20, "music", &[])).await.unwrap();
        repo.upsert(&video("other", 30, "gaming", &[])).await.unwrap();

        let recent = VideoQuery::default()
            .with_niche("music")
            .created_between(Some(Utc::now() - Duration::days(7)), None);
        let found = repo.find(&recent).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "new");
        assert_eq!(repo.count(&VideoQuery::default().with_niche("music")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_ids_and_clear_all() {
        let repo = repository().await;
        for id in ["a", "b", "c"] {
            repo.upsert(&video(id, 1, "gaming", &[])).await.unwrap();
        }
        let deleted = repo.delete_by_ids(&["a".to_string(), "missing".to_string()]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(repo.clear_all().await.unwrap(), 2);
        assert_eq!(repo.count(&VideoQuery::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_all_is_atomic() {
        let repo = repository().await;
        repo.upsert(&video("a", 10, "music", &[])).await.unwrap();
        sqlx::query("DROP TABLE view_snapshots").execute(&*repo.pool).await.unwrap();

        assert!(repo.clear_all().await.is_err());
        assert_eq!(repo.count(&VideoQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_rows_are_recorded() {
        let repo = repository().await;
        let mut first = video("a", 100, "gaming", &[]);
        first.updated_at = Utc::now() - Duration::days(3);
        repo.upsert(&first).await.unwrap();
        repo.upsert(&video("a", 400, "gaming", &[])).await.unwrap();

        let before = snapshot_at_or_before(&repo.pool, "a", Utc::now() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(before, Some(100));
    }
}
