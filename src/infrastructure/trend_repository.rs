//! SQLite-backed trend repository

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::errors::PersistenceError;
use crate::domain::repositories::{PersistenceResult, TrendRepository};
use crate::domain::trend::{TrendRecord, TrendWindow};

#[derive(Clone)]
pub struct SqliteTrendRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteTrendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    fn row_to_trend(row: &SqliteRow) -> PersistenceResult<TrendRecord> {
        let window: String = row.try_get("time_period")?;
        let rank: i64 = row.try_get("rank")?;
        Ok(TrendRecord {
            keyword: row.try_get("keyword")?,
            rank: u32::try_from(rank).unwrap_or(u32::MAX),
            time_period: TrendWindow::parse(&window).ok_or_else(|| PersistenceError::InvalidRecord {
                id: window.clone(),
                reason: "unknown trend window".to_string(),
            })?,
            region: row.try_get("region")?,
            scraped_at: row.try_get("scraped_at")?,
        })
    }
}

#[async_trait]
impl TrendRepository for SqliteTrendRepository {
    async fn replace_trends(&self, trends: &[TrendRecord]) -> PersistenceResult<usize> {
        // First occurrence of a key wins within the incoming batch
        let mut seen = HashSet::new();
        let unique: Vec<&TrendRecord> = trends.iter().filter(|t| seen.insert(t.key())).collect();

        // A fresh scrape supersedes its whole (window, region) partition so ranks stay unique
        let partitions: HashSet<(&str, &str)> = unique
            .iter()
            .map(|t| (t.time_period.as_str(), t.region.as_str()))
            .collect();

        let mut tx = self.pool.begin().await?;
        for (window, region) in &partitions {
            sqlx::query("DELETE FROM trends WHERE time_period = ? AND region = ?")
                .bind(*window)
                .bind(*region)
                .execute(&mut *tx)
                .await?;
        }
        for trend in &unique {
            sqlx::query("DELETE FROM trends WHERE lower(keyword) = ? AND time_period = ? AND region = ?")
                .bind(trend.keyword.to_lowercase())
                .bind(trend.time_period.as_str())
                .bind(&trend.region)
                .execute(&mut *tx)
                .await?;

            sqlx::query("INSERT INTO trends (keyword, rank, time_period, region, scraped_at) VALUES (?, ?, ?, ?, ?)")
                .bind(&trend.keyword)
                .bind(i64::from(trend.rank))
                .bind(trend.time_period.as_str())
                .bind(&trend.region)
                .bind(trend.scraped_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("Replaced {} trend rows ({} duplicates dropped)", unique.len(), trends.len() - unique.len());
        Ok(unique.len())
    }

    async fn find_trends(&self, window: TrendWindow, region: &str) -> PersistenceResult<Vec<TrendRecord>> {
        let rows = sqlx::query("SELECT * FROM trends WHERE time_period = ? AND region = ? ORDER BY rank ASC, id ASC")
            .bind(window.as_str())
            .bind(region)
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(Self::row_to_trend).collect()
    }

    async fn count_trends(&self) -> PersistenceResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trends")
            .fetch_one(&*self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;

    async fn pool() -> SqlitePool {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.pool().clone()
    }

    #[tokio::test]
    async fn test_replace_trends_keeps_one_row_per_key() {
        let repo = SqliteTrendRepository::new(pool().await);
        repo.replace_trends(&[TrendRecord::new("foo", 1, TrendWindow::Today, "US")])
            .await
            .unwrap();
        repo.replace_trends(&[TrendRecord::new("foo", 3, TrendWindow::Today, "US")])
            .await
            .unwrap();

        let rows = repo.find_trends(TrendWindow::Today, "US").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 3);
        assert_eq!(repo.count_trends().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_trends_dedupes_incoming_batch() {
        let repo = SqliteTrendRepository::new(pool().await);
        let written = repo
            .replace_trends(&[
                TrendRecord::new("Foo", 1, TrendWindow::SevenDays, ""),
                TrendRecord::new("foo", 2, TrendWindow::SevenDays, ""),
                TrendRecord::new("bar", 3, TrendWindow::SevenDays, ""),
            ])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let rows = repo.find_trends(TrendWindow::SevenDays, "GLOBAL").await.unwrap();
        let keywords: Vec<_> = rows.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["Foo", "bar"]);
    }

    #[tokio::test]
    async fn test_fresh_scrape_supersedes_partition_ranks() {
        let repo = SqliteTrendRepository::new(pool().await);
        repo.replace_trends(&[
            TrendRecord::new("old1", 1, TrendWindow::Today, "US"),
            TrendRecord::new("old2", 2, TrendWindow::Today, "US"),
            TrendRecord::new("elsewhere", 1, TrendWindow::Today, "DE"),
        ])
        .await
        .unwrap();
        repo.replace_trends(&[
            TrendRecord::new("new1", 1, TrendWindow::Today, "US"),
            TrendRecord::new("new2", 2, TrendWindow::Today, "US"),
        ])
        .await
        .unwrap();

        let rows = repo.find_trends(TrendWindow::Today, "US").await.unwrap();
        let ranked: Vec<_> = rows.iter().map(|t| (t.keyword.as_str(), t.rank)).collect();
        assert_eq!(ranked, vec![("new1", 1), ("new2", 2)]);

        let ranks: HashSet<u32> = rows.iter().map(|t| t.rank).collect();
        assert_eq!(ranks.len(), rows.len());
        assert_eq!(repo.find_trends(TrendWindow::Today, "DE").await.unwrap().len(), 1);
    }
}
