// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::Path;

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::info;

use crate::infrastructure::config::DatabaseConfig;

#[derive(Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_max_connections(&config.url, config.max_connections).await
    }

    async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        // Make sure the database file exists so the pool can open it
        if !db_path.starts_with(":memory:") && !Path::new(db_path).exists() {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::File::create(db_path).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to database: {}", database_url);
        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every connection would otherwise
    /// see its own empty database
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_videos_sql = r#"
            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                channel TEXT NOT NULL DEFAULT '',
                views INTEGER NOT NULL DEFAULT 0,
                upload_date TEXT NOT NULL DEFAULT '',
                niche TEXT NOT NULL DEFAULT '',
                keywords TEXT NOT NULL DEFAULT '[]',
                time_period TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;

        let create_trends_sql = r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword TEXT NOT NULL,
                rank INTEGER NOT NULL,
                time_period TEXT NOT NULL,
                region TEXT NOT NULL,
                scraped_at DATETIME NOT NULL
            )
        "#;

        let create_watchlist_sql = r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                video_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                channel TEXT NOT NULL DEFAULT '',
                views INTEGER NOT NULL DEFAULT 0,
                niche TEXT NOT NULL DEFAULT '',
                notes TEXT,
                added_at DATETIME NOT NULL
            )
        "#;

        let create_snapshots_sql = r#"
            CREATE TABLE IF NOT EXISTS view_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                views INTEGER NOT NULL,
                captured_at DATETIME NOT NULL
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_videos_niche ON videos (niche);
            CREATE INDEX IF NOT EXISTS idx_videos_created_at ON videos (created_at);
            CREATE INDEX IF NOT EXISTS idx_trends_key ON trends (keyword, time_period, region);
            CREATE INDEX IF NOT EXISTS idx_snapshots_video ON view_snapshots (video_id, captured_at);
        "#;

        sqlx::query(create_videos_sql).execute(&self.pool).await?;
        sqlx::query(create_trends_sql).execute(&self.pool).await?;
        sqlx::query(create_watchlist_sql).execute(&self.pool).await?;
        sqlx::query(create_snapshots_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        Ok(())
    }
}
