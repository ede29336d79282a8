//! Repository interfaces for the ingestion pipeline
//!
//! The persistence layer owns `VideoRecord` and `TrendRecord`; everything else
//! reaches them through these traits.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::PersistenceError;
use crate::domain::trend::{TrendRecord, TrendWindow};
use crate::domain::video::{TimePeriod, VideoRecord};
use crate::domain::watchlist::WatchlistEntry;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Filter for video selects and counts
#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
    pub niche: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub time_period: Option<TimePeriod>,
    pub limit: Option<u32>,
}

impl VideoQuery {
    pub fn with_niche(mut self, niche: impl Into<String>) -> Self {
        self.niche = Some(niche.into());
        self
    }

    pub fn created_between(mut self, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of a batched write; failures are per record and never abort the batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert, or overwrite views/updated_at and union keywords for an existing id
    async fn upsert(&self, video: &VideoRecord) -> PersistenceResult<()>;
    async fn upsert_batch(&self, videos: &[VideoRecord]) -> BatchWriteReport;
    async fn find_by_id(&self, id: &str) -> PersistenceResult<Option<VideoRecord>>;
    async fn find(&self, query: &VideoQuery) -> PersistenceResult<Vec<VideoRecord>>;
    async fn count(&self, query: &VideoQuery) -> PersistenceResult<u64>;
    /// Returns the number of rows removed
    async fn delete_by_ids(&self, ids: &[String]) -> PersistenceResult<u64>;
    async fn clear_all(&self) -> PersistenceResult<u64>;
}

#[async_trait]
pub trait TrendRepository: Send + Sync {
    /// Purge rows sharing a (keyword, time_period, region) key, then insert
    async fn replace_trends(&self, trends: &[TrendRecord]) -> PersistenceResult<usize>;
    async fn find_trends(&self, window: TrendWindow, region: &str) -> PersistenceResult<Vec<TrendRecord>>;
    async fn count_trends(&self) -> PersistenceResult<u64>;
}

#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    async fn add(&self, entry: &WatchlistEntry) -> PersistenceResult<()>;
    async fn remove(&self, video_id: &str) -> PersistenceResult<bool>;
    async fn list(&self) -> PersistenceResult<Vec<WatchlistEntry>>;
    /// Ids that de-duplication must never delete
    async fn protected_ids(&self) -> PersistenceResult<HashSet<String>>;
}

/// Baseline view count consumed by the growth classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub views: u64,
    /// True when synthesized rather than observed
    pub estimated: bool,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn baseline(&self, video: &VideoRecord, period: TimePeriod) -> PersistenceResult<Baseline>;
}
