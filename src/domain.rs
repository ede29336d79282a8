//! Domain module - records, derived entities and repository interfaces
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod analytics;
pub mod errors;
pub mod job;
pub mod repositories;
pub mod trend;
pub mod video;
pub mod watchlist;

pub use analytics::{ClusterEdge, ClusterGraph, ClusterNode, GrowthVideo, VelocityTier};
pub use errors::{ExtractionError, FetchError, PersistenceError, SchedulerError, TrendsError};
pub use job::{JobKey, JobResult, JobState, RunSummary};
pub use repositories::{
    Baseline, BatchWriteReport, SnapshotStore, TrendRepository, VideoQuery, VideoRepository,
    WatchlistRepository,
};
pub use trend::{GLOBAL_REGION, TrendRecord, TrendWindow, normalize_region};
pub use video::{TimePeriod, VideoCandidate, VideoRecord};
pub use watchlist::WatchlistEntry;
