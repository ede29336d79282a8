//! Application layer - pipeline services
//!
//! Keyword enrichment, de-duplication, growth classification and clustering are
//! pure computations; ingestion, trend refresh and scheduling coordinate them
//! with the infrastructure layer.

pub mod analysis;
pub mod dedup;
pub mod growth_classifier;
pub mod ingestion;
pub mod keyword_extractor;
pub mod scheduler;
pub mod topic_cluster;
pub mod trend_service;

// Re-export commonly used items
pub use analysis::{AnalysisService, GrowthReport};
pub use dedup::{DedupPlan, DedupReport, DeduplicationEngine};
pub use growth_classifier::GrowthVelocityClassifier;
pub use ingestion::{JobExecutor, StateObserver, VideoIngestionPipeline};
pub use keyword_extractor::{KeywordExtractor, KeywordSet};
pub use scheduler::{SchedulerState, SchedulingController};
pub use topic_cluster::TopicClusterBuilder;
pub use trend_service::{TrendRefresh, TrendService};
