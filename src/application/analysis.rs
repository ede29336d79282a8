//! Read-side analysis over the persisted video set
//!
//! Both reports are batch computations over a filtered select; they never
//! write, so they may run alongside an in-flight ingestion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::application::growth_classifier::GrowthVelocityClassifier;
use crate::application::topic_cluster::TopicClusterBuilder;
use crate::domain::analytics::{ClusterGraph, GrowthVideo};
use crate::domain::errors::PersistenceError;
use crate::domain::repositories::{SnapshotStore, VideoQuery, VideoRepository};
use crate::domain::video::TimePeriod;

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub time_period: TimePeriod,
    pub generated_at: DateTime<Utc>,
    /// Every classified video, fastest first
    pub all: Vec<GrowthVideo>,
    /// Subset passing the significance filter
    pub notable: Vec<GrowthVideo>,
}

pub struct AnalysisService {
    videos: Arc<dyn VideoRepository>,
    snapshots: Arc<dyn SnapshotStore>,
    classifier: GrowthVelocityClassifier,
    clusters: TopicClusterBuilder,
}

fn scoped_query(period: TimePeriod, niche: Option<&str>, now: DateTime<Utc>) -> VideoQuery {
    let mut query = VideoQuery::default();
    if let Some(window) = period.window() {
        query = query.created_between(Some(now - window), None);
    }
    match niche.map(str::trim) {
        Some(niche) if !niche.is_empty() => query.with_niche(niche.to_lowercase()),
        _ => query,
    }
}

impl AnalysisService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        snapshots: Arc<dyn SnapshotStore>,
        classifier: GrowthVelocityClassifier,
        clusters: TopicClusterBuilder,
    ) -> Self {
        Self {
            videos,
            snapshots,
            classifier,
            clusters,
        }
    }

    pub async fn growth_report(&self, period: TimePeriod, niche: Option<&str>) -> Result<GrowthReport, PersistenceError> {
        let now = Utc::now();
        let records = self.videos.find(&scoped_query(period, niche, now)).await?;

        let mut all = Vec::with_capacity(records.len());
        for record in &records {
            let baseline = self.snapshots.baseline(record, period).await?;
            all.push(self.classifier.classify(record, period, baseline, now));
        }
        all.sort_by(|a, b| b.velocity_score.total_cmp(&a.velocity_score));

        let notable: Vec<GrowthVideo> = all.iter().filter(|g| self.classifier.is_notable(g)).cloned().collect();
        info!(
            "📈 Growth report [{}]: {} videos, {} notable",
            period,
            all.len(),
            notable.len()
        );

        Ok(GrowthReport {
            time_period: period,
            generated_at: now,
            all,
            notable,
        })
    }

    pub async fn topic_clusters(&self, niche: Option<&str>) -> Result<ClusterGraph, PersistenceError> {
        let records = self
            .videos
            .find(&scoped_query(TimePeriod::All, niche, Utc::now()))
            .await?;
        Ok(self.clusters.build(&records))
    }
}
