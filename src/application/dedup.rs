//! Near-duplicate video removal
//!
//! Detection is pure: records sharing a normalized (title, channel) key collapse
//! to the highest-views survivor, ties keeping the first seen. Execution deletes
//! the duplicate ids in fixed-size batches; a failed batch is logged and the
//! remaining batches still run.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::PersistenceError;
use crate::domain::repositories::{VideoQuery, VideoRepository, WatchlistRepository};
use crate::domain::video::VideoRecord;
use crate::infrastructure::config::DedupConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupPlan {
    pub survivors: Vec<VideoRecord>,
    pub duplicate_ids: Vec<String>,
    /// Protected ids that would otherwise have been deleted
    pub retained_protected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub requested: usize,
    pub deleted: u64,
    pub failed_batches: usize,
    pub errors: Vec<String>,
}

impl DedupReport {
    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0
    }
}

fn group_key(record: &VideoRecord) -> (String, String) {
    (
        record.title.trim().to_lowercase(),
        record.channel.trim().to_lowercase(),
    )
}

pub struct DeduplicationEngine {
    batch_size: usize,
}

impl DeduplicationEngine {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
        }
    }

    /// Pick one survivor per group; `protected` ids never appear in `duplicate_ids`
    pub fn detect(&self, records: &[VideoRecord], protected: &HashSet<String>) -> DedupPlan {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut groups: HashMap<(String, String), Vec<&VideoRecord>> = HashMap::new();
        for record in records {
            let key = group_key(record);
            let group = groups.entry(key.clone()).or_default();
            if group.is_empty() {
                order.push(key);
            }
            group.push(record);
        }

        let mut plan = DedupPlan::default();
        for key in &order {
            let Some(group) = groups.get(key) else { continue };

            // Strictly greater keeps the first seen on ties
            let mut survivor = group[0];
            for &record in group.iter().skip(1) {
                if record.views > survivor.views {
                    survivor = record;
                }
            }
            plan.survivors.push(survivor.clone());

            for record in group {
                if record.id == survivor.id {
                    continue;
                }
                if protected.contains(&record.id) {
                    plan.retained_protected.push(record.id.clone());
                } else {
                    plan.duplicate_ids.push(record.id.clone());
                }
            }
        }
        plan
    }

    pub async fn execute(&self, repo: &dyn VideoRepository, plan: &DedupPlan) -> DedupReport {
        let mut report = DedupReport {
            requested: plan.duplicate_ids.len(),
            ..DedupReport::default()
        };

        for (index, batch) in plan.duplicate_ids.chunks(self.batch_size).enumerate() {
            match repo.delete_by_ids(batch).await {
                Ok(deleted) => report.deleted += deleted,
                Err(e) => {
                    warn!("⚠️ Dedup batch {} ({} ids) failed: {}", index + 1, batch.len(), e);
                    report.failed_batches += 1;
                    report.errors.push(format!("batch {}: {}", index + 1, e));
                }
            }
        }
        report
    }

    /// Load everything, protect watchlisted ids, detect, then delete
    pub async fn run(
        &self,
        videos: &dyn VideoRepository,
        watchlist: &dyn WatchlistRepository,
    ) -> Result<DedupReport, PersistenceError> {
        let protected = watchlist.protected_ids().await?;
        let records = videos.find(&VideoQuery::default()).await?;

        let plan = self.detect(&records, &protected);
        let report = self.execute(videos, &plan).await;
        info!(
            "🧹 Dedup: {} records, {} duplicates, {} deleted, {} protected kept, {} failed batches",
            records.len(),
            report.requested,
            report.deleted,
            plan.retained_protected.len(),
            report.failed_batches
        );
        Ok(report)
    }
}
