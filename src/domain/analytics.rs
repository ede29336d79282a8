//! Derived, never-persisted analysis entities
//!
//! These are produced per analysis request and handed to the presentation
//! layer as plain structured data.

use serde::{Deserialize, Serialize};

use super::video::VideoRecord;

/// Qualitative growth bucket, ordered slowest to fastest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityTier {
    Slow,
    Normal,
    Fast,
    Viral,
}

impl VelocityTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
            Self::Viral => "viral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthVideo {
    #[serde(flatten)]
    pub video: VideoRecord,
    pub initial_views: u64,
    /// Views gained per day of age
    pub growth_rate: f64,
    pub growth_percentage: f64,
    pub velocity_score: f64,
    pub velocity: VelocityTier,
    pub age_in_days: i64,
    pub is_growth_estimated: bool,
}

impl GrowthVideo {
    pub fn absolute_growth(&self) -> i64 {
        self.video.views as i64 - self.initial_views as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// The keyword itself
    pub id: String,
    pub frequency: usize,
    pub size: f64,
    /// Most frequent niche among videos carrying the keyword
    pub group: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEdge {
    /// Order-independent pair id
    pub id: String,
    pub source: String,
    pub target: String,
    pub co_occurrences: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterGraph {
    pub nodes: Vec<ClusterNode>,
    pub edges: Vec<ClusterEdge>,
}
