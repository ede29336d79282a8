//! Watchlist entries
//!
//! Lifecycle is independent from `VideoRecord`: clearing videos never touches
//! the watchlist, and watchlisted ids are protected from de-duplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::video::VideoRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    /// Views at the time the entry was added
    pub views: u64,
    pub niche: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn from_video(video: &VideoRecord, notes: Option<String>) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
            channel: video.channel.clone(),
            views: video.views,
            niche: video.niche.clone(),
            notes,
            added_at: Utc::now(),
        }
    }
}
