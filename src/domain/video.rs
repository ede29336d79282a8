//! Video records and the ingestion/analysis time window

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::PersistenceError;

/// Ingestion/analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Day,
    Week,
    Month,
    All,
}

impl TimePeriod {
    pub const SCHEDULED: [Self; 3] = [Self::Day, Self::Week, Self::Month];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    /// Length of the window; `All` is unbounded
    pub fn window(self) -> Option<Duration> {
        match self {
            Self::Day => Some(Duration::days(1)),
            Self::Week => Some(Duration::days(7)),
            Self::Month => Some(Duration::days(30)),
            Self::All => None,
        }
    }

    /// Matching trend-explorer window, when one exists
    pub const fn trend_window(self) -> Option<super::trend::TrendWindow> {
        use super::trend::TrendWindow;
        match self {
            Self::Day => Some(TrendWindow::Today),
            Self::Week => Some(TrendWindow::SevenDays),
            Self::Month => Some(TrendWindow::ThirtyDays),
            Self::All => None,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "today" => Ok(Self::Day),
            "week" | "7days" => Ok(Self::Week),
            "month" | "30days" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(format!("unknown time period: {other}")),
        }
    }
}

/// A persisted video; `id` is the sole identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub views: u64,
    /// Loosely structured: relative text ("3 days ago") or a timestamp
    pub upload_date: String,
    pub niche: String,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub time_period: Option<TimePeriod>,
}

impl VideoRecord {
    /// Validate an extracted record at the ingestion boundary
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.id.trim().is_empty() {
            return Err(PersistenceError::InvalidRecord {
                id: self.id.clone(),
                reason: "empty id".to_string(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(PersistenceError::InvalidRecord {
                id: self.id.clone(),
                reason: "empty title".to_string(),
            });
        }
        Ok(())
    }

    /// Union `other` into our keyword set, keeping first-seen order
    pub fn merge_keywords(&mut self, other: &[String]) {
        for keyword in other {
            if !self.keywords.iter().any(|k| k == keyword) {
                self.keywords.push(keyword.clone());
            }
        }
    }
}

/// Raw fields pulled off a listing page before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub views_text: String,
    pub upload_text: String,
}
