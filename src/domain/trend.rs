//! Search-trend records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Region code used when a trend is not tied to a country
pub const GLOBAL_REGION: &str = "GLOBAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendWindow {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
}

impl TrendWindow {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::SevenDays => "7days",
            Self::ThirtyDays => "30days",
        }
    }

    /// Value of the explorer's `date` query parameter
    pub const fn explorer_date_param(self) -> &'static str {
        match self {
            Self::Today => "now 1-d",
            Self::SevenDays => "now 7-d",
            Self::ThirtyDays => "today 1-m",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "7days" => Some(Self::SevenDays),
            "30days" => Some(Self::ThirtyDays),
            _ => None,
        }
    }
}

impl fmt::Display for TrendWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub keyword: String,
    /// 1-indexed, unique within (time_period, region)
    pub rank: u32,
    pub time_period: TrendWindow,
    pub region: String,
    pub scraped_at: DateTime<Utc>,
}

/// Upper-case region code, `GLOBAL` when blank
pub fn normalize_region(region: &str) -> String {
    let region = region.trim();
    if region.is_empty() {
        GLOBAL_REGION.to_string()
    } else {
        region.to_uppercase()
    }
}

impl TrendRecord {
    pub fn new(keyword: impl Into<String>, rank: u32, time_period: TrendWindow, region: &str) -> Self {
        Self {
            keyword: keyword.into(),
            rank,
            time_period,
            region: normalize_region(region),
            scraped_at: Utc::now(),
        }
    }

    /// Identity used by the save pipeline's purge step
    pub fn key(&self) -> (String, TrendWindow, String) {
        (self.keyword.to_lowercase(), self.time_period, self.region.clone())
    }
}
