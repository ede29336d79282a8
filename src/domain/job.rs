//! Per-(niche, time period) ingestion job state and run summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::video::TimePeriod;

/// PENDING → FETCHING → EXTRACTING → PERSISTING → DONE | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Fetching,
    Extracting,
    Persisting,
    Done,
    Failed,
}

impl JobState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition; failure is reachable from
    /// every non-terminal state and nothing leaves a terminal state
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Done | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Pending, Self::Fetching)
            | (Self::Fetching, Self::Extracting)
            | (Self::Extracting, Self::Persisting)
            | (Self::Persisting, Self::Done) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub niche: String,
    pub time_period: TimePeriod,
}

impl JobKey {
    pub fn new(niche: &str, time_period: TimePeriod) -> Self {
        Self { niche: niche.to_string(), time_period }
    }
}

/// Outcome of a single job as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub niche: String,
    pub time_period: TimePeriod,
    pub count: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn succeeded(key: &JobKey, count: usize) -> Self {
        Self {
            niche: key.niche.clone(),
            time_period: key.time_period,
            count,
            success: true,
            error: None,
        }
    }

    pub fn failed(key: &JobKey, error: impl Into<String>) -> Self {
        Self {
            niche: key.niche.clone(),
            time_period: key.time_period,
            count: 0,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<JobResult>,
}

impl RunSummary {
    pub fn total_count(&self) -> usize {
        self.results.iter().map(|r| r.count).sum()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            JobState::Pending,
            JobState::Fetching,
            JobState::Extracting,
            JobState::Persisting,
            JobState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(!JobState::Failed.can_transition_to(JobState::Fetching));
        assert!(!JobState::Done.can_transition_to(JobState::Failed));
        assert!(JobState::Extracting.can_transition_to(JobState::Failed));
        assert!(!JobState::Pending.can_transition_to(JobState::Persisting));
    }
}
