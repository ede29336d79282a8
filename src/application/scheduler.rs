//! Recurring and on-demand ingestion runs
//!
//! One interval loop per scheduled time period, each stopped through a shared
//! cancellation token. Within a run, niches execute sequentially so at most one
//! browser session per cadence is active. Shutdown lets the in-flight tick
//! finish so browser sessions are always closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::ingestion::JobExecutor;
use crate::application::trend_service::TrendService;
use crate::domain::errors::SchedulerError;
use crate::domain::job::{JobKey, JobResult, JobState, RunSummary};
use crate::domain::video::TimePeriod;
use crate::infrastructure::config::SchedulerConfig;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trimmed, lower-cased, de-duplicated; the general niche `""` always comes first
fn normalize_niches(niches: &[String]) -> Vec<String> {
    let mut normalized = vec![String::new()];
    extend_unique(&mut normalized, niches);
    normalized
}

/// Trimmed, lower-cased and de-duplicated, in first-seen order
fn extend_unique(normalized: &mut Vec<String>, niches: &[String]) {
    for niche in niches {
        let niche = niche.trim().to_lowercase();
        if !normalized.contains(&niche) {
            normalized.push(niche);
        }
    }
}

/// Process-wide scheduler state, owned explicitly instead of living in globals
#[derive(Default)]
pub struct SchedulerState {
    niches: Mutex<Vec<String>>,
    job_states: Mutex<HashMap<JobKey, JobState>>,
    cancel: Mutex<Option<CancellationToken>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SchedulerState {
    pub fn new(niches: &[String]) -> Self {
        Self {
            niches: Mutex::new(normalize_niches(niches)),
            ..Self::default()
        }
    }

    pub fn niches(&self) -> Vec<String> {
        let niches = lock(&self.niches);
        if niches.is_empty() { vec![String::new()] } else { niches.clone() }
    }

    pub fn set_niches(&self, niches: &[String]) {
        *lock(&self.niches) = normalize_niches(niches);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.cancel).is_some()
    }

    pub fn job_states(&self) -> HashMap<JobKey, JobState> {
        lock(&self.job_states).clone()
    }

    /// Pending restarts a job; any other state must be a legal transition
    fn record(&self, key: &JobKey, state: JobState) {
        let mut states = lock(&self.job_states);
        match states.get(key) {
            Some(current) if state != JobState::Pending && !current.can_transition_to(state) => {
                warn!("Ignoring illegal job transition {:?} -> {:?} for {:?}", current, state, key);
            }
            _ => {
                states.insert(key.clone(), state);
            }
        }
    }
}

/// Shared by the interval loops and on-demand callers
struct Runner {
    state: Arc<SchedulerState>,
    executor: Arc<dyn JobExecutor>,
    trends: Option<Arc<TrendService>>,
    region: String,
}

impl Runner {
    async fn run_jobs(&self, period: TimePeriod, niches: &[String]) -> Vec<JobResult> {
        let observe = |key: &JobKey, state: JobState| self.state.record(key, state);
        let mut results = Vec::with_capacity(niches.len());
        for niche in niches {
            let key = JobKey::new(niche, period);
            results.push(self.executor.run_job(&key, &observe).await);
        }
        results
    }

    async fn scheduled_tick(&self, period: TimePeriod) {
        let niches = self.state.niches();
        info!("⏰ Scheduled run [{}] over {} niches", period, niches.len());
        let results = self.run_jobs(period, &niches).await;
        let failures = results.iter().filter(|r| !r.success).count();
        if failures > 0 {
            warn!("⚠️ Scheduled run [{}]: {} of {} jobs failed", period, failures, results.len());
        }

        if let (Some(trends), Some(window)) = (&self.trends, period.trend_window()) {
            if let Err(e) = trends.refresh(window, &self.region).await {
                error!("Trend refresh for {} failed: {}", window, e);
            }
        }
    }
}

pub struct SchedulingController {
    runner: Arc<Runner>,
    config: SchedulerConfig,
}

impl SchedulingController {
    pub fn new(
        state: Arc<SchedulerState>,
        executor: Arc<dyn JobExecutor>,
        trends: Option<Arc<TrendService>>,
        config: SchedulerConfig,
        region: impl Into<String>,
    ) -> Self {
        let trends = if config.refresh_trends { trends } else { None };
        Self {
            runner: Arc::new(Runner {
                state,
                executor,
                trends,
                region: region.into(),
            }),
            config,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.runner.state
    }

    /// Spawn one interval loop per scheduled period; the first tick fires immediately
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut cancel = lock(&self.runner.state.cancel);
        if cancel.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        let mut handles = lock(&self.runner.state.handles);
        for period in TimePeriod::SCHEDULED {
            let Some(secs) = self.config.interval_secs(period).filter(|secs| *secs > 0) else {
                continue;
            };
            let runner = Arc::clone(&self.runner);
            let token = token.clone();

            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(secs));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        () = token.cancelled() => {
                            debug!("Scheduler loop [{}] cancelled", period);
                            break;
                        }
                        _ = ticker.tick() => runner.scheduled_tick(period).await,
                    }
                }
            }));
            info!("🚀 Scheduled [{}] every {}s", period, secs);
        }

        *cancel = Some(token);
        Ok(())
    }

    /// Cancel every loop and wait for in-flight ticks to finish
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let token = lock(&self.runner.state.cancel).take().ok_or(SchedulerError::NotRunning)?;
        token.cancel();

        let handles: Vec<_> = lock(&self.runner.state.handles).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Scheduler loop ended abnormally: {}", e);
            }
        }
        info!("🛑 Scheduler stopped");
        Ok(())
    }

    /// Replace the active niche list; the general niche is always kept
    pub fn set_niches(&self, niches: &[String]) {
        self.runner.state.set_niches(niches);
        info!("Active niches: {:?}", self.runner.state.niches());
    }

    /// Run `periods` now; `niche_override` applies to this run only
    pub async fn run_on_demand(&self, periods: &[TimePeriod], niche_override: Option<Vec<String>>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let niches = match niche_override {
            Some(requested) => {
                let mut niches = Vec::new();
                extend_unique(&mut niches, &requested);
                niches
            }
            None => self.runner.state.niches(),
        };
        info!("▶️ On-demand run {} over {:?} x {} niches", run_id, periods, niches.len());

        let mut results = Vec::new();
        for &period in periods {
            results.extend(self.runner.run_jobs(period, &niches).await);
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            results,
        };
        info!(
            "On-demand run {} finished: {} videos, {} failed jobs",
            run_id,
            summary.total_count(),
            summary.failures()
        );
        summary
    }

    pub fn job_states(&self) -> HashMap<JobKey, JobState> {
        self.runner.state.job_states()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestion::StateObserver;
    use async_trait::async_trait;

    /// Succeeds with one video per job, except for the `broken` niche
    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(String, TimePeriod)>>,
    }

    #[async_trait]
    impl JobExecutor for RecordingExecutor {
        async fn run_job(&self, key: &JobKey, observe: StateObserver<'_>) -> JobResult {
            lock(&self.calls).push((key.niche.clone(), key.time_period));
            observe(key, JobState::Pending);
            observe(key, JobState::Fetching);
            if key.niche == "broken" {
                observe(key, JobState::Failed);
                return JobResult::failed(key, "navigation failed");
            }
            observe(key, JobState::Extracting);
            observe(key, JobState::Persisting);
            observe(key, JobState::Done);
            JobResult::succeeded(key, 1)
        }
    }

    fn controller(niches: &[&str], interval_secs: u64) -> (SchedulingController, Arc<RecordingExecutor>) {
        let niches: Vec<String> = niches.iter().map(ToString::to_string).collect();
        let executor = Arc::new(RecordingExecutor::default());
        let config = SchedulerConfig {
            day_interval_secs: interval_secs,
            week_interval_secs: interval_secs,
            month_interval_secs: interval_secs,
            niches: niches.clone(),
            refresh_trends: false,
        };
        let controller = SchedulingController::new(
            Arc::new(SchedulerState::new(&niches)),
            executor.clone(),
            None,
            config,
            "US",
        );
        (controller, executor)
    }

    #[test]
    fn test_general_niche_is_always_present() {
        let state = SchedulerState::new(&["Gaming".to_string(), "gaming ".to_string()]);
        assert_eq!(state.niches(), vec!["", "gaming"]);

        state.set_niches(&["music".to_string()]);
        assert_eq!(state.niches(), vec!["", "music"]);
    }

    #[tokio::test]
    async fn test_on_demand_runs_niches_sequentially_and_survives_failures() {
        let (controller, executor) = controller(&["broken", "music"], 3600);

        let summary = controller
            .run_on_demand(&[TimePeriod::Day, TimePeriod::Week], None)
            .await;

        assert_eq!(summary.results.len(), 6);
        assert_eq!(summary.failures(), 2);
        assert_eq!(summary.total_count(), 4);
        let broken = summary.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(broken.error.as_deref(), Some("navigation failed"));

        let calls = lock(&executor.calls).clone();
        assert_eq!(
            calls,
            vec![
                (String::new(), TimePeriod::Day),
                ("broken".to_string(), TimePeriod::Day),
                ("music".to_string(), TimePeriod::Day),
                (String::new(), TimePeriod::Week),
                ("broken".to_string(), TimePeriod::Week),
                ("music".to_string(), TimePeriod::Week),
            ]
        );

        let states = controller.job_states();
        assert_eq!(states[&JobKey::new("broken", TimePeriod::Day)], JobState::Failed);
        assert_eq!(states[&JobKey::new("music", TimePeriod::Week)], JobState::Done);
    }

    #[tokio::test]
    async fn test_niche_override_is_transient() {
        let (controller, executor) = controller(&["music"], 3600);

        let summary = controller
            .run_on_demand(&[TimePeriod::Month], Some(vec!["cooking".to_string()]))
            .await;

        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].niche, "cooking");
        assert_eq!(lock(&executor.calls).len(), 1);
        assert_eq!(controller.state().niches(), vec!["", "music"]);
    }

    #[tokio::test]
    async fn test_niche_override_is_normalized() {
        let (controller, executor) = controller(&[], 3600);

        let summary = controller
            .run_on_demand(
                &[TimePeriod::Day],
                Some(vec!["Gaming".to_string(), " gaming ".to_string(), "Music".to_string()]),
            )
            .await;

        let niches: Vec<_> = summary.results.iter().map(|r| r.niche.as_str()).collect();
        assert_eq!(niches, vec!["gaming", "music"]);
        assert_eq!(lock(&executor.calls).len(), 2);
    }

    #[test]
    fn test_illegal_transition_is_ignored() {
        let state = SchedulerState::default();
        let key = JobKey::new("", TimePeriod::Day);
        state.record(&key, JobState::Pending);
        state.record(&key, JobState::Persisting);
        assert_eq!(state.job_states()[&key], JobState::Pending);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let (controller, executor) = controller(&[], 3600);

        assert_eq!(controller.stop().await, Err(SchedulerError::NotRunning));
        controller.start().unwrap();
        assert_eq!(controller.start(), Err(SchedulerError::AlreadyRunning));
        assert!(controller.state().is_running());

        // First tick of each loop fires immediately
        for _ in 0..100 {
            if lock(&executor.calls).len() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        controller.stop().await.unwrap();
        assert!(!controller.state().is_running());

        let mut periods: Vec<_> = lock(&executor.calls).iter().map(|(_, p)| *p).collect();
        periods.sort();
        assert_eq!(periods, vec![TimePeriod::Day, TimePeriod::Week, TimePeriod::Month]);
    }
}
