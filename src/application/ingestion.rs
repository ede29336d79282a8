//! Per-(niche, time period) ingestion job
//!
//! fetch → extract → enrich → validate → upsert. Element-level and record-level
//! failures degrade the result; only a failed fetch or unreachable persistence
//! fails the job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::application::keyword_extractor::KeywordExtractor;
use crate::domain::errors::ExtractionError;
use crate::domain::job::{JobKey, JobResult, JobState};
use crate::domain::repositories::VideoRepository;
use crate::domain::video::{TimePeriod, VideoCandidate, VideoRecord};
use crate::infrastructure::config::SourcesConfig;
use crate::infrastructure::fetch_orchestrator::FetchOrchestrator;
use crate::infrastructure::parsing::{VideoListParser, parse_view_count};

/// Receives each state a job enters
pub type StateObserver<'a> = &'a (dyn Fn(&JobKey, JobState) + Send + Sync);

#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one job to a terminal state; never panics on job-level failure
    async fn run_job(&self, key: &JobKey, observe: StateObserver<'_>) -> JobResult;
}

/// Listing URL for a job: trending for the general niche, search otherwise
pub fn listing_url(sources: &SourcesConfig, niche: &str, period: TimePeriod) -> String {
    let niche = niche.trim();
    if niche.is_empty() {
        return sources.trending_url.clone();
    }
    let query: String = url::form_urlencoded::byte_serialize(niche.as_bytes()).collect();
    let filter = sources
        .upload_filters
        .get(period.as_str())
        .map_or("", String::as_str);
    sources
        .video_search_url
        .replace("{query}", &query)
        .replace("{filter}", filter)
}

pub struct VideoIngestionPipeline {
    fetcher: FetchOrchestrator,
    parser: VideoListParser,
    keywords: KeywordExtractor,
    videos: Arc<dyn VideoRepository>,
    sources: SourcesConfig,
}

impl VideoIngestionPipeline {
    pub fn new(
        fetcher: FetchOrchestrator,
        keywords: KeywordExtractor,
        videos: Arc<dyn VideoRepository>,
        sources: SourcesConfig,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            fetcher,
            parser: VideoListParser::new()?,
            keywords,
            videos,
            sources,
        })
    }

    /// Enrich a raw candidate into a validated record
    pub fn to_record(&self, candidate: &VideoCandidate, key: &JobKey) -> Option<VideoRecord> {
        let enriched = self.keywords.enrich(&candidate.title, &[], &key.niche);
        let now = Utc::now();
        let record = VideoRecord {
            id: candidate.id.trim().to_string(),
            title: candidate.title.trim().to_string(),
            channel: candidate.channel.trim().to_string(),
            views: parse_view_count(&candidate.views_text),
            upload_date: candidate.upload_text.trim().to_string(),
            niche: enriched.niche,
            keywords: enriched.keywords,
            created_at: now,
            updated_at: now,
            time_period: Some(key.time_period),
        };

        match record.validate() {
            Ok(()) => Some(record),
            Err(e) => {
                warn!("⚠️ Skipping candidate: {}", e);
                None
            }
        }
    }

    async fn execute(&self, key: &JobKey, observe: StateObserver<'_>) -> Result<usize, String> {
        let url = listing_url(&self.sources, &key.niche, key.time_period);

        observe(key, JobState::Fetching);
        debug!("🌐 Fetching {}", url);
        let html = self.fetcher.navigate(&url).await.map_err(|e| e.to_string())?;

        observe(key, JobState::Extracting);
        let extraction = self.parser.parse(&html);
        let records: Vec<VideoRecord> = extraction
            .items
            .iter()
            .filter_map(|candidate| self.to_record(candidate, key))
            .collect();

        observe(key, JobState::Persisting);
        if records.is_empty() {
            return Ok(0);
        }
        let report = self.videos.upsert_batch(&records).await;
        if report.succeeded == 0 && report.failed > 0 {
            return Err(format!(
                "all {} records failed to persist: {}",
                report.failed,
                report.errors.first().map_or("", String::as_str)
            ));
        }
        if report.failed > 0 {
            warn!(
                "⚠️ [{}:{}] {} of {} records failed to persist",
                key.niche, key.time_period, report.failed, records.len()
            );
        }
        Ok(report.succeeded)
    }
}

#[async_trait]
impl JobExecutor for VideoIngestionPipeline {
    async fn run_job(&self, key: &JobKey, observe: StateObserver<'_>) -> JobResult {
        observe(key, JobState::Pending);
        match self.execute(key, observe).await {
            Ok(count) => {
                observe(key, JobState::Done);
                info!("✅ Job [{}:{}] stored {} videos", display_niche(&key.niche), key.time_period, count);
                JobResult::succeeded(key, count)
            }
            Err(e) => {
                observe(key, JobState::Failed);
                error!("❌ Job [{}:{}] failed: {}", display_niche(&key.niche), key.time_period, e);
                JobResult::failed(key, e)
            }
        }
    }
}

fn display_niche(niche: &str) -> &str {
    if niche.is_empty() { "general" } else { niche }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FetchError;
    use crate::domain::repositories::VideoQuery;
    use crate::infrastructure::config::KeywordConfig;
    use crate::infrastructure::fetch_orchestrator::test_support::{ScriptedLauncher, orchestrator};
    use crate::infrastructure::{DatabaseConnection, SqliteVideoRepository};
    use std::sync::Mutex;

    const LISTING: &str = r#"
        <html><body>
          <ytd-video-renderer>
            <a id="video-title" href="/watch?v=abc123" title="Top 10 JavaScript Tricks for Beginners 2024">Top 10 JavaScript Tricks for Beginners 2024</a>
            <ytd-channel-name><a href="/@devchan">Dev Channel</a></ytd-channel-name>
            <div id="metadata-line"><span>1.2M views</span><span>3 days ago</span></div>
          </ytd-video-renderer>
          <ytd-video-renderer>
            <a id="video-title" href="/watch?v=def456">Minecraft speedrun world record</a>
            <ytd-channel-name><a href="/@gamer">Gamer</a></ytd-channel-name>
            <div id="metadata-line"><span>15K views</span><span>1 week ago</span></div>
          </ytd-video-renderer>
        </body></html>
    "#;

    async fn pipeline(script: Vec<Result<String, FetchError>>) -> (VideoIngestionPipeline, Arc<SqliteVideoRepository>) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = Arc::new(SqliteVideoRepository::new(db.pool().clone()));
        let launcher = Arc::new(ScriptedLauncher::new(script));
        let pipeline = VideoIngestionPipeline::new(
            orchestrator(&launcher),
            KeywordExtractor::new(KeywordConfig::default()),
            repo.clone(),
            SourcesConfig::default(),
        )
        .unwrap();
        (pipeline, repo)
    }

    #[test]
    fn test_listing_url() {
        let sources = SourcesConfig::default();
        assert_eq!(listing_url(&sources, "", TimePeriod::Day), sources.trending_url);

        let url = listing_url(&sources, "video games", TimePeriod::Week);
        assert!(url.contains("search_query=video+games"));
        assert!(url.ends_with("sp=EgIIAw%3D%3D"));
    }

    #[tokio::test]
    async fn test_job_persists_enriched_records() {
        let (pipeline, repo) = pipeline(vec![Ok(LISTING.to_string())]).await;
        let states = Mutex::new(Vec::new());
        let observe = |_: &JobKey, state: JobState| states.lock().unwrap().push(state);

        let result = pipeline.run_job(&JobKey::new("", TimePeriod::Day), &observe).await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.count, 2);
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                JobState::Pending,
                JobState::Fetching,
                JobState::Extracting,
                JobState::Persisting,
                JobState::Done
            ]
        );

        let stored = repo.find_by_id("abc123").await.unwrap().unwrap();
        assert_eq!(stored.views, 1_200_000);
        assert_eq!(stored.niche, "programming");
        assert_eq!(stored.time_period, Some(TimePeriod::Day));
        assert!(stored.keywords.contains(&"javascript tricks".to_string()));

        let gaming = repo.find(&VideoQuery::default().with_niche("gaming")).await.unwrap();
        assert_eq!(gaming.len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_niche_is_kept() {
        let (pipeline, repo) = pipeline(vec![Ok(LISTING.to_string())]).await;
        let result = pipeline.run_job(&JobKey::new("music", TimePeriod::Week), &|_: &JobKey, _: JobState| {}).await;

        assert!(result.success);
        assert_eq!(repo.find(&VideoQuery::default().with_niche("music")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_navigation_failure_fails_the_job() {
        let transport = || Err(FetchError::Transport("reset".to_string()));
        let (pipeline, repo) = pipeline(vec![transport(), transport(), transport()]).await;
        let last = Mutex::new(None);
        let observe = |_: &JobKey, state: JobState| *last.lock().unwrap() = Some(state);

        let result = pipeline.run_job(&JobKey::new("gaming", TimePeriod::Month), &observe).await;

        assert!(!result.success);
        assert_eq!(result.count, 0);
        assert!(result.error.unwrap().contains("3 attempts"));
        assert_eq!(*last.lock().unwrap(), Some(JobState::Failed));
        assert_eq!(repo.count(&VideoQuery::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_page_is_a_successful_zero() {
        let (pipeline, _repo) = pipeline(vec![Ok("<html><body></body></html>".to_string())]).await;
        let result = pipeline.run_job(&JobKey::new("", TimePeriod::Day), &|_: &JobKey, _: JobState| {}).await;
        assert!(result.success);
        assert_eq!(result.count, 0);
    }
}
