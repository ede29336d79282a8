//! Trend Radar binary
//!
//! `trend-radar [--config <path>] [--once]`
//!
//! Without `--once` the scheduler runs until Ctrl-C. With `--once` a single
//! on-demand pass runs over every scheduled period, followed by
//! de-duplication and a growth report.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use trend_radar::application::{
    AnalysisService, DeduplicationEngine, GrowthVelocityClassifier, KeywordExtractor, SchedulerState,
    SchedulingController, TopicClusterBuilder, TrendService, VideoIngestionPipeline,
};
use trend_radar::domain::{TimePeriod, VideoRepository};
use trend_radar::infrastructure::logging::log_system_info;
use trend_radar::infrastructure::{
    AppConfig, BrowserLauncher, BrowserlessLauncher, DatabaseConnection, FetchOrchestrator, SqliteSnapshotStore,
    SqliteTrendRepository, SqliteVideoRepository, SqliteWatchlistRepository, SuggestionClient,
    init_logging_with_config,
};

const DEFAULT_CONFIG: &str = "config/default";

struct Args {
    config_path: String,
    once: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    Args {
        config_path,
        once: args.iter().any(|arg| arg == "--once"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    let config = AppConfig::load(Some(&args.config_path))?;

    init_logging_with_config(config.logging.clone())?;
    log_system_info();

    let db = DatabaseConnection::from_config(&config.database)
        .await
        .context("Failed to open database")?;
    db.migrate().await.context("Failed to migrate database")?;
    let pool = db.pool().clone();

    let videos = Arc::new(SqliteVideoRepository::new(pool.clone()));
    let trends = Arc::new(SqliteTrendRepository::new(pool.clone()));
    let watchlist = SqliteWatchlistRepository::new(pool.clone());

    let launcher: Arc<dyn BrowserLauncher> = Arc::new(BrowserlessLauncher::new(&config.browser)?);
    let fetcher = || {
        FetchOrchestrator::new(
            Arc::clone(&launcher),
            config.fetch.clone(),
            config.browser.wait_until.clone(),
        )
    };

    let pipeline = VideoIngestionPipeline::new(
        fetcher(),
        KeywordExtractor::new(config.keywords.clone()),
        videos.clone(),
        config.sources.clone(),
    )?;
    let suggestions = SuggestionClient::new(&config.sources)
        .map_err(|e| warn!("⚠️ Suggestion client disabled: {}", e))
        .ok();
    let trend_service = TrendService::new(fetcher(), trends, suggestions, config.sources.trends_explore_url.clone())?;

    let controller = SchedulingController::new(
        Arc::new(SchedulerState::new(&config.scheduler.niches)),
        Arc::new(pipeline),
        Some(Arc::new(trend_service)),
        config.scheduler.clone(),
        config.sources.region.clone(),
    );

    if !args.once {
        controller.start()?;
        info!("Scheduler running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
        controller.stop().await?;
        return Ok(());
    }

    let summary = controller.run_on_demand(&TimePeriod::SCHEDULED, None).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let dedup = DeduplicationEngine::new(&config.dedup)
        .run(videos.as_ref(), &watchlist)
        .await?;
    info!("Dedup removed {} of {} duplicates", dedup.deleted, dedup.requested);

    let analysis = AnalysisService::new(
        videos.clone(),
        Arc::new(SqliteSnapshotStore::new(pool)),
        GrowthVelocityClassifier::new(config.growth.clone()),
        TopicClusterBuilder::new(config.clustering.clone()),
    );
    let report = analysis.growth_report(TimePeriod::Day, None).await?;
    for growth in report.notable.iter().take(10) {
        info!(
            "{:>7} {:>10} views  +{:.1}%  {}",
            growth.velocity.as_str(),
            growth.video.views,
            growth.growth_percentage,
            growth.video.title
        );
    }
    let graph = analysis.topic_clusters(None).await?;
    info!(
        "Stored videos: {}, cluster graph: {} nodes / {} edges",
        videos.count(&Default::default()).await?,
        graph.nodes.len(),
        graph.edges.len()
    );

    Ok(())
}
