//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! This module provides database connections and repositories, HTML parsing,
//! the browser fetch path, the suggestion client, configuration and logging.

pub mod browser;
pub mod config; // Configuration constants and helpers
pub mod database_connection;
pub mod fetch_orchestrator;
pub mod logging; // Logging infrastructure
pub mod parsing;
pub mod snapshot_store;
pub mod suggestion_client;
pub mod trend_repository;
pub mod video_repository;
pub mod watchlist_repository;

// Re-export commonly used items
pub use browser::{BrowserLauncher, BrowserPage, BrowserlessLauncher, NavigationOptions};
pub use config::AppConfig;
pub use database_connection::DatabaseConnection;
pub use fetch_orchestrator::{FetchOrchestrator, SessionProfile};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{TrendListParser, VideoListParser, parse_upload_date, parse_view_count};
pub use snapshot_store::{SimulatedSnapshotStore, SqliteSnapshotStore};
pub use suggestion_client::SuggestionClient;
pub use trend_repository::SqliteTrendRepository;
pub use video_repository::SqliteVideoRepository;
pub use watchlist_repository::SqliteWatchlistRepository;
