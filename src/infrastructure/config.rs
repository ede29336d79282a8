//! Configuration infrastructure
//!
//! Layered loading: built-in defaults → optional config file → `TREND_RADAR__*`
//! environment variables. Every calibration knob of the pipeline (retry caps,
//! growth multiplier tables, niche precedence, cluster bounds) lives here
//! rather than as literals in the algorithms.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::video::TimePeriod;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub browser: BrowserConfig,
    pub fetch: FetchConfig,
    pub sources: SourcesConfig,
    pub scheduler: SchedulerConfig,
    pub keywords: KeywordConfig,
    pub growth: GrowthCalibration,
    pub clustering: ClusteringConfig,
    pub dedup: DedupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Headless-browser collaborator (Browserless-compatible `/content` endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub endpoint: String,
    pub token: Option<String>,
    /// Passed through as the page's `waitUntil` lifecycle event
    pub wait_until: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Navigation attempts per session before giving up
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay_ms: u64,
    /// Minimum wait after a successful navigation before capturing HTML
    pub settle_delay_ms: u64,
    pub navigation_timeout_ms: u64,
    pub viewports: Vec<ViewportSize>,
    pub user_agents: Vec<String>,
    pub accept_languages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// `{query}` and `{filter}` are substituted per job
    pub video_search_url: String,
    /// Used for the general (empty) niche
    pub trending_url: String,
    pub upload_filters: HashMap<String, String>,
    pub trends_explore_url: String,
    pub suggestion_url: String,
    pub suggestion_timeout_ms: u64,
    pub suggestion_requests_per_second: u32,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub day_interval_secs: u64,
    pub week_interval_secs: u64,
    pub month_interval_secs: u64,
    /// Active niches; the general niche "" is always added
    pub niches: Vec<String>,
    pub refresh_trends: bool,
}

/// A niche and the phrases that select it; list order is precedence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicheRule {
    pub niche: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub max_keywords: usize,
    pub min_word_len: usize,
    pub min_bigram_word_len: usize,
    pub stopwords: Vec<String>,
    pub known_phrases: Vec<String>,
    pub niche_rules: Vec<NicheRule>,
    pub fallback_niche: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodMultipliers {
    pub day: f64,
    pub week: f64,
    pub month: f64,
    pub all: f64,
}

/// Applies when age in days is at most `max_days`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeStep {
    pub max_days: i64,
    pub multiplier: f64,
}

/// Applies when views are at least `min_views`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewScaleStep {
    pub min_views: u64,
    pub multiplier: f64,
}

/// Minimum growth for a record to count as notable at a given scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceStep {
    pub min_views: u64,
    pub min_absolute_growth: u64,
    pub min_growth_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub viral: f64,
    pub fast: f64,
    pub normal: f64,
}

/// Growth classifier calibration knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthCalibration {
    pub period_multipliers: PeriodMultipliers,
    /// Ascending by `max_days`
    pub age_steps: Vec<AgeStep>,
    pub age_default: f64,
    /// Descending by `min_views`
    pub view_scale_steps: Vec<ViewScaleStep>,
    pub view_scale_default: f64,
    pub base_thresholds: TierThresholds,
    /// Descending by `min_views`; the last step should start at 0
    pub significance_steps: Vec<SignificanceStep>,
}

impl GrowthCalibration {
    pub const fn period_multiplier(&self, period: TimePeriod) -> f64 {
        match period {
            TimePeriod::Day => self.period_multipliers.day,
            TimePeriod::Week => self.period_multipliers.week,
            TimePeriod::Month => self.period_multipliers.month,
            TimePeriod::All => self.period_multipliers.all,
        }
    }

    pub fn age_multiplier(&self, age_in_days: i64) -> f64 {
        self.age_steps
            .iter()
            .find(|step| age_in_days <= step.max_days)
            .map_or(self.age_default, |step| step.multiplier)
    }

    pub fn view_scale_multiplier(&self, views: u64) -> f64 {
        self.view_scale_steps
            .iter()
            .find(|step| views >= step.min_views)
            .map_or(self.view_scale_default, |step| step.multiplier)
    }

    pub fn significance_for(&self, views: u64) -> Option<&SignificanceStep> {
        self.significance_steps.iter().find(|step| views >= step.min_views)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Distinct videos a keyword must appear in to become a node
    pub min_frequency: usize,
    pub max_nodes: usize,
    pub node_size_scale: f64,
    pub max_edge_weight: f64,
    pub niche_palette: HashMap<String, String>,
    pub default_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub batch_size: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output (daily rolling)
    pub file_output: bool,

    /// Log file name prefix
    pub file_prefix: String,

    /// Overrides the default log directory when set
    pub directory: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let url = get_app_data_dir().map_or_else(
            |_| defaults::DATABASE_URL_FALLBACK.to_string(),
            |dir| format!("sqlite:{}", dir.join(defaults::DATABASE_FILE).display()),
        );
        Self {
            url,
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::BROWSER_ENDPOINT.to_string(),
            token: None,
            wait_until: defaults::WAIT_UNTIL.to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_NAVIGATION_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            navigation_timeout_ms: defaults::NAVIGATION_TIMEOUT_MS,
            viewports: defaults::VIEWPORTS
                .iter()
                .map(|&(width, height)| ViewportSize { width, height })
                .collect(),
            user_agents: to_strings(defaults::USER_AGENTS),
            accept_languages: to_strings(defaults::ACCEPT_LANGUAGES),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let upload_filters = defaults::UPLOAD_FILTERS
            .iter()
            .map(|(period, filter)| ((*period).to_string(), (*filter).to_string()))
            .collect();
        Self {
            video_search_url: defaults::VIDEO_SEARCH_URL.to_string(),
            trending_url: defaults::TRENDING_URL.to_string(),
            upload_filters,
            trends_explore_url: defaults::TRENDS_EXPLORE_URL.to_string(),
            suggestion_url: defaults::SUGGESTION_URL.to_string(),
            suggestion_timeout_ms: defaults::SUGGESTION_TIMEOUT_MS,
            suggestion_requests_per_second: defaults::SUGGESTION_REQUESTS_PER_SECOND,
            region: defaults::REGION.to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_interval_secs: defaults::DAY_INTERVAL_SECS,
            week_interval_secs: defaults::WEEK_INTERVAL_SECS,
            month_interval_secs: defaults::MONTH_INTERVAL_SECS,
            niches: to_strings(defaults::NICHES),
            refresh_trends: true,
        }
    }
}

impl SchedulerConfig {
    /// Cadence for a period; `All` is never scheduled
    pub const fn interval_secs(&self, period: TimePeriod) -> Option<u64> {
        match period {
            TimePeriod::Day => Some(self.day_interval_secs),
            TimePeriod::Week => Some(self.week_interval_secs),
            TimePeriod::Month => Some(self.month_interval_secs),
            TimePeriod::All => None,
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            max_keywords: defaults::MAX_KEYWORDS,
            min_word_len: defaults::MIN_WORD_LEN,
            min_bigram_word_len: defaults::MIN_BIGRAM_WORD_LEN,
            stopwords: to_strings(defaults::STOPWORDS),
            known_phrases: to_strings(defaults::KNOWN_PHRASES),
            niche_rules: defaults::NICHE_RULES
                .iter()
                .map(|(niche, patterns)| NicheRule {
                    niche: (*niche).to_string(),
                    patterns: to_strings(patterns),
                })
                .collect(),
            fallback_niche: defaults::FALLBACK_NICHE.to_string(),
        }
    }
}

impl Default for GrowthCalibration {
    fn default() -> Self {
        Self {
            period_multipliers: PeriodMultipliers {
                day: 3.0,
                week: 1.0,
                month: 0.3,
                all: 0.1,
            },
            age_steps: vec![
                AgeStep { max_days: 2, multiplier: 0.5 },
                AgeStep { max_days: 7, multiplier: 0.7 },
                AgeStep { max_days: 30, multiplier: 0.9 },
                AgeStep { max_days: 90, multiplier: 1.2 },
                AgeStep { max_days: 365, multiplier: 1.5 },
            ],
            age_default: 2.0,
            view_scale_steps: vec![
                ViewScaleStep { min_views: 1_000_000, multiplier: 2.5 },
                ViewScaleStep { min_views: 500_000, multiplier: 2.0 },
                ViewScaleStep { min_views: 100_000, multiplier: 1.5 },
                ViewScaleStep { min_views: 10_000, multiplier: 1.0 },
                ViewScaleStep { min_views: 1_000, multiplier: 0.8 },
            ],
            view_scale_default: 0.6,
            base_thresholds: TierThresholds {
                viral: 200.0,
                fast: 100.0,
                normal: 30.0,
            },
            significance_steps: vec![
                SignificanceStep { min_views: 1_000_000, min_absolute_growth: 50_000, min_growth_percentage: 5.0 },
                SignificanceStep { min_views: 100_000, min_absolute_growth: 5_000, min_growth_percentage: 10.0 },
                SignificanceStep { min_views: 10_000, min_absolute_growth: 500, min_growth_percentage: 15.0 },
                SignificanceStep { min_views: 0, min_absolute_growth: 50, min_growth_percentage: 20.0 },
            ],
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_frequency: defaults::CLUSTER_MIN_FREQUENCY,
            max_nodes: defaults::CLUSTER_MAX_NODES,
            node_size_scale: defaults::CLUSTER_NODE_SIZE_SCALE,
            max_edge_weight: defaults::CLUSTER_MAX_EDGE_WEIGHT,
            niche_palette: defaults::NICHE_PALETTE
                .iter()
                .map(|(niche, color)| ((*niche).to_string(), (*color).to_string()))
                .collect(),
            default_color: defaults::CLUSTER_DEFAULT_COLOR.to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::DEDUP_BATCH_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            directory: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Load defaults, then an optional file, then environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).context("Failed to seed default configuration")?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(defaults::ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        info!("Configuration loaded (file: {:?})", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_attempts == 0 {
            anyhow::bail!("fetch.max_attempts must be greater than 0");
        }
        if self.fetch.viewports.is_empty() || self.fetch.user_agents.is_empty() {
            anyhow::bail!("fetch.viewports and fetch.user_agents must not be empty");
        }
        if self.dedup.batch_size == 0 {
            anyhow::bail!("dedup.batch_size must be greater than 0");
        }
        if self.keywords.max_keywords == 0 {
            anyhow::bail!("keywords.max_keywords must be greater than 0");
        }
        if self.growth.age_steps.is_empty() || self.growth.view_scale_steps.is_empty() {
            anyhow::bail!("growth multiplier tables must not be empty");
        }
        if self.sources.suggestion_requests_per_second == 0 {
            anyhow::bail!("sources.suggestion_requests_per_second must be greater than 0");
        }
        Ok(())
    }
}

/// Get application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Failed to get user data directory")?
        .join(defaults::APP_DIR_NAME);

    Ok(data_dir)
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "trend-radar";
    pub const ENV_PREFIX: &str = "TREND_RADAR";

    pub const DATABASE_FILE: &str = "trend_radar.db";
    pub const DATABASE_URL_FALLBACK: &str = "sqlite:trend_radar.db";
    pub const DB_MAX_CONNECTIONS: u32 = 5;

    pub const BROWSER_ENDPOINT: &str = "http://localhost:3000";
    pub const WAIT_UNTIL: &str = "networkidle2";

    /// Navigation attempts per browser session
    pub const MAX_NAVIGATION_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 2000;
    /// Listing pages keep rendering after the load event
    pub const SETTLE_DELAY_MS: u64 = 3000;
    pub const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

    pub const VIEWPORTS: &[(u32, u32)] = &[(1920, 1080), (1366, 768), (1536, 864), (1440, 900), (1280, 720)];

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ];

    pub const ACCEPT_LANGUAGES: &[&str] = &["en-US,en;q=0.9", "en-GB,en;q=0.8", "en-US,en;q=0.8,de;q=0.5"];

    pub const VIDEO_SEARCH_URL: &str = "https://www.youtube.com/results?search_query={query}&sp={filter}";
    pub const TRENDING_URL: &str = "https://www.youtube.com/feed/trending";
    /// Upload-date search filters per period
    pub const UPLOAD_FILTERS: &[(&str, &str)] = &[
        ("day", "EgIIAg%3D%3D"),
        ("week", "EgIIAw%3D%3D"),
        ("month", "EgIIBA%3D%3D"),
        ("all", "CAM%3D"),
    ];
    pub const TRENDS_EXPLORE_URL: &str = "https://trends.google.com/trends/explore";
    pub const SUGGESTION_URL: &str = "https://suggestqueries.google.com/complete/search";
    pub const SUGGESTION_TIMEOUT_MS: u64 = 10_000;
    pub const SUGGESTION_REQUESTS_PER_SECOND: u32 = 2;
    pub const REGION: &str = "US";

    pub const DAY_INTERVAL_SECS: u64 = 2 * 60 * 60;
    pub const WEEK_INTERVAL_SECS: u64 = 12 * 60 * 60;
    pub const MONTH_INTERVAL_SECS: u64 = 24 * 60 * 60;
    pub const NICHES: &[&str] = &["", "gaming", "music", "technology", "programming"];

    pub const MAX_KEYWORDS: usize = 15;
    pub const MIN_WORD_LEN: usize = 4;
    pub const MIN_BIGRAM_WORD_LEN: usize = 3;
    pub const FALLBACK_NICHE: &str = "other";

    pub const STOPWORDS: &[&str] = &[
        "the", "and", "for", "with", "this", "that", "from", "your", "you", "are", "was", "were", "what",
        "when", "where", "which", "who", "why", "how", "will", "have", "has", "had", "been", "into", "about",
        "than", "then", "them", "they", "their", "there", "these", "those", "just", "like", "more", "most",
        "some", "very", "over", "only", "also", "does", "make", "made", "here", "each", "every", "after",
        "before", "while", "video", "videos", "watch", "episode", "part", "new", "official",
    ];

    pub const KNOWN_PHRASES: &[&str] = &[
        "how to", "tutorial", "vs", "review", "for beginners", "top 10", "explained", "unboxing",
        "reaction", "live stream", "highlights", "challenge", "tips and tricks", "step by step",
        "full course", "crash course",
    ];

    /// Order is precedence: the first rule with a matching pattern wins
    pub const NICHE_RULES: &[(&str, &[&str])] = &[
        ("technology", &["technology", "tech review", "unboxing", "iphone", "android", "smartphone", "gadget", "laptop"]),
        ("gaming", &["gaming", "gameplay", "minecraft", "fortnite", "playthrough", "speedrun", "walkthrough"]),
        ("programming", &["programming", "coding", "javascript", "typescript", "python", "rust", "developer", "react"]),
        ("music", &["music", "song", "lyrics", "remix", "album", "official music video"]),
        ("education", &["explained", "lesson", "course", "learn", "science", "history"]),
        ("fitness", &["workout", "fitness", "gym", "exercise", "yoga"]),
        ("cooking", &["recipe", "cooking", "baking", "kitchen"]),
        ("finance", &["stock", "stocks", "crypto", "bitcoin", "investing", "finance"]),
        ("entertainment", &["comedy", "prank", "funny", "trailer", "movie"]),
        ("news", &["news", "breaking", "politics"]),
    ];

    pub const CLUSTER_MIN_FREQUENCY: usize = 2;
    pub const CLUSTER_MAX_NODES: usize = 50;
    pub const CLUSTER_NODE_SIZE_SCALE: f64 = 4.0;
    pub const CLUSTER_MAX_EDGE_WEIGHT: f64 = 10.0;
    pub const CLUSTER_DEFAULT_COLOR: &str = "#9ca3af";
    pub const NICHE_PALETTE: &[(&str, &str)] = &[
        ("technology", "#3b82f6"),
        ("gaming", "#8b5cf6"),
        ("programming", "#10b981"),
        ("music", "#ec4899"),
        ("education", "#f59e0b"),
        ("fitness", "#ef4444"),
        ("cooking", "#f97316"),
        ("finance", "#14b8a6"),
        ("entertainment", "#eab308"),
        ("news", "#64748b"),
    ];

    /// Ids per delete statement during de-duplication
    pub const DEDUP_BATCH_SIZE: usize = 100;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_FILE_PREFIX: &str = "trend-radar.log";
}
