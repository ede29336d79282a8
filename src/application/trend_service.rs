//! Search-trend refresh and related-query lookup

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::{ExtractionError, TrendsError};
use crate::domain::repositories::TrendRepository;
use crate::domain::trend::{GLOBAL_REGION, TrendRecord, TrendWindow, normalize_region};
use crate::infrastructure::fetch_orchestrator::FetchOrchestrator;
use crate::infrastructure::parsing::TrendListParser;
use crate::infrastructure::suggestion_client::SuggestionClient;

#[derive(Debug, Clone, Serialize)]
pub struct TrendRefresh {
    pub records: Vec<TrendRecord>,
    /// Served from stored rows after a rate-limit signal
    pub from_cache: bool,
    /// The page matched no strategy and the curated list was used
    pub used_fallback: bool,
}

pub struct TrendService {
    fetcher: FetchOrchestrator,
    parser: TrendListParser,
    trends: Arc<dyn TrendRepository>,
    suggestions: Option<SuggestionClient>,
    explore_url: String,
}

/// Explorer URL for a window; the geo parameter is empty for global trends
pub fn explore_url(base: &str, window: TrendWindow, region: &str) -> String {
    let geo = if region == GLOBAL_REGION { "" } else { region };
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("date", window.explorer_date_param())
        .append_pair("geo", geo)
        .finish();
    format!("{base}?{query}")
}

impl TrendService {
    pub fn new(
        fetcher: FetchOrchestrator,
        trends: Arc<dyn TrendRepository>,
        suggestions: Option<SuggestionClient>,
        explore_url: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            fetcher,
            parser: TrendListParser::new()?,
            trends,
            suggestions,
            explore_url: explore_url.into(),
        })
    }

    /// Fetch, rank and store the current trend list for `window` and `region`.
    ///
    /// A rate-limit signal falls back to the stored rows for the same key when
    /// any exist; otherwise it propagates as [`TrendsError::RateLimited`].
    pub async fn refresh(&self, window: TrendWindow, region: &str) -> Result<TrendRefresh, TrendsError> {
        let region = normalize_region(region);
        let url = explore_url(&self.explore_url, window, &region);

        let html = match self.fetcher.navigate(&url).await.map_err(TrendsError::from) {
            Ok(html) => html,
            Err(TrendsError::RateLimited(source)) => {
                let cached = self.trends.find_trends(window, &region).await?;
                if cached.is_empty() {
                    return Err(TrendsError::RateLimited(source));
                }
                warn!(
                    "⚠️ Trends rate limited for {}/{}; serving {} cached rows",
                    window,
                    region,
                    cached.len()
                );
                return Ok(TrendRefresh {
                    records: cached,
                    from_cache: true,
                    used_fallback: false,
                });
            }
            Err(e) => return Err(e),
        };

        let extraction = self.parser.parse(&html);
        let records: Vec<TrendRecord> = extraction
            .items
            .into_iter()
            .map(|ranked| TrendRecord::new(ranked.keyword, ranked.rank, window, &region))
            .collect();

        let stored = self.trends.replace_trends(&records).await?;
        info!("📊 Stored {} trends for {}/{}", stored, window, region);

        Ok(TrendRefresh {
            records,
            from_cache: false,
            used_fallback: extraction.used_fallback,
        })
    }

    /// Suggestions for `seed`; failures degrade to an empty list
    pub async fn related_queries(&self, seed: &str) -> Vec<String> {
        let Some(client) = &self.suggestions else {
            return Vec::new();
        };
        match client.suggest(seed).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("⚠️ Suggestion lookup for '{}' failed: {}", seed, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FetchError;
    use crate::infrastructure::fetch_orchestrator::test_support::{ScriptedLauncher, orchestrator};
    use crate::infrastructure::{DatabaseConnection, SqliteTrendRepository};

    const EXPLORER: &str = r#"
        <div class="fe-related-queries">
          <div class="label-text">rust tutorial</div>
          <div class="label-text">Rust Tutorial</div>
          <div class="label-text">tokio</div>
        </div>
    "#;

    fn rate_limited() -> Result<String, FetchError> {
        Err(FetchError::RateLimited {
            url: "https://trends.example".to_string(),
        })
    }

    async fn service(script: Vec<Result<String, FetchError>>) -> (TrendService, Arc<SqliteTrendRepository>) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = Arc::new(SqliteTrendRepository::new(db.pool().clone()));
        let launcher = Arc::new(ScriptedLauncher::new(script));
        let service = TrendService::new(orchestrator(&launcher), repo.clone(), None, "https://trends.example/explore").unwrap();
        (service, repo)
    }

    #[test]
    fn test_explore_url() {
        let url = explore_url("https://trends.example/explore", TrendWindow::SevenDays, "US");
        assert_eq!(url, "https://trends.example/explore?date=now+7-d&geo=US");
        assert!(explore_url("b", TrendWindow::Today, GLOBAL_REGION).ends_with("geo="));
    }

    #[tokio::test]
    async fn test_refresh_ranks_and_stores() {
        let (service, repo) = service(vec![Ok(EXPLORER.to_string())]).await;

        let refresh = service.refresh(TrendWindow::Today, "us").await.unwrap();

        assert!(!refresh.from_cache);
        let keywords: Vec<_> = refresh.records.iter().map(|t| (t.keyword.as_str(), t.rank)).collect();
        assert_eq!(keywords, vec![("rust tutorial", 1), ("tokio", 2)]);
        assert_eq!(repo.find_trends(TrendWindow::Today, "US").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_serves_cached_rows() {
        let (service, _repo) = service(vec![Ok(EXPLORER.to_string()), rate_limited()]).await;
        service.refresh(TrendWindow::Today, "US").await.unwrap();

        let refresh = service.refresh(TrendWindow::Today, "US").await.unwrap();

        assert!(refresh.from_cache);
        assert_eq!(refresh.records.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_without_cache_propagates() {
        let (service, _repo) = service(vec![rate_limited()]).await;
        let err = service.refresh(TrendWindow::ThirtyDays, "US").await.unwrap_err();
        assert!(matches!(err, TrendsError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_related_queries_without_client_is_empty() {
        let (service, _repo) = service(Vec::new()).await;
        assert!(service.related_queries("rust").await.is_empty());
    }
}
