//! Rendered-page fetching with bounded retries
//!
//! Each call to [`FetchOrchestrator::navigate`] owns one browser session for the
//! duration of navigation and capture. The session is closed on every exit path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::errors::FetchError;
use crate::infrastructure::browser::{BrowserLauncher, BrowserPage, NavigationOptions};
use crate::infrastructure::config::{FetchConfig, ViewportSize};

/// Randomized-but-realistic client profile for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub viewport: ViewportSize,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl SessionProfile {
    pub fn random(config: &FetchConfig) -> Self {
        let viewport = pick(&config.viewports).copied().unwrap_or(ViewportSize {
            width: 1920,
            height: 1080,
        });
        let user_agent = pick(&config.user_agents).cloned().unwrap_or_default();

        let mut headers = HashMap::new();
        if let Some(language) = pick(&config.accept_languages) {
            headers.insert("Accept-Language".to_string(), language.clone());
        }
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());

        Self {
            viewport,
            user_agent,
            headers,
        }
    }
}

fn pick<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(fastrand::usize(..items.len()))
    }
}

pub struct FetchOrchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    config: FetchConfig,
    wait_until: String,
}

impl FetchOrchestrator {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: FetchConfig, wait_until: impl Into<String>) -> Self {
        Self {
            launcher,
            config,
            wait_until: wait_until.into(),
        }
    }

    /// Fetch the rendered HTML of `url`
    pub async fn navigate(&self, url: &str) -> Result<String, FetchError> {
        let mut page = self.launcher.launch().await.map_err(|e| match e {
            FetchError::SessionLaunch(_) => e,
            other => FetchError::SessionLaunch(other.to_string()),
        })?;

        let result = self.drive(page.as_mut(), url).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close browser session for {}: {}", url, e);
        }
        result
    }

    async fn drive(&self, page: &mut dyn BrowserPage, url: &str) -> Result<String, FetchError> {
        let profile = SessionProfile::random(&self.config);
        debug!(
            "Session profile: {}x{}, UA={}",
            profile.viewport.width, profile.viewport.height, profile.user_agent
        );
        page.set_viewport(profile.viewport).await?;
        page.set_user_agent(&profile.user_agent).await?;
        page.set_extra_headers(profile.headers).await?;

        let options = NavigationOptions {
            wait_until: self.wait_until.clone(),
            timeout_ms: self.config.navigation_timeout_ms,
        };
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!("🌐 Navigating to {} (attempt {}/{})", url, attempt, max_attempts);

            let outcome = tokio::time::timeout(
                Duration::from_millis(options.timeout_ms),
                page.goto(url, &options),
            )
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout_ms,
                })
            });

            match outcome {
                Ok(()) => {
                    if self.config.settle_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
                    }
                    let html = page.content().await?;
                    info!("✅ Fetched {} ({} bytes, attempt {})", url, html.len(), attempt);
                    return Ok(html);
                }
                Err(e) if !e.is_retryable() => {
                    warn!("Navigation to {} failed without retry: {}", url, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("⚠️ Attempt {}/{} for {} failed: {}", attempt, max_attempts, url, e);
                    last_error = e.to_string();
                    if attempt < max_attempts && self.config.retry_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }

        Err(FetchError::Navigation {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn transport(msg: &str) -> Result<String, FetchError> {
        Err(FetchError::Transport(msg.to_string()))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let launcher = Arc::new(ScriptedLauncher::new(vec![
            transport("reset"),
            transport("reset"),
            Ok("<html>ok</html>".to_string()),
        ]));
        let html = orchestrator(&launcher).navigate("https://example.com").await.unwrap();

        assert_eq!(html, "<html>ok</html>");
        assert_eq!(launcher.gotos(), 3);
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_yield_navigation_error_and_close_session() {
        let launcher = Arc::new(ScriptedLauncher::new(vec![
            transport("a"),
            transport("b"),
            transport("c"),
            Ok("never reached".to_string()),
        ]));
        let err = orchestrator(&launcher).navigate("https://example.com").await.unwrap_err();

        match err {
            FetchError::Navigation { attempts, last_error, .. } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains('c'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(launcher.gotos(), 3);
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let launcher = Arc::new(ScriptedLauncher::new(vec![
            Err(FetchError::RateLimited { url: "u".to_string() }),
            Ok("unused".to_string()),
        ]));
        let err = orchestrator(&launcher).navigate("https://example.com").await.unwrap_err();

        assert!(matches!(err, FetchError::RateLimited { .. }));
        assert_eq!(launcher.gotos(), 1);
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_session_launch_error() {
        let launcher = Arc::new(ScriptedLauncher {
            fail_launch: true,
            ..ScriptedLauncher::default()
        });
        let err = orchestrator(&launcher).navigate("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::SessionLaunch(_)));
        assert_eq!(launcher.closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_navigation_times_out_each_attempt() {
        let launcher = Arc::new(ScriptedLauncher {
            hang: true,
            ..ScriptedLauncher::default()
        });
        let config = FetchConfig {
            retry_delay_ms: 500,
            ..fast_fetch_config()
        };
        let fetcher = FetchOrchestrator::new(Arc::new(Arc::clone(&launcher)), config, "networkidle2");

        let started = tokio::time::Instant::now();
        let err = fetcher.navigate("https://example.com/slow").await.unwrap_err();

        match err {
            FetchError::Navigation { attempts, last_error, .. } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("1000"), "unexpected last error: {last_error}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(launcher.gotos(), 3);
        assert_eq!(launcher.closes(), 1);
        // Three 1s timeouts plus two retry delays
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(4_000) && elapsed < Duration::from_millis(4_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_precedes_capture() {
        let launcher = Arc::new(ScriptedLauncher::new(vec![Ok("<html>late</html>".to_string())]));
        let config = FetchConfig {
            settle_delay_ms: 2_500,
            ..fast_fetch_config()
        };
        let fetcher = FetchOrchestrator::new(Arc::new(Arc::clone(&launcher)), config, "networkidle2");

        let started = tokio::time::Instant::now();
        let html = fetcher.navigate("https://example.com").await.unwrap();

        assert_eq!(html, "<html>late</html>");
        assert!(started.elapsed() >= Duration::from_millis(2_500));
        assert_eq!(launcher.closes(), 1);
    }

    #[test]
    fn test_session_profile_draws_from_pools() {
        let config = FetchConfig::default();
        let profile = SessionProfile::random(&config);
        assert!(config.viewports.contains(&profile.viewport));
        assert!(config.user_agents.contains(&profile.user_agent));
        let language = profile.headers.get("Accept-Language").unwrap();
        assert!(config.accept_languages.contains(language));
    }
}
