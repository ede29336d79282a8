//! Headless-browser collaborator
//!
//! `BrowserLauncher` hands out single-use `BrowserPage` sessions. The shipped
//! implementation talks to a Browserless-compatible `/content` endpoint, which
//! renders the page server-side and returns the final HTML.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::domain::errors::FetchError;
use crate::infrastructure::config::{BrowserConfig, ViewportSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Lifecycle event that marks navigation complete (e.g. "networkidle2")
    pub wait_until: String,
    pub timeout_ms: u64,
}

/// One browser session; at most one navigation is in flight at a time
#[async_trait]
pub trait BrowserPage: Send {
    async fn set_viewport(&mut self, viewport: ViewportSize) -> Result<(), FetchError>;
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), FetchError>;
    async fn set_extra_headers(&mut self, headers: HashMap<String, String>) -> Result<(), FetchError>;
    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), FetchError>;
    /// Rendered HTML of the last successful navigation
    async fn content(&mut self) -> Result<String, FetchError>;
    async fn close(&mut self) -> Result<(), FetchError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, FetchError>;
}

pub struct BrowserlessLauncher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl BrowserlessLauncher {
    pub fn new(config: &BrowserConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::SessionLaunch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/content", config.endpoint.trim_end_matches('/')),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl BrowserLauncher for BrowserlessLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, FetchError> {
        Ok(Box::new(BrowserlessPage {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            viewport: None,
            user_agent: None,
            headers: HashMap::new(),
            html: None,
            closed: false,
        }))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions<'a> {
    wait_until: &'a str,
    timeout: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    viewport: Option<ViewportSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<&'a str>,
    #[serde(rename = "setExtraHTTPHeaders", skip_serializing_if = "no_headers")]
    extra_headers: &'a HashMap<String, String>,
}

fn no_headers(headers: &&HashMap<String, String>) -> bool {
    headers.is_empty()
}

struct BrowserlessPage {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    viewport: Option<ViewportSize>,
    user_agent: Option<String>,
    headers: HashMap<String, String>,
    html: Option<String>,
    closed: bool,
}

impl BrowserlessPage {
    fn ensure_open(&self) -> Result<(), FetchError> {
        if self.closed {
            return Err(FetchError::Transport("browser session already closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for BrowserlessPage {
    async fn set_viewport(&mut self, viewport: ViewportSize) -> Result<(), FetchError> {
        self.ensure_open()?;
        self.viewport = Some(viewport);
        Ok(())
    }

    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), FetchError> {
        self.ensure_open()?;
        self.user_agent = Some(user_agent.to_string());
        Ok(())
    }

    async fn set_extra_headers(&mut self, headers: HashMap<String, String>) -> Result<(), FetchError> {
        self.ensure_open()?;
        self.headers = headers;
        Ok(())
    }

    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), FetchError> {
        self.ensure_open()?;
        let body = ContentRequest {
            url,
            goto_options: GotoOptions {
                wait_until: &options.wait_until,
                timeout: options.timeout_ms,
            },
            viewport: self.viewport,
            user_agent: self.user_agent.as_deref(),
            extra_headers: &self.headers,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_millis(options.timeout_ms))
            .json(&body);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout_ms,
                }
            } else {
                FetchError::from(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Transport(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let html = response.text().await?;
        debug!("Rendered {} ({} bytes)", url, html.len());
        self.html = Some(html);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        self.ensure_open()?;
        self.html
            .clone()
            .ok_or_else(|| FetchError::Transport("no page has been loaded".to_string()))
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.closed = true;
        self.html = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_content_before_navigation_is_an_error() {
        let launcher = BrowserlessLauncher::new(&BrowserConfig::default()).unwrap();
        let mut page = launcher.launch().await.unwrap();
        assert!(page.content().await.is_err());
        page.close().await.unwrap();
        assert!(page.set_user_agent("ua").await.is_err());
    }

    #[test]
    fn test_request_body_uses_browserless_field_names() {
        let headers = HashMap::from([("Accept-Language".to_string(), "en-US".to_string())]);
        let body = ContentRequest {
            url: "https://example.com",
            goto_options: GotoOptions {
                wait_until: "networkidle2",
                timeout: 1000,
            },
            viewport: Some(ViewportSize { width: 1280, height: 720 }),
            user_agent: Some("ua"),
            extra_headers: &headers,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["gotoOptions"]["waitUntil"], "networkidle2");
        assert_eq!(json["userAgent"], "ua");
        assert_eq!(json["setExtraHTTPHeaders"]["Accept-Language"], "en-US");
        assert_eq!(json["viewport"]["width"], 1280);
    }
}
