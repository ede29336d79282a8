//! Search-suggestion endpoint client
//!
//! The endpoint answers with a JSONP-style wrapped array whose second element
//! holds `[suggestion, ...]` tuples. Requests are rate limited and time boxed.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::domain::errors::TrendsError;
use crate::infrastructure::config::SourcesConfig;

pub struct SuggestionClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    endpoint: String,
}

impl SuggestionClient {
    pub fn new(config: &SourcesConfig) -> Result<Self, TrendsError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.suggestion_timeout_ms))
            .build()
            .map_err(|e| TrendsError::Suggestion(format!("Failed to create HTTP client: {e}")))?;

        let per_second = NonZeroU32::new(config.suggestion_requests_per_second)
            .ok_or_else(|| TrendsError::Suggestion("Rate limit must be greater than 0".to_string()))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            endpoint: config.suggestion_url.clone(),
        })
    }

    pub async fn suggest(&self, query: &str) -> Result<Vec<String>, TrendsError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("client", "youtube"), ("ds", "yt"), ("q", query)])
            .send()
            .await
            .map_err(|e| TrendsError::Suggestion(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TrendsError::RateLimited(self.endpoint.clone()));
        }
        if !status.is_success() {
            return Err(TrendsError::Suggestion(format!("HTTP {} for '{}'", status.as_u16(), query)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrendsError::Suggestion(e.to_string()))?;
        let suggestions = parse_suggestion_payload(&body)?;
        debug!("{} suggestions for '{}'", suggestions.len(), query);
        Ok(suggestions)
    }
}

/// Strip the JSONP callback wrapper and pull suggestion texts from element [1]
pub fn parse_suggestion_payload(body: &str) -> Result<Vec<String>, TrendsError> {
    let body = body.trim();
    let json = if body.starts_with('[') {
        body
    } else {
        let start = body.find('(');
        let end = body.rfind(')');
        match (start, end) {
            (Some(start), Some(end)) if start < end => &body[start + 1..end],
            _ => return Err(TrendsError::Suggestion("unrecognized payload wrapper".to_string())),
        }
    };

    let value: Value = serde_json::from_str(json).map_err(|e| TrendsError::Suggestion(e.to_string()))?;
    let tuples = value
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| TrendsError::Suggestion("payload has no suggestion array".to_string()))?;

    Ok(tuples
        .iter()
        .filter_map(|tuple| tuple.get(0).and_then(Value::as_str))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwraps_jsonp_payload() {
        let body = r#"window.google.ac.h(["rust",[["rust tutorial",0,[512]],["rust game",0],["",0]],{"k":1}])"#;
        let suggestions = parse_suggestion_payload(body).unwrap();
        assert_eq!(suggestions, vec!["rust tutorial", "rust game"]);
    }

    #[test]
    fn test_accepts_bare_array() {
        let suggestions = parse_suggestion_payload(r#"["q",[["one"],["two"]]]"#).unwrap();
        assert_eq!(suggestions, vec!["one", "two"]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_suggestion_payload("<html>blocked</html>").is_err());
        assert!(parse_suggestion_payload(r#"cb({"a":1})"#).is_err());
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        let config = SourcesConfig {
            suggestion_requests_per_second: 0,
            ..SourcesConfig::default()
        };
        assert!(SuggestionClient::new(&config).is_err());
    }
}
