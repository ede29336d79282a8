//! Video listing parser
//!
//! Strategies run from the most specific renderer markup down to bare watch
//! links. Video extraction carries no curated fallback: an empty page yields
//! zero candidates.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use super::selector_fallback::{
    Extraction, ExtractionStrategy, SelectorFallbackExtractor, child_attr, child_text, compile_selector,
    element_text,
};
use crate::domain::errors::ExtractionError;
use crate::domain::video::VideoCandidate;

const BASE_URL: &str = "https://www.youtube.com";

static ARIA_VIEWS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d.,]+\s*[kmb]?)\s+views").expect("valid regex"));
static ARIA_AGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+\s+(?:second|minute|hour|day|week|month|year)s?\s+ago)").expect("valid regex")
});
static ARIA_CHANNEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bby\s+(.+?)\s+[\d.,]+\s*[KMBkmb]?\s+views").expect("valid regex"));

/// Extract the video id from a watch or shorts link
pub fn video_id_from_href(href: &str) -> Option<String> {
    let base = Url::parse(BASE_URL).ok()?;
    let url = base.join(href).ok()?;

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        let id = id.trim().to_string();
        return (!id.is_empty()).then_some(id);
    }

    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("shorts"), Some(id)) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}

/// Selectors for renderer-style cards
struct RendererSelectors {
    link: Selector,
    title: Selector,
    channel: Selector,
    metadata: Selector,
}

impl RendererSelectors {
    fn compile(link: &str, title: &str, channel: &str, metadata: &str) -> Result<Self, ExtractionError> {
        Ok(Self {
            link: compile_selector(link)?,
            title: compile_selector(title)?,
            channel: compile_selector(channel)?,
            metadata: compile_selector(metadata)?,
        })
    }

    fn extract(&self, element: &ElementRef<'_>) -> Result<VideoCandidate, ExtractionError> {
        let id = child_attr(element, &self.link, "href")
            .and_then(|href| video_id_from_href(&href))
            .ok_or_else(|| ExtractionError::required_field_missing("id"))?;

        let title = child_attr(element, &self.title, "title")
            .or_else(|| child_text(element, &self.title))
            .ok_or_else(|| ExtractionError::required_field_missing("title"))?;

        let channel = child_text(element, &self.channel).unwrap_or_default();

        let metadata: Vec<String> = element
            .select(&self.metadata)
            .map(|span| element_text(&span))
            .filter(|text| !text.is_empty())
            .collect();
        let views_text = metadata
            .iter()
            .find(|text| text.to_lowercase().contains("view") || text.to_lowercase().contains("watching"))
            .cloned()
            .unwrap_or_default();
        let upload_text = metadata
            .iter()
            .find(|text| text.to_lowercase().contains("ago") || text.to_lowercase().contains("streamed"))
            .cloned()
            .unwrap_or_default();

        Ok(VideoCandidate {
            id,
            title,
            channel,
            views_text,
            upload_text,
        })
    }
}

/// Generic `[data-video-id]` cards
struct DataCardSelectors {
    title: Selector,
    channel: Selector,
    views: Selector,
    upload: Selector,
}

impl DataCardSelectors {
    fn extract(&self, element: &ElementRef<'_>) -> Result<VideoCandidate, ExtractionError> {
        let id = element
            .value()
            .attr("data-video-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExtractionError::required_field_missing("id"))?
            .to_string();

        let title = element
            .value()
            .attr("data-title")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| child_text(element, &self.title))
            .ok_or_else(|| ExtractionError::required_field_missing("title"))?;

        Ok(VideoCandidate {
            id,
            title,
            channel: child_text(element, &self.channel).unwrap_or_default(),
            views_text: child_text(element, &self.views).unwrap_or_default(),
            upload_text: child_attr(element, &self.upload, "datetime")
                .or_else(|| child_text(element, &self.upload))
                .unwrap_or_default(),
        })
    }
}

/// Bare watch links; metadata comes from the accessibility label when present
fn extract_from_anchor(element: &ElementRef<'_>) -> Result<VideoCandidate, ExtractionError> {
    let id = element
        .value()
        .attr("href")
        .and_then(video_id_from_href)
        .ok_or_else(|| ExtractionError::required_field_missing("id"))?;

    let title = element
        .value()
        .attr("title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| Some(element_text(element)).filter(|t| !t.is_empty()))
        .ok_or_else(|| ExtractionError::required_field_missing("title"))?;

    let label = element.value().attr("aria-label").unwrap_or_default();
    let capture = |re: &Regex| {
        re.captures(label)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    Ok(VideoCandidate {
        id,
        title,
        channel: capture(&ARIA_CHANNEL),
        views_text: capture(&ARIA_VIEWS),
        upload_text: capture(&ARIA_AGE),
    })
}

pub struct VideoListParser {
    extractor: SelectorFallbackExtractor<VideoCandidate>,
}

impl VideoListParser {
    pub fn new() -> Result<Self, ExtractionError> {
        let renderer = RendererSelectors::compile(
            "a#video-title, a#thumbnail, a#video-title-link",
            "#video-title",
            "ytd-channel-name a, #channel-name a, #channel-name",
            "#metadata-line span, .inline-metadata-item",
        )?;
        let grid = RendererSelectors::compile(
            "a#video-title-link, a#video-title, a#thumbnail",
            "#video-title-link, #video-title",
            "ytd-channel-name a, #channel-name a, #channel-name",
            "#metadata-line span, .inline-metadata-item",
        )?;
        let card = DataCardSelectors {
            title: compile_selector(".title, h3, [data-title]")?,
            channel: compile_selector(".channel, .channel-name, .author")?,
            views: compile_selector(".views, .view-count")?,
            upload: compile_selector(".upload-date, .published, time")?,
        };

        let strategies = vec![
            ExtractionStrategy::new("video-renderer", "ytd-video-renderer", move |el| renderer.extract(el))?,
            ExtractionStrategy::new(
                "grid-renderer",
                "ytd-rich-item-renderer, ytd-grid-video-renderer",
                move |el| grid.extract(el),
            )?,
            ExtractionStrategy::new("data-video-id", "[data-video-id]", move |el| card.extract(el))?,
            ExtractionStrategy::new("watch-anchor", r#"a[href*="watch?v="]"#, extract_from_anchor)?,
        ];

        Ok(Self {
            extractor: SelectorFallbackExtractor::new(strategies),
        })
    }

    /// Extract candidates, keeping the first occurrence of each id
    pub fn parse(&self, html: &str) -> Extraction<VideoCandidate> {
        let mut extraction = self.extractor.extract(html);

        let mut seen = HashSet::new();
        let before = extraction.items.len();
        extraction.items.retain(|candidate| seen.insert(candidate.id.clone()));

        match &extraction.strategy_used {
            Some(strategy) => debug!(
                "Extracted {} video candidates via '{}' ({} duplicate ids dropped)",
                extraction.items.len(),
                strategy,
                before - extraction.items.len()
            ),
            None => warn!("No video strategy matched the page"),
        }
        extraction
    }
}
