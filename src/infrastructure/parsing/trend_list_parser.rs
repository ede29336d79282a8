//! Trend explorer keyword parser
//!
//! Keywords are de-duplicated by normalized text before ranks are assigned, so
//! rank is first-appearance order starting at 1. Callers always get a non-empty
//! result: when no strategy matches, a curated keyword list is returned.

use std::collections::HashSet;

use scraper::ElementRef;
use tracing::{debug, warn};

use super::selector_fallback::{Extraction, ExtractionStrategy, SelectorFallbackExtractor, element_text};
use crate::domain::errors::ExtractionError;

pub const CURATED_TRENDS: &[&str] = &[
    "ai tools",
    "chatgpt",
    "minecraft",
    "iphone",
    "fortnite",
    "taylor swift",
    "bitcoin",
    "world cup",
    "python tutorial",
    "workout routine",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedKeyword {
    pub keyword: String,
    pub rank: u32,
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn keyword_text(element: &ElementRef<'_>) -> Result<String, ExtractionError> {
    let text = normalize(&element_text(element));
    if text.is_empty() {
        Err(ExtractionError::required_field_missing("keyword"))
    } else {
        Ok(text)
    }
}

fn keyword_attr(element: &ElementRef<'_>) -> Result<String, ExtractionError> {
    element
        .value()
        .attr("data-query")
        .map(normalize)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ExtractionError::required_field_missing("data-query"))
}

pub struct TrendListParser {
    extractor: SelectorFallbackExtractor<String>,
}

impl TrendListParser {
    pub fn new() -> Result<Self, ExtractionError> {
        Self::with_fallback(CURATED_TRENDS.iter().map(|s| (*s).to_string()).collect())
    }

    pub fn with_fallback(fallback: Vec<String>) -> Result<Self, ExtractionError> {
        let strategies = vec![
            ExtractionStrategy::new(
                "related-queries",
                ".fe-related-queries .label-text, .related-queries .label-text",
                keyword_text,
            )?,
            ExtractionStrategy::new("feed-item", ".feed-item .title a, .feed-item-header .title", keyword_text)?,
            ExtractionStrategy::new("data-query", "[data-query]", keyword_attr)?,
            ExtractionStrategy::new("trending-search", ".trending-searches .title, .mZ3RIc", keyword_text)?,
        ];

        Ok(Self {
            extractor: SelectorFallbackExtractor::new(strategies).with_fallback(fallback),
        })
    }

    pub fn parse(&self, html: &str) -> Extraction<RankedKeyword> {
        let extraction = self.extractor.extract(html);
        if extraction.used_fallback {
            warn!("No trend strategy matched; using curated keyword list");
        }

        let mut seen = HashSet::new();
        let mut ranked = Vec::new();
        for keyword in extraction.items {
            if seen.insert(keyword.to_lowercase()) {
                ranked.push(RankedKeyword {
                    keyword,
                    rank: u32::try_from(ranked.len() + 1).unwrap_or(u32::MAX),
                });
            }
        }
        debug!("Ranked {} trend keywords", ranked.len());

        Extraction {
            items: ranked,
            strategy_used: extraction.strategy_used,
            used_fallback: extraction.used_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_before_rank() {
        let html = r#"
            <div class="fe-related-queries">
              <div class="label-text">Rust  Tutorial</div>
              <div class="label-text">rust tutorial</div>
              <div class="label-text">Tokio</div>
              <div class="label-text">   </div>
            </div>
        "#;
        let result = TrendListParser::new().unwrap().parse(html);

        assert_eq!(
            result.items,
            vec![
                RankedKeyword { keyword: "Rust Tutorial".to_string(), rank: 1 },
                RankedKeyword { keyword: "Tokio".to_string(), rank: 2 },
            ]
        );
        assert!(!result.used_fallback);
    }

    #[test]
    fn test_data_query_attributes() {
        let html = r#"<ul><li data-query="alpha"></li><li data-query="beta"></li></ul>"#;
        let result = TrendListParser::new().unwrap().parse(html);
        assert_eq!(result.strategy_used.as_deref(), Some("data-query"));
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn test_curated_fallback_is_never_empty() {
        let result = TrendListParser::new().unwrap().parse("<html></html>");
        assert!(result.used_fallback);
        assert_eq!(result.items.len(), CURATED_TRENDS.len());
        assert_eq!(result.items[0].rank, 1);
    }
}
