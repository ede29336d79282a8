//! Ordered-strategy extraction that degrades gracefully as markup drifts
//!
//! Strategies are tried in priority order. A strategy whose selector matches
//! nothing is skipped; elements failing their field rule are skipped one by one.
//! The first strategy producing at least one item wins. When every strategy
//! comes up empty the configured fallback items are returned instead.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::errors::ExtractionError;

pub type FieldRule<T> = Box<dyn Fn(&ElementRef<'_>) -> Result<T, ExtractionError> + Send + Sync>;

pub struct ExtractionStrategy<T> {
    pub name: String,
    selector: Selector,
    rule: FieldRule<T>,
}

impl<T> ExtractionStrategy<T> {
    pub fn new<F>(name: impl Into<String>, selector: &str, rule: F) -> Result<Self, ExtractionError>
    where
        F: Fn(&ElementRef<'_>) -> Result<T, ExtractionError> + Send + Sync + 'static,
    {
        Ok(Self {
            name: name.into(),
            selector: compile_selector(selector)?,
            rule: Box::new(rule),
        })
    }
}

/// Result of one extraction pass
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub items: Vec<T>,
    /// Name of the winning strategy; `None` when nothing matched
    pub strategy_used: Option<String>,
    pub used_fallback: bool,
}

impl<T> Extraction<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct SelectorFallbackExtractor<T> {
    strategies: Vec<ExtractionStrategy<T>>,
    fallback: Vec<T>,
}

impl<T: Clone> SelectorFallbackExtractor<T> {
    pub fn new(strategies: Vec<ExtractionStrategy<T>>) -> Self {
        Self {
            strategies,
            fallback: Vec::new(),
        }
    }

    /// Items returned when every strategy yields nothing
    pub fn with_fallback(mut self, fallback: Vec<T>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn extract(&self, html: &str) -> Extraction<T> {
        let document = Html::parse_document(html);
        self.extract_from(&document)
    }

    pub fn extract_from(&self, document: &Html) -> Extraction<T> {
        for strategy in &self.strategies {
            let elements: Vec<ElementRef<'_>> = document.select(&strategy.selector).collect();
            if elements.is_empty() {
                debug!("Strategy '{}' matched no elements", strategy.name);
                continue;
            }

            let mut items = Vec::with_capacity(elements.len());
            let mut skipped = 0usize;
            for element in &elements {
                match (strategy.rule)(element) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        skipped += 1;
                        debug!("Strategy '{}' skipped element: {}", strategy.name, e);
                    }
                }
            }

            if !items.is_empty() {
                debug!(
                    "Strategy '{}' extracted {} items ({} skipped)",
                    strategy.name,
                    items.len(),
                    skipped
                );
                return Extraction {
                    items,
                    strategy_used: Some(strategy.name.clone()),
                    used_fallback: false,
                };
            }
        }

        Extraction {
            items: self.fallback.clone(),
            strategy_used: None,
            used_fallback: !self.fallback.is_empty(),
        }
    }
}

pub fn compile_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Element text with whitespace collapsed
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first descendant matching `selector`, if non-empty
pub fn child_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|child| element_text(&child))
        .find(|text| !text.is_empty())
}

/// Attribute of the first descendant matching `selector`, if non-empty
pub fn child_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .filter_map(|child| child.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(ToString::to_string)
}
