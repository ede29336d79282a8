//! Trend Radar - resilient ingestion and analysis of video listings and search trends
//!
//! Listing and trend pages are fetched through a headless browser, extracted
//! with ordered selector fallbacks, enriched with keywords and niches, and
//! persisted to SQLite. Analysis classifies growth velocity and builds keyword
//! co-occurrence graphs over the stored set.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
