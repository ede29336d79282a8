//! Human-formatted view counts ("15K", "1.2M views", "123,456 views")

use once_cell::sync::Lazy;
use regex::Regex;

static SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([kmb])").expect("valid suffixed count regex"));
static DIGIT_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").expect("valid digit group regex"));

/// Parse a view count; total, never fails. Unparseable input yields 0.
pub fn parse_view_count(text: &str) -> u64 {
    if let Some(caps) = SUFFIXED.captures(text) {
        let value: f64 = caps[1].parse().unwrap_or(0.0);
        let multiplier = match caps[2].to_ascii_uppercase().as_str() {
            "K" => 1_000.0,
            "M" => 1_000_000.0,
            _ => 1_000_000_000.0,
        };
        return (value * multiplier).round() as u64;
    }

    DIGIT_GROUP
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}
