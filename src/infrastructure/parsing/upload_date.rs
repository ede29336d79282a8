//! Loosely structured upload dates
//!
//! Listing pages show relative text ("3 days ago", "Streamed 2 weeks ago");
//! stored records may carry RFC 3339 or plain `YYYY-MM-DD` timestamps.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(second|sec|minute|min|hour|hr|day|week|month|year)s?\s+ago").expect("valid regex")
});

pub fn parse_upload_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d", "%b %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    let lower = text.to_lowercase();
    if lower.contains("just now") || lower == "today" {
        return Some(now);
    }
    if lower.contains("yesterday") {
        return Some(now - Duration::days(1));
    }

    let caps = RELATIVE.captures(text)?;
    let amount: i64 = caps[1].parse().ok()?;
    let unit_seconds: i64 = match caps[2].to_lowercase().as_str() {
        "second" | "sec" => 1,
        "minute" | "min" => 60,
        "hour" | "hr" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        _ => 365 * 86_400,
    };
    // Out-of-range ages are unparseable
    let age = Duration::try_seconds(amount.checked_mul(unit_seconds)?)?;
    now.checked_sub_signed(age)
}
