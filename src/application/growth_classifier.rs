//! Growth velocity classification
//!
//! Growth percentage is normalized by the square root of age, then compared to
//! tier thresholds scaled by period, age and view-count multipliers. All
//! multipliers come from [`GrowthCalibration`].

use chrono::{DateTime, Utc};

use crate::domain::analytics::{GrowthVideo, VelocityTier};
use crate::domain::repositories::Baseline;
use crate::domain::video::{TimePeriod, VideoRecord};
use crate::infrastructure::config::GrowthCalibration;
use crate::infrastructure::parsing::parse_upload_date;

pub struct GrowthVelocityClassifier {
    calibration: GrowthCalibration,
}

impl GrowthVelocityClassifier {
    pub fn new(calibration: GrowthCalibration) -> Self {
        Self { calibration }
    }

    /// Whole days since the earliest known date, at least 1
    pub fn age_in_days(record: &VideoRecord, now: DateTime<Utc>) -> i64 {
        let earliest = parse_upload_date(&record.upload_date, now)
            .map_or(record.created_at, |uploaded| uploaded.min(record.created_at));
        (now - earliest).num_days().max(1)
    }

    pub fn combined_multiplier(&self, period: TimePeriod, age_in_days: i64, views: u64) -> f64 {
        self.calibration.period_multiplier(period)
            * self.calibration.age_multiplier(age_in_days)
            * self.calibration.view_scale_multiplier(views)
    }

    /// Highest tier whose threshold the score meets, boundaries inclusive
    pub fn tier_for(&self, velocity_score: f64, combined_multiplier: f64) -> VelocityTier {
        let thresholds = &self.calibration.base_thresholds;
        if velocity_score >= thresholds.viral * combined_multiplier {
            VelocityTier::Viral
        } else if velocity_score >= thresholds.fast * combined_multiplier {
            VelocityTier::Fast
        } else if velocity_score >= thresholds.normal * combined_multiplier {
            VelocityTier::Normal
        } else {
            VelocityTier::Slow
        }
    }

    pub fn classify(&self, record: &VideoRecord, period: TimePeriod, baseline: Baseline, now: DateTime<Utc>) -> GrowthVideo {
        let age_in_days = Self::age_in_days(record, now);
        let absolute = record.views as f64 - baseline.views as f64;

        let growth_percentage = if baseline.views == 0 {
            0.0
        } else {
            absolute / baseline.views as f64 * 100.0
        };
        let velocity_score = growth_percentage / (age_in_days as f64).sqrt();
        let combined = self.combined_multiplier(period, age_in_days, record.views);

        GrowthVideo {
            video: record.clone(),
            initial_views: baseline.views,
            growth_rate: absolute / age_in_days as f64,
            growth_percentage,
            velocity_score,
            velocity: self.tier_for(velocity_score, combined),
            age_in_days,
            is_growth_estimated: baseline.estimated,
        }
    }

    /// Significance filter: excluded when both absolute and relative growth are
    /// below the view-scaled minimums
    pub fn is_notable(&self, growth: &GrowthVideo) -> bool {
        let Some(step) = self.calibration.significance_for(growth.video.views) else {
            return true;
        };
        let below_absolute = growth.absolute_growth() < i64::try_from(step.min_absolute_growth).unwrap_or(i64::MAX);
        let below_percentage = growth.growth_percentage < step.min_growth_percentage;
        !(below_absolute && below_percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;

    fn classifier() -> GrowthVelocityClassifier {
        GrowthVelocityClassifier::new(GrowthCalibration::default())
    }

    fn record(views: u64, created_days_ago: i64, upload_date: &str, now: DateTime<Utc>) -> VideoRecord {
        VideoRecord {
            id: "v".to_string(),
            title: "Title".to_string(),
            channel: "Channel".to_string(),
            views,
            upload_date: upload_date.to_string(),
            niche: "other".to_string(),
            keywords: Vec::new(),
            created_at: now - Duration::days(created_days_ago),
            updated_at: now,
            time_period: Some(TimePeriod::Day),
        }
    }

    fn observed(views: u64) -> Baseline {
        Baseline { views, estimated: false }
    }

    #[test]
    fn test_young_small_video_goes_viral() {
        let now = Utc::now();
        let growth = classifier().classify(&record(7_000, 0, "", now), TimePeriod::Day, observed(2_000), now);

        assert_eq!(growth.age_in_days, 1);
        assert!((growth.growth_percentage - 250.0).abs() < 1e-9);
        assert!((growth.velocity_score - 250.0).abs() < 1e-9);
        assert_eq!(growth.velocity, VelocityTier::Viral);
        assert!(!growth.is_growth_estimated);
        assert_eq!(growth.absolute_growth(), 5_000);
    }

    #[rstest]
    #[case(100.0, VelocityTier::Viral)]
    #[case(50.0, VelocityTier::Fast)]
    #[case(15.0, VelocityTier::Normal)]
    #[case(14.99, VelocityTier::Slow)]
    #[case(-20.0, VelocityTier::Slow)]
    fn test_thresholds_are_inclusive(#[case] score: f64, #[case] expected: VelocityTier) {
        assert_eq!(classifier().tier_for(score, 0.5), expected);
    }

    #[test]
    fn test_age_uses_earliest_known_date() {
        let now = Utc::now();
        // Uploaded long before we first saw it
        assert_eq!(GrowthVelocityClassifier::age_in_days(&record(1, 0, "3 weeks ago", now), now), 21);
        assert_eq!(GrowthVelocityClassifier::age_in_days(&record(1, 10, "garbled", now), now), 10);
        assert_eq!(GrowthVelocityClassifier::age_in_days(&record(1, 0, "", now), now), 1);
    }

    #[test]
    fn test_absurd_upload_age_falls_back_to_created_at() {
        let now = Utc::now();
        let video = record(5_000, 4, "999999999 years ago", now);
        assert_eq!(GrowthVelocityClassifier::age_in_days(&video, now), 4);

        let growth = classifier().classify(&video, TimePeriod::Week, observed(1_000), now);
        assert_eq!(growth.age_in_days, 4);
    }

    #[test]
    fn test_zero_baseline_gives_zero_growth() {
        let now = Utc::now();
        let growth = classifier().classify(&record(500, 3, "", now), TimePeriod::Week, observed(0), now);
        assert!(growth.growth_percentage.abs() < f64::EPSILON);
        assert_eq!(growth.velocity, VelocityTier::Slow);
    }

    #[test]
    fn test_significance_filter() {
        let now = Utc::now();
        let c = classifier();

        // 1M+ views: +10k is below 50k but 1% is below 5%: excluded
        let small = c.classify(&record(1_010_000, 5, "", now), TimePeriod::Week, observed(1_000_000), now);
        assert!(!c.is_notable(&small));

        // Absolute growth alone is enough
        let large = c.classify(&record(1_060_000, 5, "", now), TimePeriod::Week, observed(1_000_000), now);
        assert!(c.is_notable(&large));

        // Small channel: 30% relative growth is enough
        let relative = c.classify(&record(130, 5, "", now), TimePeriod::Week, observed(100), now);
        assert!(c.is_notable(&relative));
    }

    proptest! {
        #[test]
        fn prop_tier_is_monotonic_in_score(
            a in -500.0f64..5_000.0,
            b in -500.0f64..5_000.0,
            multiplier in 0.01f64..20.0,
        ) {
            let c = classifier();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(c.tier_for(low, multiplier) <= c.tier_for(high, multiplier));
        }

        #[test]
        fn prop_more_growth_never_lowers_tier(
            views in 1u64..5_000_000,
            lower_baseline_pct in 1u64..100,
            higher_baseline_pct in 1u64..100,
            days in 0i64..1_000,
        ) {
            let now = Utc::now();
            let c = classifier();
            let rec = record(views, days, "", now);
            let (small, large) = if lower_baseline_pct <= higher_baseline_pct {
                (lower_baseline_pct, higher_baseline_pct)
            } else {
                (higher_baseline_pct, lower_baseline_pct)
            };
            // A smaller baseline means a larger growth percentage
            let more = c.classify(&rec, TimePeriod::Month, observed(views * small / 100), now);
            let less = c.classify(&rec, TimePeriod::Month, observed(views * large / 100), now);
            prop_assert!(more.velocity >= less.velocity);
        }
    }
}
