//! Rule-based engagement prediction.
//!
//! A deterministic score over clip duration and creative text lengths.
//! No model is involved; the same inputs always produce the same output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::creatives::AdCreatives;
use crate::platform::Platform;

const BASE_SCORE: i32 = 60;
const HEADLINE_ADVISORY_CHARS: usize = 50;
const CTA_ADVISORY_CHARS: usize = 20;

/// Engagement bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

impl EngagementLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => Self::High,
            50.. => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// Score, bucket and advisory suggestions for one content variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngagementPrediction {
    /// Predicted score in `[0, 100]`
    pub predicted_engagement: u8,
    pub engagement_level: EngagementLevel,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Predict engagement for a clip of `duration` seconds on `platform`.
pub fn predict_engagement(
    platform: Platform,
    duration: f64,
    creatives: &AdCreatives,
) -> EngagementPrediction {
    let mut score = BASE_SCORE;
    let mut suggestions = Vec::new();

    let (delta, advice) = duration_adjustment(platform, duration);
    score += delta;
    if let Some(advice) = advice {
        suggestions.push(advice.to_string());
    }

    if let Some(headline) = creatives.headline.as_deref().filter(|h| !h.is_empty()) {
        if headline.chars().count() > HEADLINE_ADVISORY_CHARS {
            suggestions.push("Consider shortening your headline for better impact".to_string());
        }
    }

    if let Some(cta) = creatives.call_to_action.as_deref().filter(|c| !c.is_empty()) {
        if cta.chars().count() > CTA_ADVISORY_CHARS {
            suggestions.push("Shorter CTAs typically drive better conversion rates".to_string());
        }
    }

    let predicted_engagement = score.clamp(0, 100) as u8;
    EngagementPrediction {
        predicted_engagement,
        engagement_level: EngagementLevel::from_score(predicted_engagement),
        suggestions,
    }
}

/// Score delta and optional advice for the platform's ideal duration window.
fn duration_adjustment(platform: Platform, duration: f64) -> (i32, Option<&'static str>) {
    match platform {
        Platform::YoutubeShorts => {
            if (15.0..=60.0).contains(&duration) {
                (15, None)
            } else if duration < 15.0 {
                (
                    -10,
                    Some("YouTube Shorts perform better when they're at least 15 seconds long"),
                )
            } else {
                (0, None)
            }
        }
        Platform::YoutubeAds => {
            if (15.0..=30.0).contains(&duration) {
                (10, None)
            } else if duration > 30.0 {
                (
                    -10,
                    Some("Consider shorter ad durations (15-30s) for better completion rates"),
                )
            } else {
                (0, None)
            }
        }
        Platform::DisplayAds => {
            if duration <= 10.0 {
                (15, None)
            } else {
                (-15, Some("Display ads should be very short (under 10 seconds)"))
            }
        }
        Platform::PerformanceMax => {
            if (10.0..=30.0).contains(&duration) {
                (10, None)
            } else if duration > 30.0 {
                (-5, Some("Performance Max ads work best when under 30 seconds"))
            } else {
                (0, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creatives(headline: &str, cta: &str) -> AdCreatives {
        AdCreatives {
            headline: Some(headline.to_string()),
            call_to_action: Some(cta.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_shorts_in_window_is_high() {
        let prediction = predict_engagement(Platform::YoutubeShorts, 30.0, &AdCreatives::default());
        assert_eq!(prediction.predicted_engagement, 75);
        assert_eq!(prediction.engagement_level, EngagementLevel::High);
        assert!(prediction.suggestions.is_empty());
    }

    #[test]
    fn test_long_display_ad_is_low() {
        let prediction = predict_engagement(Platform::DisplayAds, 20.0, &AdCreatives::default());
        assert_eq!(prediction.predicted_engagement, 45);
        assert_eq!(prediction.engagement_level, EngagementLevel::Low);
        assert_eq!(prediction.suggestions.len(), 1);
    }

    #[test]
    fn test_short_shorts_penalized() {
        let prediction = predict_engagement(Platform::YoutubeShorts, 10.0, &AdCreatives::default());
        assert_eq!(prediction.predicted_engagement, 50);
        assert_eq!(prediction.engagement_level, EngagementLevel::Medium);
        assert!(prediction.suggestions[0].contains("at least 15 seconds"));
    }

    #[test]
    fn test_ads_duration_windows() {
        let none = AdCreatives::default();
        assert_eq!(predict_engagement(Platform::YoutubeAds, 15.0, &none).predicted_engagement, 70);
        assert_eq!(predict_engagement(Platform::YoutubeAds, 45.0, &none).predicted_engagement, 50);
        assert_eq!(predict_engagement(Platform::YoutubeAds, 10.0, &none).predicted_engagement, 60);
        assert_eq!(predict_engagement(Platform::PerformanceMax, 20.0, &none).predicted_engagement, 70);
        assert_eq!(predict_engagement(Platform::PerformanceMax, 40.0, &none).predicted_engagement, 55);
        assert_eq!(predict_engagement(Platform::DisplayAds, 6.0, &none).predicted_engagement, 75);
    }

    #[test]
    fn test_text_length_suggestions() {
        let long = creatives(&"h".repeat(51), &"c".repeat(21));
        let prediction = predict_engagement(Platform::YoutubeAds, 15.0, &long);
        assert_eq!(prediction.suggestions.len(), 2);
        // Text advisories never change the score
        assert_eq!(prediction.predicted_engagement, 70);

        let short = creatives(&"h".repeat(50), &"c".repeat(20));
        assert!(predict_engagement(Platform::YoutubeAds, 15.0, &short).suggestions.is_empty());
    }

    #[test]
    fn test_score_always_in_range() {
        for platform in Platform::ALL {
            for duration in [0.0, 1.0, 9.9, 15.0, 30.0, 61.0, 1000.0] {
                let p = predict_engagement(platform, duration, &AdCreatives::default());
                assert!(p.predicted_engagement <= 100);
            }
        }
    }

    #[test]
    fn test_level_serializes_capitalized() {
        let json = serde_json::to_string(&EngagementLevel::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");
    }
}
