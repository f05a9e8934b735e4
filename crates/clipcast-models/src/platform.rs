//! Target platforms and their clip settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::aspect::AspectRatio;

/// Hard cap on short-form clip length.
pub const SHORTS_MAX_DURATION_SECS: f64 = 60.0;

/// Platform a content variant is produced for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    YoutubeShorts,
    YoutubeAds,
    DisplayAds,
    PerformanceMax,
}

/// Static settings for one platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformSettings {
    /// Nominal clip duration in seconds
    pub duration: f64,
    /// Output aspect ratio
    pub aspect_ratio: AspectRatio,
    /// Whether timed subtitles are burned in by default
    pub auto_subtitles: bool,
    /// Whether the smart crop and letterbox tiers are attempted
    pub content_aware: bool,
}

impl Platform {
    /// All platforms in processing order.
    pub const ALL: [Platform; 4] = [
        Platform::YoutubeShorts,
        Platform::YoutubeAds,
        Platform::DisplayAds,
        Platform::PerformanceMax,
    ];

    /// Get the snake_case name used in paths and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YoutubeShorts => "youtube_shorts",
            Platform::YoutubeAds => "youtube_ads",
            Platform::DisplayAds => "display_ads",
            Platform::PerformanceMax => "performance_max",
        }
    }

    /// Human-readable ad format label used in generation prompts.
    pub fn format_label(&self) -> &'static str {
        match self {
            Platform::YoutubeShorts => "YouTube Shorts",
            Platform::YoutubeAds => "YouTube Ads",
            Platform::DisplayAds => "Display Ads",
            Platform::PerformanceMax => "Performance Max",
        }
    }

    pub fn settings(&self) -> PlatformSettings {
        match self {
            Platform::YoutubeShorts => PlatformSettings {
                duration: SHORTS_MAX_DURATION_SECS,
                aspect_ratio: AspectRatio::PORTRAIT,
                auto_subtitles: true,
                content_aware: true,
            },
            Platform::YoutubeAds => PlatformSettings {
                duration: 15.0,
                aspect_ratio: AspectRatio::LANDSCAPE,
                auto_subtitles: false,
                content_aware: false,
            },
            Platform::DisplayAds => PlatformSettings {
                duration: 6.0,
                aspect_ratio: AspectRatio::SQUARE,
                auto_subtitles: false,
                content_aware: false,
            },
            Platform::PerformanceMax => PlatformSettings {
                duration: 20.0,
                aspect_ratio: AspectRatio::LANDSCAPE,
                auto_subtitles: false,
                content_aware: false,
            },
        }
    }

    /// Compute the `[start, end)` clip window inside a source of `source_duration`.
    ///
    /// The start is clamped to leave at least one second of source. Shorts
    /// always span at least one second; ads end at the source end.
    pub fn clip_window(&self, timestamp: f64, source_duration: f64) -> (f64, f64) {
        let start = timestamp.min(source_duration - 1.0).max(0.0);
        let length = self.settings().duration;
        match self {
            Platform::YoutubeShorts => {
                let end = (start + length.min(SHORTS_MAX_DURATION_SECS)).min(source_duration);
                (start, end.max(start + 1.0))
            }
            _ => (start, (start + length).min(source_duration)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube_shorts" => Ok(Platform::YoutubeShorts),
            "youtube_ads" => Ok(Platform::YoutubeAds),
            "display_ads" => Ok(Platform::DisplayAds),
            "performance_max" => Ok(Platform::PerformanceMax),
            _ => Err(PlatformParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown platform: {0}, expected one of youtube_shorts, youtube_ads, display_ads, performance_max")]
pub struct PlatformParseError(pub String);
