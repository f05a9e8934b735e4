//! Persisted per-platform metadata and the run summary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aspect::AspectRatio;
use crate::creatives::AdCreatives;
use crate::engagement::{EngagementLevel, EngagementPrediction};
use crate::platform::Platform;

/// Metadata record written next to each platform's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentMetadata {
    pub platform: Platform,
    /// Source timestamp the clip starts at (seconds)
    pub timestamp: f64,
    /// Nominal clip duration (seconds)
    pub duration: f64,
    pub aspect_ratio: AspectRatio,
    /// Video filename relative to the platform directory
    pub video_file: String,
    /// Thumbnail filename relative to the platform directory
    pub thumbnail_file: String,
    pub creatives: AdCreatives,
    pub job_id: Option<String>,
    pub engagement_prediction: EngagementPrediction,
}

impl ContentMetadata {
    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Per-platform entry of the summary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentSummary {
    pub video_file: String,
    pub thumbnail_file: String,
    pub predicted_engagement: u8,
    pub engagement_level: EngagementLevel,
}

impl From<&ContentMetadata> for ContentSummary {
    fn from(metadata: &ContentMetadata) -> Self {
        Self {
            video_file: metadata.video_file.clone(),
            thumbnail_file: metadata.thumbnail_file.clone(),
            predicted_engagement: metadata.engagement_prediction.predicted_engagement,
            engagement_level: metadata.engagement_prediction.engagement_level,
        }
    }
}

/// `summary_report.json` aggregating one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryReport {
    /// Input video file name
    pub input_video: String,
    pub platforms_processed: Vec<Platform>,
    pub job_id: Option<String>,
    pub created_content: BTreeMap<Platform, ContentSummary>,
}

impl SummaryReport {
    pub fn new(input_video: impl Into<String>, platforms: &[Platform], job_id: Option<String>) -> Self {
        Self {
            input_video: input_video.into(),
            platforms_processed: platforms.to_vec(),
            job_id,
            created_content: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, metadata: &ContentMetadata) {
        self.created_content
            .insert(metadata.platform, ContentSummary::from(metadata));
    }
}
