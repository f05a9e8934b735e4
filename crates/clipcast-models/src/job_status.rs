//! Job status notifications.
//!
//! Payloads posted to the external job-status service as a job advances.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::creatives::AdCreatives;
use crate::engagement::EngagementPrediction;
use crate::metadata::ContentMetadata;

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// Job is actively being processed
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One produced content item reported on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobContent {
    /// Upper-case platform name
    pub platform: String,
    pub video_path: String,
    pub thumbnail_path: String,
    pub metadata_path: String,
    pub start_timestamp: f64,
    pub duration: f64,
    pub creatives: AdCreatives,
    #[serde(rename = "engagement_prediction")]
    pub engagement_prediction: EngagementPrediction,
}

impl JobContent {
    pub fn from_metadata(
        metadata: &ContentMetadata,
        video_path: impl Into<String>,
        thumbnail_path: impl Into<String>,
        metadata_path: impl Into<String>,
    ) -> Self {
        Self {
            platform: metadata.platform.as_str().to_uppercase(),
            video_path: video_path.into(),
            thumbnail_path: thumbnail_path.into(),
            metadata_path: metadata_path.into(),
            start_timestamp: metadata.timestamp,
            duration: metadata.duration,
            creatives: metadata.creatives.clone(),
            engagement_prediction: metadata.engagement_prediction.clone(),
        }
    }
}

/// Body of a job-status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<JobContent>>,
}

impl JobStatusUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus, progress: u8) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            progress: progress.min(100),
            contents: None,
        }
    }

    pub fn with_contents(mut self, contents: Vec<JobContent>) -> Self {
        if !contents.is_empty() {
            self.contents = Some(contents);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_body() {
        let update = JobStatusUpdate::new("abc", JobStatus::Processing, 20);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"jobId": "abc", "status": "PROCESSING", "progress": 20})
        );
    }

    #[test]
    fn test_empty_contents_omitted() {
        let update = JobStatusUpdate::new("abc", JobStatus::Completed, 100).with_contents(vec![]);
        assert!(update.contents.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert_eq!(JobStatus::Completed.to_string(), "COMPLETED");
    }
}
