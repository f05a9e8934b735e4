//! Shared data models for the ClipCast content pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Target platforms and their clip settings
//! - Aspect ratios and encoding configuration
//! - Transcript and subtitle segments
//! - Overlay text and generated ad creatives
//! - Per-platform metadata, summary report and job status payloads
//! - The rule-based engagement heuristic

pub mod aspect;
pub mod creatives;
pub mod encoding;
pub mod engagement;
pub mod job_status;
pub mod metadata;
pub mod overlay;
pub mod platform;
pub mod subtitle;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError};
pub use creatives::AdCreatives;
pub use encoding::EncodingConfig;
pub use engagement::{predict_engagement, EngagementLevel, EngagementPrediction};
pub use job_status::{JobContent, JobStatus, JobStatusUpdate};
pub use metadata::{ContentMetadata, ContentSummary, SummaryReport};
pub use overlay::OverlaySpec;
pub use platform::{Platform, PlatformParseError, PlatformSettings};
pub use subtitle::{SubtitleSegment, TranscriptSegment};
