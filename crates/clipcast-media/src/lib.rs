#![deny(unreachable_patterns)]
//! FFmpeg-backed media core.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and probing
//! - Region detection and crop planning on decoded frames
//! - The reframing tier ladder with passthrough as its floor
//! - Subtitle chunking, ASS tracks and best-effort text overlays
//! - Vertical thumbnail composition

pub mod clip;
pub mod command;
pub mod compositor;
pub mod crop_planner;
pub mod detection;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod overlay;
pub mod probe;
pub mod reframe;
pub mod subtitles;
pub mod thumbnail;

pub use clip::extract_subclip;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compositor::{apply_plan_to_frame, FrameCompositor};
pub use crop_planner::{CropPlan, CropPlanner, CropWindow, LetterboxPlan, WideContentPolicy};
pub use detection::{Region, RegionDetector};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frame_with_retry, extract_rgb_frame};
pub use overlay::{CaptionPosition, OverlayOutcome, OverlayRenderer, OverlayStatus, OverlayStrategy};
pub use probe::{probe_video, VideoInfo};
pub use reframe::{
    FfmpegTierRenderer, ReframeOutcome, ReframePipeline, ReframeState, TierFailure, TierRenderer,
};
pub use subtitles::{build_ass_document, format_ass_time, SubtitleSegmenter};
pub use thumbnail::{ThumbnailComposer, ThumbnailOutcome};
