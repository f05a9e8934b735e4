//! Reframing pipeline.
//!
//! A subclip is rendered through an ordered ladder of tiers. Each tier
//! writes to its own temporary file; the first one that produces a
//! non-empty file wins and is renamed over the destination. When every
//! rendering tier fails the unmodified subclip is moved into place, so a
//! decodable source always ends up with an output.

use async_trait::async_trait;
use clipcast_models::{AspectRatio, EncodingConfig, PlatformSettings};
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::clip::extract_subclip;
use crate::command::FfmpegRunner;
use crate::compositor::FrameCompositor;
use crate::crop_planner::{CropPlan, CropPlanner, WideContentPolicy};
use crate::detection::RegionDetector;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{is_valid_output, persist_output, temp_path_in};
use crate::probe::probe_video;

/// Tiers of the reframing ladder, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReframeState {
    SmartCrop,
    DirectCrop,
    BackgroundLetterbox,
    OriginalPassthrough,
}

impl ReframeState {
    /// First tier for a platform.
    pub fn initial(content_aware: bool) -> Self {
        if content_aware {
            Self::SmartCrop
        } else {
            Self::DirectCrop
        }
    }

    /// Tier to try after this one fails.
    ///
    /// Platforms without content-aware reframing go straight from the
    /// direct crop to passthrough.
    pub fn next(self, content_aware: bool) -> Self {
        match self {
            Self::SmartCrop => Self::DirectCrop,
            Self::DirectCrop if content_aware => Self::BackgroundLetterbox,
            Self::DirectCrop => Self::OriginalPassthrough,
            Self::BackgroundLetterbox | Self::OriginalPassthrough => Self::OriginalPassthrough,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::OriginalPassthrough
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmartCrop => "smart_crop",
            Self::DirectCrop => "direct_crop",
            Self::BackgroundLetterbox => "background_letterbox",
            Self::OriginalPassthrough => "original_passthrough",
        }
    }
}

impl fmt::Display for ReframeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierFailure {
    pub state: ReframeState,
    pub diagnostic: String,
}

/// Result of a reframe: the tier that produced the output and every tier
/// that failed before it.
#[derive(Debug, Clone, Serialize)]
pub struct ReframeOutcome {
    pub output: PathBuf,
    pub final_state: ReframeState,
    pub failures: Vec<TierFailure>,
}

impl ReframeOutcome {
    /// True when the preferred tier did not produce the output.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Renders one non-terminal tier of the ladder into `output`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TierRenderer: Send + Sync {
    async fn render(
        &self,
        state: ReframeState,
        target: AspectRatio,
        input: &Path,
        output: &Path,
    ) -> MediaResult<()>;
}

/// FFmpeg-backed tiers: region detection, crop planning and compositing.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTierRenderer {
    detector: RegionDetector,
    planner: CropPlanner,
    compositor: FrameCompositor,
}

impl FfmpegTierRenderer {
    pub fn new(detector: RegionDetector, planner: CropPlanner, compositor: FrameCompositor) -> Self {
        Self {
            detector,
            planner,
            compositor,
        }
    }

    pub fn with_policy(policy: WideContentPolicy, compositor: FrameCompositor) -> Self {
        Self::new(RegionDetector::default(), CropPlanner::new(policy), compositor)
    }
}

#[async_trait]
impl TierRenderer for FfmpegTierRenderer {
    async fn render(
        &self,
        state: ReframeState,
        target: AspectRatio,
        input: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        let info = probe_video(input).await?;
        let plan = match state {
            ReframeState::SmartCrop => {
                let regions = self.detector.detect_in_video(input, &info).await?;
                self.planner.plan(info.width, info.height, &regions, target)
            }
            ReframeState::DirectCrop => self.planner.center_plan(info.width, info.height, target),
            ReframeState::BackgroundLetterbox => {
                CropPlan::Letterbox(self.planner.letterbox_plan(info.width, info.height, target))
            }
            ReframeState::OriginalPassthrough => {
                return Err(MediaError::internal("passthrough is not a rendering tier"));
            }
        };
        self.compositor.render(input, output, &plan, info.has_audio).await
    }
}

/// Cuts a subclip and reframes it for a platform.
pub struct ReframePipeline<R = FfmpegTierRenderer> {
    renderer: R,
    runner: FfmpegRunner,
    encoding: EncodingConfig,
}

impl ReframePipeline<FfmpegTierRenderer> {
    /// Pipeline using FFmpeg for every tier.
    pub fn with_policy(policy: WideContentPolicy, encoding: EncodingConfig) -> Self {
        let runner = FfmpegRunner::new();
        let compositor = FrameCompositor::new(encoding.clone(), runner.clone());
        Self::new(
            FfmpegTierRenderer::with_policy(policy, compositor),
            runner,
            encoding,
        )
    }
}

impl<R: TierRenderer> ReframePipeline<R> {
    pub fn new(renderer: R, runner: FfmpegRunner, encoding: EncodingConfig) -> Self {
        Self {
            renderer,
            runner,
            encoding,
        }
    }

    /// Cut `[start, end)` from `source` and reframe it into `output`.
    ///
    /// Only the subclip cut can fail; reframing always yields an output.
    pub async fn run(
        &self,
        source: &Path,
        (start, end): (f64, f64),
        settings: &PlatformSettings,
        output: &Path,
    ) -> MediaResult<ReframeOutcome> {
        let dir = output_dir(output);
        let subclip = temp_path_in(dir, "mp4")?;
        extract_subclip(&self.runner, source, &subclip, start, end, &self.encoding).await?;
        self.reframe_subclip(
            subclip,
            settings.aspect_ratio,
            settings.content_aware,
            output,
        )
        .await
    }

    /// Walk the tier ladder for an already cut `subclip`.
    ///
    /// The subclip is consumed: it becomes the output on passthrough and is
    /// deleted otherwise.
    pub async fn reframe_subclip(
        &self,
        subclip: tempfile::TempPath,
        target: AspectRatio,
        content_aware: bool,
        output: &Path,
    ) -> MediaResult<ReframeOutcome> {
        let dir = output_dir(output);
        let mut failures = Vec::new();
        let mut state = ReframeState::initial(content_aware);

        while !state.is_terminal() {
            counter!("clipcast_reframe_attempts_total", "tier" => state.as_str()).increment(1);

            match self.attempt(state, target, &subclip, dir, output).await {
                Ok(()) => {
                    info!(tier = %state, output = %output.display(), "Reframe complete");
                    return Ok(ReframeOutcome {
                        output: output.to_path_buf(),
                        final_state: state,
                        failures,
                    });
                }
                Err(e) => {
                    let next = state.next(content_aware);
                    warn!(
                        tier = %state,
                        next = %next,
                        "Reframe tier failed: {}",
                        e.diagnostic()
                    );
                    counter!("clipcast_reframe_fallbacks_total", "tier" => state.as_str())
                        .increment(1);
                    failures.push(TierFailure {
                        state,
                        diagnostic: e.diagnostic(),
                    });
                    state = next;
                }
            }
        }

        counter!("clipcast_reframe_attempts_total", "tier" => state.as_str()).increment(1);
        persist_output(subclip, output).await?;
        info!(tier = %state, output = %output.display(), "Reframe fell back to the original subclip");

        Ok(ReframeOutcome {
            output: output.to_path_buf(),
            final_state: state,
            failures,
        })
    }

    async fn attempt(
        &self,
        state: ReframeState,
        target: AspectRatio,
        subclip: &Path,
        dir: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        let temp = temp_path_in(dir, "mp4")?;
        self.renderer.render(state, target, subclip, &temp).await?;
        if !is_valid_output(&temp).await {
            return Err(MediaError::EmptyOutput(temp.to_path_buf()));
        }
        persist_output(temp, output).await
    }
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
