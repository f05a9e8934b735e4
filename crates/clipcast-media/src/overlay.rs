//! Text and subtitle overlays burned onto finished clips.
//!
//! Every operation here is best-effort. The clip is re-rendered into a
//! temporary file next to it and renamed over the original only when the
//! render succeeded, so on failure the clip is left exactly as it was.
//! Results are reported as an [`OverlayOutcome`], never as an error.

use clipcast_models::{EncodingConfig, OverlaySpec, SubtitleSegment};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::fs_utils::{persist_output, temp_path_in};
use crate::subtitles::build_ass_document;

/// Headline text cap in characters.
pub const HEADLINE_MAX_CHARS: usize = 60;
/// Call-to-action text cap in characters.
pub const CTA_MAX_CHARS: usize = 80;
/// Single-caption fallback text cap in characters.
pub const CAPTION_MAX_CHARS: usize = 80;
/// Drawtext subtitle text cap in characters.
pub const SUBTITLE_MAX_CHARS: usize = 35;

const ELLIPSIS: &str = "...";

/// Escape text for a single-quoted drawtext `text=` value.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace(',', "\\,")
}

/// Cut `text` to `max` characters, ending in `...` when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// A drawtext filter drawing `text` with the given style options.
pub(crate) fn drawtext_filter(font_file: Option<&Path>, text: &str, style: &str) -> String {
    let font = font_file
        .map(|p| format!("fontfile='{}':", escape_filter_path(p)))
        .unwrap_or_default();
    format!("drawtext={}text='{}':{}", font, escape_drawtext(text), style)
}

/// Where a single caption is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPosition {
    Top,
    Center,
    Bottom,
}

impl CaptionPosition {
    fn y_expr(self) -> &'static str {
        match self {
            Self::Top => "30",
            Self::Center => "(h-text_h)/2",
            Self::Bottom => "h-70",
        }
    }
}

/// How an overlay was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStrategy {
    HeadlineAndCta,
    SingleCaption,
    AssTrack,
    DrawtextChain,
}

impl fmt::Display for OverlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HeadlineAndCta => "headline_and_cta",
            Self::SingleCaption => "single_caption",
            Self::AssTrack => "ass_track",
            Self::DrawtextChain => "drawtext_chain",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStatus {
    Applied,
    /// Nothing to draw.
    Skipped,
    /// Every strategy failed; the clip is unchanged.
    Failed,
}

/// Result of an overlay operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayOutcome {
    pub status: OverlayStatus,
    pub strategy: Option<OverlayStrategy>,
    pub diagnostics: Vec<String>,
}

impl OverlayOutcome {
    fn applied(strategy: OverlayStrategy, diagnostics: Vec<String>) -> Self {
        Self {
            status: OverlayStatus::Applied,
            strategy: Some(strategy),
            diagnostics,
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: OverlayStatus::Skipped,
            strategy: None,
            diagnostics: vec![reason.into()],
        }
    }

    fn failed(diagnostics: Vec<String>) -> Self {
        Self {
            status: OverlayStatus::Failed,
            strategy: None,
            diagnostics,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == OverlayStatus::Applied
    }
}

/// Burns headline, call-to-action and subtitle text onto clips.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
    font_file: Option<PathBuf>,
}

impl OverlayRenderer {
    pub fn new(encoding: EncodingConfig, runner: FfmpegRunner) -> Self {
        Self {
            encoding,
            runner,
            font_file: None,
        }
    }

    /// Use an explicit font for drawtext instead of the fontconfig default.
    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    fn drawtext(&self, text: &str, style: &str) -> String {
        drawtext_filter(self.font_file.as_deref(), text, style)
    }

    /// Headline top-left, call-to-action bottom-left.
    pub fn text_overlay_filter(&self, spec: &OverlaySpec) -> Option<String> {
        let mut filters = Vec::new();
        if let Some(headline) = spec.headline_text() {
            filters.push(self.drawtext(
                &truncate_chars(headline, HEADLINE_MAX_CHARS),
                "fontcolor=white:fontsize=24:box=1:boxcolor=black@0.8:x=20:y=30",
            ));
        }
        if let Some(cta) = spec.cta_text() {
            filters.push(self.drawtext(
                &truncate_chars(cta, CTA_MAX_CHARS),
                "fontcolor=white:fontsize=20:box=1:boxcolor=black@0.8:x=20:y=h-60",
            ));
        }
        (!filters.is_empty()).then(|| filters.join(","))
    }

    /// One caption at `position`.
    pub fn caption_filter(&self, text: &str, position: CaptionPosition) -> String {
        self.drawtext(
            &truncate_chars(text, CAPTION_MAX_CHARS),
            &format!(
                "fontcolor=white:fontsize=24:box=1:boxcolor=black@0.8:x=20:y={}",
                position.y_expr()
            ),
        )
    }

    /// Timed, centered drawtext filters, one per segment.
    pub fn subtitle_drawtext_chain(&self, segments: &[SubtitleSegment]) -> Option<String> {
        let filters: Vec<String> = segments
            .iter()
            .map(|seg| {
                self.drawtext(
                    &truncate_chars(&seg.text, SUBTITLE_MAX_CHARS),
                    &format!(
                        "fontcolor=white:fontsize=18:box=1:boxcolor=black@0.7:boxborderw=3:\
                         x=(w-text_w)/2:y=h-60:enable='gte(t,{:.3})*lt(t,{:.3})'",
                        seg.start, seg.end
                    ),
                )
            })
            .collect();
        (!filters.is_empty()).then(|| filters.join(","))
    }

    /// Burn the headline and call-to-action.
    ///
    /// If the combined overlay fails, retries with a single caption: the
    /// headline at the top, otherwise the call-to-action at the bottom.
    pub async fn apply_text_overlay(&self, video: &Path, spec: &OverlaySpec) -> OverlayOutcome {
        let Some(filter) = self.text_overlay_filter(spec) else {
            return OverlayOutcome::skipped("no overlay text");
        };

        let mut diagnostics = Vec::new();
        match self.render_in_place(video, filter).await {
            Ok(()) => {
                info!(video = %video.display(), "Text overlay applied");
                return OverlayOutcome::applied(OverlayStrategy::HeadlineAndCta, diagnostics);
            }
            Err(e) => {
                warn!(video = %video.display(), "Text overlay failed: {}", e.diagnostic());
                diagnostics.push(format!("{}: {}", OverlayStrategy::HeadlineAndCta, e.diagnostic()));
            }
        }

        let caption = match (spec.headline_text(), spec.cta_text()) {
            (Some(headline), _) => (headline, CaptionPosition::Top),
            (None, Some(cta)) => (cta, CaptionPosition::Bottom),
            (None, None) => return OverlayOutcome::failed(diagnostics),
        };
        self.apply_caption_with(video, caption.0, caption.1, diagnostics).await
    }

    /// Burn one caption.
    pub async fn apply_caption(
        &self,
        video: &Path,
        text: &str,
        position: CaptionPosition,
    ) -> OverlayOutcome {
        if text.trim().is_empty() {
            return OverlayOutcome::skipped("no caption text");
        }
        self.apply_caption_with(video, text, position, Vec::new()).await
    }

    async fn apply_caption_with(
        &self,
        video: &Path,
        text: &str,
        position: CaptionPosition,
        mut diagnostics: Vec<String>,
    ) -> OverlayOutcome {
        let filter = self.caption_filter(text, position);
        match self.render_in_place(video, filter).await {
            Ok(()) => {
                info!(video = %video.display(), ?position, "Caption applied");
                OverlayOutcome::applied(OverlayStrategy::SingleCaption, diagnostics)
            }
            Err(e) => {
                warn!(video = %video.display(), "Caption overlay failed: {}", e.diagnostic());
                diagnostics.push(format!("{}: {}", OverlayStrategy::SingleCaption, e.diagnostic()));
                OverlayOutcome::failed(diagnostics)
            }
        }
    }

    /// Burn timed subtitles, preferring a styled ASS track and falling
    /// back to chained drawtext filters.
    pub async fn burn_subtitles(&self, video: &Path, segments: &[SubtitleSegment]) -> OverlayOutcome {
        if segments.is_empty() {
            return OverlayOutcome::skipped("no subtitle segments");
        }

        let mut diagnostics = Vec::new();
        match self.burn_ass_track(video, segments).await {
            Ok(()) => {
                info!(video = %video.display(), segments = segments.len(), "Subtitles burned");
                return OverlayOutcome::applied(OverlayStrategy::AssTrack, diagnostics);
            }
            Err(e) => {
                warn!(video = %video.display(), "ASS subtitle burn failed: {}", e.diagnostic());
                diagnostics.push(format!("{}: {}", OverlayStrategy::AssTrack, e.diagnostic()));
            }
        }

        let Some(chain) = self.subtitle_drawtext_chain(segments) else {
            return OverlayOutcome::failed(diagnostics);
        };
        match self.render_in_place(video, chain).await {
            Ok(()) => {
                info!(video = %video.display(), segments = segments.len(), "Subtitles drawn with drawtext");
                OverlayOutcome::applied(OverlayStrategy::DrawtextChain, diagnostics)
            }
            Err(e) => {
                warn!(video = %video.display(), "Drawtext subtitles failed: {}", e.diagnostic());
                diagnostics.push(format!("{}: {}", OverlayStrategy::DrawtextChain, e.diagnostic()));
                OverlayOutcome::failed(diagnostics)
            }
        }
    }

    async fn burn_ass_track(&self, video: &Path, segments: &[SubtitleSegment]) -> MediaResult<()> {
        let track = temp_path_in(parent_dir(video), "ass")?;
        fs::write(&track, build_ass_document(segments)).await?;
        debug!(track = %track.display(), "Wrote subtitle track");

        let filter = format!("ass='{}'", escape_filter_path(&track));
        self.render_in_place(video, filter).await
    }

    /// Re-render `video` through `filter` and replace it on success.
    async fn render_in_place(&self, video: &Path, filter: String) -> MediaResult<()> {
        let temp = temp_path_in(parent_dir(video), "mp4")?;
        let cmd = FfmpegCommand::new(video, &temp)
            .video_filter(filter)
            .output_args(self.encoding.video_args())
            .copy_audio();
        self.runner.run(&cmd).await?;
        persist_output(temp, video).await
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
