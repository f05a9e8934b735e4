//! Thumbnail composition.
//!
//! One frame is decoded from the source, reframed to 9:16 with the same
//! detector and planner as the clips, and captioned: the headline on a
//! dark strip at the top, the call-to-action on a strip at the bottom.
//! Each strip is sized to its text as measured in the drawing font.
//! Strips are blended in memory; the text itself is drawn by FFmpeg,
//! centered horizontally.

use clipcast_models::{AspectRatio, OverlaySpec};
use image::{DynamicImage, ImageFormat, RgbImage};
use imageproc::drawing::text_size;
use rusttype::{Font, Scale};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compositor::apply_plan_to_frame;
use crate::crop_planner::{CropPlan, CropPlanner};
use crate::detection::RegionDetector;
use crate::error::{MediaError, MediaResult};
use crate::frames::extract_frame_with_retry;
use crate::fs_utils::{persist_output, temp_path_in};
use crate::overlay::{drawtext_filter, truncate_chars, CTA_MAX_CHARS, HEADLINE_MAX_CHARS};
use crate::probe::probe_video;

pub const HEADLINE_FONT_SIZE: u32 = 24;
pub const CTA_FONT_SIZE: u32 = 20;

/// Strip opacity out of 255.
pub const STRIP_ALPHA: u8 = 180;

const HEADLINE_TOP: u32 = 20;
const CTA_BOTTOM_MARGIN: u32 = 30;
const STRIP_PADDING: u32 = 10;

/// Fonts tried, in order, when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
];

/// First installed font from [`SYSTEM_FONTS`].
pub fn system_font() -> Option<PathBuf> {
    SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Text extents in the font that drawtext renders with.
#[derive(Clone, Default)]
pub struct TextMeasure {
    font: Option<Font<'static>>,
}

impl std::fmt::Debug for TextMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextMeasure")
            .field("font_loaded", &self.font.is_some())
            .finish()
    }
}

impl TextMeasure {
    pub async fn load(path: &Path) -> MediaResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| MediaError::InvalidFont(path.to_path_buf()))?;
        Ok(Self { font: Some(font) })
    }

    /// Inked height of `text` below the top of the line, in pixels.
    ///
    /// `font_size` is the em size, as FFmpeg interprets `fontsize`. With no
    /// font loaded the line height is taken as the font size.
    pub fn text_height(&self, text: &str, font_size: u32) -> u32 {
        let Some(font) = &self.font else {
            return font_size;
        };
        let v = font.v_metrics_unscaled();
        let units_per_em = font.units_per_em().max(1) as f32;
        let scale = Scale::uniform(font_size as f32 * (v.ascent - v.descent) / units_per_em);
        let (_, height) = text_size(scale, font, text);
        height.max(0) as u32
    }
}

/// A full-width background strip and the offset of its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStrip {
    pub top: u32,
    pub height: u32,
    pub text_y: u32,
    pub font_size: u32,
}

impl TextStrip {
    fn new(top: u32, text_height: u32, font_size: u32) -> Self {
        Self {
            top,
            height: text_height + STRIP_PADDING,
            text_y: top + STRIP_PADDING / 2,
            font_size,
        }
    }

    /// Strip at the top edge for headline text `text_height` pixels tall.
    pub fn headline(text_height: u32) -> Self {
        Self::new(HEADLINE_TOP, text_height, HEADLINE_FONT_SIZE)
    }

    /// Strip near the bottom edge for call-to-action text `text_height`
    /// pixels tall.
    pub fn cta(image_height: u32, text_height: u32) -> Self {
        let top = image_height.saturating_sub(text_height + CTA_BOTTOM_MARGIN);
        Self::new(top, text_height, CTA_FONT_SIZE)
    }
}

/// One line of thumbnail text with its strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub strip: TextStrip,
}

/// Lay out headline and CTA strips on a `height`-pixel image, each sized to
/// its measured text.
pub fn layout_text(text: &OverlaySpec, height: u32, measure: &TextMeasure) -> Vec<TextLine> {
    let mut lines = Vec::new();
    if let Some(headline) = text.headline_text() {
        let headline = truncate_chars(headline, HEADLINE_MAX_CHARS);
        let text_height = measure.text_height(&headline, HEADLINE_FONT_SIZE);
        lines.push(TextLine {
            text: headline,
            strip: TextStrip::headline(text_height),
        });
    }
    if let Some(cta) = text.cta_text() {
        let cta = truncate_chars(cta, CTA_MAX_CHARS);
        let text_height = measure.text_height(&cta, CTA_FONT_SIZE);
        lines.push(TextLine {
            text: cta,
            strip: TextStrip::cta(height, text_height),
        });
    }
    lines
}

/// Drawtext filters centering each line on its strip.
pub fn text_filter(font_file: Option<&Path>, lines: &[TextLine]) -> Option<String> {
    let filters: Vec<String> = lines
        .iter()
        .map(|line| {
            drawtext_filter(
                font_file,
                &line.text,
                &format!(
                    "fontcolor=white:fontsize={}:x=(w-text_w)/2:y={}",
                    line.strip.font_size, line.strip.text_y
                ),
            )
        })
        .collect();
    (!filters.is_empty()).then(|| filters.join(","))
}

/// Darken the rows covered by `strip`, as if painted black at `alpha`.
pub fn blend_strip(image: &mut RgbImage, strip: &TextStrip, alpha: u8) {
    let keep = 255 - alpha as u32;
    let bottom = (strip.top + strip.height).min(image.height());
    for y in strip.top.min(bottom)..bottom {
        for x in 0..image.width() {
            let px = image.get_pixel_mut(x, y);
            for c in px.0.iter_mut() {
                *c = ((*c as u32 * keep) / 255) as u8;
            }
        }
    }
}

/// Result of a thumbnail render.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailOutcome {
    pub output: PathBuf,
    pub plan: CropPlan,
    /// Whether headline/CTA text was drawn.
    pub text_applied: bool,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ThumbnailComposer {
    detector: RegionDetector,
    planner: CropPlanner,
    runner: FfmpegRunner,
    font_file: Option<PathBuf>,
}

impl ThumbnailComposer {
    pub fn new(detector: RegionDetector, planner: CropPlanner, runner: FfmpegRunner) -> Self {
        Self {
            detector,
            planner,
            runner,
            font_file: None,
        }
    }

    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    /// Decode, reframe and crop the still at `timestamp`.
    pub async fn vertical_still(&self, video: &Path, timestamp: f64) -> MediaResult<(RgbImage, CropPlan)> {
        let info = probe_video(video).await?;
        let frame = extract_frame_with_retry(video, timestamp, info.fps, info.width, info.height).await?;
        let regions = self.detector.detect(&frame);
        let plan = self
            .planner
            .plan(frame.width(), frame.height(), &regions, AspectRatio::PORTRAIT);
        let still = apply_plan_to_frame(&frame, &plan)?;
        Ok((still, plan))
    }

    /// Render the thumbnail for `video` at `timestamp` into `output` (JPEG).
    ///
    /// Fails only when no frame can be decoded or the image cannot be
    /// written. Text rendering failures fall back to the bare still.
    pub async fn compose(
        &self,
        video: &Path,
        timestamp: f64,
        text: &OverlaySpec,
        output: &Path,
    ) -> MediaResult<ThumbnailOutcome> {
        let (still, plan) = self.vertical_still(video, timestamp).await?;
        let dir = parent_dir(output);
        let mut diagnostics = Vec::new();

        let mut text_applied = false;
        if !text.is_empty() {
            match self.draw_text(&still, text, dir).await {
                Ok(temp) => {
                    persist_output(temp, output).await?;
                    text_applied = true;
                }
                Err(e) => {
                    warn!(output = %output.display(), "Thumbnail text failed: {}", e.diagnostic());
                    diagnostics.push(e.diagnostic());
                }
            }
        }

        if !text_applied {
            let temp = temp_path_in(dir, "jpg")?;
            DynamicImage::ImageRgb8(still).save_with_format(&temp, ImageFormat::Jpeg)?;
            persist_output(temp, output).await?;
        }

        info!(
            output = %output.display(),
            timestamp,
            letterbox = plan.is_letterbox(),
            text_applied,
            "Thumbnail created"
        );
        Ok(ThumbnailOutcome {
            output: output.to_path_buf(),
            plan,
            text_applied,
            diagnostics,
        })
    }

    /// Configured font, else the first installed system font.
    fn font_path(&self) -> Option<PathBuf> {
        self.font_file.clone().or_else(system_font)
    }

    async fn draw_text(
        &self,
        still: &RgbImage,
        text: &OverlaySpec,
        dir: &Path,
    ) -> MediaResult<tempfile::TempPath> {
        let font = self.font_path();
        let measure = match &font {
            Some(path) => TextMeasure::load(path).await.unwrap_or_else(|e| {
                warn!(font = %path.display(), "Measuring thumbnail text by font size: {}", e);
                TextMeasure::default()
            }),
            None => TextMeasure::default(),
        };

        let lines = layout_text(text, still.height(), &measure);
        let mut canvas = still.clone();
        for line in &lines {
            blend_strip(&mut canvas, &line.strip, STRIP_ALPHA);
        }

        let source = temp_path_in(dir, "png")?;
        DynamicImage::ImageRgb8(canvas).save_with_format(&source, ImageFormat::Png)?;

        let output = temp_path_in(dir, "jpg")?;
        let filter = text_filter(font.as_deref(), &lines).unwrap_or_default();
        let cmd = FfmpegCommand::new(&source, &output)
            .video_filter(filter)
            .single_frame()
            .output_arg("-q:v")
            .output_arg("2")
            .log_level("error");
        self.runner.run(&cmd).await?;
        Ok(output)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_strip_layout() {
        let headline = TextStrip::headline(24);
        assert_eq!(headline.top, 20);
        assert_eq!(headline.height, 34);
        assert_eq!(headline.text_y, 25);

        let cta = TextStrip::cta(1080, 20);
        assert_eq!(cta.top, 1030);
        assert_eq!(cta.height, 30);
        assert_eq!(cta.text_y, 1035);
        assert!(cta.top + cta.height <= 1080);
    }

    #[test]
    fn test_strip_follows_text_height() {
        let short = TextStrip::headline(14);
        let tall = TextStrip::headline(31);
        assert_eq!(short.height, 24);
        assert_eq!(tall.height, 41);
        assert_eq!(short.text_y, tall.text_y);

        let cta = TextStrip::cta(1080, 31);
        assert_eq!(cta.top, 1080 - 31 - 30);
        assert_eq!(cta.top + cta.height, 1080 - 20);
    }

    #[test]
    fn test_layout_without_font_uses_font_size() {
        let lines = layout_text(
            &OverlaySpec::headline_and_cta("Hello", "Tap"),
            1080,
            &TextMeasure::default(),
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].strip, TextStrip::headline(HEADLINE_FONT_SIZE));
        assert_eq!(lines[1].strip, TextStrip::cta(1080, CTA_FONT_SIZE));
        assert!(layout_text(&OverlaySpec::NoOverlay, 1080, &TextMeasure::default()).is_empty());
    }

    #[tokio::test]
    async fn test_strip_sized_from_font_metrics() {
        let Some(font) = system_font() else {
            return;
        };
        let measure = TextMeasure::load(&font).await.unwrap();
        let flat = measure.text_height("ace", HEADLINE_FONT_SIZE);
        let deep = measure.text_height("Typography", HEADLINE_FONT_SIZE);
        assert!(flat > 0 && flat < deep);
        assert!(deep < 2 * HEADLINE_FONT_SIZE);

        let lines = layout_text(&OverlaySpec::headline_and_cta("Typography", "ace"), 1080, &measure);
        assert_eq!(lines[0].strip.height, deep + 10);
        assert_eq!(lines[1].strip.top, 1080 - measure.text_height("ace", CTA_FONT_SIZE) - 30);
    }

    #[tokio::test]
    async fn test_invalid_font_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(
            TextMeasure::load(&path).await,
            Err(MediaError::InvalidFont(_))
        ));
    }

    #[test]
    fn test_blend_strip_darkens_only_its_rows() {
        let mut image = RgbImage::from_pixel(10, 100, Rgb([255, 255, 255]));
        let strip = TextStrip::headline(24);
        blend_strip(&mut image, &strip, STRIP_ALPHA);

        assert_eq!(image.get_pixel(5, 19), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(5, 20), &Rgb([75, 75, 75]));
        assert_eq!(image.get_pixel(5, 53), &Rgb([75, 75, 75]));
        assert_eq!(image.get_pixel(5, 54), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_blend_strip_clamps_to_image() {
        let mut image = RgbImage::from_pixel(4, 10, Rgb([100, 100, 100]));
        blend_strip(&mut image, &TextStrip::cta(10, 20), STRIP_ALPHA);
        assert_eq!(image.get_pixel(0, 9)[0], 29);
    }

    #[test]
    fn test_text_filter_centers_text() {
        let lines = layout_text(
            &OverlaySpec::headline_and_cta("Top: story", "Learn More"),
            1080,
            &TextMeasure::default(),
        );
        let filter = text_filter(None, &lines).unwrap();
        assert!(filter.contains("text='Top\\: story':fontcolor=white:fontsize=24:x=(w-text_w)/2:y=25"));
        assert!(filter.contains("text='Learn More':fontcolor=white:fontsize=20:x=(w-text_w)/2:y=1035"));
        assert!(text_filter(None, &[]).is_none());
    }

    #[tokio::test]
    async fn test_missing_video_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = ThumbnailComposer::default()
            .compose(
                Path::new("/nonexistent/video.mp4"),
                1.0,
                &OverlaySpec::NoOverlay,
                &dir.path().join("thumb.jpg"),
            )
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("thumb.jpg").exists());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_compose_vertical_thumbnail() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("source.mp4");
        let status = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-f", "lavfi", "-i", "testsrc=size=640x360:rate=30:duration=2"])
            .arg(&video)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let output = dir.path().join("thumb.jpg");
        let outcome = ThumbnailComposer::default()
            .compose(&video, 1.0, &OverlaySpec::headline_and_cta("Hello", "Tap"), &output)
            .await
            .unwrap();

        let image = image::open(&output).unwrap();
        assert!(image.width() < image.height());
        assert_eq!(outcome.plan.output_dimensions(), (image.width(), image.height()));
    }
}
