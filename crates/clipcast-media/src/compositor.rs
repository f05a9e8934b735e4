//! Applies crop plans to frames and whole clips.
//!
//! Single frames (thumbnails) are transformed in memory with `image`.
//! Whole clips are transformed by FFmpeg filter graphs built from the same
//! plan, encoded at a constant frame rate with the audio stream, if any,
//! copied.

use clipcast_models::EncodingConfig;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::crop_planner::{CropPlan, CropWindow, LetterboxPlan};
use crate::error::{MediaError, MediaResult};

/// Gaussian sigma matching a 151x151 kernel.
pub const BACKGROUND_BLUR_SIGMA: f32 = 23.0;

/// The in-memory background is blurred at this fraction of its size.
const BLUR_DOWNSCALE: u32 = 4;

/// Transform one frame according to `plan`.
///
/// Crop plans fail with [`MediaError::DimensionMismatch`] when the frame
/// is not the size the plan was computed for.
pub fn apply_plan_to_frame(frame: &RgbImage, plan: &CropPlan) -> MediaResult<RgbImage> {
    match plan {
        CropPlan::Crop {
            source_width,
            source_height,
            window,
        } => {
            let (w, h) = frame.dimensions();
            if (w, h) != (*source_width, *source_height) {
                return Err(MediaError::DimensionMismatch {
                    expected_width: *source_width,
                    expected_height: *source_height,
                    actual_width: w,
                    actual_height: h,
                });
            }
            Ok(crop_frame(frame, window))
        }
        CropPlan::Letterbox(plan) => Ok(letterbox_frame(frame, plan)),
    }
}

fn crop_frame(frame: &RgbImage, window: &CropWindow) -> RgbImage {
    imageops::crop_imm(frame, window.left, window.top, window.width(), window.height()).to_image()
}

/// Scale `frame` onto a blurred, stretched copy of itself.
pub fn letterbox_frame(frame: &RgbImage, plan: &LetterboxPlan) -> RgbImage {
    let small_w = (plan.target_width / BLUR_DOWNSCALE).max(1);
    let small_h = (plan.target_height / BLUR_DOWNSCALE).max(1);
    let background = imageops::resize(frame, small_w, small_h, FilterType::Triangle);
    let background = imageops::blur(&background, BACKGROUND_BLUR_SIGMA / BLUR_DOWNSCALE as f32);
    let mut canvas = imageops::resize(
        &background,
        plan.target_width,
        plan.target_height,
        FilterType::Triangle,
    );

    let foreground = imageops::resize(
        frame,
        plan.scaled_width,
        plan.scaled_height,
        FilterType::Lanczos3,
    );
    imageops::overlay(
        &mut canvas,
        &foreground,
        plan.offset_x as i64,
        plan.offset_y as i64,
    );
    canvas
}

/// FFmpeg `crop` filter for a window.
pub fn crop_filter(window: &CropWindow) -> String {
    format!(
        "crop={}:{}:{}:{}",
        window.width(),
        window.height(),
        window.left,
        window.top
    )
}

/// FFmpeg filter graph for a letterbox plan. The result is labelled `[v]`.
pub fn letterbox_filter_complex(plan: &LetterboxPlan) -> String {
    format!(
        "[0:v]split=2[bg][fg];\
         [bg]scale={tw}:{th},gblur=sigma={sigma}[bgb];\
         [fg]scale={sw}:{sh}[fgs];\
         [bgb][fgs]overlay={ox}:{oy},setsar=1[v]",
        tw = plan.target_width,
        th = plan.target_height,
        sigma = BACKGROUND_BLUR_SIGMA,
        sw = plan.scaled_width,
        sh = plan.scaled_height,
        ox = plan.offset_x,
        oy = plan.offset_y,
    )
}

/// Renders whole clips from crop plans.
#[derive(Debug, Clone, Default)]
pub struct FrameCompositor {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FrameCompositor {
    pub fn new(encoding: EncodingConfig, runner: FfmpegRunner) -> Self {
        Self { encoding, runner }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Build the FFmpeg command rendering `input` through `plan` into `output`.
    ///
    /// Silent inputs are rendered with audio disabled.
    pub fn build_command(
        &self,
        input: &Path,
        output: &Path,
        plan: &CropPlan,
        has_audio: bool,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(input, output);
        let cmd = match plan {
            CropPlan::Crop { window, .. } => cmd.video_filter(crop_filter(window)),
            CropPlan::Letterbox(plan) => {
                let cmd = cmd.filter_complex(letterbox_filter_complex(plan)).map("[v]");
                if has_audio {
                    cmd.map("0:a")
                } else {
                    cmd
                }
            }
        };
        let cmd = cmd.output_args(self.encoding.video_args());
        if has_audio {
            cmd.copy_audio()
        } else {
            cmd.output_arg("-an")
        }
    }

    /// Render `input` through `plan` into `output`.
    pub async fn render(
        &self,
        input: &Path,
        output: &Path,
        plan: &CropPlan,
        has_audio: bool,
    ) -> MediaResult<()> {
        debug!(plan = ?plan, output = %output.display(), has_audio, "Compositing clip");
        let cmd = self.build_command(input, output, plan, has_audio);
        self.runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop_planner::CropPlanner;
    use clipcast_models::AspectRatio;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn test_crop_frame_slices_window() {
        let frame = gradient(320, 180);
        let plan = CropPlanner::default().center_plan(320, 180, AspectRatio::PORTRAIT);
        let out = apply_plan_to_frame(&frame, &plan).unwrap();
        assert_eq!(out.dimensions(), plan.output_dimensions());
        let CropPlan::Crop { window, .. } = plan else {
            panic!("expected crop");
        };
        assert_eq!(out.get_pixel(0, 0), frame.get_pixel(window.left, 0));
    }

    #[test]
    fn test_crop_frame_rejects_other_sizes() {
        let plan = CropPlanner::default().center_plan(320, 180, AspectRatio::PORTRAIT);
        let err = apply_plan_to_frame(&gradient(640, 360), &plan).unwrap_err();
        assert!(matches!(err, MediaError::DimensionMismatch { actual_width: 640, .. }));
    }

    #[test]
    fn test_letterbox_frame_places_foreground() {
        let frame = RgbImage::from_pixel(320, 180, Rgb([200, 10, 10]));
        let plan = CropPlanner::default().letterbox_plan(320, 180, AspectRatio::PORTRAIT);
        let out = letterbox_frame(&frame, &plan);
        assert_eq!(out.dimensions(), (plan.target_width, plan.target_height));

        let cx = plan.offset_x + plan.scaled_width / 2;
        let cy = plan.offset_y + plan.scaled_height / 2;
        let px = out.get_pixel(cx, cy);
        assert!(px[0] >= 195 && px[1] <= 15, "foreground not at the plan offset: {:?}", px);
    }

    #[test]
    fn test_crop_filter() {
        let window = CropWindow {
            left: 657,
            right: 1263,
            top: 0,
            bottom: 1080,
        };
        assert_eq!(crop_filter(&window), "crop=606:1080:657:0");
    }

    #[test]
    fn test_letterbox_command_maps_audio() {
        let plan = CropPlan::Letterbox(
            CropPlanner::default().letterbox_plan(1920, 1080, AspectRatio::PORTRAIT),
        );
        let args = FrameCompositor::default()
            .build_command(Path::new("in.mp4"), Path::new("out.mp4"), &plan, true)
            .build_args();
        let graph = args.iter().find(|a| a.contains("gblur")).unwrap();
        assert!(graph.contains("scale=606:1080"));
        assert!(graph.contains("overlay=31:387"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "24"));
        assert!(!args.iter().any(|a| a == "-an"));
    }

    #[test]
    fn test_silent_input_disables_audio() {
        let planner = CropPlanner::default();
        let letterbox = CropPlan::Letterbox(planner.letterbox_plan(1920, 1080, AspectRatio::PORTRAIT));
        let crop = planner.center_plan(1920, 1080, AspectRatio::PORTRAIT);
        let compositor = FrameCompositor::default();

        for plan in [letterbox, crop] {
            let args = compositor
                .build_command(Path::new("in.mp4"), Path::new("out.mp4"), &plan, false)
                .build_args();
            assert!(args.iter().any(|a| a == "-an"));
            assert!(!args.iter().any(|a| a == "0:a" || a == "-c:a"));
        }
    }
}
