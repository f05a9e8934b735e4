//! Crop planning for a target aspect ratio.
//!
//! The planner picks a fixed window over the source that keeps detected
//! content in frame:
//! 1. No regions: exact center crop.
//! 2. Content fits the window: center the window on the content
//!    envelope, flushed against a frame edge instead of overflowing it.
//! 3. Content wider than the window: governed by [`WideContentPolicy`].
//!
//! The crop axis follows the target. Narrower targets crop horizontally
//! and keep the full height, wider targets crop vertically and keep the
//! full width. Output dimensions are rounded down to even numbers so
//! every plan can be encoded as yuv420p.

use clipcast_models::AspectRatio;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::detection::Region;

/// Scale applied to the foreground in letterbox plans.
pub const LETTERBOX_MARGIN: f64 = 0.9;

/// What to do when detected content is wider than the crop window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WideContentPolicy {
    /// Center the window on the content anyway, clipping its edges.
    #[default]
    CenterOnContent,
    /// Fit the whole frame on a blurred background instead of cropping.
    Letterbox,
}

impl FromStr for WideContentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" | "center_on_content" => Ok(Self::CenterOnContent),
            "letterbox" | "background" => Ok(Self::Letterbox),
            other => Err(format!("Unknown wide-content policy: {}", other)),
        }
    }
}

impl fmt::Display for WideContentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CenterOnContent => f.write_str("center"),
            Self::Letterbox => f.write_str("letterbox"),
        }
    }
}

/// Crop window in source pixels; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl CropWindow {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Placement of a scaled source frame on a blurred canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterboxPlan {
    pub target_width: u32,
    pub target_height: u32,
    pub scale_factor: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Output of the planner, computed once per clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CropPlan {
    Crop {
        /// Source dimensions the window was planned against
        source_width: u32,
        source_height: u32,
        window: CropWindow,
    },
    Letterbox(LetterboxPlan),
}

impl CropPlan {
    /// Output frame size.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match self {
            CropPlan::Crop { window, .. } => (window.width(), window.height()),
            CropPlan::Letterbox(plan) => (plan.target_width, plan.target_height),
        }
    }

    pub fn is_letterbox(&self) -> bool {
        matches!(self, CropPlan::Letterbox(_))
    }
}

/// Computes crop plans from detected regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropPlanner {
    pub policy: WideContentPolicy,
}

impl CropPlanner {
    pub fn new(policy: WideContentPolicy) -> Self {
        Self { policy }
    }

    /// Plan a crop of a `width x height` source for `target`.
    pub fn plan(&self, width: u32, height: u32, regions: &[Region], target: AspectRatio) -> CropPlan {
        let (fit_w, _) = target.fit_within(width, height);
        let crop_horizontal = fit_w < width;
        let (target_w, target_h) = target_dimensions(width, height, target);

        let (h_envelope, v_envelope) = if crop_horizontal {
            (horizontal_envelope(regions), None)
        } else {
            (None, vertical_envelope(regions))
        };
        let (envelope, window) = if crop_horizontal {
            (h_envelope, target_w)
        } else {
            (v_envelope, target_h)
        };

        if let Some((lo, hi)) = envelope {
            if hi - lo > window {
                debug!(
                    content = hi - lo,
                    window,
                    policy = %self.policy,
                    "Detected content is wider than the crop window"
                );
                if self.policy == WideContentPolicy::Letterbox {
                    return CropPlan::Letterbox(self.letterbox_plan(width, height, target));
                }
            }
        }

        // The secondary axis only loses its even-rounding pixel, so it stays centered.
        let (left, right) = place_window(width, target_w, h_envelope);
        let (top, bottom) = place_window(height, target_h, v_envelope);
        let window = CropWindow {
            left,
            right,
            top,
            bottom,
        };

        CropPlan::Crop {
            source_width: width,
            source_height: height,
            window,
        }
    }

    /// Exact center crop, ignoring content.
    pub fn center_plan(&self, width: u32, height: u32, target: AspectRatio) -> CropPlan {
        Self::new(WideContentPolicy::CenterOnContent).plan(width, height, &[], target)
    }

    /// Letterbox the whole source onto a `target` canvas.
    pub fn letterbox_plan(&self, width: u32, height: u32, target: AspectRatio) -> LetterboxPlan {
        let (target_w, target_h) = target_dimensions(width, height, target);
        let scale = (target_w as f64 / width.max(1) as f64)
            .min(target_h as f64 / height.max(1) as f64)
            * LETTERBOX_MARGIN;

        let scaled_w = even_floor((width as f64 * scale) as u32).min(target_w);
        let scaled_h = even_floor((height as f64 * scale) as u32).min(target_h);

        LetterboxPlan {
            target_width: target_w,
            target_height: target_h,
            scale_factor: scale,
            scaled_width: scaled_w,
            scaled_height: scaled_h,
            offset_x: (target_w - scaled_w) / 2,
            offset_y: (target_h - scaled_h) / 2,
        }
    }
}

/// Encoder-friendly output size for `target` within the source.
pub fn target_dimensions(width: u32, height: u32, target: AspectRatio) -> (u32, u32) {
    let (w, h) = target.fit_within(width, height);
    (even_floor(w), even_floor(h))
}

fn even_floor(value: u32) -> u32 {
    (value & !1).max(2)
}

/// Place a window of `window` pixels on an axis of `extent` pixels.
fn place_window(extent: u32, window: u32, envelope: Option<(u32, u32)>) -> (u32, u32) {
    if window >= extent {
        return (0, window.min(extent));
    }

    let start = match envelope {
        None => (extent - window) / 2,
        Some((lo, hi)) => {
            let center = lo + (hi - lo) / 2;
            center.saturating_sub(window / 2).min(extent - window)
        }
    };
    (start, start + window)
}

fn horizontal_envelope(regions: &[Region]) -> Option<(u32, u32)> {
    let lo = regions.iter().map(|r| r.x).min()?;
    let hi = regions.iter().map(|r| r.right()).max()?;
    Some((lo, hi))
}

fn vertical_envelope(regions: &[Region]) -> Option<(u32, u32)> {
    let lo = regions.iter().map(|r| r.y).min()?;
    let hi = regions.iter().map(|r| r.bottom()).max()?;
    Some((lo, hi))
}
