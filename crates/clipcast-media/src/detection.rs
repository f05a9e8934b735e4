//! Edge-density region detection.
//!
//! Frames are reduced to a Canny edge map (Gaussian smoothing included),
//! dilated so nearby edges merge into blobs, and the outer contour of every
//! blob enclosing more than the area threshold is reported by its bounding
//! box. Contours nested inside another blob are not reported.
//!
//! Regions come back in contour discovery order (row-major scan of the
//! dilated map). Callers must not rely on any ordering.

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::MediaResult;
use crate::frames::extract_rgb_frame;
use crate::probe::VideoInfo;

/// Maximum number of frames sampled per clip.
pub const MAX_SAMPLE_FRAMES: usize = 10;

/// Axis-aligned bounding box of a significant region, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Detector parameters.
#[derive(Debug, Clone)]
pub struct RegionDetector {
    /// Canny low hysteresis threshold
    pub low_threshold: f32,
    /// Canny high hysteresis threshold
    pub high_threshold: f32,
    /// Square dilation kernel size
    pub dilate_kernel: u32,
    /// Dilation passes
    pub dilate_iterations: u32,
    /// Contours must enclose strictly more than this area, in square pixels
    pub min_area: u64,
}

impl Default for RegionDetector {
    fn default() -> Self {
        Self {
            low_threshold: 100.0,
            high_threshold: 200.0,
            dilate_kernel: 5,
            dilate_iterations: 2,
            min_area: 500,
        }
    }
}

impl RegionDetector {
    /// Detect significant regions in one frame.
    pub fn detect(&self, frame: &RgbImage) -> Vec<Region> {
        let gray = image::imageops::grayscale(frame);
        let edges = imageproc::edges::canny(&gray, self.low_threshold, self.high_threshold);
        self.regions_from_edges(&edges)
    }

    /// Dilate an edge map and extract outer contour bounding boxes.
    pub fn regions_from_edges(&self, edges: &GrayImage) -> Vec<Region> {
        let radius = (self.dilate_kernel / 2).min(u8::MAX as u32) as u8;
        let mut map = edges.clone();
        for _ in 0..self.dilate_iterations {
            map = imageproc::morphology::dilate(&map, Norm::LInf, radius);
        }

        find_contours::<u32>(&map)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| doubled_area(&c.points).unsigned_abs() > 2 * self.min_area)
            .filter_map(|c| bounding_rect(&c.points))
            .collect()
    }

    /// Union of regions over evenly spaced frames of `video`.
    ///
    /// Frames that cannot be decoded are skipped.
    pub async fn detect_in_video(&self, video: &Path, info: &VideoInfo) -> MediaResult<Vec<Region>> {
        let mut regions = Vec::new();
        let times = sample_times(info.duration);

        for t in &times {
            match extract_rgb_frame(video, *t, info.width, info.height).await {
                Ok(frame) => regions.extend(self.detect(&frame)),
                Err(e) => debug!(timestamp = t, "Skipping undecodable sample frame: {}", e),
            }
        }

        info!(
            samples = times.len(),
            regions = regions.len(),
            "Region detection complete"
        );
        Ok(regions)
    }
}

/// Sample times `linspace(0, duration, min(10, floor(duration) + 1))`.
pub fn sample_times(duration: f64) -> Vec<f64> {
    let duration = duration.max(0.0);
    let count = MAX_SAMPLE_FRAMES.min(duration.floor() as usize + 1);
    if count <= 1 {
        return vec![0.0];
    }
    let step = duration / (count - 1) as f64;
    (0..count).map(|i| step * i as f64).collect()
}

/// Twice the signed area enclosed by a closed contour (shoelace formula).
fn doubled_area(points: &[Point<u32>]) -> i64 {
    if points.len() < 3 {
        return 0;
    }
    let mut sum = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        sum += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    sum
}

/// Smallest upright box containing every contour point.
fn bounding_rect(points: &[Point<u32>]) -> Option<Region> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(Region::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}
