//! Single-frame decoding into in-memory images.

use image::RgbImage;
use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner, PIPE_OUTPUT};
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when probing reports none.
const FALLBACK_FPS: f64 = 30.0;

/// Decode the frame at `timestamp` as RGB.
///
/// `width` and `height` are the probed stream dimensions. A seek past the
/// last frame makes FFmpeg exit cleanly with no output, which is reported
/// as [`MediaError::NoDecodableFrame`].
pub async fn extract_rgb_frame(
    video: &Path,
    timestamp: f64,
    width: u32,
    height: u32,
) -> MediaResult<RgbImage> {
    let cmd = FfmpegCommand::new(video, PIPE_OUTPUT)
        .seek(timestamp)
        .raw_frame("rgb24");
    let bytes = FfmpegRunner::new().run_capture(&cmd).await?;

    let expected = width as usize * height as usize * 3;
    if bytes.len() < expected {
        return Err(MediaError::no_decodable_frame(format!(
            "{} at {:.3}s: got {} of {} bytes",
            video.display(),
            timestamp,
            bytes.len(),
            expected
        )));
    }

    let mut bytes = bytes;
    bytes.truncate(expected);
    RgbImage::from_raw(width, height, bytes)
        .ok_or_else(|| MediaError::internal("raw frame buffer size mismatch"))
}

/// Frame indices tried when the frame at `frame_number` cannot be decoded.
///
/// Starts one frame earlier and doubles the step back each time, always
/// ending at frame 0.
pub fn fallback_frame_indices(frame_number: u64) -> Vec<u64> {
    let mut indices = Vec::new();
    let mut step = 1u64;
    while step <= frame_number {
        indices.push(frame_number - step);
        step *= 2;
    }
    if indices.last() != Some(&0) && frame_number > 0 {
        indices.push(0);
    }
    indices
}

/// Decode the frame at `timestamp`, retrying at earlier frames on failure.
///
/// Fails only when no candidate frame can be decoded.
pub async fn extract_frame_with_retry(
    video: &Path,
    timestamp: f64,
    fps: f64,
    width: u32,
    height: u32,
) -> MediaResult<RgbImage> {
    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
    let frame_number = (timestamp.max(0.0) * fps) as u64;

    let mut last_error = match extract_rgb_frame(video, frame_number as f64 / fps, width, height).await {
        Ok(frame) => return Ok(frame),
        Err(e) => e,
    };

    for index in fallback_frame_indices(frame_number) {
        debug!(frame = index, "Retrying frame extraction at an earlier frame");
        match extract_rgb_frame(video, index as f64 / fps, width, height).await {
            Ok(frame) => return Ok(frame),
            Err(e) => last_error = e,
        }
    }

    Err(MediaError::no_decodable_frame(format!(
        "no frame at or before {:.3}s in {}: {}",
        timestamp,
        video.display(),
        last_error
    )))
}
