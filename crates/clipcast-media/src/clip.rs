//! Subclip extraction.

use clipcast_models::EncodingConfig;
use std::path::Path;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::is_valid_output;

/// Rounds both dimensions down to even values, as yuv420p encoders require.
pub const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Build the command cutting `[start, end)` out of `source`.
pub fn subclip_command(
    source: &Path,
    output: &Path,
    start: f64,
    end: f64,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(source, output)
        .seek(start)
        .duration((end - start).max(0.0))
        .video_filter(EVEN_DIMENSIONS_FILTER)
        .output_args(encoding.video_args())
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .output_arg("-movflags")
        .output_arg("+faststart")
}

/// Build the stream-copy cut used when re-encoding fails.
///
/// Cuts land on the nearest keyframes, so the clip may start slightly early.
pub fn stream_copy_command(source: &Path, output: &Path, start: f64, end: f64) -> FfmpegCommand {
    FfmpegCommand::new(source, output)
        .seek(start)
        .duration((end - start).max(0.0))
        .output_arg("-c")
        .output_arg("copy")
        .output_arg("-movflags")
        .output_arg("+faststart")
}

/// Cut `[start, end)` out of `source` into `output`, re-encoded at the
/// configured frame rate. When the encoder rejects the source the streams
/// are copied instead.
///
/// This is the only render of a job that may fail hard: a source that
/// yields no subclip has nothing left to fall back to.
pub async fn extract_subclip(
    runner: &FfmpegRunner,
    source: &Path,
    output: &Path,
    start: f64,
    end: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    info!(
        source = %source.display(),
        start,
        end,
        "Extracting subclip"
    );

    let cmd = subclip_command(source, output, start, end, encoding);
    let encoded = match runner.run(&cmd).await {
        Ok(()) if is_valid_output(output).await => return Ok(()),
        Ok(()) => MediaError::EmptyOutput(output.to_path_buf()),
        Err(e) => e,
    };
    warn!(
        source = %source.display(),
        "Subclip re-encode failed, retrying with stream copy: {}",
        encoded.diagnostic()
    );

    let copy = stream_copy_command(source, output, start, end);
    if runner.run(&copy).await.is_err() || !is_valid_output(output).await {
        return Err(encoded);
    }
    Ok(())
}
