//! Filesystem helpers for render outputs.
//!
//! Every render writes to a temporary file created next to its final
//! destination. The temporary is removed when dropped, and only a
//! non-empty result is renamed into place.

use std::path::Path;
use tempfile::TempPath;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Post-condition for every render: the file exists and is non-empty.
pub async fn is_valid_output(path: impl AsRef<Path>) -> bool {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Create a temporary path in `dir` with the given extension (e.g. `"mp4"`).
///
/// The file is deleted when the returned handle is dropped.
pub fn temp_path_in(dir: impl AsRef<Path>, extension: &str) -> MediaResult<TempPath> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let file = tempfile::Builder::new()
        .prefix(".clipcast-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// Rename a validated temporary over `dst`.
///
/// Fails with [`MediaError::EmptyOutput`] when the temporary is missing or
/// empty; in that case `dst` is untouched and the temporary is removed.
pub async fn persist_output(temp: TempPath, dst: impl AsRef<Path>) -> MediaResult<()> {
    let dst = dst.as_ref();
    if !is_valid_output(&temp).await {
        return Err(MediaError::EmptyOutput(temp.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match temp.persist(dst) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_error(&err.error) => {
            let temp = err.path;
            tracing::debug!(
                "Cross-device rename detected, falling back to copy: {} -> {}",
                temp.display(),
                dst.display()
            );
            copy_into_place(&temp, dst).await
        }
        Err(err) => Err(MediaError::from(err.error)),
    }
}

/// Move a file from `src` to `dst`, handling cross-device moves.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            copy_into_place(src, dst).await?;
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!(
                    "Failed to remove source file after cross-device move: {}: {}",
                    src.display(),
                    e
                );
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Copy to a sibling of `dst`, then rename so `dst` never holds a partial file.
async fn copy_into_place(src: &Path, dst: &Path) -> MediaResult<()> {
    let staging = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staging).await {
        let _ = fs::remove_file(&staging).await;
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::rename(&staging, dst).await {
        let _ = fs::remove_file(&staging).await;
        return Err(MediaError::from(e));
    }

    Ok(())
}
