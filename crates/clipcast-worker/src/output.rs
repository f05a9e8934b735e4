//! Output layout: one directory per platform under the run's output root.

use chrono::{DateTime, Local};
use clipcast_models::Platform;
use std::path::{Path, PathBuf};

pub const SUMMARY_REPORT_FILE: &str = "summary_report.json";

/// Output file base name: `<platform>_<YYYYmmdd_HHMMSS>`.
pub fn output_stem(platform: Platform, at: DateTime<Local>) -> String {
    format!("{}_{}", platform.as_str(), at.format("%Y%m%d_%H%M%S"))
}

/// Paths written for one platform in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutputs {
    pub dir: PathBuf,
    pub video: PathBuf,
    pub thumbnail: PathBuf,
    pub metadata: PathBuf,
}

impl PlatformOutputs {
    pub fn new(output_root: &Path, platform: Platform, at: DateTime<Local>) -> Self {
        let dir = platform_dir(output_root, platform);
        let stem = output_stem(platform, at);
        Self {
            video: dir.join(format!("{stem}.mp4")),
            thumbnail: dir.join(format!("{stem}.jpg")),
            metadata: dir.join(format!("{stem}.json")),
            dir,
        }
    }

    pub fn video_file(&self) -> String {
        file_name(&self.video)
    }

    pub fn thumbnail_file(&self) -> String {
        file_name(&self.thumbnail)
    }
}

pub fn platform_dir(output_root: &Path, platform: Platform) -> PathBuf {
    output_root.join(platform.as_str())
}

/// Create the output root and every platform directory.
pub async fn create_platform_dirs(output_root: &Path, platforms: &[Platform]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(output_root).await?;
    for platform in platforms {
        tokio::fs::create_dir_all(platform_dir(output_root, *platform)).await?;
    }
    Ok(())
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
