//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;

use clipcast_media::WideContentPolicy;
use clipcast_ml_client::scoring::DEFAULT_TOP_N;

use crate::error::{WorkerError, WorkerResult};

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_JOB_STATUS_URL: &str = "http://localhost:3000/api/update-job";

/// Worker configuration.
///
/// Read once at the start of a run and passed to every component.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory for per-platform outputs and the summary report
    pub output_dir: PathBuf,
    /// Job-status endpoint; `None` disables notifications
    pub job_status_url: Option<String>,
    /// Directory for per-job scratch files
    pub work_dir: PathBuf,
    /// Number of candidate moments kept by the moment search
    pub moments_top_n: usize,
    /// Crop behaviour when detected content is wider than the window
    pub wide_content: WideContentPolicy,
    /// Burn timed subtitles on platforms that enable them
    pub auto_subtitles: bool,
    /// Font used by drawtext filters instead of the fontconfig default
    pub font_file: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            job_status_url: Some(DEFAULT_JOB_STATUS_URL.to_string()),
            work_dir: std::env::temp_dir().join("clipcast"),
            moments_top_n: DEFAULT_TOP_N,
            wide_content: WideContentPolicy::default(),
            auto_subtitles: true,
            font_file: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// An empty `JOB_STATUS_URL` disables status notifications.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let wide_content = match std::env::var("CLIPCAST_WIDE_CONTENT") {
            Ok(value) => WideContentPolicy::from_str(&value).map_err(WorkerError::config_error)?,
            Err(_) => defaults.wide_content,
        };

        let job_status_url = match std::env::var("JOB_STATUS_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(url),
            Err(_) => defaults.job_status_url,
        };

        Ok(Self {
            output_dir: std::env::var("CLIPCAST_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            job_status_url,
            work_dir: std::env::var("CLIPCAST_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            moments_top_n: std::env::var("CLIPCAST_MOMENTS_TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.moments_top_n),
            wide_content,
            auto_subtitles: std::env::var("CLIPCAST_AUTO_SUBTITLES")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.auto_subtitles),
            font_file: std::env::var("CLIPCAST_FONT_FILE").ok().map(PathBuf::from),
        })
    }
}
