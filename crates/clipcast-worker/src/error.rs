//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input video not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] clipcast_media::MediaError),

    #[error("ML service error: {0}")]
    Ml(#[from] clipcast_ml_client::MlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkerError::InputNotFound(PathBuf::from("/videos/missing.mp4"));
        assert_eq!(err.to_string(), "Input video not found: /videos/missing.mp4");

        let err: WorkerError = clipcast_media::MediaError::FfmpegNotFound.into();
        assert_eq!(err.to_string(), "Media error: FFmpeg not found in PATH");
    }
}
