//! ML client error types.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("ML service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(#[from] clipcast_media::MediaError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl MlError {
    pub fn is_retryable(&self) -> bool {
        match self {
            MlError::ServiceUnavailable(_) | MlError::Timeout(_) => true,
            MlError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Map a non-success HTTP status to an error. 5xx responses are retryable.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() {
            MlError::ServiceUnavailable(format!("{}: {}", status, body))
        } else {
            MlError::RequestFailed(format!("service returned {}: {}", status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let e = MlError::from_status(reqwest::StatusCode::BAD_GATEWAY, String::new());
        assert!(e.is_retryable());
        let e = MlError::from_status(reqwest::StatusCode::BAD_REQUEST, "bad".into());
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("400"));
    }
}
