//! Shared HTTP plumbing for the collaborator services.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::error::{MlError, MlResult};

pub const DEFAULT_GENERATION_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_GENERATION_MODEL: &str = "zephyr";
pub const DEFAULT_TRANSCRIPTION_URL: &str = "http://localhost:9000/transcribe";
pub const DEFAULT_SCORING_URL: &str = "http://localhost:9001/score";

/// Configuration for the collaborator clients.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Text-generation endpoint
    pub generation_url: String,
    /// Model name sent with generation requests
    pub generation_model: String,
    /// Speech-to-text endpoint
    pub transcription_url: String,
    /// Image/prompt affinity endpoint
    pub scoring_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            generation_url: DEFAULT_GENERATION_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            transcription_url: DEFAULT_TRANSCRIPTION_URL.to_string(),
            scoring_url: DEFAULT_SCORING_URL.to_string(),
            timeout: Duration::from_secs(300), // transcription of long sources is slow
            max_retries: 2,
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            generation_url: std::env::var("GENERATION_URL").unwrap_or(defaults.generation_url),
            generation_model: std::env::var("GENERATION_MODEL")
                .unwrap_or(defaults.generation_model),
            transcription_url: std::env::var("TRANSCRIPTION_URL")
                .unwrap_or(defaults.transcription_url),
            scoring_url: std::env::var("SCORING_URL").unwrap_or(defaults.scoring_url),
            timeout: Duration::from_secs(
                std::env::var("ML_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("ML_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    /// Build the shared reqwest client.
    pub fn http_client(&self) -> MlResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(MlError::Network)
    }
}

/// Run `operation`, retrying retryable errors with exponential backoff.
pub(crate) async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> MlResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = MlResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(
                    "ML request failed (attempt {}), retrying in {:?}: {}",
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(MlError::RequestFailed("Unknown error".to_string())))
}

/// Turn a non-success response into an error.
pub(crate) async fn check_status(response: reqwest::Response) -> MlResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MlError::from_status(status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.generation_url, "http://localhost:11434/api/generate");
        assert_eq!(config.generation_model, "zephyr");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: MlResult<()> = with_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(MlError::RequestFailed("400".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(2, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(MlError::ServiceUnavailable("503".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
