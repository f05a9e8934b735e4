//! Job-status notifications.
//!
//! Status updates are fire-and-forget: a failed POST is logged and the
//! job carries on.

use async_trait::async_trait;
use clipcast_models::JobStatusUpdate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Receives job-status updates as a job advances.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, update: &JobStatusUpdate);
}

/// Posts updates as JSON to the job-status service.
pub struct HttpStatusNotifier {
    http: Client,
    url: String,
}

impl HttpStatusNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build status client, using defaults: {}", e);
                Client::new()
            });
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl StatusNotifier for HttpStatusNotifier {
    async fn notify(&self, update: &JobStatusUpdate) {
        let result = self.http.post(&self.url).json(update).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    job_id = %update.job_id,
                    status = %update.status,
                    progress = update.progress,
                    "Job status updated"
                );
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(
                    job_id = %update.job_id,
                    status = %update.status,
                    "Job status update rejected ({}): {}",
                    status,
                    body
                );
            }
            Err(e) => {
                warn!(job_id = %update.job_id, status = %update.status, "Job status update failed: {}", e);
            }
        }
    }
}

/// Drops every update; used when no status endpoint is configured.
pub struct NoopNotifier;

#[async_trait]
impl StatusNotifier for NoopNotifier {
    async fn notify(&self, update: &JobStatusUpdate) {
        debug!(job_id = %update.job_id, status = %update.status, "Status notifications disabled");
    }
}

/// Notifier for an optional status endpoint.
pub fn notifier_for(url: Option<&str>) -> Arc<dyn StatusNotifier> {
    match url {
        Some(url) => Arc::new(HttpStatusNotifier::new(url)),
        None => Arc::new(NoopNotifier),
    }
}
