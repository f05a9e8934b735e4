//! Speech-to-text collaborator.

use async_trait::async_trait;
use clipcast_models::TranscriptSegment;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{check_status, with_retry, MlClientConfig};
use crate::error::{MlError, MlResult};

/// A transcript, optionally with timestamped segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.segments.is_empty()
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio of `media`. `timestamps` requests segments.
    async fn transcribe_with(&self, media: &Path, timestamps: bool) -> MlResult<Transcript>;

    /// Plain transcript text.
    async fn transcribe(&self, media: &Path) -> MlResult<Transcript> {
        self.transcribe_with(media, false).await
    }

    /// Timestamped segments only.
    async fn transcribe_segments(&self, media: &Path) -> MlResult<Vec<TranscriptSegment>> {
        Ok(self.transcribe_with(media, true).await?.segments)
    }
}

#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe_with(&self, media: &Path, timestamps: bool) -> MlResult<Transcript> {
        (**self).transcribe_with(media, timestamps).await
    }
}

/// Uploads media as multipart form data and reads `{text, segments?}` back.
pub struct HttpTranscriber {
    http: Client,
    url: String,
    max_retries: u32,
}

impl HttpTranscriber {
    pub fn new(config: &MlClientConfig) -> MlResult<Self> {
        Ok(Self {
            http: config.http_client()?,
            url: config.transcription_url.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe_with(&self, media: &Path, timestamps: bool) -> MlResult<Transcript> {
        let bytes = tokio::fs::read(media).await?;
        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        debug!(url = %self.url, size = bytes.len(), timestamps, "Sending transcription request");

        let response = with_retry(self.max_retries, || async {
            let form = Form::new()
                .text("timestamps", timestamps.to_string())
                .part("file", Part::bytes(bytes.clone()).file_name(file_name.clone()));
            let response = self
                .http
                .post(&self.url)
                .multipart(form)
                .send()
                .await
                .map_err(MlError::Network)?;
            check_status(response).await
        })
        .await?;

        let transcript: Transcript = response.json().await?;
        info!(
            chars = transcript.text.len(),
            segments = transcript.segments.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}

/// Transcript text, empty when the service fails.
pub async fn transcript_or_empty<T: Transcriber + ?Sized>(transcriber: &T, media: &Path) -> Transcript {
    match transcriber.transcribe(media).await {
        Ok(t) => t,
        Err(e) => {
            warn!(media = %media.display(), "Transcription failed, continuing without transcript: {}", e);
            Transcript::default()
        }
    }
}

/// Timestamped segments, empty when the service fails.
pub async fn segments_or_empty<T: Transcriber + ?Sized>(
    transcriber: &T,
    media: &Path,
) -> Vec<TranscriptSegment> {
    match transcriber.transcribe_segments(media).await {
        Ok(segments) => segments,
        Err(e) => {
            warn!(media = %media.display(), "Timestamped transcription failed: {}", e);
            Vec::new()
        }
    }
}
