//! Frame engagement scoring and moment selection.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clipcast_media::{extract_rgb_frame, probe_video};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{check_status, with_retry, MlClientConfig};
use crate::error::{MlError, MlResult};

/// Prompts averaged per frame.
pub const DEFAULT_PROMPTS: [&str; 3] = [
    "exciting moment",
    "visually stunning scene",
    "emotionally powerful moment",
];

pub const DEFAULT_TOP_N: usize = 5;

/// Frames sampled per second of source.
pub const SAMPLE_FPS: f64 = 1.0;

#[async_trait]
pub trait FrameScorer: Send + Sync {
    /// Affinity between a PNG image and a text prompt. Higher is better.
    async fn score(&self, image_png: &[u8], prompt: &str) -> MlResult<f64>;
}

#[async_trait]
impl<S: FrameScorer + ?Sized> FrameScorer for Arc<S> {
    async fn score(&self, image_png: &[u8], prompt: &str) -> MlResult<f64> {
        (**self).score(image_png, prompt).await
    }
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    image: String,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Posts `{image: base64, prompt}` and reads `{score}` back.
pub struct HttpFrameScorer {
    http: Client,
    url: String,
    max_retries: u32,
}

impl HttpFrameScorer {
    pub fn new(config: &MlClientConfig) -> MlResult<Self> {
        Ok(Self {
            http: config.http_client()?,
            url: config.scoring_url.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl FrameScorer for HttpFrameScorer {
    async fn score(&self, image_png: &[u8], prompt: &str) -> MlResult<f64> {
        let request = ScoreRequest {
            image: STANDARD.encode(image_png),
            prompt,
        };
        let response = with_retry(self.max_retries, || async {
            let response = self
                .http
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(MlError::Network)?;
            check_status(response).await
        })
        .await?;

        let body: ScoreResponse = response.json().await?;
        if !body.score.is_finite() {
            return Err(MlError::InvalidResponse(format!("non-finite score {}", body.score)));
        }
        Ok(body.score)
    }
}

/// Encode a frame as PNG for upload.
pub fn encode_png(frame: RgbImage) -> MlResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(frame).write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

/// Indices of the `top_n` highest scores as timestamps at `fps`.
///
/// Ties keep sample order.
pub fn rank_moments(scores: &[f64], fps: f64, top_n: usize) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
        .into_iter()
        .take(top_n)
        .map(|i| i as f64 / fps)
        .collect()
}

/// Finds the most engaging timestamps of a video.
pub struct MomentFinder<S> {
    scorer: S,
    prompts: Vec<String>,
    top_n: usize,
}

impl<S: FrameScorer> MomentFinder<S> {
    pub fn new(scorer: S) -> Self {
        Self {
            scorer,
            prompts: DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect(),
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_prompts(mut self, prompts: Vec<String>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Mean score of one frame over all prompts.
    pub async fn score_frame(&self, image_png: &[u8]) -> MlResult<f64> {
        if self.prompts.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for prompt in &self.prompts {
            total += self.scorer.score(image_png, prompt).await?;
        }
        Ok(total / self.prompts.len() as f64)
    }

    /// Rank pre-encoded samples taken at [`SAMPLE_FPS`].
    pub async fn rank_samples(&self, samples: &[Vec<u8>]) -> MlResult<Vec<f64>> {
        let mut scores = Vec::with_capacity(samples.len());
        for png in samples {
            scores.push(self.score_frame(png).await?);
        }
        Ok(rank_moments(&scores, SAMPLE_FPS, self.top_n))
    }

    /// Top timestamps of `video`, best first.
    pub async fn find(&self, video: &Path) -> MlResult<Vec<f64>> {
        let info = probe_video(video).await?;
        let count = (info.duration * SAMPLE_FPS).ceil().max(0.0) as usize;

        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            let t = i as f64 / SAMPLE_FPS;
            match extract_rgb_frame(video, t, info.width, info.height).await {
                Ok(frame) => samples.push(encode_png(frame)?),
                // Past the last decodable frame. Stopping keeps index == seconds.
                Err(e) => {
                    debug!(timestamp = t, "Stopping at undecodable sample: {}", e);
                    break;
                }
            }
        }

        let moments = self.rank_samples(&samples).await?;
        info!(samples = samples.len(), moments = moments.len(), "Moment search complete");
        Ok(moments)
    }

    /// Like [`find`](Self::find), empty on any failure.
    pub async fn find_or_empty(&self, video: &Path) -> Vec<f64> {
        match self.find(video).await {
            Ok(moments) => moments,
            Err(e) => {
                warn!(video = %video.display(), "Moment search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Scores by the first byte of the image and a per-prompt offset.
    struct TableScorer {
        offsets: HashMap<&'static str, f64>,
    }

    #[async_trait]
    impl FrameScorer for TableScorer {
        async fn score(&self, image_png: &[u8], prompt: &str) -> MlResult<f64> {
            let offset = self
                .offsets
                .get(prompt)
                .copied()
                .ok_or_else(|| MlError::InvalidResponse(prompt.to_string()))?;
            Ok(image_png[0] as f64 + offset)
        }
    }

    fn table() -> TableScorer {
        TableScorer {
            offsets: HashMap::from([
                ("exciting moment", 0.0),
                ("visually stunning scene", 3.0),
                ("emotionally powerful moment", 6.0),
            ]),
        }
    }

    #[test]
    fn test_rank_moments() {
        let scores = [1.0, 9.0, 3.0, 9.0, 5.0];
        assert_eq!(rank_moments(&scores, 1.0, 3), vec![1.0, 3.0, 4.0]);
        assert_eq!(rank_moments(&scores, 2.0, 1), vec![0.5]);
        assert!(rank_moments(&[], 1.0, 5).is_empty());
        assert_eq!(rank_moments(&[2.0, 1.0], 1.0, 5).len(), 2);
    }

    #[tokio::test]
    async fn test_score_frame_averages_prompts() {
        let finder = MomentFinder::new(table());
        assert_eq!(finder.score_frame(&[10]).await.unwrap(), 13.0);
    }

    #[tokio::test]
    async fn test_rank_samples_returns_timestamps() {
        let finder = MomentFinder::new(table()).with_top_n(2);
        let samples = vec![vec![1], vec![50], vec![7], vec![20]];
        assert_eq!(finder.rank_samples(&samples).await.unwrap(), vec![1.0, 3.0]);
    }

    #[tokio::test]
    async fn test_scorer_failure_fails_ranking() {
        let finder = MomentFinder::new(table()).with_prompts(vec!["unknown".into()]);
        assert!(finder.rank_samples(&[vec![1]]).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_video_gives_no_moments() {
        let finder = MomentFinder::new(table());
        assert!(finder.find_or_empty(Path::new("/nonexistent.mp4")).await.is_empty());
    }

    #[tokio::test]
    async fn test_http_scorer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "prompt": "exciting moment",
                "image": STANDARD.encode([1u8, 2, 3]),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"score": 0.42})))
            .expect(1)
            .mount(&server)
            .await;

        let config = MlClientConfig {
            scoring_url: server.uri(),
            max_retries: 0,
            ..MlClientConfig::default()
        };
        let scorer = HttpFrameScorer::new(&config).unwrap();
        let score = scorer.score(&[1, 2, 3], "exciting moment").await.unwrap();
        assert!((score - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(RgbImage::new(2, 2)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
