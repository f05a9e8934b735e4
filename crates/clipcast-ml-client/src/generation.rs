//! Text generation: transcript insights and ad creatives.

use async_trait::async_trait;
use clipcast_models::{AdCreatives, Platform};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{check_status, with_retry, MlClientConfig};
use crate::error::{MlError, MlResult};

/// Returned when insight generation fails.
pub const INSIGHTS_FALLBACK: &str =
    "Could not generate insights. Make sure Zephyr is running and accessible.";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> MlResult<String>;
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for Arc<G> {
    async fn generate(&self, prompt: &str) -> MlResult<String> {
        (**self).generate(prompt).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming `{model, prompt, stream: false}` generation endpoint.
pub struct HttpTextGenerator {
    http: Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl HttpTextGenerator {
    pub fn new(config: &MlClientConfig) -> MlResult<Self> {
        Ok(Self {
            http: config.http_client()?,
            url: config.generation_url.clone(),
            model: config.generation_model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> MlResult<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        debug!(url = %self.url, model = %self.model, "Sending generation request");

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

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}

pub fn insights_prompt(transcript: &str) -> String {
    format!(
        "Analyze the following video transcript and generate insights:
- Key themes
- High-impact moments
- Audience engagement points
- Content performance predictions

Transcript:
{transcript}
"
    )
}

fn creative_requirements(platform: Platform) -> &'static str {
    match platform {
        Platform::YoutubeAds => {
            "- Compelling headline (max 60 characters)
- Engaging description (max 90 characters)
- Call-to-action that drives clicks"
        }
        Platform::DisplayAds => {
            "- Short, attention-grabbing headline (max 30 characters)
- Visually descriptive text (max 90 characters)
- Clear call-to-action"
        }
        Platform::PerformanceMax => {
            "- Conversion-focused headline (max 30 characters)
- Benefit-driven description (max 90 characters)
- Strong call-to-action that drives immediate response"
        }
        Platform::YoutubeShorts => {
            "- Headline
- Description
- Call-to-action"
        }
    }
}

pub fn ad_creatives_prompt(transcript: &str, platform: Platform) -> String {
    format!(
        r#"Generate ad creatives for the following video transcript:
{requirements}
- Video snippet suggestions (what moments to highlight)

Ad Format: {format}
Transcript:
{transcript}

Format the response as JSON with the following structure:
{{
    "headline": "Your headline here",
    "description": "Your description here",
    "call_to_action": "Your CTA here",
    "video_snippets": ["Snippet 1", "Snippet 2"]
}}
"#,
        requirements = creative_requirements(platform),
        format = platform.format_label(),
    )
}

/// Insights for `transcript`, or [`INSIGHTS_FALLBACK`] on failure.
pub async fn generate_insights<G: TextGenerator + ?Sized>(generator: &G, transcript: &str) -> String {
    match generator.generate(&insights_prompt(transcript)).await {
        Ok(text) => {
            info!(chars = text.len(), "Insights generated");
            text
        }
        Err(e) => {
            warn!("Insight generation failed: {}", e);
            INSIGHTS_FALLBACK.to_string()
        }
    }
}

/// Ad copy for `platform`.
///
/// Replies that are not JSON are kept as raw text; request failures
/// produce the platform placeholder.
pub async fn generate_ad_creatives<G: TextGenerator + ?Sized>(
    generator: &G,
    transcript: &str,
    platform: Platform,
) -> AdCreatives {
    match generator.generate(&ad_creatives_prompt(transcript, platform)).await {
        Ok(text) => {
            let creatives = AdCreatives::from_generated(&text);
            if creatives.is_raw() {
                warn!(platform = %platform, "Ad creatives were not valid JSON, keeping raw text");
            }
            creatives
        }
        Err(e) => {
            warn!(platform = %platform, "Ad creative generation failed: {}", e);
            AdCreatives::placeholder(platform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer) -> HttpTextGenerator {
        let config = MlClientConfig {
            generation_url: format!("{}/api/generate", server.uri()),
            max_retries: 0,
            ..MlClientConfig::default()
        };
        HttpTextGenerator::new(&config).unwrap()
    }

    #[test]
    fn test_prompts_per_platform() {
        let prompt = ad_creatives_prompt("hello", Platform::DisplayAds);
        assert!(prompt.contains("max 30 characters"));
        assert!(prompt.contains("Ad Format: Display Ads"));
        assert!(prompt.contains("\"call_to_action\": \"Your CTA here\""));

        let prompt = ad_creatives_prompt("hello", Platform::YoutubeAds);
        assert!(prompt.contains("max 60 characters"));

        let prompt = insights_prompt("the transcript");
        assert!(prompt.contains("- Key themes"));
        assert!(prompt.ends_with("the transcript\n"));
    }

    #[tokio::test]
    async fn test_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(serde_json::json!({
                "model": "zephyr",
                "prompt": "hi",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "hello"})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(generator_for(&server).generate("hi").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_ad_creatives_parse_json_reply() {
        let server = MockServer::start().await;
        let reply = r#"Sure! Here you go:
{"headline": "Watch This", "description": "Wow", "call_to_action": "Subscribe", "video_snippets": ["intro"]}"#;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"model": "zephyr"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": reply})))
            .mount(&server)
            .await;

        let creatives =
            generate_ad_creatives(&generator_for(&server), "t", Platform::YoutubeShorts).await;
        assert_eq!(creatives.headline.as_deref(), Some("Watch This"));
        assert_eq!(creatives.call_to_action.as_deref(), Some("Subscribe"));
        assert_eq!(creatives.video_snippets, vec!["intro".to_string()]);
    }

    #[tokio::test]
    async fn test_ad_creatives_keep_prose_as_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "Just buy it"})),
            )
            .mount(&server)
            .await;

        let creatives = generate_ad_creatives(&generator_for(&server), "t", Platform::YoutubeAds).await;
        assert!(creatives.is_raw());
        assert_eq!(creatives.raw_text.as_deref(), Some("Just buy it"));
    }

    #[tokio::test]
    async fn test_failures_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let generator = generator_for(&server);

        let creatives = generate_ad_creatives(&generator, "t", Platform::PerformanceMax).await;
        assert_eq!(creatives, AdCreatives::placeholder(Platform::PerformanceMax));
        assert_eq!(generate_insights(&generator, "t").await, INSIGHTS_FALLBACK);
    }
}
