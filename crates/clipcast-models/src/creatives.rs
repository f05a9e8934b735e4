//! Generated ad copy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::overlay::OverlaySpec;
use crate::platform::Platform;

/// Ad creative fields produced by the text-generation service.
///
/// When the generated reply is not valid JSON only `raw_text` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AdCreatives {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub video_snippets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl AdCreatives {
    /// Canned creative used when generation is unavailable.
    pub fn placeholder(platform: Platform) -> Self {
        Self {
            headline: Some(format!("Engaging {} Content", platform.format_label())),
            description: Some("Discover what makes this content special".to_string()),
            call_to_action: Some("Learn More".to_string()),
            video_snippets: Vec::new(),
            raw_text: None,
        }
    }

    /// Wrap an unstructured reply.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Parse a generated reply.
    ///
    /// Accepts a bare JSON object or one embedded in surrounding prose or a
    /// code fence. Anything else becomes a `raw_text` wrapper.
    pub fn from_generated(text: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<AdCreatives>(text.trim()) {
            return parsed;
        }

        if let (Some(open), Some(close)) = (text.find('{'), text.rfind('}')) {
            if open < close {
                if let Ok(parsed) = serde_json::from_str::<AdCreatives>(&text[open..=close]) {
                    return parsed;
                }
            }
        }

        Self::raw(text)
    }

    /// Whether the reply carried no structured fields.
    pub fn is_raw(&self) -> bool {
        self.headline.is_none() && self.call_to_action.is_none() && self.description.is_none()
    }

    /// Overlay text for clips and thumbnails.
    pub fn overlay_spec(&self) -> OverlaySpec {
        OverlaySpec::from_parts(self.headline.as_deref(), self.call_to_action.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_reply() {
        let reply = r#"{"headline":"Watch This","description":"Amazing","call_to_action":"Subscribe","video_snippets":["intro"]}"#;
        let creatives = AdCreatives::from_generated(reply);
        assert_eq!(creatives.headline.as_deref(), Some("Watch This"));
        assert_eq!(creatives.call_to_action.as_deref(), Some("Subscribe"));
        assert_eq!(creatives.video_snippets, vec!["intro".to_string()]);
        assert!(creatives.raw_text.is_none());
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let reply = "Sure! Here you go:\n```json\n{\"headline\": \"Fast Cars\", \"call_to_action\": \"Drive\"}\n```";
        let creatives = AdCreatives::from_generated(reply);
        assert_eq!(creatives.headline.as_deref(), Some("Fast Cars"));
    }

    #[test]
    fn test_unparseable_reply_is_raw() {
        let creatives = AdCreatives::from_generated("Headline: Fast Cars");
        assert!(creatives.is_raw());
        assert_eq!(creatives.raw_text.as_deref(), Some("Headline: Fast Cars"));
        assert!(creatives.overlay_spec().is_empty());

        let json = serde_json::to_value(&creatives).unwrap();
        assert_eq!(json, serde_json::json!({"raw_text": "Headline: Fast Cars"}));
    }

    #[test]
    fn test_placeholder() {
        let creatives = AdCreatives::placeholder(Platform::DisplayAds);
        assert_eq!(creatives.headline.as_deref(), Some("Engaging Display Ads Content"));
        assert_eq!(creatives.call_to_action.as_deref(), Some("Learn More"));
    }
}
