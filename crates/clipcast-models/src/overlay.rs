//! Headline and call-to-action overlay text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Text burned onto a finished clip or thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlaySpec {
    #[default]
    NoOverlay,
    Headline {
        headline: String,
    },
    Cta {
        cta: String,
    },
    HeadlineAndCta {
        headline: String,
        cta: String,
    },
}

impl OverlaySpec {
    pub fn headline(text: impl Into<String>) -> Self {
        Self::Headline {
            headline: text.into(),
        }
    }

    pub fn headline_and_cta(headline: impl Into<String>, cta: impl Into<String>) -> Self {
        Self::HeadlineAndCta {
            headline: headline.into(),
            cta: cta.into(),
        }
    }

    /// Build from optional parts. Blank strings count as absent.
    pub fn from_parts(headline: Option<&str>, cta: Option<&str>) -> Self {
        let headline = headline.map(str::trim).filter(|s| !s.is_empty());
        let cta = cta.map(str::trim).filter(|s| !s.is_empty());
        match (headline, cta) {
            (Some(h), Some(c)) => Self::headline_and_cta(h, c),
            (Some(h), None) => Self::headline(h),
            (None, Some(c)) => Self::Cta { cta: c.to_string() },
            (None, None) => Self::NoOverlay,
        }
    }

    pub fn headline_text(&self) -> Option<&str> {
        match self {
            Self::Headline { headline } | Self::HeadlineAndCta { headline, .. } => Some(headline),
            _ => None,
        }
    }

    pub fn cta_text(&self) -> Option<&str> {
        match self {
            Self::Cta { cta } | Self::HeadlineAndCta { cta, .. } => Some(cta),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoOverlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(OverlaySpec::from_parts(None, None), OverlaySpec::NoOverlay);
        assert_eq!(
            OverlaySpec::from_parts(Some("  "), Some("Buy now")),
            OverlaySpec::Cta {
                cta: "Buy now".to_string()
            }
        );
        let spec = OverlaySpec::from_parts(Some("Big news"), Some("Learn More"));
        assert_eq!(spec.headline_text(), Some("Big news"));
        assert_eq!(spec.cta_text(), Some("Learn More"));
    }
}
