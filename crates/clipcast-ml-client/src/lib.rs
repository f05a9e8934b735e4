//! Clients for the external collaborator services.
//!
//! Each collaborator sits behind a trait so the job processor can run
//! against fakes:
//! - [`Transcriber`]: speech-to-text, optionally timestamped
//! - [`FrameScorer`]: image/prompt affinity, driving [`MomentFinder`]
//! - [`TextGenerator`]: insights and ad creatives
//!
//! Failures degrade to empty or canned results at the helper level; the
//! trait methods themselves return errors.

pub mod client;
pub mod error;
pub mod generation;
pub mod scoring;
pub mod transcription;

pub use client::MlClientConfig;
pub use error::{MlError, MlResult};
pub use generation::{
    generate_ad_creatives, generate_insights, HttpTextGenerator, TextGenerator, INSIGHTS_FALLBACK,
};
pub use scoring::{FrameScorer, HttpFrameScorer, MomentFinder};
pub use transcription::{
    segments_or_empty, transcript_or_empty, HttpTranscriber, Transcriber, Transcript,
};
