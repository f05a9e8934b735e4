//! Content job worker.
//!
//! This crate provides:
//! - Environment-driven configuration
//! - The per-platform job processor and summary report
//! - Job-status notifications
//! - Structured job logging

pub mod config;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod output;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use notifier::{notifier_for, HttpStatusNotifier, NoopNotifier, StatusNotifier};
pub use output::PlatformOutputs;
pub use processor::{Collaborators, JobProcessor, JobResult, PlatformResult};
