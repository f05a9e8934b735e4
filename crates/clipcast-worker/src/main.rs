//! `clipcast` command-line entry point.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use clipcast_media::{check_ffmpeg, check_ffprobe, WideContentPolicy};
use clipcast_ml_client::MlClientConfig;
use clipcast_models::Platform;
use clipcast_worker::{notifier_for, Collaborators, JobProcessor, WorkerConfig};

/// Turn one video into platform-ready clips, thumbnails and metadata.
#[derive(Debug, Parser)]
#[command(name = "clipcast", version, about)]
struct Cli {
    /// Source video
    video: PathBuf,

    /// Platforms to produce content for (default: all)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    platforms: Vec<Platform>,

    /// Output directory (overrides CLIPCAST_OUTPUT_DIR)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Job identifier reported to the status service
    #[arg(long = "job-id", alias = "job_id")]
    job_id: Option<String>,

    /// Skip burned-in subtitles
    #[arg(long)]
    no_subtitles: bool,

    /// Crop behaviour for content wider than the target: center or letterbox
    #[arg(long)]
    wide_content: Option<WideContentPolicy>,

    /// Font file for rendered text
    #[arg(long)]
    font_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut WorkerConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.no_subtitles {
            config.auto_subtitles = false;
        }
        if let Some(policy) = self.wide_content {
            config.wide_content = policy;
        }
        if let Some(font) = &self.font_file {
            config.font_file = Some(font.clone());
        }
    }

    fn platforms(&self) -> Vec<Platform> {
        if self.platforms.is_empty() {
            return Platform::ALL.to_vec();
        }
        let mut platforms = Vec::with_capacity(self.platforms.len());
        for platform in &self.platforms {
            if !platforms.contains(platform) {
                platforms.push(*platform);
            }
        }
        platforms
    }
}

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("clipcast=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env().context("invalid worker configuration")?;
    cli.apply(&mut config);
    info!("Worker config: {:?}", config);

    for check in [check_ffmpeg(), check_ffprobe()] {
        if let Err(e) = check {
            warn!("{}; rendering steps will fail", e);
        }
    }

    let ml_config = MlClientConfig::from_env();
    let collaborators = Collaborators::http(&ml_config).context("failed to build service clients")?;
    let notifier = notifier_for(config.job_status_url.as_deref());

    let job_id = cli.job_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let platforms = cli.platforms();
    let processor = JobProcessor::new(config, collaborators, notifier);

    let job = processor
        .run_job(&cli.video, &platforms, &job_id)
        .await
        .with_context(|| format!("job {} failed for {}", job_id, cli.video.display()))?;

    for result in &job.platforms {
        let prediction = &result.metadata.engagement_prediction;
        info!(
            platform = %result.metadata.platform,
            video = %result.outputs.video.display(),
            thumbnail = %result.outputs.thumbnail.display(),
            tier = %result.reframe.final_state,
            engagement = prediction.predicted_engagement,
            level = %prediction.engagement_level,
            "Content ready"
        );
    }
    info!(report = %job.report_path.display(), "Processing completed");

    Ok(())
}
