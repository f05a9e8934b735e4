//! Job orchestration.
//!
//! One job turns a single source video into a clip, thumbnail and metadata
//! document per requested platform. The source is transcribed and scored
//! once; platforms are then processed one after another. Reframing and
//! overlays degrade instead of failing; only an unreadable source, a
//! failed subclip cut, a missing thumbnail or an output write aborts the
//! job.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clipcast_media::fs_utils::move_file;
use clipcast_media::{
    probe_video, CropPlanner, FfmpegRunner, OverlayOutcome, OverlayRenderer, OverlayStatus,
    ReframeOutcome, ReframePipeline, RegionDetector, SubtitleSegmenter, ThumbnailComposer,
    ThumbnailOutcome,
};
use clipcast_ml_client::{
    generate_ad_creatives, generate_insights, segments_or_empty, transcript_or_empty,
    FrameScorer, HttpFrameScorer, HttpTextGenerator, HttpTranscriber, MlClientConfig,
    MomentFinder, TextGenerator, Transcriber,
};
use clipcast_models::{
    predict_engagement, ContentMetadata, EncodingConfig, JobContent, JobStatus, JobStatusUpdate,
    Platform, SummaryReport,
};
use metrics::{counter, histogram};
use tracing::{info, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::notifier::StatusNotifier;
use crate::output::{create_platform_dirs, file_name, PlatformOutputs, SUMMARY_REPORT_FILE};

/// External services a job depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub scorer: Arc<dyn FrameScorer>,
    pub generator: Arc<dyn TextGenerator>,
}

impl Collaborators {
    /// HTTP clients for every collaborator.
    pub fn http(config: &MlClientConfig) -> WorkerResult<Self> {
        Ok(Self {
            transcriber: Arc::new(HttpTranscriber::new(config)?),
            scorer: Arc::new(HttpFrameScorer::new(config)?),
            generator: Arc::new(HttpTextGenerator::new(config)?),
        })
    }
}

/// Everything produced for one platform.
#[derive(Debug, Clone)]
pub struct PlatformResult {
    pub outputs: PlatformOutputs,
    pub metadata: ContentMetadata,
    pub reframe: ReframeOutcome,
    pub overlays: Vec<OverlayOutcome>,
    pub thumbnail: ThumbnailOutcome,
}

impl PlatformResult {
    fn job_content(&self) -> JobContent {
        JobContent::from_metadata(
            &self.metadata,
            self.outputs.video.display().to_string(),
            self.outputs.thumbnail.display().to_string(),
            self.outputs.metadata.display().to_string(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub insights: String,
    pub moments: Vec<f64>,
    pub platforms: Vec<PlatformResult>,
    pub report: SummaryReport,
    pub report_path: PathBuf,
}

impl JobResult {
    pub fn contents(&self) -> Vec<JobContent> {
        self.platforms.iter().map(PlatformResult::job_content).collect()
    }
}

/// Runs content jobs against a fixed configuration.
pub struct JobProcessor {
    config: WorkerConfig,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn TextGenerator>,
    moments: MomentFinder<Arc<dyn FrameScorer>>,
    notifier: Arc<dyn StatusNotifier>,
    reframe: ReframePipeline,
    overlays: OverlayRenderer,
    thumbnails: ThumbnailComposer,
    segmenter: SubtitleSegmenter,
}

impl JobProcessor {
    pub fn new(
        config: WorkerConfig,
        collaborators: Collaborators,
        notifier: Arc<dyn StatusNotifier>,
    ) -> Self {
        let encoding = EncodingConfig::default();
        let runner = FfmpegRunner::new();

        let mut overlays = OverlayRenderer::new(encoding.clone(), runner.clone());
        let mut thumbnails = ThumbnailComposer::new(
            RegionDetector::default(),
            CropPlanner::new(config.wide_content),
            runner,
        );
        if let Some(font) = &config.font_file {
            overlays = overlays.with_font_file(font);
            thumbnails = thumbnails.with_font_file(font);
        }

        Self {
            reframe: ReframePipeline::with_policy(config.wide_content, encoding),
            moments: MomentFinder::new(collaborators.scorer).with_top_n(config.moments_top_n),
            transcriber: collaborators.transcriber,
            generator: collaborators.generator,
            notifier,
            overlays,
            thumbnails,
            segmenter: SubtitleSegmenter::default(),
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process `video` for `platforms`, reporting status as the job advances.
    ///
    /// Ends with `COMPLETED 100` carrying one content entry per platform,
    /// or `FAILED 0` when any step is fatal.
    pub async fn run_job(
        &self,
        video: &Path,
        platforms: &[Platform],
        job_id: &str,
    ) -> WorkerResult<JobResult> {
        let started = Instant::now();
        let logger = JobLogger::new(job_id, "content_pipeline");
        logger.log_start(&format!("{} for {} platform(s)", video.display(), platforms.len()));

        let result = self
            .process(video, platforms, &logger)
            .instrument(logger.create_span())
            .await;

        match &result {
            Ok(job) => {
                self.notify(
                    JobStatusUpdate::new(job_id, JobStatus::Completed, 100)
                        .with_contents(job.contents()),
                )
                .await;
                counter!("clipcast_jobs_total", "status" => "completed").increment(1);
                logger.log_completion(&format!(
                    "{} platform(s) in {:.1}s",
                    job.platforms.len(),
                    started.elapsed().as_secs_f64()
                ));
            }
            Err(e) => {
                self.notify(JobStatusUpdate::new(job_id, JobStatus::Failed, 0)).await;
                counter!("clipcast_jobs_total", "status" => "failed").increment(1);
                logger.log_error(&e.to_string());
            }
        }
        histogram!("clipcast_job_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn process(
        &self,
        video: &Path,
        platforms: &[Platform],
        logger: &JobLogger,
    ) -> WorkerResult<JobResult> {
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(WorkerError::InputNotFound(video.to_path_buf()));
        }
        if platforms.is_empty() {
            return Err(WorkerError::processing_failed("no platforms requested"));
        }
        let job_id = logger.job_id();

        self.notify(JobStatusUpdate::new(job_id, JobStatus::Processing, 10)).await;
        create_platform_dirs(&self.config.output_dir, platforms).await?;
        self.notify(JobStatusUpdate::new(job_id, JobStatus::Processing, 20)).await;

        let transcript = transcript_or_empty(&*self.transcriber, video).await;
        if transcript.is_empty() {
            logger.log_warning("empty transcript, creatives will use placeholders");
        }
        logger.log_progress(&format!("transcript has {} characters", transcript.text.len()));

        let moments = self.moments.find_or_empty(video).await;
        let timestamp = moments.first().copied().unwrap_or(0.0);
        logger.log_progress(&format!("{} moment(s), using {:.2}s", moments.len(), timestamp));

        let insights = generate_insights(&*self.generator, &transcript.text).await;
        info!(job_id = %job_id, "Insights:\n{}", insights);

        let source = probe_video(video).await?;

        let mut report = SummaryReport::new(file_name(video), platforms, Some(job_id.to_string()));
        let mut results = Vec::with_capacity(platforms.len());
        for &platform in platforms {
            let platform_logger = logger.for_operation(platform.as_str());
            let result = self
                .process_platform(
                    video,
                    source.duration,
                    timestamp,
                    &transcript.text,
                    platform,
                    &platform_logger,
                )
                .await?;
            report.record(&result.metadata);
            results.push(result);
        }

        let report_path = self.config.output_dir.join(SUMMARY_REPORT_FILE);
        tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?).await?;
        info!(job_id = %job_id, path = %report_path.display(), "Summary report written");

        self.notify(JobStatusUpdate::new(job_id, JobStatus::Processing, 90)).await;

        Ok(JobResult {
            job_id: job_id.to_string(),
            insights,
            moments,
            platforms: results,
            report,
            report_path,
        })
    }

    async fn process_platform(
        &self,
        video: &Path,
        source_duration: f64,
        timestamp: f64,
        transcript: &str,
        platform: Platform,
        logger: &JobLogger,
    ) -> WorkerResult<PlatformResult> {
        logger.log_start(&format!("creating {} content", platform.format_label()));
        let settings = platform.settings();
        let outputs = PlatformOutputs::new(&self.config.output_dir, platform, Local::now());

        let creatives = generate_ad_creatives(&*self.generator, transcript, platform).await;
        let overlay_spec = creatives.overlay_spec();

        // Render and overlay in scratch space so the platform directory only
        // ever sees finished clips.
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("clipcast-job-")
            .tempdir_in(&self.config.work_dir)?;
        let staged = scratch.path().join(format!("{}.mp4", platform.as_str()));

        let window = platform.clip_window(timestamp, source_duration);
        let reframe = self.reframe.run(video, window, &settings, &staged).await?;
        if reframe.is_degraded() {
            logger.log_warning(&format!("reframed with {} tier", reframe.final_state));
        }

        let mut overlays = vec![self.overlays.apply_text_overlay(&staged, &overlay_spec).await];
        if settings.auto_subtitles && self.config.auto_subtitles {
            overlays.push(self.burn_auto_subtitles(&staged).await);
        }
        for outcome in overlays.iter().filter(|o| o.status == OverlayStatus::Failed) {
            logger.log_warning(&format!("overlay failed: {}", outcome.diagnostics.join("; ")));
        }

        move_file(&staged, &outputs.video).await?;

        let thumbnail = self
            .thumbnails
            .compose(video, timestamp, &overlay_spec, &outputs.thumbnail)
            .await?;

        let metadata = ContentMetadata {
            platform,
            timestamp,
            duration: settings.duration,
            aspect_ratio: settings.aspect_ratio,
            video_file: outputs.video_file(),
            thumbnail_file: outputs.thumbnail_file(),
            engagement_prediction: predict_engagement(platform, settings.duration, &creatives),
            creatives,
            job_id: Some(logger.job_id().to_string()),
        };
        tokio::fs::write(&outputs.metadata, metadata.to_json_pretty()?).await?;

        counter!("clipcast_platform_outputs_total", "platform" => platform.as_str()).increment(1);
        logger.log_completion(&format!(
            "{} (engagement {} {})",
            outputs.video.display(),
            metadata.engagement_prediction.predicted_engagement,
            metadata.engagement_prediction.engagement_level
        ));

        Ok(PlatformResult {
            outputs,
            metadata,
            reframe,
            overlays,
            thumbnail,
        })
    }

    /// Transcribe the finished clip and burn its captions.
    async fn burn_auto_subtitles(&self, clip: &Path) -> OverlayOutcome {
        let segments = segments_or_empty(&*self.transcriber, clip).await;
        let chunks = self.segmenter.segment(&segments);
        self.overlays.burn_subtitles(clip, &chunks).await
    }

    async fn notify(&self, update: JobStatusUpdate) {
        self.notifier.notify(&update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipcast_ml_client::{MlResult, Transcript};
    use clipcast_models::TranscriptSegment;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeTranscriber;

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe_with(&self, _media: &Path, timestamps: bool) -> MlResult<Transcript> {
            let text = "This is an amazing demo. Watch closely!".to_string();
            let segments = if timestamps {
                vec![TranscriptSegment::new(0.0, 1.5, text.clone())]
            } else {
                Vec::new()
            };
            Ok(Transcript { text, segments })
        }
    }

    struct FakeScorer;

    #[async_trait]
    impl FrameScorer for FakeScorer {
        async fn score(&self, image_png: &[u8], _prompt: &str) -> MlResult<f64> {
            Ok(image_png.len() as f64)
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, _prompt: &str) -> MlResult<String> {
            Ok(r#"{"headline": "Amazing Demo", "description": "Watch it", "call_to_action": "Watch Now", "video_snippets": []}"#.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        updates: Mutex<Vec<JobStatusUpdate>>,
    }

    impl RecordingNotifier {
        fn sequence(&self) -> Vec<(JobStatus, u8)> {
            self.updates
                .lock()
                .unwrap()
                .iter()
                .map(|u| (u.status, u.progress))
                .collect()
        }
    }

    #[async_trait]
    impl StatusNotifier for RecordingNotifier {
        async fn notify(&self, update: &JobStatusUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }
    }

    fn processor(root: &Path) -> (JobProcessor, Arc<RecordingNotifier>) {
        let config = WorkerConfig {
            output_dir: root.join("outputs"),
            work_dir: root.join("work"),
            job_status_url: None,
            ..WorkerConfig::default()
        };
        let collaborators = Collaborators {
            transcriber: Arc::new(FakeTranscriber),
            scorer: Arc::new(FakeScorer),
            generator: Arc::new(FakeGenerator),
        };
        let notifier = Arc::new(RecordingNotifier::default());
        (JobProcessor::new(config, collaborators, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn test_missing_input_fails_immediately() {
        let root = TempDir::new().unwrap();
        let (processor, notifier) = processor(root.path());

        let result = processor
            .run_job(&root.path().join("missing.mp4"), &Platform::ALL, "job-1")
            .await;

        assert!(matches!(result, Err(WorkerError::InputNotFound(_))));
        assert_eq!(notifier.sequence(), vec![(JobStatus::Failed, 0)]);
        assert!(!root.path().join("outputs").exists());
    }

    #[tokio::test]
    async fn test_no_platforms_fails() {
        let root = TempDir::new().unwrap();
        let video = root.path().join("input.mp4");
        std::fs::write(&video, b"bytes").unwrap();
        let (processor, notifier) = processor(root.path());

        let result = processor.run_job(&video, &[], "job-2").await;

        assert!(matches!(result, Err(WorkerError::ProcessingFailed(_))));
        assert_eq!(notifier.sequence(), vec![(JobStatus::Failed, 0)]);
    }

    #[tokio::test]
    async fn test_undecodable_source_fails_after_setup() {
        let root = TempDir::new().unwrap();
        let video = root.path().join("input.mp4");
        std::fs::write(&video, b"definitely not a video").unwrap();
        let (processor, notifier) = processor(root.path());

        let result = processor
            .run_job(&video, &[Platform::DisplayAds], "job-3")
            .await;

        assert!(result.is_err());
        assert_eq!(
            notifier.sequence(),
            vec![
                (JobStatus::Processing, 10),
                (JobStatus::Processing, 20),
                (JobStatus::Failed, 0),
            ]
        );
        assert!(root.path().join("outputs/display_ads").is_dir());
        assert!(!root.path().join("outputs").join(SUMMARY_REPORT_FILE).exists());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_full_job_on_generated_source() {
        let root = TempDir::new().unwrap();
        let video = root.path().join("source.mp4");
        let status = tokio::process::Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=640x360:rate=30:duration=4",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=440:duration=4",
                "-shortest",
            ])
            .arg(&video)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let (processor, notifier) = processor(root.path());
        let platforms = [Platform::YoutubeShorts, Platform::DisplayAds];
        let job = processor.run_job(&video, &platforms, "job-4").await.unwrap();

        assert_eq!(
            notifier.sequence(),
            vec![
                (JobStatus::Processing, 10),
                (JobStatus::Processing, 20),
                (JobStatus::Processing, 90),
                (JobStatus::Completed, 100),
            ]
        );

        let last = notifier.updates.lock().unwrap().last().cloned().unwrap();
        let contents = last.contents.unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].platform, "YOUTUBE_SHORTS");
        assert_eq!(contents[1].duration, 6.0);

        for result in &job.platforms {
            assert!(result.outputs.video.is_file());
            assert!(result.outputs.thumbnail.is_file());
            let json = std::fs::read_to_string(&result.outputs.metadata).unwrap();
            assert_eq!(ContentMetadata::from_json(&json).unwrap(), result.metadata);
            assert_eq!(result.metadata.creatives.headline.as_deref(), Some("Amazing Demo"));
        }

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&job.report_path).unwrap()).unwrap();
        assert_eq!(report["input_video"], "source.mp4");
        assert!(report["created_content"]["display_ads"]["video_file"].is_string());

        // Scratch space is cleaned up per platform.
        let leftovers = std::fs::read_dir(root.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
