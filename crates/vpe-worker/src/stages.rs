//! Media stage seam.
//!
//! The orchestrator drives milestones, persistence, and notifications;
//! the actual frame and codec work sits behind [`MediaStages`] so it
//! can be swapped out in orchestrator tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use vpe_media::{
    apply_compression, assess, concat_clips, get_duration, probe_video, FfmpegClipSinkFactory,
    FfmpegFrameSource, MediaResult, MotionConfig, MotionEventDetector, MotionOutcome, TrimEngine,
};
use vpe_models::trim::TrimStrategy;
use vpe_models::{ClipSet, CompressionPlan, Milestone, MotionEvent, QualityScore};

use crate::error::{WorkerError, WorkerResult};

/// Result of the motion stage.
#[derive(Debug)]
pub struct MotionPass {
    /// File downstream stages operate on: the rejoined event clips, or
    /// the untouched source when no motion was found.
    pub working_file: PathBuf,
    pub events: Vec<MotionEvent>,
}

/// Result of the compression stage.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub score: QualityScore,
    pub target_bitrate: u64,
}

/// The frame- and codec-level operations a run needs.
#[async_trait]
pub trait MediaStages: Send + Sync {
    async fn probe_duration(&self, file: &Path) -> WorkerResult<f64>;

    /// Extract motion-event clips and rejoin them into one working
    /// file. A source without motion passes through unchanged.
    async fn motion_pass(
        &self,
        file: &Path,
        work_dir: &Path,
        stem: &str,
    ) -> WorkerResult<MotionPass>;

    /// Assess quality against `reference` and re-encode `file` in
    /// place at the planned bitrate.
    async fn compress(&self, file: &Path, reference: &Path) -> WorkerResult<CompressionOutcome>;

    /// Split `file` into the clip set selected by `strategy`.
    async fn trim(
        &self,
        file: &Path,
        strategy: &TrimStrategy,
        sampling_rate: f64,
        out_dir: &Path,
    ) -> WorkerResult<ClipSet>;
}

/// Production stages, shelling out to ffmpeg/ffprobe.
pub struct FfmpegMediaStages {
    motion: MotionConfig,
}

impl FfmpegMediaStages {
    pub fn new(motion: MotionConfig) -> Self {
        Self { motion }
    }
}

impl Default for FfmpegMediaStages {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

#[async_trait]
impl MediaStages for FfmpegMediaStages {
    async fn probe_duration(&self, file: &Path) -> WorkerResult<f64> {
        Ok(get_duration(file).await?)
    }

    async fn motion_pass(
        &self,
        file: &Path,
        work_dir: &Path,
        stem: &str,
    ) -> WorkerResult<MotionPass> {
        let info = probe_video(file).await?;
        let config = self.motion.clone();
        let source_path = file.to_path_buf();
        let out_dir = work_dir.to_path_buf();
        let clip_stem = stem.to_string();

        // The detector reads raw frames at its own pace; keep it off
        // the async runtime.
        let outcome = tokio::task::spawn_blocking(move || -> MediaResult<MotionOutcome> {
            let mut source = FfmpegFrameSource::open(&source_path, &info)?;
            let sinks = FfmpegClipSinkFactory::new(&out_dir, &clip_stem, &info);
            MotionEventDetector::new(config).detect(&mut source, &sinks)
        })
        .await
        .map_err(|e| {
            WorkerError::stage(Milestone::MotionAnalysis, format!("motion task failed: {e}"))
        })??;

        if outcome.is_empty() {
            info!("No motion events; keeping the full source as working file");
            return Ok(MotionPass {
                working_file: file.to_path_buf(),
                events: Vec::new(),
            });
        }

        let joined = work_dir.join(format!("{stem}_motion.mp4"));
        concat_clips(&outcome.clips, &joined).await?;
        Ok(MotionPass {
            working_file: joined,
            events: outcome.events,
        })
    }

    async fn compress(&self, file: &Path, reference: &Path) -> WorkerResult<CompressionOutcome> {
        let score = assess(file, reference).await?;
        let plan = CompressionPlan::for_rating(score.rating);
        let target_bitrate = apply_compression(file, plan).await?;
        Ok(CompressionOutcome {
            score,
            target_bitrate,
        })
    }

    async fn trim(
        &self,
        file: &Path,
        strategy: &TrimStrategy,
        sampling_rate: f64,
        out_dir: &Path,
    ) -> WorkerResult<ClipSet> {
        Ok(TrimEngine::new(out_dir)
            .trim(file, strategy, sampling_rate)
            .await?)
    }
}
