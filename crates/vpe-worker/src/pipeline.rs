//! Run orchestration.
//!
//! Eight stages, one durable checkpoint each, and at most one outcome
//! notification per run. Stage semantics:
//!
//! 1. acquisition      copy the source into the run's work directory
//! 2. motion_analysis  extract and rejoin motion-event clips
//! 3. compression      quality-driven in-place re-encode
//! 4. trimming         split the working file into the clip set
//! 5. addons           best-effort per-clip enrichment
//! 6. upload           publish clips into the storage bucket
//! 7. persistence      one video-map row per published clip
//! 8. cleanup          drop the work directory
//!
//! A skipped stage still records its checkpoint so the durable
//! high-water mark always reaches cleanup on success.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vpe_db::CreateVideoMap;
use vpe_media::{estimated_clip_count, AddonChain, ObjectCountAddon, RedactionAddon};
use vpe_models::naming::{bucket_name, order_name, storage_bucket, video_type};
use vpe_models::{Clip, ClipSet, Job, Milestone, MotionEvent, ProcessingRequest, QualityScore};

use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;

/// What a run produced.
#[derive(Debug)]
pub enum RunOutcome {
    /// The request named no source file; nothing ran, nothing is owed.
    Skipped,
    Completed(RunSummary),
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub order: String,
    pub bucket: String,
    pub storage_bucket: String,
    pub clips: ClipSet,
    pub quality: Option<QualityScore>,
    pub events: Vec<MotionEvent>,
}

/// Drives one run end to end against the collaborator seams.
pub struct PipelineOrchestrator {
    ctx: PipelineContext,
}

impl PipelineOrchestrator {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Run a job to completion, delivering at most one notification.
    pub async fn run(&self, job: &Job) -> WorkerResult<RunOutcome> {
        let request = &job.request;
        let order = order_name(
            request.store_id,
            &request.area_code,
            request.camera_id,
            job.received_at,
        );
        let logger = RunLogger::new(&job.id, &order);
        let started = std::time::Instant::now();

        let result = self.execute(job, &order, &logger).await;
        match &result {
            Ok(RunOutcome::Skipped) => {}
            Ok(RunOutcome::Completed(summary)) => {
                logger.log_completion(&format!(
                    "{} clip(s) published; processing engine ran for {:.1}s",
                    summary.clips.len(),
                    started.elapsed().as_secs_f64()
                ));
                if let Err(e) = self
                    .ctx
                    .notifier
                    .notify_success(&order, summary.clips.len())
                    .await
                {
                    logger.log_warning(&format!("success notification not delivered: {e}"));
                }
            }
            Err(err) if err.notifies() => {
                logger.log_error(&err.to_string());
                if let Err(e) = self
                    .ctx
                    .notifier
                    .notify_failure(&order, &err.to_string())
                    .await
                {
                    logger.log_warning(&format!("failure notification not delivered: {e}"));
                }
            }
            Err(err) => {
                logger.log_error(&format!("aborting without notification: {err}"));
            }
        }
        result
    }

    /// [`run`](Self::run) under a deadline and a shutdown signal.
    ///
    /// Cancelling the run drops the in-flight stage, which releases
    /// its codec handles, and surfaces as [`WorkerError::Interrupted`]
    /// with no notification owed.
    pub async fn run_until(
        &self,
        job: &Job,
        deadline: Duration,
        shutdown: impl Future<Output = ()>,
    ) -> WorkerResult<RunOutcome> {
        tokio::select! {
            result = tokio::time::timeout(deadline, self.run(job)) => {
                result.unwrap_or(Err(WorkerError::interrupted("deadline exceeded")))
            }
            _ = shutdown => Err(WorkerError::interrupted("shutdown signal")),
        }
    }

    async fn execute(
        &self,
        job: &Job,
        order: &str,
        logger: &RunLogger,
    ) -> WorkerResult<RunOutcome> {
        let request = &job.request;
        request.validate()?;

        let Some(org_file) = &request.org_file else {
            logger.log_progress("request names no source file; nothing to process");
            return Ok(RunOutcome::Skipped);
        };

        let bucket = bucket_name(
            &request.country_code,
            request.customer_id,
            request.contract_id,
            request.order_id,
        );
        let storage = storage_bucket(&bucket).to_string();
        let vt = video_type(
            request.perform_compression,
            request.trimming_enabled(),
            request.trim_compressed,
        );
        logger.log_start(&format!("bucket {bucket}, storage {storage}, type {vt}"));

        let work_dir = PathBuf::from(&self.ctx.config.work_dir).join(order);
        tokio::fs::create_dir_all(&work_dir).await?;

        // 1. Acquisition.
        if !org_file.exists() {
            return Err(WorkerError::stage(
                Milestone::Acquisition,
                format!("source file {} is missing", org_file.display()),
            ));
        }
        let extension = org_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let stem = format!("{order}_{vt}");
        let acquired = work_dir.join(format!("{stem}.{extension}"));
        tokio::fs::copy(org_file, &acquired).await.map_err(|e| {
            WorkerError::stage(Milestone::Acquisition, format!("copy failed: {e}"))
        })?;
        self.checkpoint(job, Milestone::Acquisition, logger).await;

        let duration = self.ctx.stages.probe_duration(&acquired).await?;
        let rate = request.effective_sampling_rate();
        let estimate = estimated_clip_count(duration, rate, request.clip_length);
        logger.log_progress(&format!(
            "source is {duration:.1}s; expecting about {estimate} clip(s) at {rate:.0}% sampling"
        ));

        // 2. Motion analysis.
        let mut working = acquired.clone();
        let mut events = Vec::new();
        if request.analyze_motion {
            let pass = self
                .ctx
                .stages
                .motion_pass(&working, &work_dir, &stem)
                .await?;
            logger.log_progress(&format!("{} motion event(s)", pass.events.len()));
            working = pass.working_file;
            events = pass.events;
        }
        self.checkpoint(job, Milestone::MotionAnalysis, logger).await;

        // 3. Compression.
        let mut quality = None;
        if request.perform_compression {
            let outcome = self.ctx.stages.compress(&working, &acquired).await?;
            logger.log_progress(&format!(
                "quality {} (ssim {:.3}); re-encoded at {} bits/sec",
                outcome.score.rating, outcome.score.ssim, outcome.target_bitrate
            ));
            quality = Some(outcome.score);
        }
        self.checkpoint(job, Milestone::Compression, logger).await;

        // 4. Trimming.
        let mut clips = if request.trimming_enabled() {
            let strategy = request.trim_strategy()?;
            self.ctx
                .stages
                .trim(&working, &strategy, rate, &work_dir)
                .await?
        } else {
            let full = self.ctx.stages.probe_duration(&working).await?;
            vec![Clip::new(1, working.clone(), 0.0, full)]
        };
        logger.log_progress(&format!("{} clip(s) in the set", clips.len()));
        self.checkpoint(job, Milestone::Trimming, logger).await;

        // 5. Addons.
        if let Some(chain) = self.build_addon_chain(request, logger) {
            for clip in &mut clips {
                chain.run(clip).await;
            }
        }
        self.checkpoint(job, Milestone::Addons, logger).await;

        // 6. Upload.
        self.ctx.publisher.ensure_bucket(&storage).await?;
        for clip in &mut clips {
            let key = format!("{order}/{}", clip.file_name());
            let url = self.ctx.publisher.publish(&storage, &key, &clip.path).await?;
            clip.url = Some(url);
        }
        self.checkpoint(job, Milestone::Upload, logger).await;

        // 7. Persistence.
        for clip in &clips {
            let entry = CreateVideoMap {
                video_id: clip.id.clone(),
                order_name: order.to_string(),
                bucket: storage.clone(),
                url: clip.url.clone().unwrap_or_default(),
                file_name: clip.file_name(),
                duration_secs: clip.duration_secs(),
            };
            // Metadata is recoverable from the bucket listing; a failed
            // row warns instead of failing the run.
            if let Err(e) = self.ctx.metadata.record_clip(&entry).await {
                logger.log_warning(&format!("video map for {} not persisted: {e}", clip.id));
            }
        }
        self.checkpoint(job, Milestone::Persistence, logger).await;

        // 8. Cleanup. Leftover scratch files are tolerated.
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            logger.log_warning(&format!(
                "work directory {} not removed: {e}",
                work_dir.display()
            ));
        }
        self.checkpoint(job, Milestone::Cleanup, logger).await;

        Ok(RunOutcome::Completed(RunSummary {
            order: order.to_string(),
            bucket,
            storage_bucket: storage,
            clips,
            quality,
            events,
        }))
    }

    /// Record the milestone high-water mark. Bookkeeping must not
    /// abort a run that is otherwise healthy, so failures only warn.
    async fn checkpoint(&self, job: &Job, milestone: Milestone, logger: &RunLogger) {
        match self.ctx.status.record(job.status_pk, milestone).await {
            Ok(()) => logger.log_milestone(milestone),
            Err(e) => logger.log_warning(&format!("milestone {milestone} not recorded: {e}")),
        }
    }

    fn build_addon_chain(
        &self,
        request: &ProcessingRequest,
        logger: &RunLogger,
    ) -> Option<AddonChain> {
        let wanted =
            request.count_obj || request.analyze_face || request.analyze_license_plate;
        if !wanted {
            return None;
        }
        let Some(detector) = &self.ctx.detector else {
            logger.log_warning("addons requested but no inference service is configured");
            return None;
        };

        let mut chain = AddonChain::new();
        if request.count_obj {
            // `objects` narrows the count to the requested labels.
            let labels = request.objects.clone().unwrap_or_default();
            chain.push(Box::new(ObjectCountAddon::new(
                Arc::clone(detector),
                labels,
            )));
        }
        if request.analyze_face {
            chain.push(Box::new(RedactionAddon::faces(Arc::clone(detector))));
        }
        if request.analyze_license_plate {
            chain.push(Box::new(RedactionAddon::plates(Arc::clone(detector))));
        }
        Some(chain)
    }
}
