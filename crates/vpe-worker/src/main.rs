//! Video processing worker binary.
//!
//! Takes a request document on the command line, wires the production
//! collaborators from the environment, and drives one run.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpe_inference::InferenceClient;
use vpe_media::{check_ffmpeg, check_ffprobe, RegionDetector};
use vpe_models::{Job, ProcessingRequest};
use vpe_storage::S3Client;
use vpe_worker::{
    FfmpegMediaStages, NullNotifier, Notifier, PgMetadataSink, PgStatusSink, PipelineContext,
    PipelineOrchestrator, RunOutcome, S3Publisher, WebhookNotifier, WorkerConfig, WorkerError,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vpe=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

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

    info!("Starting vpe-worker");

    let Some(request_path) = std::env::args().nth(1) else {
        error!("Usage: vpe-worker <request.json>");
        std::process::exit(2);
    };

    let raw = match std::fs::read_to_string(&request_path) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read request document {request_path}: {e}");
            std::process::exit(2);
        }
    };

    // Fail fast on a malformed request; nothing has run yet, so no
    // notification is owed.
    let request = match ProcessingRequest::from_json(&raw) {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid request document: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = check_ffmpeg().and_then(|_| check_ffprobe()) {
        error!("Codec tooling unavailable: {e}");
        std::process::exit(1);
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);
    let job_timeout = config.job_timeout;

    let ctx = match build_context(config, &request).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to wire collaborators: {e}");
            std::process::exit(1);
        }
    };

    let status_pk = request.order_pk;
    let job = Job::new(status_pk, request);
    let orchestrator = PipelineOrchestrator::new(ctx);

    // Cancelling the run drops the in-flight stage and its codec
    // handles before the process goes away.
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal; aborting run");
    };

    match orchestrator.run_until(&job, job_timeout, shutdown).await {
        Ok(RunOutcome::Completed(summary)) => {
            info!(
                "Run {} complete: {} clip(s) in bucket {}",
                summary.order,
                summary.clips.len(),
                summary.storage_bucket
            );
        }
        Ok(RunOutcome::Skipped) => {
            info!("Run skipped: nothing to process");
        }
        Err(WorkerError::Interrupted(_)) => {
            info!("Run interrupted; no notification sent");
            std::process::exit(130);
        }
        Err(e) => {
            error!("Run failed: {e}");
            std::process::exit(1);
        }
    }

    info!("Worker shutdown complete");
}

async fn build_context(
    config: WorkerConfig,
    request: &ProcessingRequest,
) -> anyhow::Result<PipelineContext> {
    let pool = vpe_db::create_pool(&config.database_url).await?;

    let s3 = S3Client::from_env().await?;
    s3.check_connectivity().await?;

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => Arc::new(NullNotifier),
    };

    let wants_inference =
        request.count_obj || request.analyze_face || request.analyze_license_plate;
    let detector: Option<Arc<dyn RegionDetector>> = if config.inference_enabled && wants_inference
    {
        let client = InferenceClient::from_env()?;
        if !client.health_check().await.unwrap_or(false) {
            info!("Inference service is not healthy; addons will be skipped");
        }
        Some(Arc::new(client))
    } else {
        None
    };

    Ok(PipelineContext {
        config,
        stages: Arc::new(FfmpegMediaStages::default()),
        status: Arc::new(PgStatusSink::new(pool.clone())),
        metadata: Arc::new(PgMetadataSink::new(pool)),
        notifier,
        publisher: Arc::new(S3Publisher::new(s3)),
        detector,
    })
}
