//! Processing pipeline worker.
//!
//! Turns one [`vpe_models::ProcessingRequest`] into a published clip
//! set: eight checkpointed stages behind collaborator seams, with at
//! most one outcome notification per run.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod stages;

pub use config::WorkerConfig;
pub use context::{
    MetadataSink, Notifier, PgMetadataSink, PgStatusSink, PipelineContext, Publisher, S3Publisher,
    StatusSink,
};
pub use error::{WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use notify::{NullNotifier, WebhookNotifier};
pub use pipeline::{PipelineOrchestrator, RunOutcome, RunSummary};
pub use stages::{CompressionOutcome, FfmpegMediaStages, MediaStages, MotionPass};
