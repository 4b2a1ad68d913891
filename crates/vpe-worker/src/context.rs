//! Collaborator seams and their production implementations.
//!
//! The orchestrator only sees these traits; production wires them to
//! Postgres, S3, and the webhook endpoint, tests wire in-memory
//! doubles.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use vpe_db::{CreateVideoMap, DbPool, StatusRepo, VideoMapRepo};
use vpe_media::RegionDetector;
use vpe_models::Milestone;
use vpe_storage::S3Client;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::stages::MediaStages;

/// Durable milestone checkpoints.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn record(&self, status_pk: i64, milestone: Milestone) -> WorkerResult<()>;
}

/// Published-clip metadata persistence.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    async fn record_clip(&self, entry: &CreateVideoMap) -> WorkerResult<()>;
}

/// Run-outcome notifications. A run sends at most one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(&self, order: &str, clip_count: usize) -> WorkerResult<()>;
    async fn notify_failure(&self, order: &str, reason: &str) -> WorkerResult<()>;
}

/// Clip publication into object storage.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn ensure_bucket(&self, bucket: &str) -> WorkerResult<()>;

    /// Upload `file` under `bucket`/`key`, returning its public URL.
    async fn publish(&self, bucket: &str, key: &str, file: &Path) -> WorkerResult<String>;
}

/// Everything a run needs, behind the seams.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub stages: Arc<dyn MediaStages>,
    pub status: Arc<dyn StatusSink>,
    pub metadata: Arc<dyn MetadataSink>,
    pub notifier: Arc<dyn Notifier>,
    pub publisher: Arc<dyn Publisher>,
    /// Frame inference, when a model server is configured. Addons are
    /// skipped (with a warning) without one.
    pub detector: Option<Arc<dyn RegionDetector>>,
}

/// Postgres-backed milestone checkpoints.
pub struct PgStatusSink {
    pool: DbPool,
}

impl PgStatusSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusSink for PgStatusSink {
    async fn record(&self, status_pk: i64, milestone: Milestone) -> WorkerResult<()> {
        StatusRepo::record_milestone(&self.pool, status_pk, milestone).await?;
        Ok(())
    }
}

/// Postgres-backed video map persistence.
pub struct PgMetadataSink {
    pool: DbPool,
}

impl PgMetadataSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataSink for PgMetadataSink {
    async fn record_clip(&self, entry: &CreateVideoMap) -> WorkerResult<()> {
        VideoMapRepo::create(&self.pool, entry).await?;
        Ok(())
    }
}

/// S3-backed clip publication.
pub struct S3Publisher {
    client: S3Client,
}

impl S3Publisher {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn ensure_bucket(&self, bucket: &str) -> WorkerResult<()> {
        self.client.ensure_bucket(bucket).await?;
        Ok(())
    }

    async fn publish(&self, bucket: &str, key: &str, file: &Path) -> WorkerResult<String> {
        let url = self
            .client
            .upload_file(bucket, file, key, "video/mp4")
            .await?;
        Ok(url)
    }
}
