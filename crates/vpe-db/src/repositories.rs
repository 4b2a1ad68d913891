//! Repositories for the `processing_status` and `video_maps` tables.

use sqlx::PgPool;
use tracing::debug;

use vpe_models::Milestone;

use crate::error::DbResult;
use crate::models::{CreateVideoMap, StatusRecord, VideoMapRecord};

const STATUS_COLUMNS: &str = "id, status_pk, milestone_id, milestone_name, recorded_at";

const VIDEO_MAP_COLUMNS: &str =
    "id, video_id, order_name, bucket, url, file_name, duration_secs, created_at";

/// Milestone checkpoint writes.
pub struct StatusRepo;

impl StatusRepo {
    /// Record one milestone checkpoint for a run.
    pub async fn record_milestone(
        pool: &PgPool,
        status_pk: i64,
        milestone: Milestone,
    ) -> DbResult<StatusRecord> {
        debug!("Recording milestone {milestone} for {status_pk}");
        let query = format!(
            "INSERT INTO processing_status (status_pk, milestone_id, milestone_name, recorded_at)
             VALUES ($1, $2, $3, NOW())
             RETURNING {STATUS_COLUMNS}"
        );
        let record = sqlx::query_as::<_, StatusRecord>(&query)
            .bind(status_pk)
            .bind(milestone.id())
            .bind(milestone.name())
            .fetch_one(pool)
            .await?;
        Ok(record)
    }

}

/// Published clip metadata writes.
pub struct VideoMapRepo;

impl VideoMapRepo {
    /// Insert one published clip's map entry.
    pub async fn create(pool: &PgPool, input: &CreateVideoMap) -> DbResult<VideoMapRecord> {
        let query = format!(
            "INSERT INTO video_maps
                 (video_id, order_name, bucket, url, file_name, duration_secs, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING {VIDEO_MAP_COLUMNS}"
        );
        let record = sqlx::query_as::<_, VideoMapRecord>(&query)
            .bind(&input.video_id)
            .bind(&input.order_name)
            .bind(&input.bucket)
            .bind(&input.url)
            .bind(&input.file_name)
            .bind(input.duration_secs)
            .fetch_one(pool)
            .await?;
        Ok(record)
    }

}
