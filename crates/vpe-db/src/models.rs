//! Row types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One milestone checkpoint row.
#[derive(Debug, Clone, FromRow)]
pub struct StatusRecord {
    pub id: i64,
    /// Run identifier the checkpoints are keyed by.
    pub status_pk: i64,
    pub milestone_id: i16,
    pub milestone_name: String,
    pub recorded_at: DateTime<Utc>,
}

/// One published clip row.
#[derive(Debug, Clone, FromRow)]
pub struct VideoMapRecord {
    pub id: i64,
    pub video_id: String,
    pub order_name: String,
    pub bucket: String,
    pub url: String,
    pub file_name: String,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a video map entry.
#[derive(Debug, Clone)]
pub struct CreateVideoMap {
    pub video_id: String,
    pub order_name: String,
    pub bucket: String,
    pub url: String,
    /// Published file name, as it appears under the order's key prefix.
    pub file_name: String,
    pub duration_secs: f64,
}
