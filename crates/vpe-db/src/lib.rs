//! Postgres persistence.
//!
//! Two tables back a run: `processing_status` receives one row per
//! milestone checkpoint, `video_maps` one row per published clip.

pub mod error;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub use error::{DbError, DbResult};
pub use models::{CreateVideoMap, StatusRecord, VideoMapRecord};
pub use repositories::{StatusRepo, VideoMapRepo};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> DbResult<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}
