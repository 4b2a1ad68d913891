//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for per-run scratch files
    pub work_dir: String,
    /// Postgres connection string
    pub database_url: String,
    /// Webhook endpoint for run notifications
    pub webhook_url: Option<String>,
    /// Whether an inference service is configured
    pub inference_enabled: bool,
    /// Deadline for one whole run; past it the run is interrupted
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/vpe".to_string(),
            database_url: "postgres://localhost/vpe".to_string(),
            webhook_url: None,
            inference_enabled: false,
            job_timeout: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            inference_enabled: std::env::var("INFERENCE_SERVICE_URL").is_ok(),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}
