//! Structured run logging.
//!
//! One logger per run, carrying the job id and order name so every
//! line is attributable without threading context by hand.

use tracing::{error, info, warn};

use vpe_models::{JobId, Milestone};

/// Run logger with consistent formatting.
#[derive(Debug, Clone)]
pub struct RunLogger {
    job_id: String,
    order: String,
}

impl RunLogger {
    pub fn new(job_id: &JobId, order: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            order: order.to_string(),
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            order = %self.order,
            "Run started: {}", message
        );
    }

    /// Log a milestone checkpoint.
    pub fn log_milestone(&self, milestone: Milestone) {
        info!(
            job_id = %self.job_id,
            order = %self.order,
            "Milestone recorded: {}", milestone
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            order = %self.order,
            "Run progress: {}", message
        );
    }

    /// Log a tolerated warning.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            order = %self.order,
            "Run warning: {}", message
        );
    }

    /// Log a run-fatal error.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            order = %self.order,
            "Run error: {}", message
        );
    }

    /// Log the completion of a run.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            order = %self.order,
            "Run completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn order(&self) -> &str {
        &self.order
    }
}
