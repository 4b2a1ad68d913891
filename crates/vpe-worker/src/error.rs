//! Worker error types.
//!
//! The variants map onto the notification contract: configuration
//! faults and interruptions never notify (nothing ran, or the abort
//! was asked for); stage failures notify exactly once.

use thiserror::Error;

use vpe_models::Milestone;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage {milestone} failed: {message}")]
    Stage { milestone: Milestone, message: String },

    #[error("Interrupted: {0}")]
    Interrupted(String),

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Media error: {0}")]
    Media(vpe_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vpe_storage::StorageError),

    #[error("Database error: {0}")]
    Db(#[from] vpe_db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<vpe_media::MediaError> for WorkerError {
    fn from(err: vpe_media::MediaError) -> Self {
        // Invalid trim parameters and the like are request faults, not
        // runtime stage failures.
        if err.is_configuration() {
            Self::Config(err.to_string())
        } else {
            Self::Media(err)
        }
    }
}

impl From<vpe_models::ModelError> for WorkerError {
    fn from(err: vpe_models::ModelError) -> Self {
        Self::Config(err.to_string())
    }
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn stage(milestone: Milestone, msg: impl Into<String>) -> Self {
        Self::Stage {
            milestone,
            message: msg.into(),
        }
    }

    pub fn interrupted(msg: impl Into<String>) -> Self {
        Self::Interrupted(msg.into())
    }

    /// Whether this failure owes the requester a failure notification.
    pub fn notifies(&self) -> bool {
        !matches!(
            self,
            WorkerError::Config(_) | WorkerError::Interrupted(_) | WorkerError::NotifyFailed(_)
        )
    }
}
