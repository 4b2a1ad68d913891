//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid timestamp {value:?} for format {format:?}")]
    InvalidTimestamp { value: String, format: String },

    #[error("Invalid trim configuration: {0}")]
    InvalidTrim(String),

    #[error("Quality metric produced no frame data for {0}")]
    EmptyMetricSeries(PathBuf),

    #[error("Clip writer failed: {0}")]
    WriterFailed(String),

    #[error("Frame inference failed: {0}")]
    DetectionFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn invalid_trim(message: impl Into<String>) -> Self {
        Self::InvalidTrim(message.into())
    }

    pub fn writer_failed(message: impl Into<String>) -> Self {
        Self::WriterFailed(message.into())
    }

    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Whether this error is a configuration fault the caller should
    /// reject before running any stage, as opposed to a runtime
    /// failure of a collaborator.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidTrim(_) | MediaError::InvalidTimestamp { .. }
        )
    }
}
