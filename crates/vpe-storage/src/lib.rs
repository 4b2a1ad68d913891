//! S3 object storage client.
//!
//! Each processing run publishes its clip set into a per-run bucket;
//! this crate wraps the bucket lifecycle and uploads.

pub mod client;
pub mod error;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
