//! Shared data models for the video processing engine.
//!
//! This crate provides Serde-serializable types for:
//! - Processing requests (the flat configuration bag) and jobs
//! - Clips, motion events, and addon outcomes
//! - Quality scores, rating buckets, and compression plans
//! - Trim strategy variants
//! - Milestone checkpoint ids
//! - Bucket/order nomenclature helpers

pub mod clip;
pub mod error;
pub mod job;
pub mod motion;
pub mod naming;
pub mod quality;
pub mod request;
pub mod trim;

// Re-export common types
pub use clip::{AddonKind, AddonOutcome, Clip, ClipSet};
pub use error::{ModelError, ModelResult};
pub use job::{Job, JobId, Milestone};
pub use motion::MotionEvent;
pub use quality::{CompressionPlan, QualityRating, QualityScore};
pub use request::ProcessingRequest;
pub use trim::TrimStrategy;
