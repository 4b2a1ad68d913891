//! Inference service request/response types.

use serde::{Deserialize, Serialize};

/// Request for region detection over a clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Path to the clip, on storage shared with the model server.
    pub input_path: String,
    /// Model to run: "objects", "faces", or "license_plates".
    pub target: String,
    /// Minimum confidence to include a detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
}

/// One detected bounding box, pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
    /// Model class label ("person", "car", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Response from region detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<Detection>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
