//! Processing request: the flat configuration bag sent by the admin
//! service, one document per source video.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::trim::{TrimStrategy, TrimType};

fn default_clip_length() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_country() -> String {
    "xa".to_string()
}

fn default_area() -> String {
    "e".to_string()
}

fn default_factor() -> String {
    "s".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// One processing request.
///
/// Unrecognized keys are ignored on parse; required keys are checked
/// by [`ProcessingRequest::from_json`] before any stage runs. The
/// organizational identifiers are opaque to the engine and only feed
/// the bucket/order nomenclature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRequest {
    #[serde(default = "default_country")]
    pub country_code: String,
    #[serde(default)]
    pub customer_id: u64,
    #[serde(default)]
    pub contract_id: u64,
    #[serde(default)]
    pub order_id: u64,
    #[serde(default)]
    pub store_id: u64,
    #[serde(default = "default_area")]
    pub area_code: String,
    #[serde(default)]
    pub camera_id: u64,
    /// Database primary key of the order row metadata is attached to.
    #[serde(default)]
    pub order_pk: i64,

    /// Source video. `None` means there is nothing to process; the
    /// pipeline logs a skip and produces no clips and no notification.
    #[serde(default)]
    pub org_file: Option<PathBuf>,

    /// Percentage of the source duration to materialize as clips.
    /// Required; a value of 100 is clamped to 99 before estimation.
    pub sampling_rate: Option<f64>,
    #[serde(default = "default_clip_length")]
    pub clip_length: u32,

    #[serde(default)]
    pub trim_type: TrimType,
    #[serde(default = "default_factor")]
    pub factor: String,
    #[serde(default = "default_true")]
    pub last_clip: bool,
    #[serde(default)]
    pub number_of_clips: u32,
    #[serde(default = "default_true")]
    pub equal_distribution: bool,
    #[serde(default)]
    pub random_start: bool,
    #[serde(default)]
    pub random_sequence: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub sample_start_time: Option<String>,
    #[serde(default)]
    pub sample_end_time: Option<String>,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default)]
    pub point_start: Option<f64>,
    #[serde(default)]
    pub point_end: Option<f64>,

    #[serde(default = "default_true")]
    pub perform_compression: bool,
    #[serde(default = "default_true")]
    pub perform_trimming: bool,
    #[serde(default = "default_true")]
    pub trim_compressed: bool,

    #[serde(default)]
    pub analyze_motion: bool,
    #[serde(default)]
    pub analyze_face: bool,
    #[serde(default)]
    pub analyze_license_plate: bool,
    #[serde(default)]
    pub count_obj: bool,
    /// Object labels to count when `count_obj` is set.
    #[serde(default)]
    pub objects: Option<Vec<String>>,
}

impl ProcessingRequest {
    /// Parse and validate a request document.
    ///
    /// Fails fast on a malformed document or a missing/invalid
    /// required key; nothing has run yet at that point, so no
    /// notification is owed.
    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let request: Self = serde_json::from_str(raw)?;
        request.validate()?;
        Ok(request)
    }

    /// Validate required keys and value ranges.
    pub fn validate(&self) -> ModelResult<()> {
        let rate = self
            .sampling_rate
            .ok_or(ModelError::MissingKey("sampling_rate"))?;
        if rate <= 0.0 || rate > 100.0 {
            return Err(ModelError::invalid_value(
                "sampling_rate",
                format!("{rate} is outside (0, 100]"),
            ));
        }
        if self.clip_length == 0 {
            return Err(ModelError::invalid_value("clip_length", "must be non-zero"));
        }
        // The selected strategy's keys are part of the request contract:
        // a run must reject them here, before any stage touches disk.
        if self.trimming_enabled() {
            self.trim_strategy()?;
        }
        Ok(())
    }

    /// Sampling rate with the 100% → 99% clamp applied.
    pub fn effective_sampling_rate(&self) -> f64 {
        match self.sampling_rate {
            Some(rate) if rate >= 100.0 => 99.0,
            Some(rate) => rate,
            None => 0.0,
        }
    }

    /// Build the trim strategy selected by this request.
    pub fn trim_strategy(&self) -> ModelResult<TrimStrategy> {
        TrimStrategy::from_request(self)
    }

    /// Whether the trimming stage should run, honoring the
    /// `trim_compressed` interlock: when compression runs, trimming
    /// happens only if the request asked to trim the compressed file.
    pub fn trimming_enabled(&self) -> bool {
        if !self.perform_trimming {
            return false;
        }
        if self.perform_compression {
            self.trim_compressed
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_parses_with_defaults() {
        let request =
            ProcessingRequest::from_json(r#"{"sampling_rate": 30, "org_file": "/tmp/a.mp4"}"#)
                .unwrap();
        assert_eq!(request.clip_length, 30);
        assert!(request.perform_compression);
        assert!(request.perform_trimming);
        assert_eq!(request.country_code, "xa");
        assert_eq!(request.trim_type, TrimType::ByFactor);
    }

    #[test]
    fn test_missing_sampling_rate_fails_fast() {
        let err = ProcessingRequest::from_json(r#"{"org_file": "/tmp/a.mp4"}"#).unwrap_err();
        assert!(matches!(err, ModelError::MissingKey("sampling_rate")));
    }

    #[test]
    fn test_unrecognized_keys_ignored() {
        let request = ProcessingRequest::from_json(
            r#"{"sampling_rate": 30, "org_file": null, "frobnicate": true}"#,
        )
        .unwrap();
        assert!(request.org_file.is_none());
    }

    #[test]
    fn test_zero_sampling_rate_rejected() {
        let err = ProcessingRequest::from_json(r#"{"sampling_rate": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidValue { key: "sampling_rate", .. }
        ));
    }

    #[test]
    fn test_strategy_keys_checked_up_front() {
        // A by_points request without its points is malformed; parsing
        // must reject it, not the trimming stage.
        let err = ProcessingRequest::from_json(
            r#"{"sampling_rate": 30, "trim_type": "by_points", "org_file": "/tmp/a.mp4"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::MissingKey("point_start")));

        // With trimming disabled the points are not required.
        ProcessingRequest::from_json(
            r#"{"sampling_rate": 30, "trim_type": "by_points",
                "perform_trimming": false, "org_file": "/tmp/a.mp4"}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_sampling_rate_clamped_at_99() {
        let request = ProcessingRequest::from_json(r#"{"sampling_rate": 100}"#).unwrap();
        assert!((request.effective_sampling_rate() - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trim_compressed_interlock() {
        let mut request = ProcessingRequest::from_json(r#"{"sampling_rate": 30}"#).unwrap();
        assert!(request.trimming_enabled());

        request.trim_compressed = false;
        assert!(!request.trimming_enabled());

        request.perform_compression = false;
        assert!(request.trimming_enabled());

        request.perform_trimming = false;
        assert!(!request.trimming_enabled());
    }
}
