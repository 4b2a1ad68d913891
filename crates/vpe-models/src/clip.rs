//! Clip and addon-outcome models.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The ordered clip set a run produces.
pub type ClipSet = Vec<Clip>;

/// Addon identifiers, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonKind {
    ObjectCount,
    FaceRedaction,
    PlateRedaction,
}

impl AddonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddonKind::ObjectCount => "object_count",
            AddonKind::FaceRedaction => "face_redaction",
            AddonKind::PlateRedaction => "plate_redaction",
        }
    }
}

/// Result of one addon over one clip. A failed addon leaves the clip
/// unmodified and records `applied: false`; it never fails the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonOutcome {
    pub addon: AddonKind,
    pub applied: bool,
    /// Human-readable detail (detection count, or the tolerated error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AddonOutcome {
    pub fn applied(addon: AddonKind, detail: impl Into<String>) -> Self {
        Self {
            addon,
            applied: true,
            detail: Some(detail.into()),
        }
    }

    pub fn skipped(addon: AddonKind, reason: impl Into<String>) -> Self {
        Self {
            addon,
            applied: false,
            detail: Some(reason.into()),
        }
    }
}

/// A derived video segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// 1-based position within the clip set.
    pub index: u32,
    /// Identifier used as the metadata `video_id` (the file stem).
    pub id: String,
    pub path: PathBuf,
    /// Source offset range, seconds.
    pub start_secs: f64,
    pub end_secs: f64,
    /// Ordered addon-result chain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addon_outcomes: Vec<AddonOutcome>,
    /// Public URL after a successful publish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Clip {
    pub fn new(index: u32, path: PathBuf, start_secs: f64, end_secs: f64) -> Self {
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("clip_{index}"));
        Self {
            index,
            id,
            path,
            start_secs,
            end_secs,
            addon_outcomes: Vec::new(),
            url: None,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_secs - self.start_secs).max(0.0)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_id_from_stem() {
        let clip = Clip::new(1, PathBuf::from("/work/xa0001_order_1.mp4"), 0.0, 30.0);
        assert_eq!(clip.id, "xa0001_order_1");
        assert_eq!(clip.file_name(), "xa0001_order_1.mp4");
        assert!((clip.duration_secs() - 30.0).abs() < f64::EPSILON);
    }
}
