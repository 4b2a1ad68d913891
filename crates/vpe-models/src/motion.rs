//! Motion event model.

use serde::{Deserialize, Serialize};

/// A contiguous span of motion-classified frames. One event maps to
/// exactly one output clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// 1-based event number within the pass.
    pub index: u32,
    /// Presentation timestamp of the first frame in the clip
    /// (including pre-roll), milliseconds.
    pub start_ms: i64,
    /// Presentation timestamp of the last written frame, milliseconds.
    pub end_ms: i64,
    /// Frames written to the clip, pre-roll included.
    pub frames: u64,
}

impl MotionEvent {
    pub fn duration_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }
}
