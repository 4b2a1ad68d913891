//! Motion-triggered clip extraction.
//!
//! Frames are compared against a fixed reference (the first decoded
//! frame). A changed region at or above the configured area opens an
//! event; a run of quiet frames closes it. Each event becomes one clip
//! with ring-buffered pre-roll, written off-thread.

pub mod blobs;
pub mod writer;

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use vpe_models::MotionEvent;

use crate::error::MediaResult;
use crate::frame::{ClipSinkFactory, FrameSource};
use self::writer::BufferedClipWriter;

/// Tuning for the detection pass.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Minimum blob area, in pixels, that counts as motion.
    pub precision: u64,
    /// Per-pixel difference threshold for the binary mask.
    pub diff_threshold: u8,
    /// Quiet frames required to close an open event.
    pub close_after: u32,
    /// Pre-roll ring depth, frames.
    pub buffer_depth: usize,
    /// Bounded queue between detector and encode thread.
    pub queue_capacity: usize,
    /// Encode-thread poll interval while idle.
    pub poll_timeout: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            precision: 1500,
            diff_threshold: 25,
            close_after: 32,
            buffer_depth: 32,
            queue_capacity: 128,
            poll_timeout: Duration::from_millis(250),
        }
    }
}

/// Result of one detection pass.
#[derive(Debug, Default)]
pub struct MotionOutcome {
    /// Clip files, one per event, in event order.
    pub clips: Vec<PathBuf>,
    pub events: Vec<MotionEvent>,
}

impl MotionOutcome {
    /// No motion anywhere in the source. The caller treats the whole
    /// source as a single clip instead of producing nothing.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Single-pass motion event detector.
pub struct MotionEventDetector {
    config: MotionConfig,
}

struct OpenEvent {
    index: u32,
    start_ms: i64,
    last_pts: i64,
}

impl MotionEventDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    /// Run detection over `source`, opening one sink per event.
    ///
    /// Blocking; run it on a blocking-capable thread. The first frame
    /// seeds the reference and is never written to any clip.
    pub fn detect(
        &self,
        source: &mut dyn FrameSource,
        sinks: &dyn ClipSinkFactory,
    ) -> MediaResult<MotionOutcome> {
        let cfg = &self.config;
        let mut clip_writer = BufferedClipWriter::new(
            cfg.buffer_depth,
            cfg.queue_capacity,
            cfg.poll_timeout,
        );

        let mut reference = None;
        let mut quiet_streak = 0u32;
        let mut next_index = 1u32;
        let mut open: Option<OpenEvent> = None;
        let mut outcome = MotionOutcome::default();

        while let Some(frame) = source.next_frame()? {
            let Some(reference) = &reference else {
                reference = Some(blobs::prepare(&frame));
                continue;
            };

            let current = blobs::prepare(&frame);
            let area = blobs::motion_area(reference, &current, cfg.diff_threshold);

            if area >= cfg.precision {
                quiet_streak = 0;
                if !clip_writer.is_recording() {
                    let (path, sink) = sinks.open_clip(next_index)?;
                    let start_ms =
                        clip_writer.oldest_pts().unwrap_or(frame.pts_ms) as i64;
                    debug!(
                        "Motion event {next_index} opens at {start_ms}ms (blob {area}px)"
                    );
                    clip_writer.start(sink)?;
                    outcome.clips.push(path);
                    open = Some(OpenEvent {
                        index: next_index,
                        start_ms,
                        last_pts: frame.pts_ms as i64,
                    });
                    next_index += 1;
                }
            } else {
                quiet_streak = quiet_streak.saturating_add(1);
            }

            let pts = frame.pts_ms as i64;
            clip_writer.update(frame)?;
            if let Some(event) = &mut open {
                event.last_pts = pts;
            }

            if clip_writer.is_recording() && quiet_streak >= cfg.close_after {
                let stats = clip_writer.stop()?;
                let event = open.take().ok_or_else(|| {
                    crate::error::MediaError::writer_failed("recording without open event")
                })?;
                info!(
                    "Motion event {} closed: {}ms-{}ms, {} frame(s)",
                    event.index, event.start_ms, event.last_pts, stats.frames_written
                );
                outcome.events.push(MotionEvent {
                    index: event.index,
                    start_ms: event.start_ms,
                    end_ms: event.last_pts,
                    frames: stats.frames_written,
                });
            }
        }

        // Source ended mid-event: flush and close.
        if clip_writer.is_recording() {
            let stats = clip_writer.stop()?;
            if let Some(event) = open.take() {
                info!(
                    "Motion event {} closed at end of stream: {} frame(s)",
                    event.index, stats.frames_written
                );
                outcome.events.push(MotionEvent {
                    index: event.index,
                    start_ms: event.start_ms,
                    end_ms: event.last_pts,
                    frames: stats.frames_written,
                });
            }
        }

        info!("Motion pass finished: {} event(s)", outcome.events.len());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::{frame_with_blob, RecordingSinkFactory, VecFrameSource};
    use crate::frame::{Frame, FrameSource};

    fn quiet(pts: u64) -> Frame {
        frame_with_blob(pts, 0)
    }

    fn moving(pts: u64) -> Frame {
        frame_with_blob(pts, 32)
    }

    fn detector(close_after: u32) -> MotionEventDetector {
        MotionEventDetector::new(MotionConfig {
            precision: 300,
            close_after,
            buffer_depth: 4,
            ..MotionConfig::default()
        })
    }

    fn run(
        frames: Vec<Frame>,
        close_after: u32,
    ) -> (MotionOutcome, RecordingSinkFactory) {
        let factory = RecordingSinkFactory::default();
        let mut source = VecFrameSource::new(frames);
        let outcome = detector(close_after)
            .detect(&mut source as &mut dyn FrameSource, &factory)
            .unwrap();
        (outcome, factory)
    }

    #[test]
    fn test_quiet_source_yields_no_events() {
        let frames = (0..20).map(|i| quiet(i * 33)).collect();
        let (outcome, factory) = run(frames, 3);
        assert!(outcome.is_empty());
        assert!(factory.clips.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_event_with_preroll() {
        let mut frames: Vec<Frame> = (0..6).map(|i| quiet(i * 33)).collect();
        frames.extend((6..10).map(|i| moving(i * 33)));
        frames.extend((10..20).map(|i| quiet(i * 33)));
        let (outcome, factory) = run(frames, 3);

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.index, 1);
        // Pre-roll reaches back 4 frames (ring depth) before trigger.
        assert_eq!(event.start_ms, 2 * 33);
        // 4 buffered + live frames until the 3rd quiet frame.
        let clips = factory.clips.lock().unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].pts.first(), Some(&(2 * 33)));
        assert_eq!(clips[0].pts.len() as u64, event.frames);
    }

    #[test]
    fn test_event_open_at_end_of_stream_is_flushed() {
        let mut frames: Vec<Frame> = (0..3).map(|i| quiet(i * 33)).collect();
        frames.extend((3..8).map(|i| moving(i * 33)));
        let (outcome, factory) = run(frames, 32);

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].end_ms, 7 * 33);
        assert!(factory.clips.lock().unwrap()[0].finished);
    }

    #[test]
    fn test_two_separated_bursts_make_two_clips() {
        let mut frames: Vec<Frame> = (0..2).map(|i| quiet(i * 33)).collect();
        frames.extend((2..5).map(|i| moving(i * 33)));
        frames.extend((5..12).map(|i| quiet(i * 33)));
        frames.extend((12..15).map(|i| moving(i * 33)));
        frames.extend((15..22).map(|i| quiet(i * 33)));
        let (outcome, _factory) = run(frames, 3);

        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.events[0].index, 1);
        assert_eq!(outcome.events[1].index, 2);
        assert!(outcome.events[1].start_ms > outcome.events[0].end_ms);
        assert_eq!(outcome.clips.len(), 2);
    }

    #[test]
    fn test_first_frame_is_reference_only() {
        // Motion from the very first comparable frame: the reference
        // frame itself must not appear in the clip.
        let frames: Vec<Frame> = vec![quiet(0), moving(33), moving(66)];
        let (outcome, factory) = run(frames, 32);
        assert_eq!(outcome.events.len(), 1);
        let clips = factory.clips.lock().unwrap();
        assert_eq!(clips[0].pts, vec![33, 66]);
    }
}
