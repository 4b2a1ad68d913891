//! Buffered clip writer.
//!
//! Keeps a ring of the most recent frames so an event clip opens with
//! pre-roll, and hands encoding to a background thread behind a
//! bounded channel so a slow encoder backpressures the detector
//! instead of dropping frames.

use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, FrameSink};

enum WriterMsg {
    Frame(Frame),
    Stop,
}

/// Counters returned when a clip is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    pub frames_written: u64,
}

/// Ring-buffered writer with one background encode thread per clip.
pub struct BufferedClipWriter {
    buffer: VecDeque<Frame>,
    buffer_depth: usize,
    queue_capacity: usize,
    poll_timeout: Duration,
    active: Option<ActiveClip>,
}

struct ActiveClip {
    tx: SyncSender<WriterMsg>,
    handle: JoinHandle<MediaResult<WriterStats>>,
}

impl BufferedClipWriter {
    pub fn new(buffer_depth: usize, queue_capacity: usize, poll_timeout: Duration) -> Self {
        Self {
            buffer: VecDeque::with_capacity(buffer_depth + 1),
            buffer_depth,
            queue_capacity,
            poll_timeout,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Timestamp of the oldest buffered frame, the pre-roll start.
    pub fn oldest_pts(&self) -> Option<u64> {
        self.buffer.front().map(|f| f.pts_ms)
    }

    /// Push a frame into the ring; when recording, also queue it for
    /// the encode thread.
    pub fn update(&mut self, frame: Frame) -> MediaResult<()> {
        if let Some(active) = &self.active {
            active
                .tx
                .send(WriterMsg::Frame(frame.clone()))
                .map_err(|_| MediaError::writer_failed("encode thread hung up"))?;
        }

        self.buffer.push_back(frame);
        while self.buffer.len() > self.buffer_depth {
            self.buffer.pop_front();
        }
        Ok(())
    }

    /// Begin a clip on `sink`, flushing the buffered pre-roll first.
    pub fn start(&mut self, sink: Box<dyn FrameSink>) -> MediaResult<()> {
        if self.active.is_some() {
            return Err(MediaError::writer_failed("clip already recording"));
        }

        let (tx, rx) = mpsc::sync_channel::<WriterMsg>(self.queue_capacity);
        let poll_timeout = self.poll_timeout;
        let handle = std::thread::Builder::new()
            .name("clip-writer".to_string())
            .spawn(move || -> MediaResult<WriterStats> {
                let mut sink = sink;
                let mut frames_written = 0u64;
                loop {
                    match rx.recv_timeout(poll_timeout) {
                        Ok(WriterMsg::Frame(frame)) => {
                            sink.write_frame(&frame)?;
                            frames_written += 1;
                        }
                        // Stop arrives after every queued frame, so the
                        // channel is already drained when we see it.
                        Ok(WriterMsg::Stop) => break,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                sink.finish()?;
                Ok(WriterStats { frames_written })
            })?;

        // Pre-roll before any live frame.
        let buffered = self.buffer.len();
        for frame in self.buffer.drain(..) {
            tx.send(WriterMsg::Frame(frame))
                .map_err(|_| MediaError::writer_failed("encode thread hung up"))?;
        }
        debug!("Clip opened with {buffered} pre-roll frame(s)");

        self.active = Some(ActiveClip { tx, handle });
        Ok(())
    }

    /// Close the current clip: drain the queue, finalize the sink, and
    /// join the encode thread.
    pub fn stop(&mut self) -> MediaResult<WriterStats> {
        let active = self
            .active
            .take()
            .ok_or_else(|| MediaError::writer_failed("no clip recording"))?;

        active
            .tx
            .send(WriterMsg::Stop)
            .map_err(|_| MediaError::writer_failed("encode thread hung up"))?;
        drop(active.tx);

        active
            .handle
            .join()
            .map_err(|_| MediaError::writer_failed("encode thread panicked"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::{gray_frame, RecordingSinkFactory};
    use crate::frame::ClipSinkFactory;

    fn writer() -> BufferedClipWriter {
        BufferedClipWriter::new(4, 16, Duration::from_millis(10))
    }

    #[test]
    fn test_ring_keeps_last_n_frames() {
        let mut w = writer();
        for i in 0..10u64 {
            w.update(gray_frame(i * 100, 0)).unwrap();
        }
        assert_eq!(w.oldest_pts(), Some(600));
    }

    #[test]
    fn test_preroll_flushed_before_live_frames() {
        let factory = RecordingSinkFactory::default();
        let mut w = writer();
        for i in 0..6u64 {
            w.update(gray_frame(i * 100, 0)).unwrap();
        }

        let (_, sink) = factory.open_clip(1).unwrap();
        w.start(sink).unwrap();
        w.update(gray_frame(600, 0)).unwrap();
        w.update(gray_frame(700, 0)).unwrap();
        let stats = w.stop().unwrap();

        // 4 buffered + 2 live, in order, nothing dropped.
        assert_eq!(stats.frames_written, 6);
        let clips = factory.clips.lock().unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].pts, vec![200, 300, 400, 500, 600, 700]);
        assert!(clips[0].finished);
    }

    #[test]
    fn test_stop_without_start_is_error() {
        let mut w = writer();
        assert!(matches!(w.stop(), Err(MediaError::WriterFailed(_))));
    }

    #[test]
    fn test_sequential_clips_reuse_writer() {
        let factory = RecordingSinkFactory::default();
        let mut w = writer();

        w.update(gray_frame(0, 0)).unwrap();
        let (_, sink) = factory.open_clip(1).unwrap();
        w.start(sink).unwrap();
        w.update(gray_frame(100, 0)).unwrap();
        w.stop().unwrap();

        // Ring restarts empty after a clip closes.
        assert_eq!(w.oldest_pts(), Some(100));
        let (_, sink) = factory.open_clip(2).unwrap();
        w.start(sink).unwrap();
        w.update(gray_frame(200, 0)).unwrap();
        let stats = w.stop().unwrap();
        assert_eq!(stats.frames_written, 2);

        let clips = factory.clips.lock().unwrap();
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[1].index, 2);
    }
}
