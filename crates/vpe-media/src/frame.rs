//! Raw frame plumbing between ffmpeg and the motion detector.
//!
//! Frames travel as gray8 rawvideo over pipes. The traits keep the
//! detector independent of the codec so tests can feed synthetic
//! frames without an ffmpeg binary present.

use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// One decoded grayscale frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Presentation timestamp, milliseconds from stream start.
    pub pts_ms: u64,
    /// Row-major gray8 pixels, `width * height` bytes.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pts_ms: u64, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            pts_ms,
            data,
        }
    }
}

/// Sequential frame producer.
pub trait FrameSource: Send {
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<Frame>>;
}

/// Sequential frame consumer backing one clip file.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> MediaResult<()>;

    /// Flush buffered frames and finalize the container.
    fn finish(self: Box<Self>) -> MediaResult<()>;
}

/// Opens a fresh sink (and its backing file) per motion event.
pub trait ClipSinkFactory: Send + Sync {
    fn open_clip(&self, index: u32) -> MediaResult<(PathBuf, Box<dyn FrameSink>)>;
}

/// Decodes a video file to gray8 frames via an ffmpeg pipe.
///
/// Blocking by design: the motion loop runs on a dedicated thread and
/// reads frames at its own pace, letting the pipe apply backpressure
/// to the decoder.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    frame_len: usize,
    width: u32,
    height: u32,
    ms_per_frame: f64,
    frame_index: u64,
}

impl FfmpegFrameSource {
    pub fn open(path: impl AsRef<Path>, info: &VideoInfo) -> MediaResult<Self> {
        let path = path.as_ref();
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        if info.width == 0 || info.height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "{} has no usable video dimensions",
                path.display()
            )));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("decoder stdout unavailable", None, None))?;

        let fps = if info.fps > 0.0 { info.fps } else { 30.0 };
        Ok(Self {
            child,
            stdout,
            frame_len: (info.width * info.height) as usize,
            width: info.width,
            height: info.height,
            ms_per_frame: 1000.0 / fps,
            frame_index: 0,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        let mut data = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < self.frame_len {
            let n = self.stdout.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            let status = self.child.wait()?;
            if !status.success() {
                return Err(MediaError::ffmpeg_failed(
                    "decoder exited with non-zero status",
                    None,
                    status.code(),
                ));
            }
            return Ok(None);
        }
        if filled < self.frame_len {
            return Err(MediaError::InvalidVideo(format!(
                "truncated frame: {filled} of {} bytes",
                self.frame_len
            )));
        }

        let pts_ms = (self.frame_index as f64 * self.ms_per_frame) as u64;
        self.frame_index += 1;
        Ok(Some(Frame::new(self.width, self.height, pts_ms, data)))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        // The reader may stop mid-stream; reap the decoder either way.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Encodes gray8 frames into a clip file via an ffmpeg pipe.
pub struct FfmpegClipSink {
    child: Child,
    stdin: Option<ChildStdin>,
    path: PathBuf,
}

impl FfmpegClipSink {
    pub fn create(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        fps: f64,
    ) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut child = Command::new("ffmpeg")
            .args([
                "-nostdin",
                "-y",
                "-v",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "gray",
                "-s",
                &format!("{width}x{height}"),
                "-r",
                &format!("{fps:.3}"),
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("encoder stdin unavailable", None, None))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            path,
        })
    }
}

impl FrameSink for FfmpegClipSink {
    fn write_frame(&mut self, frame: &Frame) -> MediaResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::writer_failed("sink already finished"))?;
        stdin.write_all(&frame.data)?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> MediaResult<()> {
        // Closing stdin signals end of stream to the encoder.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("encoder failed for {}", self.path.display()),
                None,
                status.code(),
            ))
        }
    }
}

/// Factory producing [`FfmpegClipSink`]s in one directory.
pub struct FfmpegClipSinkFactory {
    out_dir: PathBuf,
    stem: String,
    width: u32,
    height: u32,
    fps: f64,
}

impl FfmpegClipSinkFactory {
    pub fn new(out_dir: impl AsRef<Path>, stem: impl Into<String>, info: &VideoInfo) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            stem: stem.into(),
            width: info.width,
            height: info.height,
            fps: if info.fps > 0.0 { info.fps } else { 30.0 },
        }
    }
}

impl ClipSinkFactory for FfmpegClipSinkFactory {
    fn open_clip(&self, index: u32) -> MediaResult<(PathBuf, Box<dyn FrameSink>)> {
        let path = self.out_dir.join(format!("{}_motion_{index}.mp4", self.stem));
        let sink = FfmpegClipSink::create(&path, self.width, self.height, self.fps)?;
        Ok((path, Box::new(sink)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Feeds a fixed frame sequence.
    pub struct VecFrameSource {
        frames: std::vec::IntoIter<Frame>,
    }

    impl VecFrameSource {
        pub fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into_iter(),
            }
        }
    }

    impl FrameSource for VecFrameSource {
        fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
            Ok(self.frames.next())
        }
    }

    /// Records written frames per clip for assertions.
    #[derive(Default)]
    pub struct RecordingSinkFactory {
        pub clips: Arc<Mutex<Vec<RecordedClip>>>,
    }

    #[derive(Debug, Clone)]
    pub struct RecordedClip {
        pub index: u32,
        pub pts: Vec<u64>,
        pub finished: bool,
    }

    struct RecordingSink {
        index: u32,
        pts: Vec<u64>,
        clips: Arc<Mutex<Vec<RecordedClip>>>,
    }

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, frame: &Frame) -> MediaResult<()> {
            self.pts.push(frame.pts_ms);
            Ok(())
        }

        fn finish(self: Box<Self>) -> MediaResult<()> {
            self.clips.lock().unwrap().push(RecordedClip {
                index: self.index,
                pts: self.pts.clone(),
                finished: true,
            });
            Ok(())
        }
    }

    impl ClipSinkFactory for RecordingSinkFactory {
        fn open_clip(&self, index: u32) -> MediaResult<(PathBuf, Box<dyn FrameSink>)> {
            let path = PathBuf::from(format!("/tmp/recorded_{index}.mp4"));
            let sink = RecordingSink {
                index,
                pts: Vec::new(),
                clips: Arc::clone(&self.clips),
            };
            Ok((path, Box::new(sink)))
        }
    }

    pub fn gray_frame(pts_ms: u64, fill: u8) -> Frame {
        Frame::new(16, 16, pts_ms, vec![fill; 256])
    }

    /// Frame with a bright square large enough to register as a blob.
    pub fn frame_with_blob(pts_ms: u64, size: u32) -> Frame {
        let (w, h) = (64u32, 64u32);
        let mut data = vec![0u8; (w * h) as usize];
        for y in 0..size.min(h) {
            for x in 0..size.min(w) {
                data[(y * w + x) as usize] = 255;
            }
        }
        Frame::new(w, h, pts_ms, data)
    }
}
