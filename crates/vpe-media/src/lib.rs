//! FFmpeg CLI wrapper and the processing core: motion-event
//! extraction, quality assessment and compression, trim strategies,
//! clip concatenation, and the per-clip addon chain.
//!
//! Frame-level inference (object/face/plate detection) and the codec
//! itself stay behind narrow collaborator traits; this crate only
//! shells out to ffmpeg/ffprobe and coordinates the work.

pub mod addons;
pub mod command;
pub mod concat;
pub mod error;
pub mod frame;
pub mod motion;
pub mod probe;
pub mod quality;
pub mod trim;

pub use addons::{
    AddonChain, ClipAddon, DetectionTarget, ObjectCountAddon, RedactionAddon, Region,
    RegionDetector,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::concat_clips;
pub use error::{MediaError, MediaResult};
pub use frame::{
    ClipSinkFactory, FfmpegClipSinkFactory, FfmpegFrameSource, Frame, FrameSink, FrameSource,
};
pub use motion::{MotionConfig, MotionEventDetector, MotionOutcome};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use quality::{apply_compression, assess, QualityAssessor};
pub use trim::{estimated_clip_count, plan_segments, TrimEngine};
