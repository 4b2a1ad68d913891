//! Clip concatenation.
//!
//! Event clips are rejoined into one working file with the concat
//! demuxer before downstream compression and trimming.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Concatenate `clips` (in order) into `output`.
pub async fn concat_clips(clips: &[PathBuf], output: impl AsRef<Path>) -> MediaResult<()> {
    let output = output.as_ref();
    if clips.is_empty() {
        return Err(MediaError::InvalidVideo(
            "nothing to concatenate".to_string(),
        ));
    }

    // Single clip: a stream copy is cheaper and lossless.
    if clips.len() == 1 {
        let cmd = FfmpegCommand::new(&clips[0], output).codec_copy();
        return FfmpegRunner::new().run(&cmd).await;
    }

    let list_dir = tempfile::tempdir()?;
    let list_path = list_dir.path().join("concat.txt");
    let listing = clips
        .iter()
        .map(|clip| format!("file '{}'\n", clip.display()))
        .collect::<String>();
    tokio::fs::write(&list_path, listing).await?;

    let cmd = FfmpegCommand::new(&list_path, output)
        .input_arg("-f")
        .input_arg("concat")
        .input_arg("-safe")
        .input_arg("0")
        .video_codec("libx264");
    FfmpegRunner::new().run(&cmd).await?;

    info!(
        "Concatenated {} clip(s) into {}",
        clips.len(),
        output.display()
    );
    Ok(())
}
