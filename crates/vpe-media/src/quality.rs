//! Quality assessment and adaptive compression.
//!
//! The assessor runs candidate and reference through one ffmpeg
//! filter graph that emits per-frame SSIM and PSNR stat files. The
//! file-level score is the structural-similarity value of the first
//! frame pair; the series is not averaged.

use std::path::{Path, PathBuf};

use tracing::info;

use vpe_models::{CompressionPlan, QualityScore};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_bitrate;

/// One frame pair's SSIM measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct SsimFrame {
    pub n: u64,
    pub all: f64,
}

/// One frame pair's PSNR measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct PsnrFrame {
    pub n: u64,
    pub avg: f64,
}

/// Pairwise quality-metric computation against a fixed reference.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    reference: PathBuf,
    scaling_algorithm: String,
}

impl QualityAssessor {
    pub fn new(reference: impl AsRef<Path>) -> Self {
        Self {
            reference: reference.as_ref().to_path_buf(),
            scaling_algorithm: "bicubic".to_string(),
        }
    }

    /// Compute the file-level quality score for `file`.
    pub async fn assess(&self, file: impl AsRef<Path>) -> MediaResult<QualityScore> {
        let file = file.as_ref();
        if !file.exists() {
            return Err(MediaError::FileNotFound(file.to_path_buf()));
        }

        let stats_dir = tempfile::tempdir()?;
        let ssim_log = stats_dir.path().join("ssim.log");
        let psnr_log = stats_dir.path().join("psnr.log");

        // The candidate is scaled onto the reference before both are
        // split into the psnr and ssim branches.
        let filter = [
            format!(
                "[1][0]scale2ref=flags={}[file][reference]",
                self.scaling_algorithm
            ),
            "[file]split[dist1][dist2]".to_string(),
            "[reference]split[ref1][ref2]".to_string(),
            format!("[dist1][ref1]psnr={}", psnr_log.display()),
            format!("[dist2][ref2]ssim={}", ssim_log.display()),
        ]
        .join(";");

        let cmd = FfmpegCommand::null_sink(&self.reference)
            .add_input(file)
            .single_thread()
            .filter_complex(filter)
            .no_audio();
        FfmpegRunner::new().run(&cmd).await?;

        let ssim_raw = tokio::fs::read_to_string(&ssim_log).await?;
        let psnr_raw = tokio::fs::read_to_string(&psnr_log).await?;

        let ssim_series = parse_ssim_stats(&ssim_raw);
        let psnr_series = parse_psnr_stats(&psnr_raw);

        let first_ssim = ssim_series
            .first()
            .ok_or_else(|| MediaError::EmptyMetricSeries(file.to_path_buf()))?;
        let first_psnr = psnr_series.first().map(|frame| frame.avg).unwrap_or(0.0);

        let score = QualityScore::new(first_ssim.all, first_psnr);
        info!(
            "Quality of {}: ssim {:.3} ({}), psnr {:.1} dB",
            file.display(),
            score.ssim,
            score.rating,
            score.psnr
        );
        Ok(score)
    }
}

/// Top-level helper: assess `file` against `reference`.
pub async fn assess(
    file: impl AsRef<Path>,
    reference: impl AsRef<Path>,
) -> MediaResult<QualityScore> {
    QualityAssessor::new(reference).assess(file).await
}

/// Re-encode `file` in place at the planned bitrate.
///
/// The source is moved aside, re-encoded back to its original path,
/// and the temporary removed, so callers keep one stable path.
pub async fn apply_compression(file: impl AsRef<Path>, plan: CompressionPlan) -> MediaResult<u64> {
    let file = file.as_ref();
    let source_bitrate = get_bitrate(file).await?;
    let target = plan.target_bitrate(source_bitrate);

    info!(
        "Compressing {}: {} -> {} bits/sec (x{})",
        file.display(),
        source_bitrate,
        target,
        plan.multiplier
    );

    let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let staging = file.with_extension(format!("orig.{extension}"));
    tokio::fs::rename(file, &staging).await?;

    let cmd = FfmpegCommand::new(&staging, file)
        .video_codec("libx264")
        .video_bitrate(target);

    let result = FfmpegRunner::new().run(&cmd).await;
    match result {
        Ok(()) => {
            tokio::fs::remove_file(&staging).await?;
            Ok(target)
        }
        Err(err) => {
            // Restore the original so the pipeline can still abort
            // with a consistent working file on disk.
            let _ = tokio::fs::rename(&staging, file).await;
            Err(err)
        }
    }
}

/// Parse ffmpeg's per-frame ssim stat lines.
///
/// Line shape: `n:1 Y:0.98 U:0.99 V:0.99 All:0.98 (19.18)`.
pub fn parse_ssim_stats(raw: &str) -> Vec<SsimFrame> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim().split(" (").next()?;
            let mut n = None;
            let mut all = None;
            for field in line.split_whitespace() {
                let (key, value) = field.split_once(':')?;
                match key {
                    "n" => n = value.parse().ok(),
                    "All" => all = value.parse().ok(),
                    _ => {}
                }
            }
            Some(SsimFrame {
                n: n?,
                all: all?,
            })
        })
        .collect()
}

/// Parse ffmpeg's per-frame psnr stat lines.
///
/// Line shape: `n:1 mse_avg:529.95 ... psnr_avg:20.89 ...`.
pub fn parse_psnr_stats(raw: &str) -> Vec<PsnrFrame> {
    raw.lines()
        .filter_map(|line| {
            let mut n = None;
            let mut avg = None;
            for field in line.trim().split_whitespace() {
                let (key, value) = field.split_once(':')?;
                match key {
                    "n" => n = value.parse().ok(),
                    "psnr_avg" => avg = value.parse().ok(),
                    _ => {}
                }
            }
            Some(PsnrFrame { n: n?, avg: avg? })
        })
        .collect()
}
