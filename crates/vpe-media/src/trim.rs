//! Trim strategy engine.
//!
//! Boundary planning is pure and testable; segment extraction shells
//! out to ffmpeg with stream copy so trimming never re-encodes.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use vpe_models::trim::TrimStrategy;
use vpe_models::Clip;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Pre-flight estimate of how many clips a sampling rate will yield.
/// Log-only; never used as a hard cap.
pub fn estimated_clip_count(duration_secs: f64, sampling_rate: f64, clip_length: u32) -> u64 {
    if clip_length == 0 {
        return 0;
    }
    (duration_secs * (sampling_rate / 100.0) / clip_length as f64).floor() as u64
}

/// Compute clip boundaries for a strategy over a known duration.
///
/// `sampling_rate` is the percentage of the source to materialize; it
/// only constrains `by_factor`, where the other variants already name
/// their segments explicitly.
pub fn plan_segments(
    strategy: &TrimStrategy,
    total_secs: f64,
    sampling_rate: f64,
) -> MediaResult<Vec<(f64, f64)>> {
    plan_segments_with_rng(strategy, total_secs, sampling_rate, &mut rand::thread_rng())
}

/// [`plan_segments`] with an injected RNG for deterministic tests.
pub fn plan_segments_with_rng<R: Rng>(
    strategy: &TrimStrategy,
    total_secs: f64,
    sampling_rate: f64,
    rng: &mut R,
) -> MediaResult<Vec<(f64, f64)>> {
    if total_secs <= 0.0 {
        return Err(MediaError::InvalidVideo(
            "source has no measurable duration".to_string(),
        ));
    }

    match strategy {
        TrimStrategy::ByFactor {
            clip_length,
            factor,
            keep_last_partial,
        } => {
            let step = *clip_length as f64 * factor.seconds();
            if step <= 0.0 {
                return Err(MediaError::invalid_trim("clip length must be non-zero"));
            }

            let budget = total_secs * (sampling_rate / 100.0);
            if budget >= total_secs {
                // Full sampling: contiguous split of the whole source.
                let mut segments = Vec::new();
                let mut start = 0.0;
                while start + step <= total_secs {
                    segments.push((start, start + step));
                    start += step;
                }
                if *keep_last_partial && start < total_secs {
                    segments.push((start, total_secs));
                }
                return Ok(segments);
            }
            if budget <= 0.0 {
                return Err(MediaError::invalid_trim(
                    "sampling rate selects no footage",
                ));
            }

            // Materialize only the sampled fraction, spread uniformly
            // over the source. The remainder becomes a trailing partial
            // segment when the request keeps it.
            let full = (budget / step).floor() as u32;
            let remainder = budget - full as f64 * step;
            let partial = *keep_last_partial && remainder > f64::EPSILON;
            let count = full + u32::from(partial);
            if count == 0 {
                return Ok(Vec::new());
            }

            let stride = total_secs / count as f64;
            let mut segments: Vec<(f64, f64)> = (0..full)
                .map(|i| {
                    let start = i as f64 * stride;
                    (start, start + step)
                })
                .collect();
            if partial {
                let start = full as f64 * stride;
                segments.push((start, start + remainder));
            }
            Ok(segments)
        }

        TrimStrategy::ByParts {
            number_of_parts,
            clip_length,
            equal_distribution,
            random_start,
            random_sequence,
        } => {
            let parts = *number_of_parts as f64;
            let length = *clip_length as f64;
            if parts * length > total_secs {
                return Err(MediaError::invalid_trim(format!(
                    "{number_of_parts} parts of {clip_length}s exceed the {total_secs:.1}s source"
                )));
            }

            let mut segments: Vec<(f64, f64)> = if *equal_distribution {
                let stride = total_secs / parts;
                (0..*number_of_parts)
                    .map(|i| {
                        let start = i as f64 * stride;
                        (start, start + length)
                    })
                    .collect()
            } else if *random_start {
                let mut starts: Vec<f64> = (0..*number_of_parts)
                    .map(|_| rng.gen_range(0.0..=(total_secs - length)))
                    .collect();
                starts.sort_by(|a, b| a.total_cmp(b));
                starts.into_iter().map(|s| (s, s + length)).collect()
            } else {
                // Neither spread nor random: pack from the front.
                (0..*number_of_parts)
                    .map(|i| {
                        let start = i as f64 * length;
                        (start, start + length)
                    })
                    .collect()
            };

            if *random_sequence {
                segments.shuffle(rng);
            }
            Ok(segments)
        }

        TrimStrategy::SubSample {
            start_time,
            end_time,
            sample_start_time,
            sample_end_time,
            timestamp_format,
        } => {
            let start = parse_wallclock(start_time, timestamp_format)?;
            let end = parse_wallclock(end_time, timestamp_format)?;
            let sample_start = parse_wallclock(sample_start_time, timestamp_format)?;
            let sample_end = parse_wallclock(sample_end_time, timestamp_format)?;

            if end <= start {
                return Err(MediaError::invalid_trim("end_time precedes start_time"));
            }
            if sample_end <= sample_start {
                return Err(MediaError::invalid_trim(
                    "sample_end_time precedes sample_start_time",
                ));
            }
            if sample_start < start || sample_end > end {
                return Err(MediaError::invalid_trim(
                    "sample range falls outside the recording span",
                ));
            }

            let offset_start = (sample_start - start).num_milliseconds() as f64 / 1000.0;
            let offset_end = (sample_end - start).num_milliseconds() as f64 / 1000.0;
            Ok(vec![(offset_start, offset_end.min(total_secs))])
        }

        TrimStrategy::ByPoints {
            point_start,
            point_end,
        } => {
            if *point_start >= total_secs {
                return Err(MediaError::invalid_trim(format!(
                    "point_start {point_start:.1}s is past the {total_secs:.1}s source"
                )));
            }
            Ok(vec![(point_start.max(0.0), point_end.min(total_secs))])
        }
    }
}

fn parse_wallclock(value: &str, format: &str) -> MediaResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format).map_err(|_| MediaError::InvalidTimestamp {
        value: value.to_string(),
        format: format.to_string(),
    })
}

/// Trim strategy engine: plans boundaries and materializes clips.
#[derive(Debug, Clone)]
pub struct TrimEngine {
    /// Directory clips are written into.
    out_dir: PathBuf,
}

impl TrimEngine {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Split `file` per `strategy`, returning the ordered clip set.
    pub async fn trim(
        &self,
        file: impl AsRef<Path>,
        strategy: &TrimStrategy,
        sampling_rate: f64,
    ) -> MediaResult<Vec<Clip>> {
        let file = file.as_ref();
        let duration = get_duration(file).await?;

        if let TrimStrategy::ByFactor { clip_length, .. } = strategy {
            let estimate = estimated_clip_count(duration, sampling_rate, *clip_length);
            info!(
                "Trim pre-flight: expecting {}-{} clip(s) from {:.1}s of source",
                estimate,
                estimate + 1,
                duration
            );
        }

        let segments = plan_segments(strategy, duration, sampling_rate)?;
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("mp4");

        let mut clips = Vec::with_capacity(segments.len());
        for (idx, (start, end)) in segments.iter().enumerate() {
            let index = idx as u32 + 1;
            let out = self.out_dir.join(format!("{stem}_{index}.{extension}"));
            extract_segment(file, &out, *start, end - start).await?;
            clips.push(Clip::new(index, out, *start, *end));
        }

        info!("Trimmed {} into {} clip(s)", file.display(), clips.len());
        Ok(clips)
    }
}

/// Extract `[start, start+duration)` from `input` without re-encoding.
pub async fn extract_segment(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    duration: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(input.as_ref(), output.as_ref())
        .seek(start_secs)
        .duration(duration)
        .codec_copy();
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use vpe_models::trim::SplitFactor;

    fn by_factor(clip_length: u32, keep_last_partial: bool) -> TrimStrategy {
        TrimStrategy::ByFactor {
            clip_length,
            factor: SplitFactor::Seconds,
            keep_last_partial,
        }
    }

    #[test]
    fn test_estimated_clip_count_reference_scenario() {
        // 300s source, 30% sampling, 30s clips -> floor(300*0.3/30) = 3.
        assert_eq!(estimated_clip_count(300.0, 30.0, 30), 3);
    }

    #[test]
    fn test_by_factor_exact_split() {
        let segments = plan_segments(&by_factor(30, true), 90.0, 100.0).unwrap();
        assert_eq!(segments, vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0)]);
    }

    #[test]
    fn test_by_factor_partial_tail() {
        let with_tail = plan_segments(&by_factor(30, true), 100.0, 100.0).unwrap();
        assert_eq!(with_tail.len(), 4);
        assert_eq!(with_tail[3], (90.0, 100.0));

        let without_tail = plan_segments(&by_factor(30, false), 100.0, 100.0).unwrap();
        assert_eq!(without_tail.len(), 3);
    }

    #[test]
    fn test_by_factor_materializes_sampled_fraction() {
        // 300s source at 30% sampling with 30s clips: 90s of footage
        // as 3 clips spread uniformly, not a split of the full source.
        let segments = plan_segments(&by_factor(30, true), 300.0, 30.0).unwrap();
        assert_eq!(segments, vec![(0.0, 30.0), (100.0, 130.0), (200.0, 230.0)]);

        let materialized: f64 = segments.iter().map(|(s, e)| e - s).sum();
        assert!((materialized - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_factor_sampled_remainder_respects_last_clip() {
        // 25% of 300s is 75s: two full clips plus a 15s remainder.
        let with_tail = plan_segments(&by_factor(30, true), 300.0, 25.0).unwrap();
        assert_eq!(with_tail.len(), 3);
        let (start, end) = with_tail[2];
        assert!((end - start - 15.0).abs() < 1e-9);

        let without_tail = plan_segments(&by_factor(30, false), 300.0, 25.0).unwrap();
        assert_eq!(without_tail.len(), 2);
    }

    #[test]
    fn test_by_parts_rejects_oversubscription() {
        let strategy = TrimStrategy::ByParts {
            number_of_parts: 5,
            clip_length: 30,
            equal_distribution: true,
            random_start: false,
            random_sequence: false,
        };
        // 5 * 30 = 150s requested from a 100s source: a configuration
        // error, never a silent truncation.
        let err = plan_segments(&strategy, 100.0, 100.0).unwrap_err();
        assert!(matches!(err, MediaError::InvalidTrim(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_by_parts_equal_distribution() {
        let strategy = TrimStrategy::ByParts {
            number_of_parts: 3,
            clip_length: 10,
            equal_distribution: true,
            random_start: false,
            random_sequence: false,
        };
        let segments = plan_segments(&strategy, 300.0, 100.0).unwrap();
        assert_eq!(segments, vec![(0.0, 10.0), (100.0, 110.0), (200.0, 210.0)]);
    }

    #[test]
    fn test_by_parts_random_start_fits_source() {
        let strategy = TrimStrategy::ByParts {
            number_of_parts: 4,
            clip_length: 15,
            equal_distribution: false,
            random_start: true,
            random_sequence: false,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let segments = plan_segments_with_rng(&strategy, 120.0, 100.0, &mut rng).unwrap();
        assert_eq!(segments.len(), 4);
        for (start, end) in &segments {
            assert!(*start >= 0.0);
            assert!(*end <= 120.0);
            assert!((end - start - 15.0).abs() < 1e-9);
        }
        // Unshuffled random starts come back in source order.
        assert!(segments.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_by_parts_random_sequence_preserves_set() {
        let strategy = TrimStrategy::ByParts {
            number_of_parts: 5,
            clip_length: 10,
            equal_distribution: true,
            random_start: false,
            random_sequence: true,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut segments = plan_segments_with_rng(&strategy, 500.0, 100.0, &mut rng).unwrap();
        segments.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(
            segments,
            vec![
                (0.0, 10.0),
                (100.0, 110.0),
                (200.0, 210.0),
                (300.0, 310.0),
                (400.0, 410.0)
            ]
        );
    }

    #[test]
    fn test_sub_sample_offsets() {
        let strategy = TrimStrategy::SubSample {
            start_time: "2021-03-04 10:00:00".to_string(),
            end_time: "2021-03-04 11:00:00".to_string(),
            sample_start_time: "2021-03-04 10:10:00".to_string(),
            sample_end_time: "2021-03-04 10:15:30".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        };
        let segments = plan_segments(&strategy, 3600.0, 100.0).unwrap();
        assert_eq!(segments, vec![(600.0, 930.0)]);
    }

    #[test]
    fn test_sub_sample_rejects_out_of_span() {
        let strategy = TrimStrategy::SubSample {
            start_time: "2021-03-04 10:00:00".to_string(),
            end_time: "2021-03-04 11:00:00".to_string(),
            sample_start_time: "2021-03-04 09:50:00".to_string(),
            sample_end_time: "2021-03-04 10:15:00".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        };
        assert!(matches!(
            plan_segments(&strategy, 3600.0, 100.0),
            Err(MediaError::InvalidTrim(_))
        ));
    }

    #[test]
    fn test_sub_sample_bad_timestamp() {
        let strategy = TrimStrategy::SubSample {
            start_time: "not-a-time".to_string(),
            end_time: "2021-03-04 11:00:00".to_string(),
            sample_start_time: "2021-03-04 10:10:00".to_string(),
            sample_end_time: "2021-03-04 10:15:00".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        };
        assert!(matches!(
            plan_segments(&strategy, 3600.0, 100.0),
            Err(MediaError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_by_points_clamped_to_duration() {
        let strategy = TrimStrategy::ByPoints {
            point_start: 10.0,
            point_end: 500.0,
        };
        let segments = plan_segments(&strategy, 300.0, 100.0).unwrap();
        assert_eq!(segments, vec![(10.0, 300.0)]);
    }
}
