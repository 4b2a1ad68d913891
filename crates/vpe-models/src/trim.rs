//! Trim strategy variants.
//!
//! A strategy describes how the working file is split into clips; the
//! boundary math lives in `vpe-media::trim`.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::request::ProcessingRequest;

/// Strategy selector as it appears in the request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrimType {
    #[default]
    ByFactor,
    ByParts,
    SubSample,
    ByPoints,
}

/// Split granularity for factor-based trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitFactor {
    /// Clip length expressed in seconds.
    #[default]
    Seconds,
    /// Clip length expressed in minutes.
    Minutes,
}

impl SplitFactor {
    fn parse(raw: &str) -> ModelResult<Self> {
        match raw {
            "s" | "sec" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "minutes" => Ok(Self::Minutes),
            other => Err(ModelError::invalid_value(
                "factor",
                format!("unknown split factor {other:?}"),
            )),
        }
    }

    /// Seconds per unit of `clip_length`.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
        }
    }
}

/// A fully resolved trim strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trim_type", rename_all = "snake_case")]
pub enum TrimStrategy {
    /// Fixed-length segments across the whole duration.
    ByFactor {
        clip_length: u32,
        factor: SplitFactor,
        /// Keep the trailing remainder segment.
        keep_last_partial: bool,
    },
    /// A fixed number of segments, evenly spaced or randomly placed.
    ByParts {
        number_of_parts: u32,
        clip_length: u32,
        equal_distribution: bool,
        random_start: bool,
        /// Shuffle returned clip order after selection.
        random_sequence: bool,
    },
    /// A wall-clock sub-range of a recording spanning known times.
    SubSample {
        start_time: String,
        end_time: String,
        sample_start_time: String,
        sample_end_time: String,
        timestamp_format: String,
    },
    /// One explicit offset range in seconds.
    ByPoints { point_start: f64, point_end: f64 },
}

impl TrimStrategy {
    /// Resolve the strategy from a flat request, checking the keys
    /// that variant actually needs.
    pub fn from_request(request: &ProcessingRequest) -> ModelResult<Self> {
        match request.trim_type {
            TrimType::ByFactor => Ok(Self::ByFactor {
                clip_length: request.clip_length,
                factor: SplitFactor::parse(&request.factor)?,
                keep_last_partial: request.last_clip,
            }),
            TrimType::ByParts => {
                if request.number_of_clips == 0 {
                    return Err(ModelError::invalid_value(
                        "number_of_clips",
                        "by_parts requires a non-zero clip count",
                    ));
                }
                Ok(Self::ByParts {
                    number_of_parts: request.number_of_clips,
                    clip_length: request.clip_length,
                    equal_distribution: request.equal_distribution,
                    random_start: request.random_start,
                    random_sequence: request.random_sequence,
                })
            }
            TrimType::SubSample => Ok(Self::SubSample {
                start_time: required(&request.start_time, "start_time")?,
                end_time: required(&request.end_time, "end_time")?,
                sample_start_time: required(&request.sample_start_time, "sample_start_time")?,
                sample_end_time: required(&request.sample_end_time, "sample_end_time")?,
                timestamp_format: request.timestamp_format.clone(),
            }),
            TrimType::ByPoints => {
                let point_start = request
                    .point_start
                    .ok_or(ModelError::MissingKey("point_start"))?;
                let point_end = request
                    .point_end
                    .ok_or(ModelError::MissingKey("point_end"))?;
                if point_end <= point_start {
                    return Err(ModelError::invalid_value(
                        "point_end",
                        "must be greater than point_start",
                    ));
                }
                Ok(Self::ByPoints {
                    point_start,
                    point_end,
                })
            }
        }
    }
}

fn required(value: &Option<String>, key: &'static str) -> ModelResult<String> {
    value.clone().ok_or(ModelError::MissingKey(key))
}
