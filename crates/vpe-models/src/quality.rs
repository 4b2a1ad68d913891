//! Quality score buckets and compression planning.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete quality tier derived from a continuous similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityRating {
    Bad,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityRating {
    /// Bucket a structural-similarity score.
    ///
    /// The metric is nominally bounded at 1.0 but upscaled references
    /// can push it slightly above; anything over 0.99 rates Excellent.
    pub fn from_score(score: f64) -> Self {
        if score < 0.5 {
            QualityRating::Bad
        } else if score < 0.88 {
            QualityRating::Poor
        } else if score < 0.95 {
            QualityRating::Fair
        } else if score <= 0.99 {
            QualityRating::Good
        } else {
            QualityRating::Excellent
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// File-level perceptual quality, derived once per source before
/// compression and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Structural-similarity value of the first frame pair.
    pub ssim: f64,
    /// Average PSNR of the first frame pair, dB.
    pub psnr: f64,
    pub rating: QualityRating,
}

impl QualityScore {
    pub fn new(ssim: f64, psnr: f64) -> Self {
        Self {
            ssim,
            psnr,
            rating: QualityRating::from_score(ssim),
        }
    }
}

/// Target-bitrate multiplier selected solely from the quality bucket.
///
/// Lower quality gets the weakest compression so loss is not
/// compounded; the multiplier strictly decreases as quality rises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionPlan {
    pub multiplier: f64,
}

impl CompressionPlan {
    pub fn for_rating(rating: QualityRating) -> Self {
        let multiplier = match rating {
            QualityRating::Bad => 0.8,
            QualityRating::Poor | QualityRating::Fair | QualityRating::Good => 0.5,
            QualityRating::Excellent => 0.3,
        };
        Self { multiplier }
    }

    /// Target bitrate for a measured source bitrate, bits/sec.
    pub fn target_bitrate(&self, source_bitrate: u64) -> u64 {
        (source_bitrate as f64 * self.multiplier) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_buckets() {
        assert_eq!(QualityRating::from_score(0.2), QualityRating::Bad);
        assert_eq!(QualityRating::from_score(0.49), QualityRating::Bad);
        assert_eq!(QualityRating::from_score(0.5), QualityRating::Poor);
        assert_eq!(QualityRating::from_score(0.87), QualityRating::Poor);
        assert_eq!(QualityRating::from_score(0.88), QualityRating::Fair);
        assert_eq!(QualityRating::from_score(0.94), QualityRating::Fair);
        assert_eq!(QualityRating::from_score(0.95), QualityRating::Good);
        assert_eq!(QualityRating::from_score(0.99), QualityRating::Good);
        // The (0.99, 1.0] gap rates Excellent, as does > 1.0.
        assert_eq!(QualityRating::from_score(0.995), QualityRating::Excellent);
        assert_eq!(QualityRating::from_score(1.05), QualityRating::Excellent);
    }

    #[test]
    fn test_multiplier_monotonic_non_increasing() {
        let ordered = [
            QualityRating::Bad,
            QualityRating::Poor,
            QualityRating::Fair,
            QualityRating::Good,
            QualityRating::Excellent,
        ];
        let multipliers: Vec<f64> = ordered
            .iter()
            .map(|r| CompressionPlan::for_rating(*r).multiplier)
            .collect();
        assert!(multipliers.windows(2).all(|w| w[0] >= w[1]));
        assert!((multipliers[0] - 0.8).abs() < f64::EPSILON);
        assert!((multipliers[4] - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_target_bitrate() {
        let plan = CompressionPlan::for_rating(QualityRating::Excellent);
        assert_eq!(plan.target_bitrate(1_000_000), 300_000);
    }
}
