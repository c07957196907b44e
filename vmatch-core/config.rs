#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nearest-neighbour filtering settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatcherConfig {
    /// Apply Lowe's ratio test. Always on for floating descriptors.
    pub ratio_test: bool,
    /// Keep a 1-NN only if `d1 < ratio_threshold * d2`, in (0, 1]
    pub ratio_threshold: f32,
    /// Upper bound (exclusive) on 1-NN distance when binary descriptors are
    /// matched without the ratio test. `None` keeps every 1-NN.
    pub fixed_distance_threshold: Option<f32>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio_test: true,
            ratio_threshold: 0.75,
            fixed_distance_threshold: Some(60.0),
        }
    }
}

/// Random sample consensus settings for homography estimation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    /// Maximum forward reprojection error (pixels) for a correspondence to count as inlier
    pub reprojection_threshold_px: f64,
    /// Hard cap on sampling iterations
    pub max_iterations: usize,
    /// Desired probability of drawing at least one outlier-free sample, in (0, 1)
    pub confidence: f64,
    /// Smallest consensus set accepted as a homography
    pub min_inliers: usize,
    /// Fixed seed for reproducible sampling; `None` seeds from OS entropy
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold_px: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            min_inliers: 4,
            seed: None,
        }
    }
}
