use nalgebra::{Matrix3, Vector2};
use std::time::Duration;
use vmatch_core::{Homography, MatchSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel location in image A and its putative counterpart in image B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub src: Vector2<f64>,
    pub dst: Vector2<f64>,
}

impl PointPair {
    pub fn new(src: (f64, f64), dst: (f64, f64)) -> Self {
        Self {
            src: Vector2::new(src.0, src.1),
            dst: Vector2::new(dst.0, dst.1),
        }
    }
}

/// Best model found by the sampler together with its support
#[derive(Debug, Clone)]
pub struct Consensus {
    pub homography: Matrix3<f64>,
    /// One flag per input pair
    pub inlier_mask: Vec<bool>,
    pub inlier_count: usize,
    pub iterations: usize,
}

/// How geometric verification ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum VerifyOutcome {
    Verified,
    /// Fewer than four matches to fit from
    InsufficientMatches { found: usize },
    /// No sample produced a model with enough support (e.g. collinear points)
    DegenerateGeometry,
}

/// Homography, inlier mask and inlier subsequence of one verification run
#[derive(Debug, Clone)]
pub struct Verification {
    pub homography: Option<Homography>,
    /// Aligned with the verified match set; empty when no model was found
    pub inlier_mask: Vec<bool>,
    pub inliers: MatchSet,
    pub outcome: VerifyOutcome,
    /// Samples drawn; the iteration cap when no model was accepted
    pub iterations: usize,
    pub elapsed: Duration,
}

impl Verification {
    pub(crate) fn unverified(outcome: VerifyOutcome, iterations: usize, elapsed: Duration) -> Self {
        Self {
            homography: None,
            inlier_mask: Vec::new(),
            inliers: MatchSet::new(),
            outcome,
            iterations,
            elapsed,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.outcome == VerifyOutcome::Verified
    }
}
