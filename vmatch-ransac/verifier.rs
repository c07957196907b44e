use crate::error::{RansacError, RansacResult};
use crate::estimator::RansacEstimator;
use crate::types::{PointPair, Verification, VerifyOutcome};
use std::time::Instant;
use tracing::debug;
use vmatch_core::{Homography, Keypoint, MatchSet, RansacConfig, MIN_CORRESPONDENCES};

/// Splits a match set into homography inliers and outliers.
#[derive(Debug, Clone)]
pub struct GeometricVerifier {
    estimator: RansacEstimator,
}

impl GeometricVerifier {
    pub fn new(cfg: RansacConfig) -> RansacResult<Self> {
        Ok(Self {
            estimator: RansacEstimator::new(cfg)?,
        })
    }

    pub fn config(&self) -> &RansacConfig {
        self.estimator.config()
    }

    pub fn estimator(&self) -> &RansacEstimator {
        &self.estimator
    }

    /// Estimate the homography taking `keypoints_a` onto `keypoints_b`.
    ///
    /// Fewer than four matches, or no sufficiently supported model, give a
    /// verification without homography and with empty mask and inliers.
    pub fn verify(
        &self,
        matches: &MatchSet,
        keypoints_a: &[Keypoint],
        keypoints_b: &[Keypoint],
    ) -> RansacResult<Verification> {
        let t0 = Instant::now();

        if matches.len() < MIN_CORRESPONDENCES {
            debug!(found = matches.len(), "too few matches to verify");
            return Ok(Verification::unverified(
                VerifyOutcome::InsufficientMatches { found: matches.len() },
                0,
                t0.elapsed(),
            ));
        }

        let pairs = point_pairs(matches, keypoints_a, keypoints_b)?;
        let Some(consensus) = self.estimator.estimate(&pairs) else {
            return Ok(Verification::unverified(
                VerifyOutcome::DegenerateGeometry,
                self.config().max_iterations,
                t0.elapsed(),
            ));
        };

        let inliers = matches.select(&consensus.inlier_mask);
        let elapsed = t0.elapsed();
        debug!(
            matches = matches.len(),
            inliers = inliers.len(),
            iterations = consensus.iterations,
            ?elapsed,
            "geometric verification done"
        );

        Ok(Verification {
            homography: Some(Homography::new(consensus.homography)),
            inlier_mask: consensus.inlier_mask,
            inliers,
            outcome: VerifyOutcome::Verified,
            iterations: consensus.iterations,
            elapsed,
        })
    }
}

fn finite_coords(image: char, index: usize, kp: &Keypoint) -> RansacResult<(f64, f64)> {
    if !(kp.x.is_finite() && kp.y.is_finite()) {
        return Err(RansacError::NonFiniteKeypoint { image, index, x: kp.x, y: kp.y });
    }
    Ok((kp.x as f64, kp.y as f64))
}

/// Keypoint coordinates of every match, in match order
pub fn point_pairs(
    matches: &MatchSet,
    keypoints_a: &[Keypoint],
    keypoints_b: &[Keypoint],
) -> RansacResult<Vec<PointPair>> {
    matches
        .iter()
        .enumerate()
        .map(|(position, m)| {
            let a = keypoints_a.get(m.query_idx).ok_or(RansacError::KeypointOutOfRange {
                image: 'A',
                position,
                index: m.query_idx,
                available: keypoints_a.len(),
            })?;
            let b = keypoints_b.get(m.train_idx).ok_or(RansacError::KeypointOutOfRange {
                image: 'B',
                position,
                index: m.train_idx,
                available: keypoints_b.len(),
            })?;
            Ok(PointPair::new(
                finite_coords('A', m.query_idx, a)?,
                finite_coords('B', m.train_idx, b)?,
            ))
        })
        .collect()
}
