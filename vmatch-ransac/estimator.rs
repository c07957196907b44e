use crate::dlt::{fit_homography, reprojection_error_sq, sample_is_degenerate};
use crate::error::{RansacError, RansacResult};
use crate::types::{Consensus, PointPair};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};
use vmatch_core::{RansacConfig, MIN_CORRESPONDENCES};

/// Iterations needed to draw one all-inlier minimal sample with probability
/// `confidence`, given the current inlier ratio, capped at `max_iterations`
pub fn adaptive_iterations(confidence: f64, inlier_ratio: f64, max_iterations: usize) -> usize {
    let outlier_ratio = (1.0 - inlier_ratio).clamp(0.0, 1.0);
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - outlier_ratio).powi(MIN_CORRESPONDENCES as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }

    let (num, denom) = (num.ln(), denom.ln());
    if denom >= 0.0 || -num >= max_iterations as f64 * -denom {
        max_iterations
    } else {
        (num / denom).round() as usize
    }
}

/// Random sample consensus over four-point homography hypotheses
#[derive(Debug, Clone)]
pub struct RansacEstimator {
    cfg: RansacConfig,
}

impl RansacEstimator {
    /// Creates a new estimator with validation
    pub fn new(cfg: RansacConfig) -> RansacResult<Self> {
        let t = cfg.reprojection_threshold_px;
        if !(t.is_finite() && t > 0.0) {
            return Err(RansacError::InvalidThreshold(t));
        }
        if !(cfg.confidence > 0.0 && cfg.confidence < 1.0) {
            return Err(RansacError::InvalidConfidence(cfg.confidence));
        }
        if cfg.max_iterations == 0 {
            return Err(RansacError::InvalidIterations(cfg.max_iterations));
        }
        if cfg.min_inliers < MIN_CORRESPONDENCES {
            return Err(RansacError::InvalidMinInliers(cfg.min_inliers));
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.cfg
    }

    /// Run the sampler with the configured seed, or OS entropy when unset
    pub fn estimate(&self, pairs: &[PointPair]) -> Option<Consensus> {
        let mut rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.estimate_with_rng(pairs, &mut rng)
    }

    /// Best-supported homography, refit on its inliers.
    ///
    /// `None` when fewer than `min_inliers` pairs agree with any hypothesis.
    pub fn estimate_with_rng<R: Rng + ?Sized>(&self, pairs: &[PointPair], rng: &mut R) -> Option<Consensus> {
        let n = pairs.len();
        if n < MIN_CORRESPONDENCES {
            return None;
        }

        let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
        let mut budget = self.cfg.max_iterations;
        let mut iterations = 0;

        while iterations < budget {
            iterations += 1;

            let idx = sample(rng, n, MIN_CORRESPONDENCES);
            let minimal: [PointPair; 4] = std::array::from_fn(|k| pairs[idx.index(k)]);
            if sample_is_degenerate(&minimal) {
                trace!(iterations, "degenerate sample, skipping");
                continue;
            }
            let Some(h) = fit_homography(&minimal) else {
                continue;
            };
            if h.determinant().abs() < 1e-10 {
                continue;
            }

            let (mask, count) = self.score(&h, pairs);
            if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
                budget = budget.min(adaptive_iterations(
                    self.cfg.confidence,
                    count as f64 / n as f64,
                    self.cfg.max_iterations,
                ));
                trace!(iterations, count, budget, "new best hypothesis");
                best = Some((h, mask, count));
            }
        }

        let Some((h, mask, count)) = best else {
            debug!(n, iterations, "no usable hypothesis");
            return None;
        };
        if count < self.cfg.min_inliers {
            debug!(n, iterations, count, min = self.cfg.min_inliers, "consensus below floor");
            return None;
        }

        let support: Vec<PointPair> = pairs
            .iter()
            .zip(mask.iter())
            .filter_map(|(p, &inlier)| inlier.then_some(*p))
            .collect();
        let homography = fit_homography(&support)
            .filter(|refit| refit.determinant().abs() >= 1e-10)
            .unwrap_or(h);

        debug!(n, iterations, inliers = count, "consensus found");
        Some(Consensus {
            homography,
            inlier_mask: mask,
            inlier_count: count,
            iterations,
        })
    }

    /// Inlier flags and count of `h` over all pairs
    pub fn score(&self, h: &Matrix3<f64>, pairs: &[PointPair]) -> (Vec<bool>, usize) {
        let thr2 = self.cfg.reprojection_threshold_px * self.cfg.reprojection_threshold_px;
        let mask: Vec<bool> = pairs
            .iter()
            .map(|p| reprojection_error_sq(h, p) <= thr2)
            .collect();
        let count = mask.iter().filter(|&&m| m).count();
        (mask, count)
    }
}
