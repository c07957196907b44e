use crate::error::RansacResult;
use crate::verifier::GeometricVerifier;
use vmatch_core::RansacConfig;

/// Builder for creating a `GeometricVerifier`
#[derive(Debug, Clone, Default)]
pub struct VerifierBuilder {
    config: RansacConfig,
}

impl VerifierBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum reprojection error, in pixels, for an inlier
    pub fn reprojection_threshold(mut self, px: f64) -> Self {
        self.config.reprojection_threshold_px = px;
        self
    }

    /// Set the hard cap on sampling iterations
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.config.max_iterations = n;
        self
    }

    /// Set the probability of drawing at least one all-inlier sample
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.config.confidence = confidence;
        self
    }

    /// Set the minimum consensus size for an accepted model
    pub fn min_inliers(mut self, n: usize) -> Self {
        self.config.min_inliers = n;
        self
    }

    /// Fix the sampler seed for reproducible runs
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Draw samples from OS entropy
    pub fn unseeded(mut self) -> Self {
        self.config.seed = None;
        self
    }

    /// Fewer iterations and a lower confidence target
    pub fn preset_fast(mut self) -> Self {
        self.config.max_iterations = 500;
        self.config.confidence = 0.99;
        self
    }

    /// Tighter tolerance and a larger consensus floor
    pub fn preset_strict(mut self) -> Self {
        self.config.reprojection_threshold_px = 3.0;
        self.config.max_iterations = 5000;
        self.config.confidence = 0.999;
        self.config.min_inliers = 8;
        self
    }

    /// Build the verifier, validating the configuration
    pub fn build(self) -> RansacResult<GeometricVerifier> {
        GeometricVerifier::new(self.config)
    }

    /// Human readable one-line description of the configuration
    pub fn summary(&self) -> String {
        let c = &self.config;
        format!(
            "RANSAC: threshold {:.1}px, confidence {}, max {} iterations, min {} inliers, seed {}",
            c.reprojection_threshold_px,
            c.confidence,
            c.max_iterations,
            c.min_inliers,
            c.seed.map_or_else(|| "random".to_string(), |s| s.to_string()),
        )
    }

    pub fn from_config(config: RansacConfig) -> Self {
        Self { config }
    }

    pub fn to_config(self) -> RansacConfig {
        self.config
    }
}
