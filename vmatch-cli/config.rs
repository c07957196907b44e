use crate::error::{ConfigResult, PipelineResult};
use crate::pipeline::Pipeline;
use vmatch_bf::{BruteForceMatcher, HammingMetric};
use vmatch_core::{default_threads, MatcherConfig, MetricFamily, RansacConfig};
use vmatch_ransac::RansacEstimator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete pipeline configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Distance convention of both descriptor sets
    pub metric: MetricFamily,
    /// Worker threads for matching; 0 runs on the global Rayon pool
    pub n_threads: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metric: MetricFamily::Binary,
            n_threads: default_threads(),
            name: None,
            description: None,
            matcher: MatcherConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new(metric: MetricFamily) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// Binary descriptors (ORB, BRIEF, AKAZE) under Hamming distance
    pub fn orb_preset() -> Self {
        Self {
            name: Some("ORB".to_string()),
            description: Some("Binary descriptors, Hamming distance, ratio test".to_string()),
            ..Self::new(MetricFamily::Binary)
        }
    }

    /// Floating descriptors (SIFT, SURF) under Euclidean distance
    pub fn sift_preset() -> Self {
        Self {
            matcher: MatcherConfig {
                ratio_test: true,
                ..MatcherConfig::default()
            },
            name: Some("SIFT".to_string()),
            description: Some("Floating descriptors, Euclidean distance, ratio test".to_string()),
            ..Self::new(MetricFamily::Floating)
        }
    }

    /// Tighter ratio and reprojection tolerance, larger consensus floor
    pub fn strict_preset() -> Self {
        Self {
            matcher: MatcherConfig {
                ratio_test: true,
                ratio_threshold: 0.7,
                fixed_distance_threshold: Some(40.0),
            },
            ransac: RansacConfig {
                reprojection_threshold_px: 3.0,
                max_iterations: 5000,
                confidence: 0.999,
                min_inliers: 8,
                seed: None,
            },
            name: Some("Strict".to_string()),
            description: Some("Fewer, more reliable correspondences".to_string()),
            ..Self::new(MetricFamily::Binary)
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    pub fn to_builder(self) -> PipelineBuilder {
        PipelineBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        let filter = if self.matcher.ratio_test || self.metric == MetricFamily::Floating {
            format!("ratio<{}", self.matcher.ratio_threshold)
        } else {
            match self.matcher.fixed_distance_threshold {
                Some(t) => format!("distance<{}", t),
                None => "unfiltered".to_string(),
            }
        };
        format!(
            "PipelineConfig: metric={}, filter={}, ransac=[threshold:{}px, confidence:{}, max_iter:{}, min_inliers:{}, seed:{}], threads={}",
            self.metric,
            filter,
            self.ransac.reprojection_threshold_px,
            self.ransac.confidence,
            self.ransac.max_iterations,
            self.ransac.min_inliers,
            self.ransac.seed.map_or_else(|| "random".to_string(), |s| s.to_string()),
            self.n_threads,
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        BruteForceMatcher::new(HammingMetric, self.matcher.clone())?;
        RansacEstimator::new(self.ransac.clone())?;
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Load from a file, choosing TOML for `.toml` and JSON otherwise
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::load_toml(path),
            _ => Self::load_json(path),
        }
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

/// Fluent API builder for a [`Pipeline`]
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metric(mut self, metric: MetricFamily) -> Self {
        self.config.metric = metric;
        self
    }

    /// Enable/disable Lowe's ratio test (ignored for floating descriptors)
    pub fn ratio_test(mut self, enable: bool) -> Self {
        self.config.matcher.ratio_test = enable;
        self
    }

    pub fn ratio_threshold(mut self, ratio: f32) -> Self {
        self.config.matcher.ratio_threshold = ratio;
        self
    }

    /// Distance cap for binary matching without ratio test; `None` disables it
    pub fn fixed_distance_threshold(mut self, threshold: Option<f32>) -> Self {
        self.config.matcher.fixed_distance_threshold = threshold;
        self
    }

    pub fn reprojection_threshold(mut self, px: f64) -> Self {
        self.config.ransac.reprojection_threshold_px = px;
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.config.ransac.max_iterations = n;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.config.ransac.confidence = confidence;
        self
    }

    pub fn min_inliers(mut self, n: usize) -> Self {
        self.config.ransac.min_inliers = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.ransac.seed = Some(seed);
        self
    }

    /// Set number of threads for parallel matching
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    pub fn preset_orb(mut self) -> Self {
        self.config = PipelineConfig::orb_preset();
        self
    }

    pub fn preset_sift(mut self) -> Self {
        self.config = PipelineConfig::sift_preset();
        self
    }

    pub fn preset_strict(mut self) -> Self {
        self.config = PipelineConfig::strict_preset();
        self
    }

    pub fn summary(&self) -> String {
        self.config.summary()
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn to_config(self) -> PipelineConfig {
        self.config
    }

    /// Validate and build the pipeline
    pub fn build(self) -> PipelineResult<Pipeline> {
        Pipeline::new(self.config)
    }
}
