//! High-level two-image similarity: brute-force descriptor matching, RANSAC
//! homography verification and a bounded confidence score.

mod config;
mod error;
mod pipeline;
pub mod scorer;

pub use config::{PipelineBuilder, PipelineConfig};
pub use error::{ConfigError, ConfigResult, PipelineError, PipelineResult};
pub use pipeline::{DescriptorInfo, PhaseTimings, Pipeline, PipelineOutput};
pub use scorer::{score, DistanceStats, SimilarityReport, Verdict};

pub use vmatch_bf::{self, MatchOutcome};
pub use vmatch_core::{self, DescriptorMatrix, DescriptorSet, Detection, Homography, Keypoint, Match, MatchSet, MetricFamily};
pub use vmatch_ransac::{self, VerifyOutcome};

/// Build a pipeline from `config` and run it once
pub fn compare(a: &Detection, b: &Detection, config: PipelineConfig) -> PipelineResult<PipelineOutput> {
    Pipeline::new(config)?.run(a, b)
}
