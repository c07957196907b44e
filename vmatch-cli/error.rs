use thiserror::Error;
use vmatch_bf::MatchError;
use vmatch_core::MetricFamily;
use vmatch_ransac::RansacError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid matcher settings: {0}")]
    Matcher(#[from] MatchError),

    #[error("Invalid RANSAC settings: {0}")]
    Ransac(#[from] RansacError),

    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Could not write TOML config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Image {image} carries {found} descriptors but the pipeline is configured for {expected}")]
    MetricMismatch {
        image: char,
        expected: MetricFamily,
        found: MetricFamily,
    },

    #[error("Image {image} has {keypoints} keypoints but {descriptors} descriptor rows")]
    MisalignedDetection {
        image: char,
        keypoints: usize,
        descriptors: usize,
    },

    #[error("Matching failed: {0}")]
    Matcher(#[from] MatchError),

    #[error("Verification failed: {0}")]
    Verifier(#[from] RansacError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
