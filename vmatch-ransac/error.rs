use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RansacError {
    #[error("Invalid reprojection threshold: {0} px (must be finite and > 0)")]
    InvalidThreshold(f64),

    #[error("Invalid confidence: {0} (must be in (0, 1))")]
    InvalidConfidence(f64),

    #[error("Invalid iteration cap: {0} (must be > 0)")]
    InvalidIterations(usize),

    #[error("Minimum inlier support {0} is below the 4 points a homography needs")]
    InvalidMinInliers(usize),

    #[error("Match #{position} refers to keypoint {index} of image {image}, which has only {available}")]
    KeypointOutOfRange {
        image: char,
        position: usize,
        index: usize,
        available: usize,
    },

    #[error("Keypoint {index} of image {image} has non-finite coordinates ({x}, {y})")]
    NonFiniteKeypoint { image: char, index: usize, x: f32, y: f32 },
}

pub type RansacResult<T> = Result<T, RansacError>;
