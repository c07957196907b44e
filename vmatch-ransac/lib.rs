//! Robust homography estimation between two keypoint sets.
//!
//! Candidate matches are mapped to point pairs, a four-point DLT model is
//! sampled repeatedly, and the hypothesis with the largest reprojection
//! consensus is refit on its inliers.

mod builder;
mod dlt;
mod error;
mod estimator;
mod types;
mod verifier;

pub use builder::VerifierBuilder;
pub use dlt::{fit_homography, reprojection_error_sq, sample_is_degenerate};
pub use error::{RansacError, RansacResult};
pub use estimator::{adaptive_iterations, RansacEstimator};
pub use types::{Consensus, PointPair, Verification, VerifyOutcome};
pub use verifier::{point_pairs, GeometricVerifier};
