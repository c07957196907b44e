use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod config;
mod descriptor;
mod error;
mod homography;
mod matches;

pub use config::{MatcherConfig, RansacConfig};
pub use descriptor::{DescriptorMatrix, DescriptorSet};
pub use error::{DescriptorError, DescriptorResult};
pub use homography::Homography;
pub use matches::{Match, MatchSet};

/// Fewest correspondences that determine a homography
pub const MIN_CORRESPONDENCES: usize = 4;

/// Key-point ≙ detected location + optional detector attributes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: f32,
    /// Orientation in radians
    #[cfg_attr(feature = "serde", serde(default))]
    pub angle: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub response: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub octave: i32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, ..Self::default() }
    }
}

/// Distance convention a descriptor set is compatible with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetricFamily {
    /// Packed bits under Hamming distance
    Binary,
    /// Real vectors under Euclidean distance
    Floating,
}

impl std::fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricFamily::Binary => write!(f, "binary/hamming"),
            MetricFamily::Floating => write!(f, "floating/euclidean"),
        }
    }
}

/// Output of an external feature detector for one image
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Detection {
    pub keypoints: Vec<Keypoint>,
    /// Row `i` describes `keypoints[i]`; `None` when the detector found nothing
    #[cfg_attr(feature = "serde", serde(default))]
    pub descriptors: Option<DescriptorSet>,
    #[cfg_attr(feature = "serde", serde(default, rename = "extraction_time_ms", with = "duration_ms"))]
    pub extraction_time: Duration,
}

impl Detection {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Option<DescriptorSet>) -> Self {
        Self {
            keypoints,
            descriptors,
            extraction_time: Duration::ZERO,
        }
    }

    pub fn with_extraction_time(mut self, elapsed: Duration) -> Self {
        self.extraction_time = elapsed;
        self
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }

    /// Descriptor rows, 0 when descriptors are absent
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.as_ref().map_or(0, DescriptorSet::len)
    }

    /// Keypoints and descriptor rows line up (vacuously true without descriptors)
    pub fn is_aligned(&self) -> bool {
        self.descriptors
            .as_ref()
            .map_or(true, |d| d.len() == self.keypoints.len())
    }
}

/// Serde adapter storing a `Duration` as fractional milliseconds
#[cfg(feature = "serde")]
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1e3)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(serde::de::Error::custom("extraction time must be a non-negative number of milliseconds"));
        }
        Duration::try_from_secs_f64(ms / 1e3).map_err(serde::de::Error::custom)
    }
}

/// Default worker count for the rayon pool
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Build a dedicated Rayon pool with `n_threads` workers
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("vmatch-{}", i))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_alignment() {
        let kps = vec![Keypoint::new(1.0, 2.0), Keypoint::new(3.0, 4.0)];
        let rows = vec![vec![0u8; 32], vec![1u8; 32]];
        let set = DescriptorSet::Binary(DescriptorMatrix::from_rows(&rows).unwrap());

        let det = Detection::new(kps.clone(), Some(set));
        assert!(det.is_aligned());
        assert_eq!(det.descriptor_count(), 2);

        let bare = Detection::new(kps, None);
        assert!(bare.is_aligned());
        assert_eq!(bare.descriptor_count(), 0);

        let short = Detection::new(
            vec![Keypoint::new(0.0, 0.0)],
            Some(DescriptorSet::Binary(DescriptorMatrix::from_rows(&rows).unwrap())),
        );
        assert!(!short.is_aligned());
    }

    #[test]
    fn test_dedicated_pool() {
        let pool = build_thread_pool(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        assert!(default_threads() >= 1);
    }

    #[test]
    fn test_metric_family_display() {
        assert_eq!(MetricFamily::Binary.to_string(), "binary/hamming");
        assert_eq!(MetricFamily::Floating.to_string(), "floating/euclidean");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_detection_json() {
        let json = r#"{
            "keypoints": [{"x": 1.5, "y": 2.0}, {"x": 3.0, "y": 4.0, "angle": 0.5}],
            "descriptors": {"kind": "float", "rows": [[0.0, 1.0], [2.0, 3.0]]},
            "extraction_time_ms": 12.5
        }"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.keypoint_count(), 2);
        assert_eq!(det.keypoints[1].angle, 0.5);
        assert_eq!(det.keypoints[0].size, 0.0);
        assert_eq!(det.descriptors.as_ref().unwrap().family(), MetricFamily::Floating);
        assert!((det.extraction_time.as_secs_f64() - 0.0125).abs() < 1e-9);

        let bare: Detection = serde_json::from_str(r#"{"keypoints": []}"#).unwrap();
        assert!(bare.descriptors.is_none());
        assert_eq!(bare.extraction_time, Duration::ZERO);

        let huge = serde_json::from_str::<Detection>(r#"{"keypoints": [], "extraction_time_ms": 1e300}"#);
        assert!(huge.is_err());
        assert!(serde_json::from_str::<Detection>(r#"{"keypoints": [], "extraction_time_ms": -1.0}"#).is_err());
    }
}
