//! Similarity scoring from raw and verified matches.

use vmatch_core::{MatchSet, MetricFamily};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weight of the inlier ratio in the confidence score
pub const INLIER_WEIGHT: f64 = 0.4;
/// Cap on the match ratio term
pub const MATCH_RATIO_CAP: f64 = 0.3;
/// Weight of the distance score in the confidence score
pub const DISTANCE_WEIGHT: f64 = 0.3;

pub const HIGH_SIMILARITY: f64 = 80.0;
pub const MEDIUM_SIMILARITY: f64 = 50.0;

/// Mean distance at which the distance score reaches zero
pub fn distance_scale(metric: MetricFamily) -> f64 {
    match metric {
        MetricFamily::Binary => 60.0,
        MetricFamily::Floating => 300.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Verdict {
    High,
    Medium,
    Low,
}

impl Verdict {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_SIMILARITY {
            Verdict::High
        } else if confidence >= MEDIUM_SIMILARITY {
            Verdict::Medium
        } else {
            Verdict::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::High => "High similarity",
            Verdict::Medium => "Medium similarity",
            Verdict::Low => "Low similarity",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary statistics of match distances; all zero for an empty set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DistanceStats {
    pub fn from_distances(distances: impl IntoIterator<Item = f32>) -> Self {
        let mut d: Vec<f64> = distances.into_iter().map(f64::from).collect();
        if d.is_empty() {
            return Self::default();
        }
        d.sort_by(f64::total_cmp);

        let n = d.len();
        let mean = d.iter().sum::<f64>() / n as f64;
        let variance = d.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (d[n / 2 - 1] + d[n / 2]) / 2.0
        } else {
            d[n / 2]
        };

        Self {
            mean,
            median,
            std_dev: variance.sqrt(),
            min: d[0],
            max: d[n - 1],
        }
    }
}

/// Outcome of one comparison, built once by [`score`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimilarityReport {
    pub metric: MetricFamily,
    pub keypoints_a: usize,
    pub keypoints_b: usize,
    pub match_count: usize,
    pub inlier_count: usize,
    /// Matches per keypoint of the smaller image, in [0, 1]
    pub match_ratio: f64,
    /// Share of matches that survived verification, in [0, 1]
    pub inlier_ratio: f64,
    pub distances: DistanceStats,
    /// 1 for a zero mean distance, falling linearly to 0 at the metric's scale
    pub distance_score: f64,
    /// In [0, 100]
    pub confidence: f64,
    pub verdict: Verdict,
}

impl SimilarityReport {
    pub fn match_ratio_percent(&self) -> f64 {
        self.match_ratio * 100.0
    }

    pub fn inlier_ratio_percent(&self) -> f64 {
        self.inlier_ratio * 100.0
    }

    fn empty(metric: MetricFamily, keypoints_a: usize, keypoints_b: usize) -> Self {
        Self {
            metric,
            keypoints_a,
            keypoints_b,
            match_count: 0,
            inlier_count: 0,
            match_ratio: 0.0,
            inlier_ratio: 0.0,
            distances: DistanceStats::default(),
            distance_score: 0.0,
            confidence: 0.0,
            verdict: Verdict::Low,
        }
    }
}

/// Combine match counts and distances into a confidence score.
///
/// ```text
/// confidence = 100 * (0.4 * inlier_ratio + min(0.3, match_ratio) + 0.3 * distance_score)
/// ```
///
/// clamped to [0, 100]. Statistics cover every raw match, not only inliers.
pub fn score(
    matches: &MatchSet,
    inliers: &MatchSet,
    keypoints_a: usize,
    keypoints_b: usize,
    metric: MetricFamily,
) -> SimilarityReport {
    if matches.is_empty() {
        return SimilarityReport::empty(metric, keypoints_a, keypoints_b);
    }

    let match_count = matches.len();
    let inlier_count = inliers.len();

    let smaller = keypoints_a.min(keypoints_b);
    let match_ratio = if smaller == 0 {
        0.0
    } else {
        (match_count as f64 / smaller as f64).min(1.0)
    };
    let inlier_ratio = inlier_count as f64 / match_count as f64;

    let distances = DistanceStats::from_distances(matches.distances());
    let scale = distance_scale(metric);
    let distance_score = ((scale - distances.mean) / scale).max(0.0);

    let raw = INLIER_WEIGHT * inlier_ratio + match_ratio.min(MATCH_RATIO_CAP) + DISTANCE_WEIGHT * distance_score;
    let confidence = (100.0 * raw).clamp(0.0, 100.0);

    SimilarityReport {
        metric,
        keypoints_a,
        keypoints_b,
        match_count,
        inlier_count,
        match_ratio,
        inlier_ratio,
        distances,
        distance_score,
        confidence,
        verdict: Verdict::from_confidence(confidence),
    }
}
