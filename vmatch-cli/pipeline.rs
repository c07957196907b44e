//! Matcher → verifier → scorer orchestration for one pair of detections.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::scorer::{score, SimilarityReport};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use vmatch_bf::{BruteForceMatcher, EuclideanMetric, HammingMetric, MatchOutcome, MatchReport};
use vmatch_core::{build_thread_pool, DescriptorSet, Detection, Homography, Match, MatchSet, MetricFamily};
use vmatch_ransac::{GeometricVerifier, VerifyOutcome};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Wall-clock time of each phase
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PhaseTimings {
    #[cfg_attr(feature = "serde", serde(rename = "matching_ms", with = "vmatch_core::duration_ms"))]
    pub matching: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "verification_ms", with = "vmatch_core::duration_ms"))]
    pub verification: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "scoring_ms", with = "vmatch_core::duration_ms"))]
    pub scoring: Duration,
    /// Whole `Pipeline::run`, including input checks
    #[cfg_attr(feature = "serde", serde(rename = "total_ms", with = "vmatch_core::duration_ms"))]
    pub total: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "extraction_a_ms", with = "vmatch_core::duration_ms"))]
    pub extraction_a: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "extraction_b_ms", with = "vmatch_core::duration_ms"))]
    pub extraction_b: Duration,
}

impl PhaseTimings {
    /// Detector extraction of both images plus the pipeline itself
    pub fn end_to_end(&self) -> Duration {
        self.extraction_a + self.extraction_b + self.total
    }
}

/// Shape of one image's descriptor set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DescriptorInfo {
    pub element_type: &'static str,
    /// Elements per descriptor
    pub length: usize,
    pub count: usize,
}

impl DescriptorInfo {
    pub fn of(set: &DescriptorSet) -> Self {
        Self {
            element_type: set.element_type(),
            length: set.descriptor_len(),
            count: set.len(),
        }
    }
}

impl std::fmt::Display for DescriptorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {} {}", self.count, self.length, self.element_type)
    }
}

/// Everything one comparison produced
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PipelineOutput {
    /// Raw matches, sorted by distance
    pub matches: MatchSet,
    /// Aligned with `matches`; empty when verification did not run
    pub inlier_mask: Vec<bool>,
    pub inliers: MatchSet,
    pub homography: Option<Homography>,
    pub report: SimilarityReport,
    pub match_outcome: MatchOutcome,
    pub verify_outcome: VerifyOutcome,
    pub ransac_iterations: usize,
    pub timings: PhaseTimings,
    /// `None` for an image without descriptors
    pub descriptors_a: Option<DescriptorInfo>,
    pub descriptors_b: Option<DescriptorInfo>,
}

impl PipelineOutput {
    /// The `k` closest raw matches
    pub fn top_matches(&self, k: usize) -> &[Match] {
        self.matches.top_k(k)
    }
}

#[derive(Debug)]
enum Matcher {
    Binary(BruteForceMatcher<HammingMetric>),
    Floating(BruteForceMatcher<EuclideanMetric>),
}

/// Reusable, thread-safe comparison pipeline
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    matcher: Matcher,
    verifier: GeometricVerifier,
    pool: Option<rayon::ThreadPool>,
}

impl Pipeline {
    /// Validate `config` and prepare matcher, verifier and worker pool
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;

        let matcher = match config.metric {
            MetricFamily::Binary => Matcher::Binary(BruteForceMatcher::new(HammingMetric, config.matcher.clone())?),
            MetricFamily::Floating => {
                Matcher::Floating(BruteForceMatcher::new(EuclideanMetric, config.matcher.clone())?)
            }
        };
        let verifier = GeometricVerifier::new(config.ransac.clone())?;
        let pool = match config.n_threads {
            0 => None,
            n => Some(build_thread_pool(n)?),
        };

        debug!(config = %config.summary(), "pipeline ready");
        Ok(Self {
            config,
            matcher,
            verifier,
            pool,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compare image A (query) against image B (train)
    pub fn run(&self, a: &Detection, b: &Detection) -> PipelineResult<PipelineOutput> {
        let t0 = Instant::now();
        self.check_detection('A', a)?;
        self.check_detection('B', b)?;

        let matched = self.match_detections(a, b)?;
        let verification = self.verifier.verify(&matched.matches, &a.keypoints, &b.keypoints)?;

        let t_score = Instant::now();
        let report = score(
            &matched.matches,
            &verification.inliers,
            a.keypoint_count(),
            b.keypoint_count(),
            self.config.metric,
        );
        let scoring = t_score.elapsed();

        let timings = PhaseTimings {
            matching: matched.elapsed,
            verification: verification.elapsed,
            scoring,
            total: t0.elapsed(),
            extraction_a: a.extraction_time,
            extraction_b: b.extraction_time,
        };

        info!(
            matches = report.match_count,
            inliers = report.inlier_count,
            confidence = report.confidence,
            verdict = %report.verdict,
            total = ?timings.total,
            "comparison done"
        );

        Ok(PipelineOutput {
            matches: matched.matches,
            inlier_mask: verification.inlier_mask,
            inliers: verification.inliers,
            homography: verification.homography,
            report,
            match_outcome: matched.outcome,
            verify_outcome: verification.outcome,
            ransac_iterations: verification.iterations,
            timings,
            descriptors_a: a.descriptors.as_ref().map(DescriptorInfo::of),
            descriptors_b: b.descriptors.as_ref().map(DescriptorInfo::of),
        })
    }

    fn check_detection(&self, image: char, d: &Detection) -> PipelineResult<()> {
        // An empty set of the other family carries nothing to match
        if let Some(set) = d.descriptors.as_ref().filter(|s| !s.is_empty()) {
            if set.family() != self.config.metric {
                return Err(PipelineError::MetricMismatch {
                    image,
                    expected: self.config.metric,
                    found: set.family(),
                });
            }
        }
        if !d.is_aligned() {
            return Err(PipelineError::MisalignedDetection {
                image,
                keypoints: d.keypoint_count(),
                descriptors: d.descriptor_count(),
            });
        }
        Ok(())
    }

    fn match_detections(&self, a: &Detection, b: &Detection) -> PipelineResult<MatchReport> {
        let (da, db) = (a.descriptors.as_ref(), b.descriptors.as_ref());
        let run = || match &self.matcher {
            Matcher::Binary(m) => m.match_descriptors(da.and_then(DescriptorSet::as_binary), db.and_then(DescriptorSet::as_binary)),
            Matcher::Floating(m) => m.match_descriptors(da.and_then(DescriptorSet::as_float), db.and_then(DescriptorSet::as_float)),
        };
        let report = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        Ok(report?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineBuilder;
    use crate::scorer::Verdict;
    use vmatch_core::{DescriptorMatrix, Keypoint};
    use vmatch_ransac::RansacError;

    fn binary_detection(rows: &[[u8; 4]], keypoints: Vec<Keypoint>) -> Detection {
        Detection::new(keypoints, Some(DescriptorSet::Binary(DescriptorMatrix::from_rows(rows).unwrap())))
    }

    fn grid_keypoints(n: usize) -> Vec<Keypoint> {
        (0..n)
            .map(|i| Keypoint::new((i % 4) as f32 * 50.0 + i as f32, (i / 4) as f32 * 40.0 + 0.5 * (i * i % 5) as f32))
            .collect()
    }

    fn distinct_rows(n: usize) -> Vec<[u8; 4]> {
        (0..n).map(|i| [1u8 << (i % 8), (i * 37) as u8, !(i as u8), (i * 11) as u8]).collect()
    }

    fn pipeline() -> Pipeline {
        PipelineBuilder::new().ratio_test(false).seed(21).threads(2).build().unwrap()
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }

    #[test]
    fn test_identical_detections_high_similarity() {
        let rows = distinct_rows(10);
        let a = binary_detection(&rows, grid_keypoints(10));
        let b = a.clone();

        let out = pipeline().run(&a, &b).unwrap();
        assert_eq!(out.matches.len(), 10);
        assert!(out.matches.iter().all(|m| m.distance == 0.0 && m.query_idx == m.train_idx));
        assert_eq!(out.inliers.len(), 10);
        assert_eq!(out.verify_outcome, VerifyOutcome::Verified);
        assert_eq!(out.report.verdict, Verdict::High);
        assert!((out.report.confidence - 100.0).abs() < 1e-9);
        assert_eq!(out.top_matches(3).len(), 3);
    }

    #[test]
    fn test_missing_descriptors_low_similarity() {
        let a = Detection::new(grid_keypoints(6), None);
        let b = Detection::default();
        let out = pipeline().run(&a, &b).unwrap();

        assert!(out.matches.is_empty());
        assert!(out.inlier_mask.is_empty());
        assert!(out.homography.is_none());
        assert_eq!(out.match_outcome, MatchOutcome::InsufficientDescriptors { query: 0, train: 0 });
        assert_eq!(out.verify_outcome, VerifyOutcome::InsufficientMatches { found: 0 });
        assert_eq!(out.report.confidence, 0.0);
        assert_eq!(out.report.verdict, Verdict::Low);
        assert_eq!(out.report.keypoints_a, 6);
    }

    #[test]
    fn test_metric_mismatch() {
        let a = binary_detection(&distinct_rows(5), grid_keypoints(5));
        let b = Detection::new(
            grid_keypoints(5),
            Some(DescriptorSet::Float(DescriptorMatrix::from_flat(vec![0.5; 20], 4).unwrap())),
        );
        let err = pipeline().run(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MetricMismatch {
                image: 'B',
                expected: MetricFamily::Binary,
                found: MetricFamily::Floating
            }
        ));
    }

    #[test]
    fn test_empty_set_of_other_family_is_not_a_mismatch() {
        let a = binary_detection(&distinct_rows(5), grid_keypoints(5));
        let b = Detection::new(Vec::new(), Some(DescriptorSet::Float(DescriptorMatrix::from_flat(Vec::new(), 128).unwrap())));

        let out = pipeline().run(&a, &b).unwrap();
        assert!(out.matches.is_empty());
        assert_eq!(out.report.confidence, 0.0);
        assert_eq!(out.report.verdict, Verdict::Low);
        assert_eq!(out.descriptors_b.unwrap().count, 0);
    }

    #[test]
    fn test_non_finite_keypoint_is_an_error() {
        let rows = distinct_rows(10);
        let mut kps = grid_keypoints(10);
        kps[3].x = f32::NAN;
        let a = binary_detection(&rows, kps);
        let b = binary_detection(&rows, grid_keypoints(10));

        let err = pipeline().run(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Verifier(RansacError::NonFiniteKeypoint { image: 'A', index: 3, .. })
        ));

        let mut kps = grid_keypoints(10);
        kps[6].y = f32::INFINITY;
        let b = binary_detection(&rows, kps);
        let err = pipeline().run(&binary_detection(&rows, grid_keypoints(10)), &b).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Verifier(RansacError::NonFiniteKeypoint { image: 'B', index: 6, .. })
        ));
    }

    #[test]
    fn test_descriptor_info_reported() {
        let rows = distinct_rows(6);
        let a = binary_detection(&rows, grid_keypoints(6));
        let out = pipeline().run(&a, &Detection::default()).unwrap();

        let info = out.descriptors_a.unwrap();
        assert_eq!(info, DescriptorInfo { element_type: "uint8", length: 4, count: 6 });
        assert_eq!(info.to_string(), "6 x 4 uint8");
        assert!(out.descriptors_b.is_none());
    }

    #[test]
    fn test_misaligned_detection() {
        let a = binary_detection(&distinct_rows(6), grid_keypoints(5));
        let err = pipeline().run(&a, &a.clone()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MisalignedDetection {
                image: 'A',
                keypoints: 5,
                descriptors: 6
            }
        ));
    }

    #[test]
    fn test_timings_accumulate() {
        let rows = distinct_rows(8);
        let a = binary_detection(&rows, grid_keypoints(8)).with_extraction_time(Duration::from_millis(4));
        let b = binary_detection(&rows, grid_keypoints(8)).with_extraction_time(Duration::from_millis(6));
        let out = pipeline().run(&a, &b).unwrap();

        let t = out.timings;
        assert!(t.total >= t.matching + t.verification);
        assert_eq!(t.extraction_a, Duration::from_millis(4));
        assert_eq!(t.end_to_end(), t.total + Duration::from_millis(10));
    }

    #[test]
    fn test_global_pool_variant() {
        let p = PipelineBuilder::new().threads(0).seed(2).build().unwrap();
        let rows = distinct_rows(6);
        let a = binary_detection(&rows, grid_keypoints(6));
        assert_eq!(p.run(&a, &a).unwrap().matches.len(), 6);
    }
}
