use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vmatch_cli::{
    DescriptorMatrix, DescriptorSet, Detection, Homography, Keypoint, MatchOutcome, MetricFamily, Pipeline,
    PipelineBuilder, PipelineConfig, Verdict, VerifyOutcome,
};

fn perspective() -> Homography {
    Homography::from([[0.92, 0.12, 35.0], [-0.1, 0.97, 20.0], [1e-4, 5e-5, 1.0]])
}

fn random_keypoints(rng: &mut StdRng, n: usize) -> Vec<Keypoint> {
    (0..n)
        .map(|_| Keypoint::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)))
        .collect()
}

fn random_binary_rows(rng: &mut StdRng, n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|_| (0..32).map(|_| rng.r#gen()).collect()).collect()
}

fn warp(h: &Homography, kps: &[Keypoint]) -> Vec<Keypoint> {
    kps.iter()
        .map(|k| {
            let (x, y) = h.project(k.x as f64, k.y as f64).unwrap();
            Keypoint::new(x as f32, y as f32)
        })
        .collect()
}

fn binary(keypoints: Vec<Keypoint>, rows: &[Vec<u8>]) -> Detection {
    let set = DescriptorSet::Binary(DescriptorMatrix::from_rows(rows).unwrap());
    Detection::new(keypoints, Some(set))
}

/// Image B shows image A's 60 features under a perspective warp, with a few
/// flipped descriptor bits, after 20 unrelated features
fn warped_scene(seed: u64) -> (Detection, Detection) {
    let mut rng = StdRng::seed_from_u64(seed);
    let kps_a = random_keypoints(&mut rng, 60);
    let rows_a = random_binary_rows(&mut rng, 60);

    let mut kps_b = random_keypoints(&mut rng, 20);
    let mut rows_b = random_binary_rows(&mut rng, 20);
    kps_b.extend(warp(&perspective(), &kps_a));
    rows_b.extend(rows_a.iter().map(|row| {
        let mut row = row.clone();
        for _ in 0..rng.gen_range(0..=3) {
            row[rng.gen_range(0..32)] ^= 1u8 << rng.gen_range(0..8u32);
        }
        row
    }));

    (binary(kps_a, &rows_a), binary(kps_b, &rows_b))
}

fn seeded(seed: u64) -> Pipeline {
    PipelineBuilder::new().seed(seed).threads(2).build().unwrap()
}

#[test]
fn identical_binary_pairs_without_ratio_test() {
    let mut rng = StdRng::seed_from_u64(1);
    let kps = random_keypoints(&mut rng, 10);
    let rows = random_binary_rows(&mut rng, 10);
    let a = binary(kps.clone(), &rows);
    let b = binary(kps, &rows);

    let pipeline = PipelineBuilder::new()
        .ratio_test(false)
        .fixed_distance_threshold(Some(60.0))
        .seed(5)
        .build()
        .unwrap();
    let out = pipeline.run(&a, &b).unwrap();

    assert_eq!(out.matches.len(), 10);
    assert!(out.matches.iter().all(|m| m.distance == 0.0));
    assert_eq!(out.inliers.len(), 10);
    assert_eq!(out.report.inlier_ratio, 1.0);
    assert_eq!(out.report.distance_score, 1.0);
    assert!(out.report.match_ratio >= 0.3);
    assert_eq!(out.report.verdict, Verdict::High);
}

#[test]
fn warped_scene_is_verified() {
    let (a, b) = warped_scene(11);
    let out = seeded(3).run(&a, &b).unwrap();

    assert_eq!(out.match_outcome, MatchOutcome::Matched);
    assert_eq!(out.verify_outcome, VerifyOutcome::Verified);
    assert_eq!(out.matches.len(), 60);
    assert_eq!(out.inliers.len(), 60);
    assert!(out.inliers.iter().all(|m| m.train_idx == m.query_idx + 20));
    assert!(out.report.distances.max <= 3.0);
    assert_eq!(out.report.verdict, Verdict::High);

    let h = out.homography.unwrap();
    for &(x, y) in &[(0.0, 0.0), (320.0, 240.0), (600.0, 50.0)] {
        let (ex, ey) = perspective().project(x, y).unwrap();
        let (gx, gy) = h.project(x, y).unwrap();
        assert!((ex - gx).abs() < 0.5 && (ey - gy).abs() < 0.5, "({gx}, {gy}) vs ({ex}, {ey})");
    }
}

#[test]
fn floating_descriptors_with_noise() {
    let mut rng = StdRng::seed_from_u64(8);
    let kps_a = random_keypoints(&mut rng, 40);
    let rows_a: Vec<Vec<f32>> = (0..40)
        .map(|_| (0..128).map(|_| rng.gen_range(0.0..255.0)).collect())
        .collect();
    let rows_b: Vec<Vec<f32>> = rows_a
        .iter()
        .map(|row| row.iter().map(|v| v + rng.gen_range(-2.0..2.0)).collect())
        .collect();
    let shift = Homography::from([[0.98, -0.05, 12.0], [0.05, 0.98, -8.0], [0.0, 0.0, 1.0]]);
    let kps_b = warp(&shift, &kps_a);

    let a = Detection::new(kps_a, Some(DescriptorSet::Float(DescriptorMatrix::from_rows(&rows_a).unwrap())));
    let b = Detection::new(kps_b, Some(DescriptorSet::Float(DescriptorMatrix::from_rows(&rows_b).unwrap())));

    let pipeline = Pipeline::new(PipelineConfig {
        ransac: vmatch_cli::vmatch_core::RansacConfig {
            seed: Some(9),
            ..Default::default()
        },
        ..PipelineConfig::sift_preset()
    })
    .unwrap();
    let out = pipeline.run(&a, &b).unwrap();

    assert_eq!(out.matches.len(), 40);
    assert_eq!(out.inliers.len(), 40);
    assert_eq!(out.report.metric, MetricFamily::Floating);
    assert!(out.report.distances.mean < 30.0);
    assert_eq!(out.report.verdict, Verdict::High);
}

#[test]
fn unrelated_images_are_low_similarity() {
    let mut rng = StdRng::seed_from_u64(21);
    let a = binary(random_keypoints(&mut rng, 50), &random_binary_rows(&mut rng, 50));
    let b = binary(random_keypoints(&mut rng, 50), &random_binary_rows(&mut rng, 50));

    let out = seeded(4).run(&a, &b).unwrap();
    assert!(out.report.confidence < 50.0);
    assert_eq!(out.report.verdict, Verdict::Low);
}

#[test]
fn tiny_descriptor_sets_give_empty_result() {
    let mut rng = StdRng::seed_from_u64(2);
    let pipeline = seeded(1);
    for n in 0..4 {
        let a = binary(random_keypoints(&mut rng, n), &random_binary_rows(&mut rng, n));
        let b = binary(random_keypoints(&mut rng, 10), &random_binary_rows(&mut rng, 10));
        let out = pipeline.run(&a, &b).unwrap();

        assert!(out.matches.is_empty());
        assert!(out.inliers.is_empty());
        assert!(out.homography.is_none());
        assert_eq!(out.match_outcome, MatchOutcome::InsufficientDescriptors { query: n, train: 10 });
        assert_eq!(out.report.confidence, 0.0);
        assert_eq!(out.report.verdict, Verdict::Low);
    }
}

#[test]
fn empty_detections_give_zero_report() {
    let out = seeded(0).run(&Detection::default(), &Detection::default()).unwrap();
    assert_eq!(out.report.match_count, 0);
    assert_eq!(out.report.match_ratio, 0.0);
    assert_eq!(out.report.distances.mean, 0.0);
    assert_eq!(out.report.verdict.to_string(), "Low similarity");
}

#[test]
fn seeded_runs_are_reproducible() {
    let (a, b) = warped_scene(17);
    let first = seeded(42).run(&a, &b).unwrap();
    let second = seeded(42).run(&a, &b).unwrap();

    assert_eq!(first.matches, second.matches);
    assert_eq!(first.inlier_mask, second.inlier_mask);
    assert_eq!(first.homography, second.homography);
    assert_eq!(first.report, second.report);
}

#[test]
fn one_pipeline_serves_concurrent_runs() {
    let (a, b) = warped_scene(5);
    let pipeline = seeded(7);
    let expected = pipeline.run(&a, &b).unwrap();

    let outputs: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| pipeline.run(&a, &b).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for out in outputs {
        assert_eq!(out.matches, expected.matches);
        assert_eq!(out.inlier_mask, expected.inlier_mask);
        assert_eq!(out.report, expected.report);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn outputs_are_ordered_and_bounded(
        seed in any::<u64>(),
        n_a in 0usize..30,
        n_b in 0usize..30,
        ratio_test in any::<bool>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = binary(random_keypoints(&mut rng, n_a), &random_binary_rows(&mut rng, n_a));
        let b = binary(random_keypoints(&mut rng, n_b), &random_binary_rows(&mut rng, n_b));
        let pipeline = PipelineBuilder::new()
            .ratio_test(ratio_test)
            .fixed_distance_threshold(None)
            .max_iterations(200)
            .seed(seed)
            .threads(0)
            .build()
            .unwrap();
        let out = pipeline.run(&a, &b).unwrap();

        for w in out.matches.as_slice().windows(2) {
            prop_assert!(
                w[0].distance < w[1].distance
                    || (w[0].distance == w[1].distance && w[0].query_idx < w[1].query_idx)
            );
        }

        prop_assert!(out.inliers.len() <= out.matches.len());
        if out.homography.is_some() {
            prop_assert_eq!(out.inlier_mask.len(), out.matches.len());
            prop_assert_eq!(out.inliers.clone(), out.matches.select(&out.inlier_mask));
        } else {
            prop_assert!(out.inlier_mask.is_empty() && out.inliers.is_empty());
        }

        let r = &out.report;
        prop_assert!((0.0..=1.0).contains(&r.match_ratio));
        prop_assert!((0.0..=1.0).contains(&r.inlier_ratio));
        prop_assert!((0.0..=100.0).contains(&r.confidence));
    }
}
