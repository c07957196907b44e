use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use vmatch_cli::{DescriptorMatrix, DescriptorSet, Detection, Homography, Keypoint, PipelineBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎯 Two-Image Similarity Demo");
    println!("============================\n");

    let mut rng = StdRng::seed_from_u64(42);
    let warp = Homography::from([[0.95, 0.08, 30.0], [-0.06, 1.01, 12.0], [5e-5, 2e-5, 1.0]]);

    let kps_a: Vec<Keypoint> = (0..80)
        .map(|_| Keypoint::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)))
        .collect();
    let rows_a: Vec<Vec<u8>> = (0..80)
        .map(|_| (0..32).map(|_| rng.r#gen()).collect())
        .collect();

    // Every fifth feature of B is moved away from where the warp puts it
    let kps_b: Vec<Keypoint> = kps_a
        .iter()
        .enumerate()
        .filter_map(|(i, k)| {
            let (x, y) = warp.project(k.x as f64, k.y as f64)?;
            let off = if i % 5 == 0 { 45.0 } else { 0.0 };
            Some(Keypoint::new(x as f32 + off, y as f32 - off))
        })
        .collect();

    let a = Detection::new(kps_a, Some(DescriptorSet::Binary(DescriptorMatrix::from_rows(&rows_a)?)))
        .with_extraction_time(Duration::from_millis(5));
    let b = Detection::new(kps_b, Some(DescriptorSet::Binary(DescriptorMatrix::from_rows(&rows_a)?)))
        .with_extraction_time(Duration::from_millis(6));

    let builder = PipelineBuilder::new().preset_orb().seed(1);
    println!("⚙️  {}", builder.summary());

    let out = builder.build()?.run(&a, &b)?;
    let r = &out.report;

    println!("\n📊 Results");
    println!("   Matches:     {} ({:.1}%)", r.match_count, r.match_ratio_percent());
    println!("   Inliers:     {} ({:.1}%)", r.inlier_count, r.inlier_ratio_percent());
    println!("   Confidence:  {:.1}", r.confidence);
    println!("   Verdict:     {}", r.verdict);
    if let Some(h) = out.homography {
        println!("   Homography:  {:?}", h.rows());
    }
    println!("   Pipeline:    {:.2?} (end to end {:.2?})", out.timings.total, out.timings.end_to_end());

    println!("\n🏆 Top 5 matches");
    for m in out.top_matches(5) {
        println!("   A#{} -> B#{} @ {}", m.query_idx, m.train_idx, m.distance);
    }
    Ok(())
}
