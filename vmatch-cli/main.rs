use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vmatch_cli::{
    DescriptorInfo, Detection, Homography, Match, MatchOutcome, Pipeline, PipelineConfig, PipelineOutput, PhaseTimings,
    SimilarityReport, VerifyOutcome,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Orb,
    Sift,
    Strict,
}

/// Compare two images from their detector output and score their similarity
#[derive(Parser, Debug)]
#[command(name = "vmatch", version)]
#[command(about = "Feature matching and homography verification for two images", long_about = None)]
struct Args {
    /// Detection file (JSON) of the query image
    detection_a: PathBuf,

    /// Detection file (JSON) of the train image
    detection_b: PathBuf,

    /// Pipeline configuration file (.json or .toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from a built-in configuration
    #[arg(long, value_enum, conflicts_with = "config")]
    preset: Option<Preset>,

    /// Filter binary matches by fixed distance instead of the ratio test
    #[arg(long)]
    no_ratio_test: bool,

    /// Lowe's ratio threshold
    #[arg(long)]
    ratio: Option<f32>,

    /// Distance cap for binary matching without ratio test
    #[arg(long)]
    max_distance: Option<f32>,

    /// RANSAC reprojection threshold in pixels
    #[arg(long)]
    reprojection: Option<f64>,

    /// RANSAC seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of best raw matches to list
    #[arg(long, default_value_t = 10)]
    top_k: usize,

    /// Print a JSON summary instead of the text report
    #[arg(long)]
    json: bool,

    /// Matching threads (0 uses the global pool)
    #[arg(long)]
    threads: Option<usize>,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut cfg = match (&self.config, self.preset) {
            (Some(path), _) => PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            (None, Some(Preset::Orb)) => PipelineConfig::orb_preset(),
            (None, Some(Preset::Sift)) => PipelineConfig::sift_preset(),
            (None, Some(Preset::Strict)) => PipelineConfig::strict_preset(),
            (None, None) => PipelineConfig::default(),
        };

        if self.no_ratio_test {
            cfg.matcher.ratio_test = false;
        }
        if let Some(r) = self.ratio {
            cfg.matcher.ratio_threshold = r;
        }
        if let Some(d) = self.max_distance {
            cfg.matcher.fixed_distance_threshold = Some(d);
        }
        if let Some(px) = self.reprojection {
            cfg.ransac.reprojection_threshold_px = px;
        }
        if let Some(seed) = self.seed {
            cfg.ransac.seed = Some(seed);
        }
        if let Some(n) = self.threads {
            cfg.n_threads = n;
        }
        Ok(cfg)
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    report: &'a SimilarityReport,
    homography: Option<&'a Homography>,
    match_outcome: MatchOutcome,
    verify_outcome: VerifyOutcome,
    ransac_iterations: usize,
    timings: &'a PhaseTimings,
    descriptors_a: Option<DescriptorInfo>,
    descriptors_b: Option<DescriptorInfo>,
    top_matches: &'a [Match],
}

fn read_detection(path: &Path) -> Result<Detection> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid detection file {}", path.display()))
}

fn print_report(out: &PipelineOutput, top_k: usize) {
    let r = &out.report;
    let d = &r.distances;

    println!("Metric:          {}", r.metric);
    println!("Keypoints:       A={} B={}", r.keypoints_a, r.keypoints_b);
    for (image, info) in [('A', out.descriptors_a), ('B', out.descriptors_b)] {
        match info {
            Some(info) => println!("Descriptors {}:   {}", image, info),
            None => println!("Descriptors {}:   none", image),
        }
    }
    println!("Matches:         {} ({:.1}% of the smaller keypoint set)", r.match_count, r.match_ratio_percent());
    println!("Inliers:         {} ({:.1}% of matches)", r.inlier_count, r.inlier_ratio_percent());
    println!(
        "Distances:       mean {:.2}, median {:.2}, std {:.2}, min {:.2}, max {:.2}",
        d.mean, d.median, d.std_dev, d.min, d.max
    );
    println!("Distance score:  {:.3}", r.distance_score);
    println!("Confidence:      {:.1} / 100", r.confidence);
    println!("Verdict:         {}", r.verdict);

    match &out.homography {
        Some(h) => {
            println!("Homography ({} RANSAC iterations):", out.ransac_iterations);
            for row in h.rows() {
                println!("    [{:>12.6} {:>12.6} {:>12.6}]", row[0], row[1], row[2]);
            }
        }
        None => println!("Homography:      none ({:?})", out.verify_outcome),
    }

    let t = &out.timings;
    println!(
        "Timings:         matching {:.2?}, verification {:.2?}, scoring {:.2?}, total {:.2?}",
        t.matching, t.verification, t.scoring, t.total
    );
    println!(
        "                 extraction A {:.2?}, B {:.2?}, end to end {:.2?}",
        t.extraction_a,
        t.extraction_b,
        t.end_to_end()
    );

    let top = out.top_matches(top_k);
    if !top.is_empty() {
        println!("Top {} matches:", top.len());
        for m in top {
            println!("    A#{:<5} -> B#{:<5} distance {:.2}", m.query_idx, m.train_idx, m.distance);
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;
    info!("{}", config.summary());

    let a = read_detection(&args.detection_a)?;
    let b = read_detection(&args.detection_b)?;
    info!(keypoints_a = a.keypoint_count(), keypoints_b = b.keypoint_count(), "detections loaded");

    let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
    let out = pipeline.run(&a, &b)?;

    if args.json {
        let summary = JsonSummary {
            report: &out.report,
            homography: out.homography.as_ref(),
            match_outcome: out.match_outcome,
            verify_outcome: out.verify_outcome,
            ransac_iterations: out.ransac_iterations,
            timings: &out.timings,
            descriptors_a: out.descriptors_a,
            descriptors_b: out.descriptors_b,
            top_matches: out.top_matches(args.top_k),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&out, args.top_k);
    }
    Ok(())
}
