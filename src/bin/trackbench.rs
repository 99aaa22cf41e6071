use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::info;
use tracker_eval::cv::{opencv_registry, VideoSource};
use tracker_eval::{EvalConfig, Evaluator, GroundTruth, TrackerKind};

/// Times every OpenCV tracker over the same video and initial box.
#[derive(Debug, Parser)]
#[command(name = "trackbench", version)]
struct Opts {
    /// Input video
    video: PathBuf,

    /// Ground truth; its first box initialises every tracker
    ground_truth: PathBuf,

    /// Runs per tracker
    #[arg(short, long, default_value_t = 10)]
    runs: u32,

    /// Trackers to time, all of them by default
    #[arg(short, long, value_delimiter = ',')]
    trackers: Vec<String>,
}

struct Timing {
    wall: Duration,
    update: Duration,
    updates: usize,
    score: Option<f64>,
}

fn bench(
    opts: &Opts,
    name: &str,
    ground_truth: &GroundTruth,
    evaluator: &Evaluator<'_>,
) -> anyhow::Result<Timing> {
    let registry = opencv_registry();
    let mut timing = Timing {
        wall: Duration::ZERO,
        update: Duration::ZERO,
        updates: 0,
        score: None,
    };

    for run in 0..opts.runs {
        let mut tracker = registry.create(name)?;
        let mut source = VideoSource::open(&opts.video)?;

        let started = Instant::now();
        let report = evaluator.run(&mut source, &mut tracker)?;
        timing.wall += started.elapsed();
        timing.update += report.update_time();
        timing.updates += report.records.len();

        if run == 0 {
            timing.score = report.mean();
            info!(
                "{}: {} frames, {} scored against {} boxes",
                name,
                report.frames,
                report.records.len(),
                ground_truth.len()
            );
        }
    }

    Ok(timing)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    anyhow::ensure!(opts.runs > 0, "--runs must be at least 1");

    let ground_truth = GroundTruth::<i32>::load(&opts.ground_truth)
        .with_context(|| format!("loading ground truth {}", opts.ground_truth.display()))?;
    let evaluator = Evaluator::new(&ground_truth, EvalConfig::default());

    let names: Vec<String> = if opts.trackers.is_empty() {
        TrackerKind::ALL.iter().map(|k| k.name().to_string()).collect()
    } else {
        opts.trackers.clone()
    };

    for name in &names {
        let timing = bench(&opts, name, &ground_truth, &evaluator)?;
        let per_run = timing.wall.as_secs_f64() * 1000.0 / opts.runs as f64;
        let per_update = if timing.updates > 0 {
            timing.update.as_secs_f64() * 1000.0 / timing.updates as f64
        } else {
            0.0
        };

        println!(
            "{} tracker, time used: {:.1}ms per run, {:.3}ms per update, score {}",
            name,
            per_run,
            per_update,
            timing
                .score
                .map_or_else(|| "n/a".to_string(), |s| format!("{:.6}", s))
        );
    }

    Ok(())
}
