use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracker_eval::cv::{opencv_registry, Adjustment, VideoRenderer, VideoSource};
use tracker_eval::render::Renderer;
use tracker_eval::{
    EvalConfig, Evaluator, ExhaustionPolicy, Filtered, FrameOverflow, GroundTruth, Metric,
    Outcome, Report, Schedule, Status,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Iou,
    Unbiased,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverflowArg {
    Extrapolate,
    Clip,
    Reject,
}

impl From<OverflowArg> for FrameOverflow {
    fn from(o: OverflowArg) -> Self {
        match o {
            OverflowArg::Extrapolate => FrameOverflow::Extrapolate,
            OverflowArg::Clip => FrameOverflow::Clip,
            OverflowArg::Reject => FrameOverflow::Reject,
        }
    }
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Iou => Metric::Iou,
            MetricArg::Unbiased => Metric::Unbiased,
        }
    }
}

/// Scores an OpenCV tracker against annotated ground truth using plain and
/// unbiased IoU.
#[derive(Debug, Parser)]
#[command(name = "trackeval", version)]
struct Opts {
    /// Input video
    video: PathBuf,

    /// Ground truth, one `[W x H from (X, Y)]` line per frame
    ground_truth: PathBuf,

    /// MIL, Boosting, KCF, TLD, MOSSE, CSRT or MedianFlow
    tracker: String,

    /// JSON evaluation config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Primary metric
    #[arg(short, long, value_enum)]
    metric: Option<MetricArg>,

    /// Unbiased IoU for boxes reaching past the frame
    #[arg(long, value_enum)]
    frame_overflow: Option<OverflowArg>,

    /// Score only N evenly spaced frames (ground truth holds N + 1 boxes)
    #[arg(short = 'n', long, value_name = "N")]
    checkpoints: Option<usize>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<usize>,

    /// Fail instead of truncating when the video ends early
    #[arg(long)]
    strict: bool,

    /// Write an annotated video here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gamma correction applied to every frame
    #[arg(long)]
    gamma: Option<f64>,

    /// Contrast gain applied to every frame
    #[arg(long, requires = "beta")]
    alpha: Option<f64>,

    /// Brightness offset applied to every frame
    #[arg(long, requires = "alpha")]
    beta: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log every scored frame
    #[arg(short, long)]
    verbose: bool,
}

impl Opts {
    fn eval_config(&self) -> anyhow::Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => EvalConfig::default(),
        };

        if let Some(metric) = self.metric {
            config.metric = metric.into();
        }
        if let Some(overflow) = self.frame_overflow {
            config.frame_overflow = overflow.into();
        }
        if let Some(count) = self.checkpoints {
            config.schedule = Schedule::Checkpoints(count);
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        if self.strict {
            config.on_exhausted = ExhaustionPolicy::Fail;
        }

        Ok(config)
    }
}

fn print_report(report: &Report, tracker: &str) {
    for record in &report.records {
        match &record.outcome {
            Outcome::Tracked { score, .. } => println!(
                "{} frame {}: IoU {:.6} unbiased IoU {:.6}",
                tracker, record.frame, score.iou, score.unbiased_iou
            ),
            Outcome::Failed => println!("{} frame {}: tracking failed", tracker, record.frame),
        }
    }

    let label = match report.metric {
        Metric::Iou => "IoU accuracy",
        Metric::Unbiased => "Unbiased IoU accuracy",
    };

    match report.mean() {
        Some(mean) => println!("{}: {:.6}", label, mean),
        None => println!("{}: n/a", label),
    }

    println!(
        "failures: {}/{} ({:.1}%)",
        report.failures(),
        report.records.len(),
        report.failure_rate() * 100.0
    );

    if let Some(t) = report.mean_update_time() {
        println!("mean update time: {:.3}ms", t.as_secs_f64() * 1000.0);
    }

    if let Status::Aborted(reason) = report.status {
        println!("aborted: {:?}", reason);
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = opts.eval_config()?;
    let ground_truth = GroundTruth::<i32>::load(&opts.ground_truth)
        .with_context(|| format!("loading ground truth {}", opts.ground_truth.display()))?;

    let registry = opencv_registry();
    let mut tracker = registry.create(&opts.tracker)?;

    let video = VideoSource::open(&opts.video)?;
    let mut source = Filtered::new(video);
    if let Some(gamma) = opts.gamma {
        source = source.with(Adjustment::Gamma(gamma));
    }
    if let (Some(alpha), Some(beta)) = (opts.alpha, opts.beta) {
        source = source.with(Adjustment::Linear { alpha, beta });
    }

    let evaluator = Evaluator::new(&ground_truth, config);
    let mut renderer = opts
        .output
        .as_ref()
        .map(|path| VideoRenderer::new(path.to_string_lossy(), &opts.tracker));

    let report = evaluator.run_with(
        &mut source,
        &mut tracker,
        renderer
            .as_mut()
            .map(|r| r as &mut dyn Renderer<_>),
    )?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &opts.tracker);
    }

    Ok(())
}
