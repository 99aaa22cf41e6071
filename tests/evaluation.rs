//! End-to-end runs of the evaluator over scripted frame sources and trackers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;

use approx::assert_relative_eq;
use tempfile::NamedTempFile;
use tracker_eval::render::{Overlay, Renderer};
use tracker_eval::{
    AbortReason, BoundingBox, Error, EvalConfig, Evaluator, ExhaustionPolicy, Frame, FrameArea,
    FrameOverflow, FrameSource, GroundTruth, Metric, Outcome, Report, Schedule, Status, Tracker,
    TrackerRegistry,
};

#[derive(Debug, Clone, Copy)]
struct Image {
    width: u32,
    height: u32,
}

impl Frame for Image {
    fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

struct Clip {
    frames: VecDeque<Image>,
    hint: Option<usize>,
}

impl Clip {
    fn new(len: usize) -> Self {
        Self::sized(len, 200, 200)
    }

    fn sized(len: usize, width: u32, height: u32) -> Self {
        Self {
            frames: (0..len).map(|_| Image { width, height }).collect(),
            hint: Some(len),
        }
    }

    fn with_hint(mut self, hint: Option<usize>) -> Self {
        self.hint = hint;
        self
    }
}

impl FrameSource for Clip {
    type Frame = Image;

    fn read_next(&mut self) -> Result<Option<Image>, Error> {
        Ok(self.frames.pop_front())
    }

    fn frame_count(&self) -> Option<usize> {
        self.hint
    }
}

/// Replays canned update results and remembers what it was given.
#[derive(Default)]
struct Scripted {
    script: VecDeque<Option<BoundingBox>>,
    init_box: Option<BoundingBox>,
    updates: usize,
    fail_with_error_at: Option<usize>,
}

impl Scripted {
    fn new<I: IntoIterator<Item = Option<BoundingBox>>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Reports `bbox` on every update.
    fn steady(bbox: BoundingBox) -> Self {
        Self::new(std::iter::repeat(Some(bbox)).take(1000))
    }
}

impl Tracker<Image> for Scripted {
    fn init(&mut self, _: &Image, bbox: &BoundingBox) -> Result<(), Error> {
        assert!(self.init_box.is_none(), "initialised twice");
        self.init_box = Some(*bbox);
        Ok(())
    }

    fn update(&mut self, _: &Image) -> Result<Option<BoundingBox>, Error> {
        assert!(self.init_box.is_some(), "update before init");
        self.updates += 1;

        if self.fail_with_error_at == Some(self.updates) {
            return Err(Error::Tracker("model crashed".into()));
        }

        Ok(self.script.pop_front().flatten())
    }
}

fn b(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
    BoundingBox::new(x, y, w, h)
}

fn steady_truth(len: usize) -> GroundTruth {
    GroundTruth::new(vec![b(50, 50, 40, 40); len])
}

#[test]
fn scores_shifted_detection() {
    let gt = GroundTruth::new(vec![b(0, 0, 100, 100), b(0, 0, 100, 100)]);
    let mut tracker = Scripted::new([Some(b(10, 10, 100, 100))]);

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut Clip::new(2), &mut tracker)
        .unwrap();

    assert_eq!(tracker.init_box, Some(b(0, 0, 100, 100)));
    assert_eq!(tracker.updates, 1);
    assert_eq!(report.status, Status::Completed);
    assert_eq!(
        report.frame_area,
        Some(FrameArea {
            width: 200,
            height: 200
        })
    );
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].frame, 1);

    let score = report.records[0].outcome.score().copied().unwrap();
    assert_relative_eq!(score.iou, 8100.0 / 11900.0);
    assert_relative_eq!(score.iou, 0.6807, epsilon = 1e-4);

    let union: f64 = 11900.0;
    let misses: f64 = 3800.0;
    let neither = 40_000.0 - union;
    let w0 = union.powi(2) / (union.powi(2) + (neither + misses).powi(2));
    let expected = w0 * score.iou + (1.0 - w0) * neither / (neither + misses);
    assert_relative_eq!(score.unbiased_iou, expected, epsilon = 1e-12);

    assert_relative_eq!(report.mean().unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn tracking_failure_is_recorded_and_run_continues() {
    let gt = steady_truth(4);
    let mut tracker = Scripted::new([Some(b(50, 50, 40, 40)), None, Some(b(50, 50, 40, 40))]);

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut Clip::new(4), &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(
        report.records.iter().map(|r| r.frame).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(report.records[1].outcome.is_failed());
    assert_eq!(report.scores().collect::<Vec<_>>()[1], None);
    assert_relative_eq!(report.records[2].outcome.score().unwrap().iou, 1.0);
    assert_eq!(report.failures(), 1);
    assert_eq!(tracker.updates, 3);
}

#[test]
fn failure_is_distinct_from_zero_score() {
    let gt = steady_truth(3);
    let mut tracker = Scripted::new([Some(b(0, 0, 10, 10)), None]);

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut Clip::new(3), &mut tracker)
        .unwrap();

    assert_eq!(report.scores().collect::<Vec<_>>(), vec![Some(0.0), None]);
    assert!(matches!(
        report.records[0].outcome,
        Outcome::Tracked { score, .. } if score.iou == 0.0
    ));
    assert_eq!(report.records[1].outcome, Outcome::Failed);
}

#[test]
fn short_ground_truth_returns_partial_scores() {
    let gt = steady_truth(3);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut Clip::new(6), &mut tracker)
        .unwrap();

    assert_eq!(
        report.status,
        Status::Aborted(AbortReason::InsufficientGroundTruth {
            frame: 3,
            available: 3
        })
    );
    assert_eq!(report.records.len(), 2);
    assert!(report
        .scores()
        .all(|s| s.is_some_and(|v| (v - 1.0).abs() < 1e-12)));
    assert_eq!(tracker.updates, 2);
}

#[test]
fn early_end_of_source_truncates_by_default() {
    let gt = steady_truth(10);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let mut clip = Clip::new(4).with_hint(Some(10));

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut clip, &mut tracker)
        .unwrap();

    assert_eq!(
        report.status,
        Status::Aborted(AbortReason::SourceExhausted {
            frame: 4,
            expected: 10
        })
    );
    assert_eq!(report.frames, 4);
    assert_eq!(report.records.len(), 3);
}

#[test]
fn early_end_of_source_can_fail() {
    let gt = steady_truth(10);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let mut clip = Clip::new(4).with_hint(Some(10));
    let config = EvalConfig {
        on_exhausted: ExhaustionPolicy::Fail,
        ..Default::default()
    };

    let result = Evaluator::new(&gt, config).run(&mut clip, &mut tracker);

    assert!(matches!(
        result,
        Err(Error::SourceExhausted {
            frame: 4,
            expected: 10
        })
    ));
}

#[test]
fn unknown_length_runs_to_end_of_source() {
    let gt = steady_truth(8);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let mut clip = Clip::new(5).with_hint(None);

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut clip, &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.frames, 5);
    assert_eq!(report.records.len(), 4);
}

#[test]
fn max_frames_caps_the_run() {
    let gt = steady_truth(20);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let config = EvalConfig {
        max_frames: Some(3),
        ..Default::default()
    };

    let report = Evaluator::new(&gt, config)
        .run(&mut Clip::new(20), &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.frames, 3);
    assert_eq!(report.records.len(), 2);
}

#[test]
fn cap_beyond_unknown_length_is_not_exhaustion() {
    let gt = steady_truth(20);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let config = EvalConfig {
        max_frames: Some(10),
        on_exhausted: ExhaustionPolicy::Fail,
        ..Default::default()
    };

    let report = Evaluator::new(&gt, config)
        .run(&mut Clip::new(4).with_hint(None), &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.frames, 4);
}

#[test]
fn checkpoints_score_evenly_spaced_frames() {
    // init box + one box per checkpoint
    let mut boxes = vec![b(0, 0, 40, 40)];
    boxes.extend((1..=5).map(|k| b(k * 10, 0, 40, 40)));
    let gt = GroundTruth::new(boxes);

    let mut tracker = Scripted::steady(b(20, 0, 40, 40));
    let config = EvalConfig {
        schedule: Schedule::Checkpoints(5),
        metric: Metric::Iou,
        ..Default::default()
    };

    let report = Evaluator::new(&gt, config)
        .run(&mut Clip::new(11), &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(
        report.records.iter().map(|r| r.frame).collect::<Vec<_>>(),
        vec![2, 4, 6, 8, 10]
    );
    assert_eq!(tracker.updates, 10);

    // checkpoint 2 is annotated at x = 20, where the tracker sits
    let scores: Vec<f64> = report.scores().flatten().collect();
    assert_relative_eq!(scores[1], 1.0);
    assert!(scores[0] < 1.0 && scores[2] < 1.0);
}

#[test]
fn checkpoints_need_a_frame_count() {
    let gt = steady_truth(11);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let config = EvalConfig {
        schedule: Schedule::Checkpoints(5),
        ..Default::default()
    };

    let result = Evaluator::new(&gt, config).run(&mut Clip::new(11).with_hint(None), &mut tracker);

    assert!(matches!(result, Err(Error::Config(_))));
    assert!(tracker.init_box.is_none());
}

#[test]
fn empty_ground_truth_cannot_initialise() {
    let gt = GroundTruth::new(Vec::new());
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));

    let result = Evaluator::new(&gt, EvalConfig::default()).run(&mut Clip::new(3), &mut tracker);

    assert!(matches!(
        result,
        Err(Error::InsufficientGroundTruth {
            frame: 0,
            available: 0
        })
    ));
}

#[test]
fn tracker_errors_abort_the_run() {
    let gt = steady_truth(5);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    tracker.fail_with_error_at = Some(2);

    let result = Evaluator::new(&gt, EvalConfig::default()).run(&mut Clip::new(5), &mut tracker);

    assert!(matches!(result, Err(Error::Tracker(_))));
}

fn shifted_in_small_frame(overflow: FrameOverflow, metric: Metric) -> Result<Report, Error> {
    let gt = GroundTruth::new(vec![b(0, 0, 100, 100), b(0, 0, 100, 100)]);
    let mut tracker = Scripted::new([Some(b(10, 10, 100, 100))]);
    let config = EvalConfig {
        metric,
        frame_overflow: overflow,
        ..Default::default()
    };

    Evaluator::new(&gt, config).run(&mut Clip::sized(2, 100, 100), &mut tracker)
}

#[test]
fn unbiased_falls_below_iou_when_boxes_overflow_frame() {
    let report = shifted_in_small_frame(FrameOverflow::default(), Metric::Unbiased).unwrap();
    let score = report.records[0].outcome.score().copied().unwrap();

    assert_relative_eq!(score.iou, 8100.0 / 11900.0);
    assert_relative_eq!(score.iou, 0.6807, epsilon = 1e-4);
    assert_relative_eq!(score.unbiased_iou, 0.6389, epsilon = 1e-4);
    assert!(score.unbiased_iou < score.iou);
}

#[test]
fn clipping_to_the_frame_is_opt_in() {
    let report = shifted_in_small_frame(FrameOverflow::Clip, Metric::Unbiased).unwrap();
    let score = report.records[0].outcome.score().copied().unwrap();

    assert_relative_eq!(score.iou, 8100.0 / 11900.0);
    assert!(score.unbiased_iou > score.iou);
    assert!((0.0..=1.0).contains(&score.unbiased_iou));
}

#[test]
fn rejected_overflow_fails_only_the_unbiased_run() {
    assert!(matches!(
        shifted_in_small_frame(FrameOverflow::Reject, Metric::Unbiased),
        Err(Error::InvalidFrameArea { .. })
    ));

    let report = shifted_in_small_frame(FrameOverflow::Reject, Metric::Iou).unwrap();
    assert_eq!(report.status, Status::Completed);
    assert_relative_eq!(report.mean().unwrap(), 8100.0 / 11900.0);
}

#[test]
fn frame_count_hint_does_not_stop_the_run() {
    let gt = steady_truth(8);
    let mut tracker = Scripted::steady(b(50, 50, 40, 40));
    let mut clip = Clip::new(8).with_hint(Some(3));

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut clip, &mut tracker)
        .unwrap();

    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.frames, 8);
    assert_eq!(report.records.len(), 7);
    assert!(clip.frames.is_empty());
}

#[test]
fn far_off_ground_truth_scores_without_overflow() {
    let far = BoundingBox::new(2_000_000_000, 0, 500_000_000, 10);
    let gt = GroundTruth::new(vec![far, far]);
    let shifted = BoundingBox::new(2_100_000_000, 0, 500_000_000, 10);
    let mut tracker = Scripted::new([Some(shifted)]);
    let config = EvalConfig {
        metric: Metric::Iou,
        ..Default::default()
    };

    let report = Evaluator::new(&gt, config)
        .run(&mut Clip::new(2), &mut tracker)
        .unwrap();

    assert_relative_eq!(report.mean().unwrap(), 4.0 / 6.0, epsilon = 1e-12);
}

#[derive(Default)]
struct Log {
    frames: Vec<(usize, bool, Option<bool>)>,
    finished: bool,
}

struct Recorder(Rc<RefCell<Log>>);

impl Renderer<Image> for Recorder {
    fn render(&mut self, _: &Image, overlay: &Overlay<'_>) -> Result<(), Error> {
        self.0.borrow_mut().frames.push((
            overlay.frame,
            overlay.annotation.is_some(),
            overlay.outcome.map(|o| o.is_failed()),
        ));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.0.borrow_mut().finished = true;
        Ok(())
    }
}

#[test]
fn renderer_sees_every_frame() {
    let gt = steady_truth(3);
    let mut tracker = Scripted::new([Some(b(50, 50, 40, 40)), None]);
    let log = Rc::new(RefCell::new(Log::default()));
    let mut recorder = Recorder(log.clone());

    Evaluator::new(&gt, EvalConfig::default())
        .run_with(&mut Clip::new(3), &mut tracker, Some(&mut recorder))
        .unwrap();

    let log = log.borrow();
    assert_eq!(
        log.frames,
        vec![(0, true, None), (1, true, Some(false)), (2, true, Some(true))]
    );
    assert!(log.finished);
}

#[test]
fn registry_and_file_backed_ground_truth() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[40 x 40 from (50, 50)]").unwrap();
    writeln!(file, "[40 x 40 from (50, 50)]").unwrap();
    writeln!(file, "[40 x 40 from (60, 50)]").unwrap();
    file.flush().unwrap();
    let gt = GroundTruth::<i32>::load(file.path()).unwrap();

    let mut registry = TrackerRegistry::<Image>::new();
    registry.register("Still", || {
        Ok(Box::new(Scripted::steady(b(50, 50, 40, 40))) as Box<dyn Tracker<Image>>)
    });

    assert!(matches!(
        registry.create("KCF"),
        Err(Error::TrackerUnavailable(name)) if name == "KCF"
    ));

    let mut tracker = registry.create("still").unwrap();
    let config = EvalConfig {
        metric: Metric::Iou,
        ..Default::default()
    };
    let report = Evaluator::new(&gt, config)
        .run(&mut Clip::new(3), &mut tracker)
        .unwrap();

    let scores: Vec<f64> = report.scores().flatten().collect();
    assert_eq!(scores.len(), 2);
    assert_relative_eq!(scores[0], 1.0);
    // 30x40 overlap over 50x40 union
    assert_relative_eq!(scores[1], 1200.0 / 2000.0);
}

#[test]
fn report_serialises_to_json() {
    let gt = steady_truth(3);
    let mut tracker = Scripted::new([Some(b(50, 50, 40, 40)), None]);

    let report = Evaluator::new(&gt, EvalConfig::default())
        .run(&mut Clip::new(3), &mut tracker)
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["metric"], "unbiased");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["records"][1]["outcome"], "failed");
    assert_eq!(json["records"][0]["frame"], 1);
}
