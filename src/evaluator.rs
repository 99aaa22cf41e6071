use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde_derive::Serialize;

use crate::bbox::BoundingBox;
use crate::config::{EvalConfig, ExhaustionPolicy, FrameOverflow, Schedule};
use crate::error::Error;
use crate::frame::FrameArea;
use crate::ground_truth::GroundTruth;
use crate::metrics::{self, Metric, Score};
use crate::render::{Overlay, Renderer};
use crate::source::FrameSource;
use crate::tracker::Tracker;
use crate::Coord;

/// Result of the tracker on one scored frame.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T = i32> {
    Tracked { bbox: BoundingBox<T>, score: Score },
    /// The tracker reported that it lost the object.
    Failed,
}

impl<T> Outcome<T> {
    #[inline]
    pub fn score(&self) -> Option<&Score> {
        match self {
            Outcome::Tracked { score, .. } => Some(score),
            Outcome::Failed => None,
        }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord<T = i32> {
    /// Video frame index.
    pub frame: usize,
    pub outcome: Outcome<T>,
    /// Wall time of the tracker update on this frame.
    pub elapsed: Duration,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The frame source ended before the expected frame count.
    SourceExhausted { frame: usize, expected: usize },
    /// No annotation box for a frame that had to be scored.
    InsufficientGroundTruth { frame: usize, available: usize },
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Completed,
    Aborted(AbortReason),
}

/// Scores of one run, in frame order. An aborted run keeps everything it
/// scored before stopping.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report<T = i32> {
    pub metric: Metric,
    pub status: Status,
    pub frame_area: Option<FrameArea>,
    pub frames: usize,
    pub records: Vec<ScoreRecord<T>>,
}

impl<T> Report<T> {
    /// Primary metric per scored frame, `None` for tracking failures.
    pub fn scores(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.records
            .iter()
            .map(move |r| r.outcome.score().map(|s| s.get(self.metric)))
    }

    /// Mean primary metric over frames where the tracker reported a box.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .scores()
            .flatten()
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn failure_rate(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.failures() as f64 / self.records.len() as f64
        }
    }

    pub fn update_time(&self) -> Duration {
        self.records.iter().map(|r| r.elapsed).sum()
    }

    pub fn mean_update_time(&self) -> Option<Duration> {
        let n = u32::try_from(self.records.len()).ok().filter(|n| *n > 0)?;

        Some(self.update_time() / n)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.status == Status::Completed
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Uninitialized,
    Running(FrameArea),
}

/// Runs a tracker over a frame source and scores it against ground truth.
///
/// Frame 0 initialises the tracker with the first ground truth box. Every
/// scheduled frame after that is scored, a lost object being recorded as
/// [`Outcome::Failed`] while the run carries on.
pub struct Evaluator<'a, T: Coord = i32> {
    ground_truth: &'a GroundTruth<T>,
    config: EvalConfig,
}

impl<'a, T: Coord> Evaluator<'a, T> {
    pub fn new(ground_truth: &'a GroundTruth<T>, config: EvalConfig) -> Self {
        Self {
            ground_truth,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn run<S, K>(&self, source: &mut S, tracker: &mut K) -> Result<Report<T>, Error>
    where
        S: FrameSource,
        K: Tracker<S::Frame, T> + ?Sized,
    {
        self.run_with(source, tracker, None)
    }

    pub fn run_with<S, K>(
        &self,
        source: &mut S,
        tracker: &mut K,
        mut renderer: Option<&mut dyn Renderer<S::Frame, T>>,
    ) -> Result<Report<T>, Error>
    where
        S: FrameSource,
        K: Tracker<S::Frame, T> + ?Sized,
    {
        // the source's own count is a hint: it sets the checkpoint spacing and
        // tells an early end apart, but never stops the read loop
        let hint = source.frame_count();
        let expected = match (self.config.max_frames, hint) {
            (Some(cap), Some(n)) => Some(cap.min(n)),
            (cap, n) => cap.or(n),
        };
        let interval = self.config.interval(expected)?;
        let limit = match self.config.schedule {
            Schedule::EveryFrame => self.config.max_frames,
            Schedule::Checkpoints(count) => Some(count * interval + 1),
        };
        let promised = hint.map(|n| limit.map_or(n, |limit| limit.min(n)));

        info!(
            "evaluating {} frames ({} reported), scoring every {} frame(s)",
            limit.map_or_else(|| "all".to_string(), |n| n.to_string()),
            hint.map_or_else(|| "none".to_string(), |n| n.to_string()),
            interval
        );

        let mut phase = Phase::Uninitialized;
        let mut records = Vec::new();
        let mut index = 0;

        let status = loop {
            if limit.is_some_and(|limit| index >= limit) {
                break Status::Completed;
            }

            let Some(frame) = source.read_next()? else {
                match promised.filter(|&promised| index < promised) {
                    None => break Status::Completed,
                    Some(expected) => match self.config.on_exhausted {
                        ExhaustionPolicy::Truncate => {
                            warn!("frame source ended at frame {} of {}", index, expected);
                            break Status::Aborted(AbortReason::SourceExhausted {
                                frame: index,
                                expected,
                            });
                        }
                        ExhaustionPolicy::Fail => {
                            return Err(Error::SourceExhausted {
                                frame: index,
                                expected,
                            })
                        }
                    },
                }
            };

            match phase {
                Phase::Uninitialized => {
                    let init = self.ground_truth.init_box().ok_or(
                        Error::InsufficientGroundTruth {
                            frame: 0,
                            available: 0,
                        },
                    )?;
                    let area = FrameArea::of(&frame);

                    tracker.init(&frame, init)?;
                    debug!("tracker initialised on {}x{} frame", area.width, area.height);

                    if let Some(r) = renderer.as_deref_mut() {
                        r.render(
                            &frame,
                            &Overlay {
                                frame: index,
                                annotation: Some(init),
                                outcome: None,
                            },
                        )?;
                    }

                    phase = Phase::Running(area);
                }

                Phase::Running(area) => {
                    if index % interval != 0 {
                        // between checkpoints the tracker only has to keep up
                        tracker.update(&frame)?;

                        if let Some(r) = renderer.as_deref_mut() {
                            r.render(
                                &frame,
                                &Overlay {
                                    frame: index,
                                    annotation: None,
                                    outcome: None,
                                },
                            )?;
                        }

                        index += 1;
                        continue;
                    }

                    let gt_index = index / interval;
                    let Some(annotation) = self.ground_truth.get(gt_index) else {
                        warn!(
                            "ground truth ends at {} boxes, stopping at frame {}",
                            self.ground_truth.len(),
                            index
                        );
                        break Status::Aborted(AbortReason::InsufficientGroundTruth {
                            frame: index,
                            available: self.ground_truth.len(),
                        });
                    };

                    let started = Instant::now();
                    let candidate = tracker.update(&frame)?;
                    let elapsed = started.elapsed();

                    let outcome = match candidate {
                        Some(bbox) => {
                            let score = self.score(annotation, &bbox, &area)?;
                            debug!(
                                "frame {}: IoU {:.4}, unbiased IoU {:.4}",
                                index, score.iou, score.unbiased_iou
                            );
                            Outcome::Tracked { bbox, score }
                        }
                        None => {
                            warn!("frame {}: tracking failed", index);
                            Outcome::Failed
                        }
                    };

                    if let Some(r) = renderer.as_deref_mut() {
                        r.render(
                            &frame,
                            &Overlay {
                                frame: index,
                                annotation: Some(annotation),
                                outcome: Some(&outcome),
                            },
                        )?;
                    }

                    records.push(ScoreRecord {
                        frame: index,
                        outcome,
                        elapsed,
                    });
                }
            }

            index += 1;
        };

        if let Some(r) = renderer {
            r.finish()?;
        }

        let frame_area = match phase {
            Phase::Uninitialized => None,
            Phase::Running(area) => Some(area),
        };

        info!(
            "evaluation {:?} after {} frames, {} scored",
            status,
            index,
            records.len()
        );

        Ok(Report {
            metric: self.config.metric,
            status,
            frame_area,
            frames: index,
            records,
        })
    }

    /// Plain IoU and unbiased IoU of the boxes as given, the latter subject to
    /// [`FrameOverflow`]. An unbiased failure only fails the frame when it is
    /// the primary metric.
    fn score(
        &self,
        annotation: &BoundingBox<T>,
        detection: &BoundingBox<T>,
        area: &FrameArea,
    ) -> Result<Score, Error> {
        let iou = metrics::iou(annotation, detection);
        let checked = match self.config.frame_overflow {
            FrameOverflow::Extrapolate => Ok(metrics::unbiased_iou_unchecked(
                annotation,
                detection,
                area.area(),
            )),
            FrameOverflow::Clip => match area.bounds::<T>() {
                Some(bounds) => metrics::unbiased_iou(
                    &annotation.clip(&bounds),
                    &detection.clip(&bounds),
                    area.area(),
                ),
                None => metrics::unbiased_iou(annotation, detection, area.area()),
            },
            FrameOverflow::Reject => metrics::unbiased_iou(annotation, detection, area.area()),
        };

        let unbiased_iou = match checked {
            Ok(v) => v,
            Err(err) if self.config.metric != Metric::Unbiased => {
                warn!("unbiased IoU unavailable ({}), extrapolating", err);
                metrics::unbiased_iou_unchecked(annotation, detection, area.area())
            }
            Err(err) => return Err(err),
        };

        Ok(Score { iou, unbiased_iou })
    }
}
