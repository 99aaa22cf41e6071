use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::metrics::Metric;

/// What to do when the frame source ends before the expected frame count.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Stop with an aborted status and keep the scores computed so far.
    #[default]
    Truncate,
    /// Fail the run with [`Error::SourceExhausted`].
    Fail,
}

/// Which frames get scored.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Every frame after the first; ground truth holds one box per frame.
    #[default]
    EveryFrame,
    /// `N` evenly spaced frames; ground truth holds `N + 1` boxes.
    Checkpoints(usize),
}

/// How unbiased IoU treats boxes whose union is larger than the frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameOverflow {
    /// Score the boxes as given; the background term goes negative.
    #[default]
    Extrapolate,
    /// Clip both boxes to the frame first.
    Clip,
    /// Fail with [`Error::InvalidFrameArea`].
    Reject,
}

/// Evaluation run settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct EvalConfig {
    /// Primary metric of the report.
    pub metric: Metric,
    /// Behaviour on early end of the frame source.
    pub on_exhausted: ExhaustionPolicy,
    /// Scored frames.
    pub schedule: Schedule,
    pub frame_overflow: FrameOverflow,
    /// Caps the frames processed.
    pub max_frames: Option<usize>,
}

impl EvalConfig {
    /// Loads a JSON config; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;

        Ok(config)
    }

    /// Distance in frames between two scored frames for a run over
    /// `frame_count` frames.
    pub fn interval(&self, frame_count: Option<usize>) -> Result<usize, Error> {
        match self.schedule {
            Schedule::EveryFrame => Ok(1),
            Schedule::Checkpoints(0) => Err(Error::Config("zero checkpoints".into())),
            Schedule::Checkpoints(count) => {
                let frames = frame_count.ok_or_else(|| {
                    Error::Config("checkpoints need a known frame count".into())
                })?;
                let interval = frames.saturating_sub(1) / count;

                if interval == 0 {
                    return Err(Error::Config(format!(
                        "{} frames are too few for {} checkpoints",
                        frames, count
                    )));
                }

                Ok(interval)
            }
        }
    }
}
