pub mod bbox;
pub mod codec;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod frame;
pub mod ground_truth;
pub mod metrics;
pub mod render;
pub mod source;
pub mod tracker;

#[cfg(feature = "opencv")]
pub mod cv;

pub use bbox::BoundingBox;
pub use config::{EvalConfig, ExhaustionPolicy, FrameOverflow, Schedule};
pub use error::Error;
pub use evaluator::{AbortReason, Evaluator, Outcome, Report, ScoreRecord, Status};
pub use frame::{Frame, FrameArea};
pub use ground_truth::GroundTruth;
pub use metrics::{Metric, Score};
pub use source::{Filtered, FrameFilter, FrameSource};
pub use tracker::{Tracker, TrackerKind, TrackerRegistry};

use std::fmt;

/// Numeric type usable as a box coordinate.
pub trait Coord:
    num_traits::Num + num_traits::NumCast + Copy + PartialOrd + fmt::Debug + 'static
{
}

impl<T> Coord for T where
    T: num_traits::Num + num_traits::NumCast + Copy + PartialOrd + fmt::Debug + 'static
{
}
