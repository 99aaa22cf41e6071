use serde_derive::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::Coord;

/// A decoded video frame as seen by the evaluator.
pub trait Frame {
    /// (width, height) in pixels
    fn dims(&self) -> (u32, u32);
}

/// Pixel extent of the video, captured from the first frame of a run.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameArea {
    pub width: u32,
    pub height: u32,
}

impl FrameArea {
    #[inline]
    pub fn of<F: Frame + ?Sized>(frame: &F) -> Self {
        let (width, height) = frame.dims();

        Self { width, height }
    }

    /// `rows * cols`, the background area of the unbiased metric
    #[inline]
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// The frame as a box anchored at the origin, `None` if the extent does
    /// not fit `T`.
    pub fn bounds<T: Coord>(&self) -> Option<BoundingBox<T>> {
        Some(BoundingBox::new(
            T::zero(),
            T::zero(),
            T::from(self.width)?,
            T::from(self.height)?,
        ))
    }
}
