//! OpenCV implementations of the frame source, tracker, renderer and frame
//! filters.

mod filter;
mod tracker;
mod video;

pub use filter::Adjustment;
pub use tracker::{opencv_registry, OpencvTracker};
pub use video::{VideoRenderer, VideoSource};

use opencv::core::{Mat, Rect};
use opencv::prelude::*;

use crate::bbox::BoundingBox;
use crate::frame::Frame;

impl Frame for Mat {
    #[inline]
    fn dims(&self) -> (u32, u32) {
        (self.cols().max(0) as u32, self.rows().max(0) as u32)
    }
}

impl From<Rect> for BoundingBox<i32> {
    #[inline]
    fn from(r: Rect) -> Self {
        BoundingBox::new(r.x, r.y, r.width, r.height)
    }
}

impl From<BoundingBox<i32>> for Rect {
    #[inline]
    fn from(b: BoundingBox<i32>) -> Self {
        Rect::new(b.x, b.y, b.width, b.height)
    }
}
