//! Overlap scores between an annotation box `a` and a detection box `d`.
//!
//! `unbiased_iou` follows "Countering bias in tracking evaluations"
//! (Hager et al., VISAPP 2018): the plain IoU term is blended with the share
//! of background pixels left correctly empty, weighted by how much of the
//! frame the two boxes jointly cover.

use serde_derive::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::Coord;

/// Metric reported as the primary per-frame score.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Iou,
    #[default]
    Unbiased,
}

/// Both overlap scores of one tracked frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Score {
    pub iou: f64,
    pub unbiased_iou: f64,
}

impl Score {
    #[inline]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Iou => self.iou,
            Metric::Unbiased => self.unbiased_iou,
        }
    }
}

/// Area of `a ∩ d`, zero when they are disjoint.
#[inline]
pub fn intersection_area<T: Coord>(a: &BoundingBox<T>, d: &BoundingBox<T>) -> f64 {
    a.intersection_area(d)
}

pub fn iou<T: Coord>(a: &BoundingBox<T>, d: &BoundingBox<T>) -> f64 {
    let i = intersection_area(a, d);
    if i <= 0.0 {
        return 0.0;
    }

    let u = a.area() + d.area() - i;

    i / u
}

/// Background-weighted IoU for a frame of `frame_area` pixels.
///
/// Fails with [`Error::InvalidFrameArea`] when the union of the boxes is
/// larger than the frame.
pub fn unbiased_iou<T: Coord>(
    a: &BoundingBox<T>,
    d: &BoundingBox<T>,
    frame_area: f64,
) -> Result<f64, Error> {
    let parts = Parts::of(a, d, frame_area);
    if parts.neither < 0.0 {
        return Err(Error::InvalidFrameArea {
            frame_area,
            union: parts.union(),
        });
    }

    Ok(parts.blend())
}

/// Same blend as [`unbiased_iou`], carried on with a negative background
/// when the union overflows the frame. The result then drops below the plain
/// IoU and may leave `[0, 1]`.
pub fn unbiased_iou_unchecked<T: Coord>(
    a: &BoundingBox<T>,
    d: &BoundingBox<T>,
    frame_area: f64,
) -> f64 {
    Parts::of(a, d, frame_area).blend()
}

struct Parts {
    both: f64,
    misses: f64,
    neither: f64,
}

impl Parts {
    fn of<T: Coord>(a: &BoundingBox<T>, d: &BoundingBox<T>, frame_area: f64) -> Self {
        let both = intersection_area(a, d);
        let misses = (a.area() - both) + (d.area() - both);

        Self {
            both,
            misses,
            neither: frame_area - both - misses,
        }
    }

    #[inline]
    fn union(&self) -> f64 {
        self.both + self.misses
    }

    fn blend(&self) -> f64 {
        let union = self.union();
        if self.both <= 0.0 || union <= 0.0 {
            return 0.0;
        }

        let w0 = union.powi(2) / (union.powi(2) + (self.neither + self.misses).powi(2));
        let wbg = 1.0 - w0;

        // neither + misses is 0 when both boxes fill the frame, wbg is 0 then
        let background = if self.neither + self.misses != 0.0 {
            self.neither / (self.neither + self.misses)
        } else {
            0.0
        };

        w0 * (self.both / union) + wbg * background
    }
}
