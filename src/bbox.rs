use serde_derive::{Deserialize, Serialize};

use crate::Coord;

/// Axis-aligned box anchored at its left-top corner.
///
/// A box with zero area is legal and stands for "nothing detected".
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox<T = i32> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

impl<T: Coord> BoundingBox<T> {
    #[inline]
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline(always)]
    pub fn left(&self) -> T {
        self.x
    }

    #[inline(always)]
    pub fn top(&self) -> T {
        self.y
    }

    /// Right edge, computed in f64 so that `x + width` never overflows `T`.
    #[inline(always)]
    pub fn right(&self) -> f64 {
        to_f64(self.x) + to_f64(self.width)
    }

    #[inline(always)]
    pub fn bottom(&self) -> f64 {
        to_f64(self.y) + to_f64(self.height)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width >= T::zero() && self.height >= T::zero()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= T::zero() || self.height <= T::zero()
    }

    /// Area in pixels; negative extents count as empty.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        to_f64(self.width) * to_f64(self.height)
    }

    /// Area shared with `other`, zero when the boxes do not overlap.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }

        let w = self.right().min(other.right()) - to_f64(self.x).max(to_f64(other.x));
        let h = self.bottom().min(other.bottom()) - to_f64(self.y).max(to_f64(other.y));

        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Rectangular intersection, `None` when the boxes do not overlap.
    ///
    /// The overlap is never wider or taller than either box, so it always
    /// fits back into `T`.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.is_empty() || other.is_empty() {
            return None;
        }

        let left = max(self.x, other.x);
        let top = max(self.y, other.y);
        let width = self.right().min(other.right()) - to_f64(left);
        let height = self.bottom().min(other.bottom()) - to_f64(top);

        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        Some(Self::new(left, top, T::from(width)?, T::from(height)?))
    }

    /// Clips the box to `bounds`, collapsing it to a zero-sized box at the
    /// nearest corner when it lies entirely outside.
    pub fn clip(&self, bounds: &Self) -> Self {
        match self.intersect(bounds) {
            Some(clipped) => clipped,
            None => {
                let x = to_f64(self.x).max(to_f64(bounds.x)).min(bounds.right());
                let y = to_f64(self.y).max(to_f64(bounds.y)).min(bounds.bottom());

                Self::new(
                    T::from(x).unwrap_or(bounds.x),
                    T::from(y).unwrap_or(bounds.y),
                    T::zero(),
                    T::zero(),
                )
            }
        }
    }

    /// Converts the coordinates into another numeric type, `None` if one of
    /// them does not fit.
    pub fn cast<U: Coord>(&self) -> Option<BoundingBox<U>> {
        Some(BoundingBox::new(
            U::from(self.x)?,
            U::from(self.y)?,
            U::from(self.width)?,
            U::from(self.height)?,
        ))
    }
}

#[inline(always)]
pub(crate) fn to_f64<T: Coord>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

#[inline(always)]
fn max<T: PartialOrd>(a: T, b: T) -> T {
    if a >= b {
        a
    } else {
        b
    }
}
