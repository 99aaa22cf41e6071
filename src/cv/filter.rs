use opencv::{
    core::{self, Mat},
    prelude::*,
};

use crate::error::Error;
use crate::source::FrameFilter;

/// Per-pixel intensity adjustments, saturating to `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// `255 * (v / 255) ^ gamma`
    Gamma(f64),
    /// `alpha * v + beta`
    Linear { alpha: f64, beta: f64 },
}

impl Adjustment {
    fn gamma_table(gamma: f64) -> Result<Mat, Error> {
        let mut table =
            Mat::new_rows_cols_with_default(1, 256, core::CV_8U, core::Scalar::all(0.0))?;

        for i in 0..256 {
            let v = (i as f64 / 255.0).powf(gamma) * 255.0;
            *table.at_2d_mut::<u8>(0, i)? = v.round().clamp(0.0, 255.0) as u8;
        }

        Ok(table)
    }
}

impl FrameFilter<Mat> for Adjustment {
    fn apply(&self, frame: Mat) -> Result<Mat, Error> {
        let mut out = Mat::default();

        match *self {
            Adjustment::Gamma(gamma) => {
                let table = Self::gamma_table(gamma)?;
                core::lut(&frame, &table, &mut out)?;
            }
            Adjustment::Linear { alpha, beta } => {
                frame.convert_to(&mut out, -1, alpha, beta)?;
            }
        }

        Ok(out)
    }
}
