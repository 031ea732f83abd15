//! Sliding-window median filter for speckle reduction
//!
//! Pixels beyond the image border are supplied by half-sample symmetric
//! reflection (`d c b a | a b c d`), repeated as often as needed when the
//! window is larger than the image.

use log::debug;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::Intensityf32;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Speckle {
    /// Edge of the square window. `0` or `1` disables the filter.
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_size() -> usize { 3 }

impl Default for Speckle {
    fn default() -> Self { Self { size: default_size() } }
}

impl Speckle {
    pub fn validate(&self) -> Result<()> {
        if self.size > 1 && self.size % 2 == 0 {
            return Err(Error::invalid("speckle.size", self.size, "window edge must be odd"));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool { self.size > 1 }

    pub fn apply(&self, image: ArrayView2<Intensityf32>) -> Result<Array2<Intensityf32>> {
        self.validate()?;
        if !self.is_enabled() {
            debug!("Speckle filter disabled");
            return Ok(image.to_owned());
        }
        Ok(median_filter(image, self.size))
    }
}

/// Median of the `size × size` neighbourhood of every pixel. `size` must be
/// odd; the output has the shape of the input.
pub fn median_filter(image: ArrayView2<Intensityf32>, size: usize) -> Array2<Intensityf32> {
    let (rows, cols) = image.dim();
    let mut out = Array2::zeros((rows, cols));
    if rows == 0 || cols == 0 { return out }
    let half = (size / 2) as isize;
    let mid = size * size / 2;

    let one_row = |r: usize, mut row: ndarray::ArrayViewMut1<Intensityf32>| {
        let mut window = Vec::with_capacity(size * size);
        for (c, pixel) in row.iter_mut().enumerate() {
            window.clear();
            for dr in -half..=half {
                let rr = reflect(r as isize + dr, rows);
                for dc in -half..=half {
                    window.push(OrderedFloat(image[[rr, reflect(c as isize + dc, cols)]]));
                }
            }
            let (_, median, _) = window.select_nth_unstable(mid);
            *pixel = median.0;
        }
    };

    let out_rows = Zip::indexed(out.axis_iter_mut(Axis(0)));
    #[cfg    (feature = "serial") ] out_rows.    for_each(one_row);
    #[cfg(not(feature = "serial"))] out_rows.par_for_each(one_row);
    out
}

/// Map any index onto `0..n` by half-sample symmetric reflection
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}
