//! Physical coordinate axes of the reconstructed image
//!
//! Depth is derived from the sample index via the round-trip time of flight;
//! the lateral axis is the set of scanline centres, used unmodified.

use itertools::Itertools;
use ndarray::Array1;
use serde::Serialize;

use units::{hz_, m_s_, Frequency, Velocity};

use crate::config::Acquisition;
use crate::error::{Error, Result};
use crate::volume::VolumeDims;
use crate::Lengthf32;

/// Depth of each of `n` samples: `i · c / (2·fs)`, so `depth[0] = 0`.
pub fn depth_axis(n: usize, sampling_rate: Frequency, speed_of_sound: Velocity) -> Result<Array1<Lengthf32>> {
    let fs = positive("sampling_rate" , hz_ (sampling_rate ))?;
    let c  = positive("speed_of_sound", m_s_(speed_of_sound))?;
    let step = c / (2.0 * fs);
    Ok(Array1::from_shape_fn(n, |i| i as Lengthf32 * step))
}

pub(crate) fn positive(parameter: &'static str, x: f32) -> Result<f32> {
    if x > 0.0 && x.is_finite() { Ok(x) }
    else { Err(Error::invalid(parameter, x, "must be strictly positive")) }
}

/// Spatial layout of transducer, scanlines and depth samples, all in metres.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub element_positions: Array1<Lengthf32>,
    pub scanline_centres : Array1<Lengthf32>,
    pub depth_axis       : Array1<Lengthf32>,
}

impl Geometry {

    /// Validate caller-supplied positions against the echo volume they
    /// describe, and derive the depth axis.
    pub fn new(
        dims             : VolumeDims,
        element_positions: Array1<Lengthf32>,
        scanline_centres : Array1<Lengthf32>,
        acquisition      : &Acquisition,
    ) -> Result<Self> {
        check_len("element_positions", dims.elements , element_positions.len())?;
        check_len("scanline_centres" , dims.scanlines, scanline_centres .len())?;
        check_sorted("element_positions", &element_positions)?;
        check_sorted("scanline_centres" , &scanline_centres )?;
        let depth_axis = depth_axis(dims.depth_samples, acquisition.sampling_rate, acquisition.speed_of_sound)?;
        Ok(Self { element_positions, scanline_centres, depth_axis })
    }

    pub fn extents(&self) -> Extents {
        let (lateral_min, lateral_max) = min_max(&self.scanline_centres);
        let (depth_min  , depth_max  ) = min_max(&self.depth_axis);
        Extents { depth_min, depth_max, lateral_min, lateral_max }
    }
}

/// Physical placement of a `[depth, scanline]` image, in metres
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Extents {
    pub depth_min  : Lengthf32,
    pub depth_max  : Lengthf32,
    pub lateral_min: Lengthf32,
    pub lateral_max: Lengthf32,
}

impl Extents {
    /// Depth extent over lateral extent; `None` for a single-column image
    pub fn aspect_ratio(&self) -> Option<f32> {
        let lateral = self.lateral_max - self.lateral_min;
        let depth   = self.depth_max   - self.depth_min;
        if lateral > 0.0 { Some(depth / lateral) } else { None }
    }
}

fn min_max(a: &Array1<Lengthf32>) -> (Lengthf32, Lengthf32) {
    a.iter().copied()
        .minmax_by(f32::total_cmp)
        .into_option()
        .unwrap_or((0.0, 0.0))
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found { Ok(()) }
    else { Err(Error::ShapeMismatch { what, expected, found }) }
}

fn check_sorted(parameter: &'static str, positions: &Array1<Lengthf32>) -> Result<()> {
    if let Some(bad) = positions.iter().find(|x| !x.is_finite()) {
        return Err(Error::invalid(parameter, bad, "positions must be finite"));
    }
    match positions.iter().tuple_windows().position(|(a, b)| b < a) {
        None    => Ok(()),
        Some(i) => Err(Error::invalid(parameter, format!("[{i}] = {}, [{}] = {}", positions[i], i+1, positions[i+1]),
                                      "positions must be sorted in increasing order")),
    }
}

#[cfg(test)]
mod test_depth_axis {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    use units::{mhz, m_s};

    #[test]
    fn four_thousand_samples_start_at_zero() -> Result<()> {
        let z = depth_axis(4000, mhz(40.0), m_s(1540.0))?;
        assert_eq!(z.len(), 4000);
        assert_eq!(z[0], 0.0);
        assert_float_eq!(z[1]   , 1.925e-5        , r2nd <= 1e-6);
        assert_float_eq!(z[3999], 3999.0 * 1.925e-5, r2nd <= 1e-5);
        Ok(())
    }

    #[test]
    fn uniformly_spaced() -> Result<()> {
        let z = depth_axis(100, mhz(20.0), m_s(1500.0))?;
        let step = z[1] - z[0];
        for (a, b) in z.iter().tuple_windows() {
            assert_float_eq!(b - a, step, abs <= 1e-8);
        }
        Ok(())
    }

    #[rstest(/**/ fs  , c     ,
             case( 0.0, 1540.0),
             case(-1.0, 1540.0),
             case(40.0,    0.0),
             case(40.0, -340.0),
    )]
    fn non_positive_parameters_rejected(fs: f32, c: f32) {
        let result = depth_axis(10, mhz(fs), m_s(c));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}

#[cfg(test)]
mod test_geometry {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use units::{mhz, m_s, mm};

    fn acquisition() -> Acquisition {
        Acquisition { sampling_rate: mhz(40.0), speed_of_sound: m_s(1540.0), focus: mm(20.0) }
    }

    fn dims(elements: usize, scanlines: usize) -> VolumeDims {
        VolumeDims { depth_samples: 11, elements, scanlines }
    }

    #[test]
    fn mismatched_element_count() {
        let result = Geometry::new(dims(4, 2), array![0.0, 1.0, 2.0], array![0.0, 1.0], &acquisition());
        assert!(matches!(result, Err(Error::ShapeMismatch { what: "element_positions", expected: 4, found: 3 })));
    }

    #[test]
    fn mismatched_scanline_count() {
        let result = Geometry::new(dims(3, 3), array![0.0, 1.0, 2.0], array![0.0, 1.0], &acquisition());
        assert!(matches!(result, Err(Error::ShapeMismatch { what: "scanline_centres", .. })));
    }

    #[test]
    fn unsorted_positions_rejected() {
        let result = Geometry::new(dims(3, 2), array![0.0, 2.0, 1.0], array![0.0, 1.0], &acquisition());
        assert!(matches!(result, Err(Error::InvalidParameter { parameter: "element_positions", .. })));
        let result = Geometry::new(dims(3, 2), array![0.0, f32::NAN, 1.0], array![0.0, 1.0], &acquisition());
        assert!(result.is_err());
    }

    #[test]
    fn extents_span_axes() -> Result<()> {
        let g = Geometry::new(dims(3, 3), array![-1.0, 0.0, 1.0], array![-0.01, 0.0, 0.01], &acquisition())?;
        let e = g.extents();
        assert_eq!((e.depth_min, e.lateral_min, e.lateral_max), (0.0, -0.01, 0.01));
        assert_eq!(e.depth_max, g.depth_axis[10]);
        assert!(e.aspect_ratio().is_some());
        Ok(())
    }

    #[test]
    fn single_scanline_has_no_aspect_ratio() -> Result<()> {
        let g = Geometry::new(dims(3, 1), array![-1.0, 0.0, 1.0], array![0.0], &acquisition())?;
        assert_eq!(g.extents().aspect_ratio(), None);
        Ok(())
    }
}
