/// Receive-element windows used to reconstruct each scanline

use std::ops::Range;

use itertools::Itertools;
use ndarray::ArrayView1;

use crate::error::{Error, Result};
use crate::Lengthf32;

/// Contiguous window `[start, end)` of receive elements
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subaperture {
    pub start: usize,
    pub end: usize,
}

impl Subaperture {
    pub fn len(&self) -> usize { self.end - self.start }
    pub fn is_empty(&self) -> bool { self.end == self.start }
    pub fn range(&self) -> Range<usize> { self.start..self.end }

    /// Window of `width` elements centred on the element nearest to `centre`.
    ///
    /// A window which would run off either end of the array is shifted inward
    /// so that it always contains exactly `width` elements.
    pub fn around(centre: Lengthf32, positions: ArrayView1<Lengthf32>, width: usize) -> Result<Self> {
        let n = positions.len();
        check_width(width, n)?;
        let nearest = nearest_element(centre, positions)
            .ok_or_else(|| Error::invalid("scanline_centre", centre, "no element is nearest to this position"))?;
        let start = nearest.saturating_sub(width / 2);
        let end   = n.min(start + width);
        let start = if end == n && end - start < width { n - width } else { start };
        Ok(Self { start, end })
    }
}

/// Select one subaperture per scanline. Fails before any selection is made if
/// the array cannot accommodate `width` elements.
pub fn select_all(
    scanline_centres : ArrayView1<Lengthf32>,
    element_positions: ArrayView1<Lengthf32>,
    width            : usize,
) -> Result<Vec<Subaperture>> {
    check_width(width, element_positions.len())?;
    scanline_centres.iter()
        .map(|&x| Subaperture::around(x, element_positions, width))
        .collect()
}

/// Index of the element closest to `x`; ties go to the lowest index.
pub fn nearest_element(x: Lengthf32, positions: ArrayView1<Lengthf32>) -> Option<usize> {
    positions.iter()
        .map(|p| (p - x).abs())
        .position_min_by(f32::total_cmp)
}

fn check_width(width: usize, n_elements: usize) -> Result<()> {
    if width == 0 {
        return Err(Error::invalid("subaperture", width, "must contain at least one element"));
    }
    if width > n_elements {
        return Err(Error::invalid("subaperture", width, "exceeds number of transducer elements"));
    }
    Ok(())
}

#[cfg(test)]
mod test_subaperture {
    use super::*;
    use ndarray::Array1;
    use rstest::rstest;
    use proptest::prelude::*;

    /// `n` elements with unit pitch, centred on zero
    fn linear_array(n: usize) -> Array1<Lengthf32> {
        Array1::from_shape_fn(n, |i| i as Lengthf32 - (n as Lengthf32 - 1.0) / 2.0)
    }

    // -------------------- Some hand-picked examples ------------------------------
    #[rstest(/**/ n ,  width, centre, expected,
             // Centre of an odd array: symmetric window
             case( 9,     4,    0.0 , (2, 6)),
             case( 9,     5,    0.0 , (2, 7)),
             // Left edge: cannot start before element 0
             case( 9,     4,   -4.0 , (0, 4)),
             case( 9,     4,   -9.0 , (0, 4)),
             // Right edge: shifted left to keep full width
             case( 9,     4,    4.0 , (5, 9)),
             case( 9,     4,   99.0 , (5, 9)),
             case( 9,     4,    3.0 , (5, 9)),
             // Width equals array
             case( 9,     9,    1.0 , (0, 9)),
             case( 1,     1,    7.0 , (0, 1)),
    )]
    fn hand_picked(n: usize, width: usize, centre: Lengthf32, expected: (usize, usize)) -> Result<()> {
        let positions = linear_array(n);
        let sub = Subaperture::around(centre, positions.view(), width)?;
        assert_eq!((sub.start, sub.end), expected);
        Ok(())
    }

    #[rstest(/**/ x   , expected,
             case(-0.5,    0),  // equidistant from elements 0 and 1: lowest index wins
             case( 0.5,    1),
             case( 0.51,   2),
             case(-7.0,    0),
             case( 7.0,    3),
    )]
    fn nearest_with_ties(x: Lengthf32, expected: usize) {
        let positions = ndarray::array![-1.0, 0.0, 1.0, 2.0];
        assert_eq!(nearest_element(x, positions.view()), Some(expected));
    }

    #[test]
    fn too_wide_rejected() {
        let positions = linear_array(8);
        let result = Subaperture::around(0.0, positions.view(), 9);
        assert!(matches!(result, Err(Error::InvalidParameter { parameter: "subaperture", .. })));
        let result = select_all(positions.view(), positions.view(), 0);
        assert!(matches!(result, Err(Error::InvalidParameter { parameter: "subaperture", .. })));
    }

    // 128 elements, 97 scanlines, 32-element windows
    #[test]
    fn edge_scanlines_keep_full_width() -> Result<()> {
        let pitch = 3.0e-4;
        let positions = Array1::from_shape_fn(128, |i| (i as f32 - 63.5) * pitch);
        let centres   = Array1::linspace(positions[0], positions[127], 97);
        let subs = select_all(centres.view(), positions.view(), 32)?;
        assert_eq!(subs.len(), 97);
        assert_eq!(subs[ 0], Subaperture { start:  0, end:  32 });
        assert_eq!(subs[96], Subaperture { start: 96, end: 128 });
        assert!(subs.iter().all(|s| s.len() == 32));
        Ok(())
    }

    // -------------------- Invariants ---------------------------------------------
    proptest! {
        #[test]
        fn always_full_width_and_in_bounds(
            (n, width) in (1..200_usize).prop_flat_map(|n| (Just(n), 1..=n)),
            centre     in -150.0 .. (150.0 as Lengthf32),
        ) {
            let positions = linear_array(n);
            let sub = Subaperture::around(centre, positions.view(), width).unwrap();
            prop_assert!(sub.start < sub.end);
            prop_assert!(sub.end <= n);
            prop_assert_eq!(sub.len(), width);
            // The nearest element lies inside its own window
            let nearest = nearest_element(centre, positions.view()).unwrap();
            prop_assert!(sub.range().contains(&nearest));
        }
    }
}
