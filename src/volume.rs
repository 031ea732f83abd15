/// Raw per-element, per-scanline echo recordings

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::error::{Error, Result};
use crate::Amplitudef32;

/// Named extents of the three axes of an `EchoVolume`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeDims {
    pub depth_samples: usize,
    pub elements: usize,
    pub scanlines: usize,
}

impl VolumeDims {
    pub fn shape(&self) -> [usize; 3] { [self.depth_samples, self.elements, self.scanlines] }
}

/// Echo samples indexed by `[depth sample, receive element, scanline]`.
///
/// Once constructed, the volume is only ever handed out as read-only views.
#[derive(Clone, Debug)]
pub struct EchoVolume {
    samples: Array3<Amplitudef32>,
}

impl EchoVolume {

    pub fn new(samples: Array3<Amplitudef32>) -> Result<Self> {
        let (depth_samples, elements, scanlines) = samples.dim();
        check_nonzero("depth_samples", depth_samples)?;
        check_nonzero("elements"     , elements     )?;
        check_nonzero("scanlines"    , scanlines    )?;
        Ok(Self { samples })
    }

    pub fn zeros(dims: VolumeDims) -> Result<Self> {
        Self::new(Array3::zeros(dims.shape()))
    }

    pub fn dims(&self) -> VolumeDims {
        let (depth_samples, elements, scanlines) = self.samples.dim();
        VolumeDims { depth_samples, elements, scanlines }
    }

    pub fn samples(&self) -> ArrayView3<Amplitudef32> { self.samples.view() }

    /// All samples recorded by `element` while acquiring `scanline`
    pub fn trace(&self, element: usize, scanline: usize) -> ArrayView1<Amplitudef32> {
        self.samples.slice(ndarray::s![.., element, scanline])
    }

    /// `[depth, element]` frame recorded for one scanline
    pub fn frame(&self, scanline: usize) -> ArrayView2<Amplitudef32> {
        self.samples.index_axis(Axis(2), scanline)
    }

    /// Contrast-enhanced view of one raw frame: `log(1 + |rf|)`
    pub fn log_frame(&self, scanline: usize) -> Result<Array2<f32>> {
        let n = self.dims().scanlines;
        if scanline >= n {
            return Err(Error::invalid("scanline", scanline, "exceeds number of scanlines in volume"));
        }
        Ok(self.frame(scanline).mapv(|x| x.abs().ln_1p()))
    }
}

fn check_nonzero(parameter: &'static str, n: usize) -> Result<()> {
    if n == 0 { Err(Error::invalid(parameter, n, "echo volume axes must be non-empty")) }
    else      { Ok(()) }
}
