//! Envelope detection, log compression and display normalization
//!
//! The envelope is the magnitude of the analytic signal along depth, obtained
//! with an FFT-based Hilbert transform applied independently to every
//! scanline. Compression and normalization are then applied to the image as a
//! whole, never per scanline.

use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use serde::Deserialize;

use crate::das::BeamformedImage;
use crate::error::{Error, Result};
use crate::{Amplitudef32, Decibelf32, Intensityf32};

/// Guards the logarithm against zero envelopes: `20·log10(ε) = -160 dB`
pub const EPSILON: f32 = 1e-8;

// ----- Configuration ---------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// `20·log10(envelope + ε)`
    #[default]
    Decibel,
    /// `ln(1 + envelope)`
    Log1p,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Map the top `dynamic_range` of the compressed image onto the display
    /// range, clamping everything below
    #[default]
    DynamicRange,
    /// Map the full range of the compressed image onto the display range
    MinMax,
}

/// How compressed envelope values become display intensities
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DisplayMapping {

    #[serde(default)]
    pub compression: Compression,

    #[serde(default)]
    pub normalization: Normalization,

    /// Width of the display window, in the units of the compressed image
    /// (dB for `Decibel`). Ignored by `MinMax`.
    #[serde(default = "default_dynamic_range")]
    pub dynamic_range: Decibelf32,

    #[serde(default)]
    pub floor: Intensityf32,

    #[serde(default = "default_ceiling")]
    pub ceiling: Intensityf32,
}

fn default_dynamic_range() -> Decibelf32 {  60.0 }
fn default_ceiling      () -> Intensityf32 { 255.0 }

impl Default for DisplayMapping {
    fn default() -> Self {
        Self {
            compression  : Compression::default(),
            normalization: Normalization::default(),
            dynamic_range: default_dynamic_range(),
            floor        : 0.0,
            ceiling      : default_ceiling(),
        }
    }
}

impl DisplayMapping {
    pub fn validate(&self) -> Result<()> {
        let DisplayMapping { dynamic_range, floor, ceiling, .. } = *self;
        if !(dynamic_range > 0.0 && dynamic_range.is_finite()) {
            return Err(Error::invalid("dynamic_range", dynamic_range, "must be strictly positive"));
        }
        if !(floor.is_finite() && ceiling.is_finite()) {
            return Err(Error::invalid("floor/ceiling", format!("{floor}/{ceiling}"), "must be finite"));
        }
        if floor >= ceiling {
            return Err(Error::invalid("floor", floor, "must lie below ceiling"));
        }
        Ok(())
    }
}

// ----- Envelope detection ----------------------------------------------------------

/// FFT-based analytic signal of traces of a fixed length.
///
/// Spectral weights: `1` at DC (and at Nyquist for even lengths), `2` at
/// positive frequencies, `0` at negative ones. No zero padding.
pub struct Hilbert {
    n: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Hilbert {

    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        Self { n, forward, inverse }
    }

    /// Write the envelope of `trace` into `out`
    pub fn envelope_into(&self, trace: ArrayView1<Amplitudef32>, mut out: ArrayViewMut1<Amplitudef32>) {
        let n = self.n;
        let mut buffer: Vec<Complex32> = trace.iter().map(|&x| Complex32::new(x, 0.0)).collect();
        self.forward.process(&mut buffer);
        let positive_end = (n + 1) / 2; // exclusive; excludes Nyquist when n is even
        for c in &mut buffer[1..positive_end] { *c *= 2.0 }
        for c in &mut buffer[n / 2 + 1..]     { *c  = Complex32::new(0.0, 0.0) }
        self.inverse.process(&mut buffer);
        // rustfft leaves the inverse unnormalized
        let scale = 1.0 / n as f32;
        for (o, c) in out.iter_mut().zip(&buffer) { *o = c.norm() * scale }
    }

    pub fn envelope(&self, trace: ArrayView1<Amplitudef32>) -> ndarray::Array1<Amplitudef32> {
        let mut out = ndarray::Array1::zeros(trace.len());
        self.envelope_into(trace, out.view_mut());
        out
    }
}

/// Envelope of each scanline (column) of `rf`, same shape, non-negative
pub fn envelope(rf: ArrayView2<Amplitudef32>) -> Array2<Amplitudef32> {
    let (depth, _) = rf.dim();
    let mut out = Array2::zeros(rf.raw_dim());
    if depth == 0 { return out }
    let hilbert = Hilbert::new(depth);
    let columns = Zip::from(out.axis_iter_mut(Axis(1))).and(rf.axis_iter(Axis(1)));
    #[cfg    (feature = "serial") ] columns.    for_each(|o, x| hilbert.envelope_into(x, o));
    #[cfg(not(feature = "serial"))] columns.par_for_each(|o, x| hilbert.envelope_into(x, o));
    out
}

// ----- Compression and normalization -------------------------------------------------

pub fn compress(envelope: &Array2<Amplitudef32>, compression: Compression) -> Array2<f32> {
    match compression {
        Compression::Decibel => envelope.mapv(|e| 20.0 * (e.abs() + EPSILON).log10()),
        Compression::Log1p   => envelope.mapv(|e| e.abs().ln_1p()),
    }
}

/// Map `compressed` onto `[floor, ceiling]` using one window for the whole
/// image.
///
/// The dynamic-range window is `[max(max - range, min), max]`, so the image
/// minimum reaches `floor` whenever the image spans less than the range. A
/// constant image maps entirely to `floor`. Non-finite values map to `floor`.
pub fn normalize(compressed: &Array2<f32>, mapping: &DisplayMapping) -> Array2<Intensityf32> {
    let DisplayMapping { normalization, dynamic_range, floor, ceiling, .. } = *mapping;
    let Some((min, max)) = compressed.iter().copied()
        .filter(|x| x.is_finite())
        .minmax_by(f32::total_cmp)
        .into_option()
    else {
        return Array2::from_elem(compressed.raw_dim(), floor);
    };
    if max <= min {
        debug!("Constant compressed image ({min}): mapped to floor");
        return Array2::from_elem(compressed.raw_dim(), floor);
    }
    let low = match normalization {
        Normalization::MinMax       => min,
        Normalization::DynamicRange => (max - dynamic_range).max(min),
    };
    debug!("Display window [{low}, {max}] -> [{floor}, {ceiling}]");
    let span = ceiling - floor;
    let scale = span / (max - low);
    compressed.mapv(|x| {
        if x.is_finite() { floor + ((x - low) * scale).clamp(0.0, span) }
        else             { floor }
    })
}

/// Envelope, compression and normalization of a beamformed image
pub fn display_intensities(image: &BeamformedImage, mapping: &DisplayMapping) -> Result<Array2<Intensityf32>> {
    mapping.validate()?;
    let envelope = envelope(image.view());
    let compressed = compress(&envelope, mapping.compression);
    Ok(normalize(&compressed, mapping))
}
