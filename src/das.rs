//! Delay-and-sum beamforming of a linear-array echo volume
//!
//! Every `(depth, scanline)` pixel is reconstructed by summing, over the
//! scanline's subaperture, the echo sample whose arrival time matches the
//! round trip from a virtual transmit source at `(x_s, focus)` via the pixel
//! at `(x_s, z)` back to each receive element.
//!
//! Lookups which fall outside the recorded depth range are silently excluded:
//! they are a routine consequence of the geometry, not a fault.

use log::{debug, info, warn};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use serde::Deserialize;

use units::{hz_, m_, m_s_};

use crate::axis::Geometry;
use crate::config::Acquisition;
use crate::error::{Error, Result};
use crate::subaperture::{self, Subaperture};
use crate::volume::EchoVolume;
use crate::{Amplitudef32, Frequencyf32, Lengthf32, Velocityf32};

// ----- Configuration ---------------------------------------------------------------

/// How echo traces are sampled at non-integer delays
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    /// Round to the nearest recorded sample (reference behaviour)
    #[default]
    Nearest,
    /// Interpolate linearly between the two neighbouring samples
    Linear,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Beamforming {

    /// Number of receive elements summed for each scanline
    #[serde(default = "default_subaperture")]
    pub subaperture: usize,

    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_subaperture() -> usize { 32 }

impl Default for Beamforming {
    fn default() -> Self {
        Self { subaperture: default_subaperture(), interpolation: Interpolation::default() }
    }
}

impl Beamforming {
    pub fn validate(&self) -> Result<()> {
        if self.subaperture == 0 {
            return Err(Error::invalid("subaperture", self.subaperture, "must contain at least one element"));
        }
        Ok(())
    }
}

// ----- Delay law --------------------------------------------------------------------

/// Single-focus transmit, dynamic receive delay model, in SI `f32`s
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayLaw {
    pub focus         : Lengthf32,
    pub speed_of_sound: Velocityf32,
    pub sampling_rate : Frequencyf32,
}

impl DelayLaw {

    pub fn new(acquisition: &Acquisition) -> Result<Self> {
        acquisition.validate()?;
        Ok(Self {
            focus         : m_  (acquisition.focus),
            speed_of_sound: m_s_(acquisition.speed_of_sound),
            sampling_rate : hz_ (acquisition.sampling_rate),
        })
    }

    /// Distance from the virtual source above `centre` to `element`.
    /// Independent of depth, so computed once per scanline.
    #[inline]
    pub fn transmit_distance(&self, element: Lengthf32, centre: Lengthf32) -> Lengthf32 {
        let dx = element - centre;
        (dx * dx + self.focus * self.focus).sqrt()
    }

    /// Distance from the pixel at `(centre, depth)` back to `element`
    #[inline]
    pub fn receive_distance(&self, element: Lengthf32, centre: Lengthf32, depth: Lengthf32) -> Lengthf32 {
        let dx = element - centre;
        (dx * dx + depth * depth).sqrt()
    }

    /// Convert a path length into a (fractional) sample index
    #[inline]
    pub fn samples(&self, distance: Lengthf32) -> f32 {
        (distance / self.speed_of_sound) * self.sampling_rate
    }

    /// Fractional sample index at which `element` records the echo from
    /// `depth` on the scanline through `centre`
    pub fn delay(&self, element: Lengthf32, centre: Lengthf32, depth: Lengthf32) -> f32 {
        self.samples(self.transmit_distance(element, centre) + self.receive_distance(element, centre, depth))
    }
}

// ----- Sample lookup ----------------------------------------------------------------

/// Strategy for reading an echo trace at a fractional sample position
pub trait SampleLookup: Copy + Send + Sync {
    /// `None` when `position` lies outside the trace
    fn sample(self, trace: &ArrayView1<Amplitudef32>, position: f32) -> Option<Amplitudef32>;
}

#[derive(Clone, Copy, Debug)]
pub struct NearestSample;

#[derive(Clone, Copy, Debug)]
pub struct LinearSample;

impl SampleLookup for NearestSample {
    #[inline]
    fn sample(self, trace: &ArrayView1<Amplitudef32>, position: f32) -> Option<Amplitudef32> {
        nearest_index(position, trace.len()).map(|i| trace[i])
    }
}

impl SampleLookup for LinearSample {
    #[inline]
    fn sample(self, trace: &ArrayView1<Amplitudef32>, position: f32) -> Option<Amplitudef32> {
        let n = trace.len();
        // Also rejects NaN
        if !(position >= 0.0 && position < n as f32) { return None }
        let below = position.floor();
        let i = below as usize;
        let frac = position - below;
        if frac == 0.0 { return Some(trace[i]) }
        if i + 1 >= n  { return None }
        Some(trace[i] + frac * (trace[i + 1] - trace[i]))
    }
}

/// Round `position` to a sample index, if it lies inside `[0, n)`
#[inline]
pub fn nearest_index(position: f32, n: usize) -> Option<usize> {
    let rounded = position.round();
    if rounded >= 0.0 && rounded < n as f32 { Some(rounded as usize) }
    else { None }
}

// ----- Beamformed image -------------------------------------------------------------

/// Coherently summed RF amplitudes, indexed by `[depth sample, scanline]`
#[derive(Clone, Debug)]
pub struct BeamformedImage {
    data: Array2<Amplitudef32>,
}

impl BeamformedImage {
    pub fn view(&self) -> ArrayView2<Amplitudef32> { self.data.view() }
    pub fn dim(&self) -> (usize, usize) { self.data.dim() }
    pub fn into_inner(self) -> Array2<Amplitudef32> { self.data }
}

impl From<Array2<Amplitudef32>> for BeamformedImage {
    fn from(data: Array2<Amplitudef32>) -> Self { Self { data } }
}

// ----- Reconstruction ---------------------------------------------------------------

pub fn beamform(
    volume     : &EchoVolume,
    geometry   : &Geometry,
    acquisition: &Acquisition,
    beamforming: &Beamforming,
) -> Result<BeamformedImage> {
    beamform_with_progress(volume, geometry, acquisition, beamforming, || {})
}

/// As `beamform`, calling `on_scanline` (possibly from several threads) each
/// time a scanline is completed.
pub fn beamform_with_progress<F>(
    volume     : &EchoVolume,
    geometry   : &Geometry,
    acquisition: &Acquisition,
    beamforming: &Beamforming,
    on_scanline: F,
) -> Result<BeamformedImage>
where
    F: Fn() + Send + Sync,
{
    // -------- Fail fast on structural problems: no partial images -------------
    beamforming.validate()?;
    let law = DelayLaw::new(acquisition)?;
    let dims = volume.dims();
    check_len("element_positions", dims.elements     , geometry.element_positions.len())?;
    check_len("scanline_centres" , dims.scanlines    , geometry.scanline_centres .len())?;
    check_len("depth_axis"       , dims.depth_samples, geometry.depth_axis       .len())?;

    let subapertures = subaperture::select_all(
        geometry.scanline_centres.view(),
        geometry.element_positions.view(),
        beamforming.subaperture,
    )?;
    debug!("{dims:?}, {law:?}, {} elements per subaperture, {:?} interpolation",
           beamforming.subaperture, beamforming.interpolation);

    // -------- Sum -----------------------------------------------------------------
    let job = Job { volume, geometry, subapertures: &subapertures, law };
    let data = match beamforming.interpolation {
        Interpolation::Nearest => job.run(NearestSample, &on_scanline),
        Interpolation::Linear  => job.run(LinearSample , &on_scanline),
    };
    info!("Beamformed {} x {} pixels", dims.depth_samples, dims.scanlines);
    Ok(BeamformedImage { data })
}

/// Read-only state shared by all scanline workers
struct Job<'a> {
    volume      : &'a EchoVolume,
    geometry    : &'a Geometry,
    subapertures: &'a [Subaperture],
    law         : DelayLaw,
}

impl Job<'_> {

    fn run<L: SampleLookup, F: Fn() + Send + Sync>(&self, lookup: L, on_scanline: &F) -> Array2<Amplitudef32> {
        let dims = self.volume.dims();
        let mut image = Array2::zeros((dims.depth_samples, dims.scanlines));

        let one_scanline = |s: usize, column: ArrayViewMut1<Amplitudef32>| {
            let silent = self.scanline(s, column, lookup);
            if silent == dims.depth_samples {
                warn!("Scanline {s}: no valid delay for any pixel in subaperture {:?}; column left at zero",
                      self.subapertures[s]);
            } else if silent > 0 {
                debug!("Scanline {s}: {silent} pixels without valid contributions set to zero");
            }
            on_scanline();
        };

        // Each worker owns one output column: no shared mutable state
        let columns = Zip::indexed(image.axis_iter_mut(Axis(1)));
        #[cfg    (feature = "serial") ] columns.    for_each(one_scanline);
        #[cfg(not(feature = "serial"))] columns.par_for_each(one_scanline);

        if image.iter().all(|&x| x == 0.0) {
            warn!("Beamformed image is identically zero");
        }
        image
    }

    /// Reconstruct scanline `s` into `column`. Returns the number of pixels
    /// which received no valid contribution.
    fn scanline<L: SampleLookup>(&self, s: usize, mut column: ArrayViewMut1<Amplitudef32>, lookup: L) -> usize {
        let Job { volume, geometry, subapertures, law } = self;
        let elements = subapertures[s].range();
        let centre = geometry.scanline_centres[s];
        let positions = geometry.element_positions.slice(s![elements.clone()]);
        let frame = volume.frame(s);

        // Depth-independent parts, computed once per scanline
        let traces: Vec<_> = elements.map(|e| frame.column(e)).collect();
        let transmit: Vec<Lengthf32> = positions.iter()
            .map(|&p| law.transmit_distance(p, centre))
            .collect();

        let mut silent = 0;
        for (pixel, &z) in column.iter_mut().zip(geometry.depth_axis.iter()) {
            let mut sum = 0.0;
            let mut valid = 0;
            for ((trace, &tx), &p) in traces.iter().zip(&transmit).zip(positions.iter()) {
                let delay = law.samples(tx + law.receive_distance(p, centre, z));
                if let Some(x) = lookup.sample(trace, delay) {
                    sum += x;
                    valid += 1;
                }
            }
            if valid == 0 { silent += 1 }
            *pixel = sum;
        }
        silent
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found { Ok(()) }
    else { Err(Error::ShapeMismatch { what, expected, found }) }
}
