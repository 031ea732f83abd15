//! Synthetic echo volumes of point reflectors
//!
//! Echoes are placed at the arrival times predicted by the same `DelayLaw`
//! which the beamformer inverts, so a reflector lying on a scanline is
//! refocused exactly by nearest-sample DAS.

use log::debug;
use ndarray::{s, Array1, Array3, ArrayViewMut1};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::das::{nearest_index, DelayLaw};
use crate::error::{Error, Result};
use crate::volume::{EchoVolume, VolumeDims};
use crate::{Amplitudef32, Frequencyf32, Lengthf32};

/// Point scatterer at `(lateral, depth)`, in metres
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reflector {
    pub lateral  : Lengthf32,
    pub depth    : Lengthf32,
    pub amplitude: Amplitudef32,
}

/// Shape of the echo left by each reflector in each trace
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pulse {
    /// Single non-zero sample at the nearest arrival index
    Impulse,
    /// Cosine at `centre_frequency` under a Gaussian window whose FWHM spans
    /// `cycles` periods
    ToneBurst { centre_frequency: Frequencyf32, cycles: f32 },
}

/// Linear array and scanline layout of a simulated acquisition
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probe {
    pub elements : usize,
    pub pitch    : Lengthf32,
    pub scanlines: usize,
}

impl Probe {
    /// Element positions centred on zero
    pub fn element_positions(&self) -> Array1<Lengthf32> {
        let half = (self.elements as f32 - 1.0) / 2.0;
        Array1::from_shape_fn(self.elements, |i| (i as f32 - half) * self.pitch)
    }

    /// Scanline centres evenly spread between the outermost elements
    pub fn scanline_centres(&self) -> Array1<Lengthf32> {
        let half_span = (self.elements as f32 - 1.0) / 2.0 * self.pitch;
        Array1::linspace(-half_span, half_span, self.scanlines)
    }
}

#[derive(Clone, Debug)]
pub struct Phantom {
    pub reflectors: Vec<Reflector>,
    pub pulse: Pulse,
    /// Lateral standard deviation of the transmit beam: reflectors far from a
    /// scanline contribute little to it
    pub beam_width: Lengthf32,
    /// Standard deviation of additive Gaussian noise; zero for none
    pub noise: Amplitudef32,
    pub seed: u64,
}

impl Phantom {

    pub fn validate(&self) -> Result<()> {
        if !(self.beam_width > 0.0) {
            return Err(Error::invalid("beam_width", self.beam_width, "must be strictly positive"));
        }
        if !(self.noise >= 0.0 && self.noise.is_finite()) {
            return Err(Error::invalid("noise", self.noise, "must be finite and non-negative"));
        }
        if let Pulse::ToneBurst { centre_frequency, cycles } = self.pulse {
            if !(centre_frequency > 0.0) { return Err(Error::invalid("centre_frequency", centre_frequency, "must be strictly positive")) }
            if !(cycles           > 0.0) { return Err(Error::invalid("cycles"          , cycles          , "must be strictly positive")) }
        }
        Ok(())
    }

    /// Echo volume recorded by `probe` with `depth_samples` per trace
    pub fn simulate(&self, probe: &Probe, depth_samples: usize, law: &DelayLaw) -> Result<EchoVolume> {
        self.validate()?;
        let dims = VolumeDims { depth_samples, elements: probe.elements, scanlines: probe.scanlines };
        let mut samples = Array3::zeros(dims.shape());
        let positions = probe.element_positions();
        let centres   = probe.scanline_centres();

        for (s, &centre) in centres.iter().enumerate() {
            for (e, &element) in positions.iter().enumerate() {
                let mut trace = samples.slice_mut(s![.., e, s]);
                let transmit = law.transmit_distance(element, centre);
                for r in &self.reflectors {
                    let offset = (r.lateral - centre) / self.beam_width;
                    let amplitude = r.amplitude * (-0.5 * offset * offset).exp();
                    let receive = law.receive_distance(element, r.lateral, r.depth);
                    let arrival = law.samples(transmit + receive);
                    self.pulse.deposit(&mut trace, arrival, amplitude, law.sampling_rate);
                }
            }
        }

        if self.noise > 0.0 {
            let normal = Normal::new(0.0, self.noise)
                .map_err(|_| Error::invalid("noise", self.noise, "not a valid standard deviation"))?;
            let mut rng = StdRng::seed_from_u64(self.seed);
            samples.mapv_inplace(|x: f32| x + normal.sample(&mut rng));
        }
        debug!("Simulated {} reflectors in {dims:?}", self.reflectors.len());
        EchoVolume::new(samples)
    }
}

impl Pulse {
    /// Add an echo arriving at fractional sample `arrival` into `trace`
    fn deposit(
        &self,
        trace: &mut ArrayViewMut1<Amplitudef32>,
        arrival: f32,
        amplitude: Amplitudef32,
        sampling_rate: Frequencyf32,
    ) {
        let n = trace.len();
        match *self {
            Pulse::Impulse => {
                if let Some(i) = nearest_index(arrival, n) { trace[i] += amplitude }
            }
            Pulse::ToneBurst { centre_frequency, cycles } => {
                let samples_per_cycle = sampling_rate / centre_frequency;
                let sigma = cycles * samples_per_cycle / FWHM_PER_SIGMA;
                let reach = (4.0 * sigma).ceil();
                if arrival + reach < 0.0 || arrival - reach >= n as f32 { return }
                let first =  (arrival - reach).max(0.0) as usize;
                let last  = ((arrival + reach) as usize).min(n - 1);
                for i in first..=last {
                    let dt = i as f32 - arrival;
                    let window = (-0.5 * (dt / sigma).powi(2)).exp();
                    trace[i] += amplitude * window * (std::f32::consts::TAU * dt / samples_per_cycle).cos();
                }
            }
        }
    }
}

/// `2·sqrt(2·ln 2)`
const FWHM_PER_SIGMA: f32 = 2.354_82;
