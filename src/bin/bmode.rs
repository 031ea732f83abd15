// ----------------------------------- CLI -----------------------------------
use std::path::PathBuf;

use clap::Parser;

use bmode::das::Interpolation;
use bmode::envelope::{Compression, Normalization};
use units::{Frequency, Length};

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "bmode", about = "Delay-and-sum B-mode reconstruction of linear-array ultrasound data")]
pub struct Cli {

    #[cfg(not(feature = "serial"))]
    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub threads: usize,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {

    /// Reconstruct a display image from a recorded acquisition
    Reconstruct {
        /// Directory containing rf_data.npy, element_positions.npy and scanline_centres.npy
        input: PathBuf,

        /// TOML file with acquisition and processing parameters
        #[clap(short, long)]
        config: PathBuf,

        /// Where to write the display image (.npy); extents go alongside
        #[clap(short, long, default_value = "bmode.npy")]
        out: PathBuf,

        #[clap(flatten)]
        overrides: Overrides,
    },

    /// Report shapes and a corner of the arrays of an acquisition
    Inspect {
        input: PathBuf,

        /// Size of the corner of the first frame to print
        #[clap(short = 'n', long, default_value = "5")]
        corner: usize,

        /// Also report the physical extents implied by this configuration
        #[clap(short, long)]
        config: Option<PathBuf>,
    },

    /// Write log(1 + |rf|) of one raw [depth, element] frame
    Preview {
        input: PathBuf,

        #[clap(short, long, default_value = "0")]
        scanline: usize,

        #[clap(short, long, default_value = "frame.npy")]
        out: PathBuf,
    },

    /// Generate a synthetic acquisition of point reflectors
    Simulate {
        /// Directory in which to write the acquisition arrays
        out: PathBuf,

        /// Acquisition parameters (other sections are ignored)
        #[clap(short, long)]
        config: PathBuf,

        /// Reflector position and optional amplitude: `x,z[,amplitude]`, e.g. `0 mm,20 mm`
        #[clap(short, long = "reflector", value_parser = parse_reflector, required = true)]
        reflectors: Vec<Reflector>,

        #[clap(long, default_value = "128")]
        elements: usize,

        #[clap(long, default_value = "0.3 mm")]
        pitch: Length,

        #[clap(long, default_value = "97")]
        scanlines: usize,

        #[clap(long, default_value = "4000")]
        depth_samples: usize,

        /// Tone burst centre frequency; unit impulses if absent
        #[clap(long)]
        tone_burst: Option<Frequency>,

        /// Tone burst length (FWHM) in periods
        #[clap(long, default_value = "2")]
        cycles: f32,

        /// Lateral standard deviation of the transmit beam
        #[clap(long, default_value = "1 mm")]
        beam_width: Length,

        /// Standard deviation of additive Gaussian noise
        #[clap(long, default_value = "0")]
        noise: f32,

        #[clap(long, default_value = "0")]
        seed: u64,
    },
}

/// Command-line values which take precedence over the configuration file
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct Overrides {
    /// Receive elements per scanline
    #[clap(short = 'w', long)]
    subaperture: Option<usize>,

    #[clap(long, value_enum)]
    interpolation: Option<Interpolation>,

    #[clap(long, value_enum)]
    compression: Option<Compression>,

    #[clap(long, value_enum)]
    normalization: Option<Normalization>,

    /// Display window in dB
    #[clap(short = 'd', long)]
    dynamic_range: Option<f32>,

    /// Median filter window edge (0 disables)
    #[clap(long)]
    speckle: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct Reflector { x: Length, z: Length, amplitude: f32 }

fn parse_reflector(s: &str) -> Result<Reflector, String> {
    let parts = s.split(',').map(str::trim).collect::<Vec<_>>();
    let length = |t: &str| t.parse::<Length>().map_err(|e| format!("`{t}`: {e}"));
    match parts[..] {
        [x, z]    => Ok(Reflector { x: length(x)?, z: length(z)?, amplitude: 1.0 }),
        [x, z, a] => Ok(Reflector { x: length(x)?, z: length(z)?,
                                    amplitude: a.parse().map_err(|e| format!("`{a}`: {e}"))? }),
        _ => Err(format!("expected `x,z` or `x,z,amplitude`, got `{s}`")),
    }
}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use ndarray::s;

use bmode::config::{read_config_file, Config};
use bmode::das::{self, DelayLaw};
use bmode::io::{self, Recording};
use bmode::phantom::{self, Phantom, Probe, Pulse};
use bmode::pipeline;
use bmode::utils::{describe_shape, group_digits, timing::Progress};
use units::{hz_, m_};

fn main() -> Result<(), Box<dyn Error>> {

    pretty_env_logger::init();
    let args = Cli::parse();

    #[cfg(not(feature = "serial"))]
    rayon::ThreadPoolBuilder::new().num_threads(args.threads).build_global()?;

    match args.command {
        Command::Reconstruct { input, config, out, overrides } => reconstruct(&input, &config, &out, overrides),
        Command::Inspect     { input, corner, config }        => inspect(&input, corner, config.as_deref()),
        Command::Preview     { input, scanline, out }         => preview(&input, scanline, &out),
        Command::Simulate    { out, config, reflectors, elements, pitch, scanlines, depth_samples,
                               tone_burst, cycles, beam_width, noise, seed } => {
            let probe = Probe { elements, pitch: m_(pitch), scanlines };
            let pulse = match tone_burst {
                Some(f) => Pulse::ToneBurst { centre_frequency: hz_(f), cycles },
                None    => Pulse::Impulse,
            };
            let reflectors = reflectors.into_iter()
                .map(|Reflector { x, z, amplitude }| phantom::Reflector { lateral: m_(x), depth: m_(z), amplitude })
                .collect();
            let phantom = Phantom { reflectors, pulse, beam_width: m_(beam_width), noise, seed };
            simulate(&out, &config, &phantom, &probe, depth_samples)
        }
    }
}

fn reconstruct(input: &Path, config: &Path, out: &Path, overrides: Overrides) -> Result<(), Box<dyn Error>> {
    let mut progress = Progress::new();

    progress.start(&format!("Reading configuration {}", config.display()));
    let mut config = read_config_file(config)?;
    apply(&overrides, &mut config);
    config.validate()?;
    progress.done();
    info!("{config:#?}");

    progress.start(&format!("Reading acquisition from {}", input.display()));
    let (volume, geometry) = Recording::read(input)?.into_parts(&config.acquisition)?;
    progress.done();
    let dims = volume.dims();
    println!("Echo volume {}", describe_shape(&dims.shape()));

    progress.startln(&format!("Beamforming {} scanlines with {}-element subapertures",
                              group_digits(dims.scanlines), config.beamforming.subaperture));
    let bar = ProgressBar::new(dims.scanlines as u64);
    bar.set_style(ProgressStyle::default_bar()
                  .template("[{elapsed_precise}] {wide_bar} {pos}/{len} scanlines ({eta_precise})")?);
    let beamformed = das::beamform_with_progress(&volume, &geometry, &config.acquisition, &config.beamforming,
                                                 || bar.inc(1))?;
    bar.finish();
    progress.done_with_message("Beamformed");

    progress.start("Envelope, compression, normalization and speckle filter");
    let image = pipeline::finish(&beamformed, &geometry, &config)?;
    progress.done();

    let extents = io::write_display_image(&image, out)?;
    let e = image.extents;
    println!("Depth   {:7.2} .. {:7.2} mm", e.depth_min   * 1e3, e.depth_max   * 1e3);
    println!("Lateral {:7.2} .. {:7.2} mm", e.lateral_min * 1e3, e.lateral_max * 1e3);
    if let Some(r) = image.aspect_ratio() { println!("Aspect ratio (depth / lateral) {r:.3}") }
    progress.done_with_message(&format!("Wrote {} and {}", out.display(), extents.display()));
    Ok(())
}

fn apply(overrides: &Overrides, config: &mut Config) {
    let Overrides { subaperture, interpolation, compression, normalization, dynamic_range, speckle } = *overrides;
    if let Some(w) = subaperture   { config.beamforming.subaperture   = w }
    if let Some(i) = interpolation { config.beamforming.interpolation = i }
    if let Some(c) = compression   { config.display.compression       = c }
    if let Some(n) = normalization { config.display.normalization     = n }
    if let Some(d) = dynamic_range { config.display.dynamic_range     = d }
    if let Some(s) = speckle       { config.speckle.size              = s }
}

fn inspect(input: &Path, corner: usize, config: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let recording = Recording::read(input)?;
    println!("{:<24} {}", io::RF_DATA          , describe_shape(&recording.volume.dims().shape()));
    println!("{:<24} {}", io::ELEMENT_POSITIONS, describe_shape(recording.element_positions.shape()));
    println!("{:<24} {}", io::SCANLINE_CENTRES , describe_shape(recording.scanline_centres .shape()));
    let dims = recording.volume.dims();
    let frame = recording.volume.frame(0);
    let (d, e) = (corner.min(dims.depth_samples), corner.min(dims.elements));
    println!("\nFirst {d} samples of first {e} elements, scanline 0:\n{:8.3}", frame.slice(s![..d, ..e]));
    let span = |a: &ndarray::Array1<f32>| {
        a.iter().next().zip(a.iter().last()).map(|(lo, hi)| format!("{:.2} .. {:.2} mm", lo * 1e3, hi * 1e3)).unwrap_or_default()
    };
    println!("\nElements  {}", span(&recording.element_positions));
    println!("Scanlines {}", span(&recording.scanline_centres));
    if let Some(config) = config {
        let config = read_config_file(config)?;
        let (_, geometry) = recording.into_parts(&config.acquisition)?;
        let e = geometry.extents();
        println!("Depth     {:.2} .. {:.2} mm", e.depth_min * 1e3, e.depth_max * 1e3);
        if let Some(r) = e.aspect_ratio() { println!("Aspect ratio (depth / lateral) {r:.3}") }
    }
    Ok(())
}

fn preview(input: &Path, scanline: usize, out: &Path) -> Result<(), Box<dyn Error>> {
    let recording = Recording::read(input)?;
    let frame = recording.volume.log_frame(scanline)?;
    io::write_f32_array2(out, &frame)?;
    println!("Wrote log(1 + |rf|) of scanline {scanline} {} to {}", describe_shape(frame.shape()), out.display());
    Ok(())
}

fn simulate(out: &Path, config: &Path, phantom: &Phantom, probe: &Probe, depth_samples: usize) -> Result<(), Box<dyn Error>> {
    let mut progress = Progress::new();
    let config = read_config_file(config)?;
    let law = DelayLaw::new(&config.acquisition)?;
    progress.start(&format!("Simulating {} reflectors", phantom.reflectors.len()));
    let volume = phantom.simulate(probe, depth_samples, &law)?;
    progress.done();
    for r in &phantom.reflectors {
        info!("Reflector at ({:.2}, {:.2}) mm, amplitude {}", r.lateral * 1e3, r.depth * 1e3, r.amplitude);
    }
    let recording = Recording {
        volume,
        element_positions: probe.element_positions(),
        scanline_centres : probe.scanline_centres(),
    };
    recording.write(out)?;
    progress.done_with_message(&format!("Wrote acquisition to {}", out.display()));
    Ok(())
}
