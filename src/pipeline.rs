//! End-to-end B-mode reconstruction: echo volume in, display image out

use log::info;
use ndarray::{Array2, ArrayView2};

use crate::axis::{Extents, Geometry};
use crate::config::Config;
use crate::das::{self, BeamformedImage};
use crate::envelope;
use crate::error::Result;
use crate::volume::EchoVolume;
use crate::Intensityf32;

/// Display-ready intensities, `[depth sample, scanline]`, with the physical
/// extents needed to place them on a grid
#[derive(Clone, Debug)]
pub struct DisplayImage {
    data: Array2<Intensityf32>,
    pub extents: Extents,
}

impl DisplayImage {
    pub fn new(data: Array2<Intensityf32>, extents: Extents) -> Self { Self { data, extents } }
    pub fn view(&self) -> ArrayView2<Intensityf32> { self.data.view() }
    pub fn dim(&self) -> (usize, usize) { self.data.dim() }
    pub fn into_inner(self) -> Array2<Intensityf32> { self.data }

    /// Depth extent over lateral extent; the factor by which a renderer
    /// should stretch columns to show the image without distortion
    pub fn aspect_ratio(&self) -> Option<f32> { self.extents.aspect_ratio() }
}

pub fn reconstruct(volume: &EchoVolume, geometry: &Geometry, config: &Config) -> Result<DisplayImage> {
    reconstruct_with_progress(volume, geometry, config, || {})
}

/// As `reconstruct`, calling `on_scanline` once per beamformed scanline
pub fn reconstruct_with_progress<F>(
    volume     : &EchoVolume,
    geometry   : &Geometry,
    config     : &Config,
    on_scanline: F,
) -> Result<DisplayImage>
where
    F: Fn() + Send + Sync,
{
    config.validate()?;
    let beamformed = das::beamform_with_progress(volume, geometry, &config.acquisition, &config.beamforming, on_scanline)?;
    finish(&beamformed, geometry, config)
}

/// Envelope, compression, normalization and speckle reduction of an already
/// beamformed image
pub fn finish(beamformed: &BeamformedImage, geometry: &Geometry, config: &Config) -> Result<DisplayImage> {
    let intensities = envelope::display_intensities(beamformed, &config.display)?;
    info!("Compressed ({:?}) and normalized ({:?}) to [{}, {}]",
          config.display.compression, config.display.normalization,
          config.display.floor, config.display.ceiling);
    let data = config.speckle.apply(intensities.view())?;
    if config.speckle.is_enabled() {
        info!("Median filtered with {0} x {0} window", config.speckle.size);
    }
    Ok(DisplayImage { data, extents: geometry.extents() })
}

#[cfg(test)]
mod test_pipeline {
    use super::*;
    use crate::config::Acquisition;
    use crate::envelope::Normalization;
    use crate::error::Error;
    use crate::volume::VolumeDims;
    use ndarray::{Array1, Array3};
    use units::{mhz, m_s, mm};

    fn config() -> Config {
        Config::new(Acquisition { sampling_rate: mhz(40.0), speed_of_sound: m_s(1540.0), focus: mm(5.0) })
    }

    fn geometry(dims: VolumeDims, config: &Config) -> Geometry {
        let positions = Array1::linspace(-0.005, 0.005, dims.elements);
        let centres   = Array1::linspace(-0.004, 0.004, dims.scanlines);
        Geometry::new(dims, positions, centres, &config.acquisition).unwrap()
    }

    #[test]
    fn zero_volume_gives_uniform_floor() -> Result<()> {
        let dims = VolumeDims { depth_samples: 256, elements: 40, scanlines: 9 };
        let config = config();
        for normalization in [Normalization::DynamicRange, Normalization::MinMax] {
            let mut config = config;
            config.display.normalization = normalization;
            config.beamforming.subaperture = 16;
            let image = reconstruct(&EchoVolume::zeros(dims)?, &geometry(dims, &config), &config)?;
            assert_eq!(image.dim(), (256, 9));
            assert!(image.view().iter().all(|&x| x == config.display.floor));
        }
        Ok(())
    }

    #[test]
    fn extents_follow_geometry() -> Result<()> {
        let dims = VolumeDims { depth_samples: 100, elements: 8, scanlines: 5 };
        let mut config = config();
        config.beamforming.subaperture = 4;
        let g = geometry(dims, &config);
        let image = reconstruct(&EchoVolume::zeros(dims)?, &g, &config)?;
        assert_eq!(image.extents, g.extents());
        assert_eq!(image.extents.lateral_min, -0.004);
        assert_eq!(image.extents.depth_min, 0.0);
        assert!(image.aspect_ratio().is_some());
        Ok(())
    }

    #[test]
    fn invalid_display_rejected_before_beamforming() {
        let dims = VolumeDims { depth_samples: 10, elements: 8, scanlines: 2 };
        let mut config = config();
        config.display.dynamic_range = -1.0;
        let volume = EchoVolume::new(Array3::ones(dims.shape())).unwrap();
        let result = reconstruct(&volume, &geometry(dims, &config), &config);
        assert!(matches!(result, Err(Error::InvalidParameter { parameter: "dynamic_range", .. })));
    }
}
