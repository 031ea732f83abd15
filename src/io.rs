//! Reading recorded acquisitions and writing display images, as `.npy` files
//!
//! An acquisition directory holds three arrays:
//!
//! + `rf_data.npy`: `[depth sample, element, scanline]` echo volume
//! + `element_positions.npy`: lateral element positions in metres
//! + `scanline_centres.npy`: lateral scanline centres in metres
//!
//! Either `f32` or `f64` arrays are accepted. The scalar acquisition
//! parameters live in the TOML configuration, not here.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{Array, Array1, Array2, Dimension};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};

use crate::axis::Geometry;
use crate::config::Acquisition;
use crate::error::Result;
use crate::pipeline::DisplayImage;
use crate::volume::EchoVolume;
use crate::Lengthf32;

pub const RF_DATA          : &str = "rf_data.npy";
pub const ELEMENT_POSITIONS: &str = "element_positions.npy";
pub const SCANLINE_CENTRES : &str = "scanline_centres.npy";

/// The arrays of one acquisition, as stored on disk
#[derive(Clone, Debug)]
pub struct Recording {
    pub volume           : EchoVolume,
    pub element_positions: Array1<Lengthf32>,
    pub scanline_centres : Array1<Lengthf32>,
}

impl Recording {

    pub fn read(dir: &Path) -> Result<Self> {
        let volume = EchoVolume::new(read_f32_array(&dir.join(RF_DATA))?)?;
        let element_positions = read_f32_array(&dir.join(ELEMENT_POSITIONS))?;
        let scanline_centres  = read_f32_array(&dir.join(SCANLINE_CENTRES ))?;
        debug!("Read {:?} from {}", volume.dims(), dir.display());
        Ok(Self { volume, element_positions, scanline_centres })
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.volume.samples().write_npy(File::create(dir.join(RF_DATA))?)?;
        self.element_positions.write_npy(File::create(dir.join(ELEMENT_POSITIONS))?)?;
        self.scanline_centres .write_npy(File::create(dir.join(SCANLINE_CENTRES ))?)?;
        Ok(())
    }

    /// Validate the position arrays against the volume and the acquisition
    pub fn into_parts(self, acquisition: &Acquisition) -> Result<(EchoVolume, Geometry)> {
        let Recording { volume, element_positions, scanline_centres } = self;
        let geometry = Geometry::new(volume.dims(), element_positions, scanline_centres, acquisition)?;
        Ok((volume, geometry))
    }
}

/// Read an `f32` array of known dimensionality, converting from `f64` if
/// that is how it was stored
pub fn read_f32_array<D: Dimension>(path: &Path) -> Result<Array<f32, D>> {
    match Array::<f32, D>::read_npy(File::open(path)?) {
        Err(ReadNpyError::WrongDescriptor(_)) => {
            debug!("{} is not f32: trying f64", path.display());
            let wide = Array::<f64, D>::read_npy(File::open(path)?)?;
            Ok(wide.mapv(|x| x as f32))
        }
        other => Ok(other?),
    }
}

pub fn write_f32_array2(path: &Path, data: &Array2<f32>) -> Result<()> {
    data.write_npy(File::create(path)?)?;
    Ok(())
}

/// Sibling of `out` where its extents are written: `image.npy` ->
/// `image.extents.toml`
pub fn extents_path(out: &Path) -> PathBuf {
    out.with_extension("extents.toml")
}

/// Write the intensities to `out` (`.npy`) and the extents next to it
pub fn write_display_image(image: &DisplayImage, out: &Path) -> Result<PathBuf> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.view().write_npy(File::create(out)?)?;
    let extents = extents_path(out);
    std::fs::write(&extents, toml::to_string(&image.extents)?)?;
    Ok(extents)
}
