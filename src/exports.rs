pub use units::uom::si::Quantity;

pub use units::todo::{
    Lengthf32, Timef32, Frequencyf32, Velocityf32, Ratiof32,
    Amplitudef32, Decibelf32, Intensityf32,
};

pub use crate::axis::{Extents, Geometry};
pub use crate::config::{Acquisition, Config};
pub use crate::das::BeamformedImage;
pub use crate::error::{Error, Result};
pub use crate::pipeline::{reconstruct, DisplayImage};
pub use crate::volume::{EchoVolume, VolumeDims};
