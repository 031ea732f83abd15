//! Delay-and-sum B-mode reconstruction of linear-array ultrasound echoes
//!
//! Stages, each in its own module:
//!
//! 1. `axis`: physical depth axis and scanline geometry
//! 2. `subaperture`: receive elements used for each scanline
//! 3. `das`: delay-and-sum beamforming
//! 4. `envelope`: envelope detection, log compression, display normalization
//! 5. `speckle`: median filtering of the display image
//!
//! `pipeline` chains them together.

mod exports;
pub use exports::*;

pub mod error;
pub mod config;
pub mod volume;
pub mod axis;
pub mod subaperture;
pub mod das;
pub mod envelope;
pub mod speckle;
pub mod pipeline;
pub mod phantom;
pub mod io;
pub mod utils;
