//! Errors which can abort a reconstruction before any summation begins.
//!
//! Out-of-volume delay lookups and scanlines without valid contributions are
//! deliberately absent: they are routine and are handled where they occur.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A scalar parameter outside its physically meaningful range
    #[error("invalid parameter `{parameter}` = {value}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },

    /// An array whose length disagrees with the dimension it describes
    #[error("invalid parameter `{what}`: expected length {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read .npy array: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("could not write .npy array: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("could not parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("could not serialize extents: {0}")]
    Extents(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn invalid(parameter: &'static str, value: impl std::fmt::Display, reason: &'static str) -> Self {
        Self::InvalidParameter { parameter, value: value.to_string(), reason }
    }
}

#[cfg(test)]
mod test_messages {
    use super::*;

    #[test]
    fn invalid_parameter_names_offender_and_value() {
        let e = Error::invalid("sampling_rate", -1.0, "must be strictly positive");
        assert_eq!(e.to_string(), "invalid parameter `sampling_rate` = -1: must be strictly positive");
    }

    #[test]
    fn shape_mismatch_reads_as_invalid_parameter() {
        let e = Error::ShapeMismatch { what: "element_positions", expected: 128, found: 127 };
        assert_eq!(e.to_string(), "invalid parameter `element_positions`: expected length 128, found 127");
    }
}
