//! Configuration file parser for B-mode reconstruction
//!
//! Physical quantities must be given with explicit units, as quoted strings:
//!
//! ```toml
//! [acquisition]
//! sampling_rate  = "40 MHz"
//! speed_of_sound = "1540 m/s"
//! focus          = "20 mm"
//!
//! [beamforming]
//! subaperture   = 32
//! interpolation = "nearest"
//!
//! [display]
//! compression   = "decibel"
//! normalization = "dynamic-range"
//! dynamic_range = 60
//!
//! [speckle]
//! size = 3
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use units::{hz_, m_, m_s_, Frequency, Length, Velocity};

use crate::axis::positive;
use crate::das::Beamforming;
use crate::envelope::DisplayMapping;
use crate::error::{Error, Result};
use crate::speckle::Speckle;

fn deserialize_uom<'d, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse::<T>()
        .map_err(de::Error::custom)
}

/// Scalar parameters of the acquisition which produced an echo volume
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Acquisition {

    /// Rate at which each element's echo signal was digitized
    #[serde(deserialize_with = "deserialize_uom")]
    pub sampling_rate: Frequency,

    /// Assumed uniform speed of sound in the imaged medium
    #[serde(deserialize_with = "deserialize_uom")]
    pub speed_of_sound: Velocity,

    /// Depth of the transmit focus (virtual source)
    #[serde(deserialize_with = "deserialize_uom")]
    pub focus: Length,
}

impl Acquisition {
    pub fn validate(&self) -> Result<()> {
        positive("sampling_rate" , hz_ (self.sampling_rate ))?;
        positive("speed_of_sound", m_s_(self.speed_of_sound))?;
        let focus = m_(self.focus);
        // Zero is a legitimate focus: the virtual source sits on the aperture
        if !(focus >= 0.0 && focus.is_finite()) {
            return Err(Error::invalid("focus", focus, "must be finite and non-negative"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {

    pub acquisition: Acquisition,

    #[serde(default)]
    pub beamforming: Beamforming,

    #[serde(default)]
    pub display: DisplayMapping,

    #[serde(default)]
    pub speckle: Speckle,
}

impl Config {

    /// Default processing of an acquisition
    pub fn new(acquisition: Acquisition) -> Self {
        Self {
            acquisition,
            beamforming: Beamforming  ::default(),
            display    : DisplayMapping::default(),
            speckle    : Speckle      ::default(),
        }
    }

    /// Reject structurally meaningless settings before any work is done
    pub fn validate(&self) -> Result<()> {
        self.acquisition.validate()?;
        self.beamforming.validate()?;
        self.display    .validate()?;
        self.speckle    .validate()?;
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

pub fn read_config_file(path: &Path) -> Result<Config> {
    fs::read_to_string(path)?.parse()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::das::Interpolation;
    use crate::envelope::{Compression, Normalization};
    use units::{assert_uom_eq, mhz, m_s, mm};
    use units::uom::si::{frequency::megahertz, length::millimeter, velocity::meter_per_second};

    const MINIMAL: &str = r#"
        [acquisition]
        sampling_rate  = "40 MHz"
        speed_of_sound = "1540 m/s"
        focus          = "20 mm"
    "#;

    // ----- Some helpers to make the tests more concise ---------------------------------
    fn parse(input: &str) -> Config {
        input.parse().unwrap()
    }
    //  ---  Macro for concise assertions about values of parsed fields -------------------
    macro_rules! check {
        ($text:expr => $($section:ident.$field:ident = $expected:expr);+$(;)?) => {
            let config = parse($text);
            println!("DESERIALIZED: {config:?}");
            $(assert_eq!(config.$section.$field, $expected);)*
        }
    }

    // ----- Acquisition quantities are parsed with their units ---------------------------
    #[test]
    fn acquisition_with_units() {
        let a = parse(MINIMAL).acquisition;
        assert_uom_eq!(megahertz       , a.sampling_rate , mhz(40.0)  , r2nd <= 1e-6);
        assert_uom_eq!(meter_per_second, a.speed_of_sound, m_s(1540.0), r2nd <= 1e-6);
        assert_uom_eq!(millimeter      , a.focus         , mm(20.0)   , r2nd <= 1e-6);
    }

    #[test]
    fn acquisition_in_other_units() {
        let a = parse(r#"
            [acquisition]
            sampling_rate  = "40000 kHz"
            speed_of_sound = "1540 m/s"
            focus          = "2 cm"
        "#).acquisition;
        assert_uom_eq!(megahertz , a.sampling_rate, mhz(40.0), r2nd <= 1e-6);
        assert_uom_eq!(millimeter, a.focus        , mm(20.0) , r2nd <= 1e-6);
    }

    // ----- Everything except the acquisition has defaults ------------------------------
    #[test]
    fn defaults() {
        check!(MINIMAL =>
               beamforming.subaperture   = 32;
               beamforming.interpolation = Interpolation::Nearest;
               display.compression       = Compression::Decibel;
               display.normalization     = Normalization::DynamicRange;
               display.dynamic_range     = 60.0;
               display.floor             = 0.0;
               display.ceiling           = 255.0;
               speckle.size              = 3;
        );
    }

    #[test]
    fn overrides() {
        let text = format!("{MINIMAL}{}", r#"
            [beamforming]
            subaperture   = 16
            interpolation = "linear"

            [display]
            compression   = "log1p"
            normalization = "min-max"
            ceiling       = 1.0

            [speckle]
            size = 5
        "#);
        check!(&text =>
               beamforming.subaperture   = 16;
               beamforming.interpolation = Interpolation::Linear;
               display.compression       = Compression::Log1p;
               display.normalization     = Normalization::MinMax;
               display.ceiling           = 1.0;
               speckle.size              = 5;
        );
    }

    // ----- Make sure that bad input is not accepted -------------------------------------
    #[test]
    fn reject_unknown_field() {
        let text = format!("{MINIMAL}unknown_field = 666");
        assert!(matches!(text.parse::<Config>(), Err(Error::Config(_))));
    }

    #[test]
    fn reject_missing_acquisition() {
        assert!(matches!("[speckle]\nsize = 3".parse::<Config>(), Err(Error::Config(_))));
    }

    #[test]
    fn reject_quantity_without_units() {
        let text = MINIMAL.replace(r#""20 mm""#, "20");
        assert!(matches!(text.parse::<Config>(), Err(Error::Config(_))));
    }

    #[test]
    fn reject_wrong_dimension() {
        let text = MINIMAL.replace("40 MHz", "40 mm");
        assert!(matches!(text.parse::<Config>(), Err(Error::Config(_))));
    }

    #[test]
    fn reject_non_positive_speed_of_sound() {
        let text = MINIMAL.replace("1540 m/s", "0 m/s");
        let result = text.parse::<Config>();
        assert!(matches!(result, Err(Error::InvalidParameter { parameter: "speed_of_sound", .. })));
    }

    #[test]
    fn zero_focus_is_valid() {
        let text = MINIMAL.replace("20 mm", "0 mm");
        assert!(text.parse::<Config>().is_ok());
    }

    #[test]
    fn config_file_roundtrip() -> Result<()> {
        use std::io::Write;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bmode.toml");
        std::fs::File::create(&path)?.write_all(MINIMAL.as_bytes())?;
        let config = read_config_file(&path)?;
        assert_eq!(config, Config::new(config.acquisition));
        Ok(())
    }
}
