/// Units which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// The reconstruction hot loops index into `ndarray`s of plain floats, so
/// quantities are converted to these aliases (always in SI base units) at
/// stage boundaries, but we still want some clues in the source as to what
/// they represent.

pub type Lengthf32    = f32; // metres
pub type Timef32      = f32; // seconds
pub type Frequencyf32 = f32; // hertz
pub type Velocityf32  = f32; // metres per second
pub type Ratiof32     = f32;
pub type Amplitudef32 = f32; // arbitrary RF units
pub type Decibelf32   = f32;
pub type Intensityf32 = f32;
