pub mod todo;

pub use uom;
pub use uom::si::Quantity;
pub use uom::si::f32::{Length, Time, Frequency, Velocity, Ratio};

mod units {
  pub use uom::si::{length   ::{micrometer, millimeter, centimeter, meter},
                    time     ::{nanosecond, microsecond, second},
                    frequency::{hertz, kilohertz, megahertz},
                    velocity ::meter_per_second,
                    ratio    ::ratio,
  };
}
// Making values from float literals seems to be very long-winded, so provide
// some pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(um     Length         micrometer);
wrap!(mm     Length         millimeter);
wrap!(cm     Length         centimeter);
wrap!(m      Length              meter);
wrap!(ns     Time           nanosecond);
wrap!(us     Time          microsecond);
wrap!(s      Time               second);
wrap!(hz     Frequency           hertz);
wrap!(khz    Frequency       kilohertz);
wrap!(mhz    Frequency       megahertz);
wrap!(m_s    Velocity meter_per_second);
wrap!(ratio  Ratio               ratio);

// Reverse direction of the above. The hot loops work in plain SI `f32`s, so
// these are the conversions that matter at stage boundaries.
pub fn m_   (x: Length   ) -> f32 { x.get::<units::meter>           () }
pub fn mm_  (x: Length   ) -> f32 { x.get::<units::millimeter>      () }
pub fn s_   (x: Time     ) -> f32 { x.get::<units::second>          () }
pub fn us_  (x: Time     ) -> f32 { x.get::<units::microsecond>     () }
pub fn hz_  (x: Frequency) -> f32 { x.get::<units::hertz>           () }
pub fn mhz_ (x: Frequency) -> f32 { x.get::<units::megahertz>       () }
pub fn m_s_ (x: Velocity ) -> f32 { x.get::<units::meter_per_second>() }
pub fn ratio_(x: Ratio   ) -> f32 { x.get::<units::ratio>           () }

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}
