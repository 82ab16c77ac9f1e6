//! Unit-tagged physical quantities.
//!
//! Shower truth values are stored on disk as bare numbers. These newtypes
//! carry the unit alongside the magnitude so that an energy can never be
//! mistaken for a distance once it has left the reader.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A scalar with a fixed physical unit.
pub trait Quantity: Copy {
    /// Unit symbol, e.g. `"TeV"`.
    const UNIT: &'static str;

    /// Raw magnitude in [`Self::UNIT`].
    fn value(&self) -> f64;
}

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $unit:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new quantity from a raw magnitude.
            #[inline]
            #[must_use]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }
        }

        impl Quantity for $name {
            const UNIT: &'static str = $unit;

            #[inline]
            fn value(&self) -> f64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if let Some(precision) = f.precision() {
                    write!(f, "{:.*} {}", precision, self.0, $unit)
                } else {
                    write!(f, "{} {}", self.0, $unit)
                }
            }
        }
    };
}

quantity!(
    /// Energy in tera-electronvolts.
    TeV,
    "TeV"
);
quantity!(
    /// Angle in radians.
    Radians,
    "rad"
);
quantity!(
    /// Distance in meters.
    Meters,
    "m"
);
quantity!(
    /// Atmospheric slant depth in g/cm².
    GramsPerSquareCm,
    "g / cm2"
);

impl TeV {
    /// Energy in GeV.
    #[must_use]
    pub fn to_gev(self) -> f64 {
        self.0 * 1.0e3
    }
}

impl Radians {
    /// Angle in degrees.
    #[must_use]
    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

impl Meters {
    /// Distance in kilometers.
    #[must_use]
    pub fn to_km(self) -> f64 {
        self.0 * 1.0e-3
    }
}

/// A position in the array ground frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: Meters,
    pub y: Meters,
    pub z: Meters,
}

impl Position {
    /// Creates a position from raw meter values.
    #[must_use]
    pub fn from_meters(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Meters(x),
            y: Meters(y),
            z: Meters(z),
        }
    }

    /// Ground-plane distance to another position.
    #[must_use]
    pub fn ground_distance(&self, other: &Self) -> Meters {
        let dx = self.x.0 - other.x.0;
        let dy = self.y.0 - other.y.0;
        Meters(dx.hypot(dy))
    }
}
