//! Unit newtypes used at API boundaries.
//!
//! All coordinates live in one planar metric system, so the engine only needs
//! two physical units: meters along the plane and degrees for turn angles.
//! The wrappers keep configuration structs self-describing; hot loops work on
//! the raw `f64`/`f32` values.

use serde::{Deserialize, Serialize};

/// Distance in meters (the unit of the input coordinate system).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

impl Meters {
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

impl Degrees {
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Turn depth in the conventional 90°-unit scale used by reported total
    /// depths.
    #[inline]
    pub fn quarter_turns(&self) -> f64 {
        self.0 / 90.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turns() {
        assert_eq!(Degrees(90.0).quarter_turns(), 1.0);
        assert_eq!(Degrees(180.0).quarter_turns(), 2.0);
    }
}
