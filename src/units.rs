//! Newtype wrapper for reported distances.
//!
//! Tracking world units are meters; wrapping the raw float keeps a reported
//! distance from being confused with a coordinate or a radius.

/// Straight-line distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Meters(pub f32);

impl std::fmt::Display for Meters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} m", self.0)
    }
}
