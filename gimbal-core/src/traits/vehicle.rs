//! Vehicle-side data sources
//!
//! The engine never estimates anything itself. Attitude, position and pilot
//! input are read from the flight stack through these traits once per task
//! slot.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Euler angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Angles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Angles {
    /// All-zero orientation
    pub const ZERO: Self = Self {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Geographic location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// Latitude in 1e-7 degrees
    pub lat: i32,
    /// Longitude in 1e-7 degrees
    pub lng: i32,
    /// Altitude in centimetres
    pub alt_cm: i32,
}

/// GPS fix quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsFix {
    #[default]
    None,
    Fix2D,
    Fix3D,
}

/// Attitude and navigation state
pub trait AttitudeSource {
    /// Body-to-NED rotation as quaternion (w, x, y, z)
    fn quaternion(&self) -> [f32; 4];

    /// NED velocity in m/s, if the estimate is usable
    fn velocity_ned(&self) -> Option<[f32; 3]>;

    fn ahrs_healthy(&self) -> bool;

    fn ahrs_initialised(&self) -> bool;

    /// Horizontal velocity estimate is valid
    fn horizontal_velocity_valid(&self) -> bool;

    fn armed(&self) -> bool;
}

/// Position source
pub trait PositionSource {
    fn gps_fix(&self) -> GpsFix;

    /// Current vehicle location, if known
    fn location(&self) -> Option<Location>;
}

/// Pilot input
pub trait RcInput {
    /// Raw pulse width of a channel in µs (0-based index)
    fn channel(&self, index: usize) -> Option<u16>;

    /// Stabilised earth-frame target derived from the pilot's sticks
    fn stabilized_target(&self) -> Angles;
}

/// Everything the engine reads from the flight stack
pub trait Vehicle: AttitudeSource + PositionSource + RcInput {}

impl<T: AttitudeSource + PositionSource + RcInput + ?Sized> Vehicle for T {}
