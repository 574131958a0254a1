//! Configuration type definitions
//!
//! These types represent the mount configuration: default pointing mode,
//! fixed orientations, pilot channel assignments and feature switches.

use bitflags::bitflags;

use crate::traits::{Angles, Location};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bus node id of the gimbal
pub const DEFAULT_BUS_NODE_ID: u8 = 71;

/// Give up discovery after this long
pub const DEFAULT_MAX_SEARCH_MS: u32 = 90_000;

/// Pointing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MountMode {
    /// Fixed retracted orientation
    #[default]
    Retract,
    /// Fixed neutral orientation
    Neutral,
    /// Earth-frame target supplied by the ground station
    ExternalTarget,
    /// Pilot sticks, raw or stabilised
    ManualTargeting,
    /// Point at a geographic location
    PositionTarget,
    /// Any other mode number; nothing is resolved
    Unsupported(u8),
}

impl MountMode {
    /// Decode a mode number
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => MountMode::Retract,
            1 => MountMode::Neutral,
            2 => MountMode::ExternalTarget,
            3 => MountMode::ManualTargeting,
            4 => MountMode::PositionTarget,
            n => MountMode::Unsupported(n),
        }
    }

    /// Mode number
    pub const fn to_u8(self) -> u8 {
        match self {
            MountMode::Retract => 0,
            MountMode::Neutral => 1,
            MountMode::ExternalTarget => 2,
            MountMode::ManualTargeting => 3,
            MountMode::PositionTarget => 4,
            MountMode::Unsupported(n) => n,
        }
    }

    /// Retract and Neutral hold a fixed orientation
    pub const fn is_fixed(self) -> bool {
        matches!(self, MountMode::Retract | MountMode::Neutral)
    }
}

bitflags! {
    /// Feature switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct FeatureMask: u16 {
        /// Send the high-rate status broadcast
        const SEND_STATUS_BROADCAST = 0x0001;
        /// Forward the sixteen RC channels
        const SEND_INPUTS = 0x0002;
        /// Manual targeting uses raw pulses instead of stabilised angles
        const PWM_FROM_RADIO = 0x0004;
        /// Forward camera triggers
        const SEND_CAMERA = 0x0008;
    }
}

impl Default for FeatureMask {
    fn default() -> Self {
        Self::SEND_STATUS_BROADCAST
            .union(Self::SEND_INPUTS)
            .union(Self::SEND_CAMERA)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FeatureMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FeatureMask({=u16:#x})", self.bits())
    }
}

/// Pilot channel assignments, 1-based; 0 means unassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RcAssignments {
    pub roll: u8,
    pub tilt: u8,
    pub pan: u8,
}

impl RcAssignments {
    /// Assigned channels in (tilt, roll, pan) order
    pub fn iter(&self) -> impl Iterator<Item = u8> {
        [self.tilt, self.roll, self.pan].into_iter()
    }
}

/// Mount configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MountConfig {
    /// Mode applied at construction
    pub default_mode: MountMode,
    /// Retracted orientation (roll, tilt, pan) in degrees
    pub retract_angles: Angles,
    /// Neutral orientation (roll, tilt, pan) in degrees
    pub neutral_angles: Angles,
    /// Pilot channel assignments
    pub rc: RcAssignments,
    /// Feature switches
    pub features: FeatureMask,
    /// Discovery timeout in ms; 0 searches forever
    pub max_search_ms: u32,
    /// Node id the gimbal broadcasts from on the bus
    pub bus_node_id: u8,
    /// Initial point of interest for position targeting
    pub roi: Option<Location>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            default_mode: MountMode::Retract,
            retract_angles: Angles::ZERO,
            neutral_angles: Angles::ZERO,
            rc: RcAssignments::default(),
            features: FeatureMask::default(),
            max_search_ms: DEFAULT_MAX_SEARCH_MS,
            bus_node_id: DEFAULT_BUS_NODE_ID,
            roi: None,
        }
    }
}
