//! Pointing target resolution
//!
//! Turns the active [`MountMode`] and the vehicle's inputs into a target the
//! gimbal understands, and that target into the command to send.
//!
//! Retract and Neutral only ever send a recenter, once, when the mode is
//! entered. Angle targets go out as `SetAngles` with pitch and yaw negated;
//! pulse targets go out as `SetPitchRollYaw` after a dead-zone filter.

use gimbal_protocol::Command;

use crate::config::{FeatureMask, MountConfig, MountMode, RcAssignments};
use crate::traits::{Angles, GpsFix, Location, PositionSource, RcInput, Vehicle};

/// Centre pulse width in µs
pub const PULSE_CENTER: u16 = 1500;

/// Pulses below this are treated as missing
pub const PULSE_FLOOR: u16 = 10;

/// Half-width of the band snapped to centre, also the pull toward centre
pub const DEAD_ZONE: u16 = 10;

/// Any assigned channel below this means the pilot link is lost
pub const FAILSAFE_PULSE: u16 = 700;

/// Metres per 1e-7 degree of latitude
const LOCATION_SCALE: f32 = 0.011_131_95;

/// Raw pulse widths in µs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulses {
    pub pitch: u16,
    pub roll: u16,
    pub yaw: u16,
}

impl Pulses {
    pub const CENTER: Self = Self {
        pitch: PULSE_CENTER,
        roll: PULSE_CENTER,
        yaw: PULSE_CENTER,
    };
}

impl Default for Pulses {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Resolved target
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// Earth-frame angles in degrees, flight-stack convention
    Angles(Angles),
    /// Raw pulse widths
    Pulses(Pulses),
}

impl Target {
    /// Neutral value of the same kind
    pub fn neutral(&self) -> Self {
        match self {
            Target::Angles(_) => Target::Angles(Angles::ZERO),
            Target::Pulses(_) => Target::Pulses(Pulses::CENTER),
        }
    }

    /// Command that moves the gimbal to this target
    pub fn to_command(&self) -> Command {
        match *self {
            Target::Angles(a) => Command::SetAngles {
                pitch_deg: -a.pitch,
                roll_deg: a.roll,
                yaw_deg: -a.yaw,
                flags: 0,
                angle_type: 0,
            },
            Target::Pulses(p) => Command::SetPitchRollYaw {
                pitch: dead_zone(p.pitch),
                roll: dead_zone(p.roll),
                yaw: dead_zone(p.yaw),
            },
        }
    }
}

/// Target tagged with the mode that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetCommand {
    pub mode: MountMode,
    pub target: Target,
}

/// Dead-zone filter for pulse widths
///
/// Values below [`PULSE_FLOOR`] become centre. Values within
/// [`DEAD_ZONE`] of centre snap to it; anything further out is pulled
/// [`DEAD_ZONE`] toward centre.
pub fn dead_zone(pulse: u16) -> u16 {
    if pulse < PULSE_FLOOR {
        PULSE_CENTER
    } else if pulse < PULSE_CENTER - DEAD_ZONE {
        pulse + DEAD_ZONE
    } else if pulse > PULSE_CENTER + DEAD_ZONE {
        pulse - DEAD_ZONE
    } else {
        PULSE_CENTER
    }
}

/// Pitch and yaw in degrees from `from` toward `to`
///
/// Equirectangular approximation, good over the short ranges a camera
/// points at. Roll is always zero.
pub fn angles_toward(from: &Location, to: &Location) -> Angles {
    let mean_lat_deg = (i64::from(from.lat) + i64::from(to.lat)) as f32 * 0.5e-7;
    let scale_lng = libm::cosf(mean_lat_deg.to_radians());

    let dx = (i64::from(to.lng) - i64::from(from.lng)) as f32 * scale_lng * LOCATION_SCALE;
    let dy = (i64::from(to.lat) - i64::from(from.lat)) as f32 * LOCATION_SCALE;
    let dz_cm = (i64::from(to.alt_cm) - i64::from(from.alt_cm)) as f32;
    let horizontal_cm = 100.0 * libm::sqrtf(dx * dx + dy * dy);

    Angles {
        roll: 0.0,
        pitch: libm::atan2f(dz_cm, horizontal_cm).to_degrees(),
        yaw: libm::atan2f(dx, dy).to_degrees(),
    }
}

/// Channel pulse for a 1-based assignment, centre if unassigned or silent
fn assigned_pulse<R: RcInput + ?Sized>(rc: &R, assignment: u8) -> u16 {
    if assignment == 0 {
        return PULSE_CENTER;
    }
    rc.channel(usize::from(assignment - 1))
        .unwrap_or(PULSE_CENTER)
}

/// True if any assigned channel reports a pulse below [`FAILSAFE_PULSE`]
fn failsafe<R: RcInput + ?Sized>(rc: &R, assignments: &RcAssignments) -> bool {
    assignments
        .iter()
        .filter(|&a| a != 0)
        .filter_map(|a| rc.channel(usize::from(a - 1)))
        .any(|pulse| pulse < FAILSAFE_PULSE)
}

/// Mode state and target resolution
#[derive(Debug, Clone)]
pub struct TargetResolver {
    mode: MountMode,
    /// Mode of the last target handed to the link
    last_sent_mode: MountMode,
    /// Last resolved target, reused when nothing new can be computed
    last: Option<TargetCommand>,
    external: Angles,
    roi: Option<Location>,
}

impl TargetResolver {
    /// Start in the configured default mode
    pub fn new(config: &MountConfig) -> Self {
        Self {
            mode: config.default_mode,
            last_sent_mode: config.default_mode,
            last: None,
            external: Angles::ZERO,
            roi: config.roi,
        }
    }

    pub fn mode(&self) -> MountMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MountMode) {
        if mode != self.mode {
            debug!("mount mode {} -> {}", self.mode.to_u8(), mode.to_u8());
        }
        self.mode = mode;
    }

    /// Earth-frame target used in [`MountMode::ExternalTarget`]
    pub fn set_external_target(&mut self, angles: Angles) {
        self.external = angles;
    }

    /// Point of interest used in [`MountMode::PositionTarget`]
    pub fn set_roi(&mut self, roi: Location) {
        self.roi = Some(roi);
    }

    /// Last resolved target
    pub fn last_target(&self) -> Option<&TargetCommand> {
        self.last.as_ref()
    }

    /// Resolve the target for this cycle
    ///
    /// Returns `None` only while nothing has ever been resolvable.
    pub fn resolve<V: Vehicle + ?Sized>(
        &mut self,
        config: &MountConfig,
        vehicle: &V,
    ) -> Option<TargetCommand> {
        let fresh = match self.mode {
            MountMode::Retract => Some(Target::Angles(config.retract_angles)),
            MountMode::Neutral => Some(Target::Angles(config.neutral_angles)),
            MountMode::ExternalTarget => Some(Target::Angles(self.external)),
            MountMode::ManualTargeting => Some(self.manual(config, vehicle)),
            MountMode::PositionTarget => self.toward_roi(vehicle).map(Target::Angles),
            MountMode::Unsupported(_) => None,
        };

        if let Some(target) = fresh {
            self.last = Some(TargetCommand {
                mode: self.mode,
                target,
            });
        }

        let mut resolved = self.last?;
        if failsafe(vehicle, &config.rc) {
            trace!("rc failsafe, neutral target");
            resolved.target = resolved.target.neutral();
        }
        Some(resolved)
    }

    /// Command to send for a resolved target
    ///
    /// Fixed modes produce a recenter on entry and nothing while held. The
    /// mode edge is consumed here, whether or not the send succeeds.
    pub fn command_for(&mut self, target: &TargetCommand) -> Option<Command> {
        if target.mode.is_fixed() {
            if target.mode == self.last_sent_mode {
                return None;
            }
            self.last_sent_mode = target.mode;
            return Some(Command::recenter());
        }
        self.last_sent_mode = target.mode;
        Some(target.target.to_command())
    }

    fn manual<V: Vehicle + ?Sized>(&self, config: &MountConfig, vehicle: &V) -> Target {
        if config.features.contains(FeatureMask::PWM_FROM_RADIO) {
            Target::Pulses(Pulses {
                pitch: assigned_pulse(vehicle, config.rc.tilt),
                roll: assigned_pulse(vehicle, config.rc.roll),
                yaw: assigned_pulse(vehicle, config.rc.pan),
            })
        } else {
            Target::Angles(vehicle.stabilized_target())
        }
    }

    fn toward_roi<P: PositionSource + ?Sized>(&self, position: &P) -> Option<Angles> {
        if position.gps_fix() < GpsFix::Fix2D {
            return None;
        }
        let here = position.location()?;
        let roi = self.roi?;
        Some(angles_toward(&here, &roi))
    }
}
