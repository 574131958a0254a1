//! Last known gimbal state
//!
//! Fed from either transport: decoded live-data answers on serial, status
//! broadcasts on the bus. Angles are kept in the flight stack's sign
//! convention.

use gimbal_protocol::{LiveData, LiveFields};

use crate::bus::BusStatus;

/// Gimbal orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Orientation for the ground-station mount status message, centidegrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MountStatus {
    pub pitch_cdeg: i32,
    pub roll_cdeg: i32,
    pub yaw_cdeg: i32,
}

impl From<DeviceStatus> for MountStatus {
    fn from(status: DeviceStatus) -> Self {
        Self {
            pitch_cdeg: (status.pitch * 100.0) as i32,
            roll_cdeg: (status.roll * 100.0) as i32,
            yaw_cdeg: (status.yaw * 100.0) as i32,
        }
    }
}

/// Telemetry cache with armed-edge detection
#[derive(Debug, Clone, Default)]
pub struct TelemetryCache {
    status: DeviceStatus,
    dirty: bool,
    armed: bool,
    armed_notice: bool,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a serial live-data answer
    ///
    /// Only answers to the outstanding request are used. Returns true if the
    /// answer was applied.
    pub fn update_live(&mut self, data: &LiveData) -> bool {
        if data.flags != LiveFields::REQUEST {
            trace!("ignoring live data with flags {=u16:#x}", data.flags.bits());
            return false;
        }
        if let Some(attitude) = data.attitude {
            self.status = DeviceStatus {
                pitch: -attitude.pitch,
                roll: attitude.roll,
                yaw: -attitude.yaw,
            };
            self.dirty = true;
        }
        if let Some(status) = data.status {
            self.set_armed(status.is_normal());
        }
        true
    }

    /// Apply a bus status broadcast
    pub fn update_bus(&mut self, status: &BusStatus) {
        self.status = DeviceStatus {
            pitch: status.pitch_rad.to_degrees(),
            roll: status.roll_rad.to_degrees(),
            yaw: status.yaw_rad.to_degrees(),
        };
        self.dirty = true;
    }

    fn set_armed(&mut self, armed: bool) {
        if armed != self.armed {
            info!("gimbal {}", if armed { "armed" } else { "disarmed" });
            self.armed = armed;
            self.armed_notice = true;
        }
    }

    /// Latest orientation
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Latest orientation if it changed since the last call
    pub fn take_update(&mut self) -> Option<DeviceStatus> {
        if core::mem::take(&mut self.dirty) {
            Some(self.status)
        } else {
            None
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mount_status(&self) -> MountStatus {
        self.status.into()
    }

    /// The gimbal reports a normal operating state
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Ask for the current armed state to be announced again
    pub fn request_armed_notice(&mut self) {
        self.armed_notice = true;
    }

    /// Consume a pending armed/disarmed notice
    pub fn take_armed_notice(&mut self) -> bool {
        core::mem::take(&mut self.armed_notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_protocol::responses::state;
    use gimbal_protocol::{LiveAttitude, LiveStatus};

    fn answer(state: u16, pitch: f32, roll: f32, yaw: f32) -> LiveData {
        LiveData {
            flags: LiveFields::REQUEST,
            status: Some(LiveStatus {
                state,
                ..Default::default()
            }),
            attitude: Some(LiveAttitude { pitch, roll, yaw }),
        }
    }

    #[test]
    fn test_live_data_converts_signs() {
        let mut cache = TelemetryCache::new();
        assert!(cache.update_live(&answer(state::NORMAL, 10.0, 2.5, -30.0)));
        assert_eq!(
            cache.take_update(),
            Some(DeviceStatus {
                pitch: -10.0,
                roll: 2.5,
                yaw: 30.0,
            })
        );
        assert_eq!(cache.take_update(), None);
        assert_eq!(
            cache.mount_status(),
            MountStatus {
                pitch_cdeg: -1000,
                roll_cdeg: 250,
                yaw_cdeg: 3000,
            }
        );
    }

    #[test]
    fn test_live_data_with_other_flags_ignored() {
        let mut cache = TelemetryCache::new();
        let mut data = answer(state::NORMAL, 1.0, 1.0, 1.0);
        data.flags = LiveFields::ATTITUDE_RELATIVE;
        assert!(!cache.update_live(&data));
        assert!(!cache.is_dirty());
        assert!(!cache.is_armed());
    }

    #[test]
    fn test_armed_edges_raise_one_notice_each() {
        let mut cache = TelemetryCache::new();
        assert!(!cache.take_armed_notice());

        cache.update_live(&answer(state::STARTUP_LEVEL, 0.0, 0.0, 0.0));
        assert!(!cache.take_armed_notice());

        cache.update_live(&answer(state::NORMAL, 0.0, 0.0, 0.0));
        assert!(cache.is_armed());
        assert!(cache.take_armed_notice());
        assert!(!cache.take_armed_notice());

        cache.update_live(&answer(state::FASTLEVEL, 0.0, 0.0, 0.0));
        assert!(!cache.take_armed_notice());

        cache.update_live(&answer(state::STARTUP_RELEVEL, 0.0, 0.0, 0.0));
        assert!(!cache.is_armed());
        assert!(cache.take_armed_notice());
    }

    #[test]
    fn test_bus_status_in_degrees() {
        let mut cache = TelemetryCache::new();
        cache.update_bus(&BusStatus {
            pitch_rad: core::f32::consts::FRAC_PI_2,
            roll_rad: 0.0,
            yaw_rad: -core::f32::consts::PI,
            ..Default::default()
        });
        let status = cache.take_update().unwrap();
        assert!((status.pitch - 90.0).abs() < 1e-4);
        assert!((status.yaw + 180.0).abs() < 1e-4);
        assert!(!cache.is_armed());
    }
}
