//! Responses (gimbal → flight controller)
//!
//! Only the two responses the link consumes are decoded: the version strings
//! answered to `GetVersionStr` and the live-data fields answered to
//! `GetDataFields`.

use bitflags::bitflags;

use crate::commands::code;
use crate::frame::{Frame, FrameError, StartByte};
use crate::ident::{IdString, ID_FIELD_SIZE};
use crate::wire::{PayloadReader, PayloadWriter};

bitflags! {
    /// Live-data field selectors for `GetDataFields`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LiveFields: u16 {
        /// Legacy status block
        const STATUS = 0x0001;
        /// Relative attitude: pitch, roll, yaw in degrees
        const ATTITUDE_RELATIVE = 0x1000;
        /// Status block: state, status, status2, errors, voltage
        const STATUS_V2 = 0x2000;

        /// Field set requested every cycle
        const REQUEST = Self::STATUS_V2.bits() | Self::ATTITUDE_RELATIVE.bits();
    }
}

impl Default for LiveFields {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LiveFields {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LiveFields({=u16:#x})", self.bits())
    }
}

/// Gimbal state codes reported in [`LiveStatus::state`]
pub mod state {
    /// Motors starting
    pub const STARTUP_MOTORS: u16 = 0;
    /// Settling
    pub const STARTUP_SETTLE: u16 = 1;
    /// Calibrating
    pub const STARTUP_CALIBRATE: u16 = 2;
    /// Levelling
    pub const STARTUP_LEVEL: u16 = 3;
    /// Motor direction detection
    pub const STARTUP_MOTORDIRDETECT: u16 = 4;
    /// Relevelling
    pub const STARTUP_RELEVEL: u16 = 5;
    /// Normal operation
    pub const NORMAL: u16 = 6;
    /// Fast levelling during normal operation
    pub const FASTLEVEL: u16 = 7;

    /// True for codes in which the gimbal is operating normally
    pub const fn is_normal(state: u16) -> bool {
        matches!(state, NORMAL | FASTLEVEL)
    }
}

/// Firmware identification answered to `GetVersionStr`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VersionInfo {
    pub version: IdString,
    pub name: IdString,
    pub board: IdString,
}

impl VersionInfo {
    const PAYLOAD_SIZE: usize = 3 * ID_FIELD_SIZE;

    /// Decode a `GetVersionStr` response
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        frame.expect_command(code::GET_VERSION_STR)?;
        if frame.payload.len() < Self::PAYLOAD_SIZE {
            return Err(FrameError::InvalidFrame);
        }
        let field = |n: usize| IdString::from_field(&frame.payload[n * ID_FIELD_SIZE..][..ID_FIELD_SIZE]);
        Ok(Self {
            version: field(0),
            name: field(1),
            board: field(2),
        })
    }

    /// Encode as the gimbal would
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut w = PayloadWriter::new();
        w.put_bytes(&self.version.to_field())?;
        w.put_bytes(&self.name.to_field())?;
        w.put_bytes(&self.board.to_field())?;
        Ok(Frame {
            start: StartByte::Device,
            command: code::GET_VERSION_STR,
            payload: w.finish(),
        })
    }
}

/// Relative attitude in the gimbal's own sign convention, degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveAttitude {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Status block of the live data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveStatus {
    pub state: u16,
    pub status: u16,
    pub status2: u16,
    pub errors: u16,
    /// Supply voltage in mV
    pub voltage: u16,
}

impl LiveStatus {
    /// True if the state code is one of the normal-operation codes
    pub fn is_normal(&self) -> bool {
        state::is_normal(self.state)
    }
}

/// Live-data fields answered to `GetDataFields`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveData {
    /// Field selector echoed from the request
    pub flags: LiveFields,
    pub status: Option<LiveStatus>,
    pub attitude: Option<LiveAttitude>,
}

impl LiveData {
    /// Fields this decoder understands
    pub const SUPPORTED: LiveFields = LiveFields::ATTITUDE_RELATIVE.union(LiveFields::STATUS_V2);

    /// Decode a `GetDataFields` response
    ///
    /// Fields follow the flags word in ascending bit order. Unknown bits
    /// make the remaining layout unknowable, so they fail the decode.
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        frame.expect_command(code::GET_DATA_FIELDS)?;
        let mut r = PayloadReader::new(&frame.payload);
        let flags = LiveFields::from_bits_retain(r.u16()?);
        if !Self::SUPPORTED.contains(flags) {
            return Err(FrameError::InvalidFrame);
        }

        let mut data = LiveData {
            flags,
            ..Default::default()
        };
        if flags.contains(LiveFields::ATTITUDE_RELATIVE) {
            data.attitude = Some(LiveAttitude {
                pitch: r.f32()?,
                roll: r.f32()?,
                yaw: r.f32()?,
            });
        }
        if flags.contains(LiveFields::STATUS_V2) {
            data.status = Some(LiveStatus {
                state: r.u16()?,
                status: r.u16()?,
                status2: r.u16()?,
                errors: r.u16()?,
                voltage: r.u16()?,
            });
        }
        if r.remaining() != 0 {
            return Err(FrameError::InvalidFrame);
        }
        Ok(data)
    }

    /// Encode as the gimbal would
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut w = PayloadWriter::new();
        let mut flags = LiveFields::empty();
        flags.set(LiveFields::ATTITUDE_RELATIVE, self.attitude.is_some());
        flags.set(LiveFields::STATUS_V2, self.status.is_some());
        w.put_u16(flags.bits())?;
        if let Some(att) = self.attitude {
            w.put_f32(att.pitch)?;
            w.put_f32(att.roll)?;
            w.put_f32(att.yaw)?;
        }
        if let Some(st) = self.status {
            for value in [st.state, st.status, st.status2, st.errors, st.voltage] {
                w.put_u16(value)?;
            }
        }
        Ok(Frame {
            start: StartByte::Device,
            command: code::GET_DATA_FIELDS,
            payload: w.finish(),
        })
    }
}

/// Any decoded gimbal response
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    Version(VersionInfo),
    LiveData(LiveData),
}

impl Response {
    /// Decode a response frame by its command code
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.command {
            code::GET_VERSION_STR => VersionInfo::from_frame(frame).map(Response::Version),
            code::GET_DATA_FIELDS => LiveData::from_frame(frame).map(Response::LiveData),
            _ => Err(FrameError::UnexpectedCommand),
        }
    }
}
