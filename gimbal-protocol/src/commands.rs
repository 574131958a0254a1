//! Command catalogue (flight controller → gimbal)
//!
//! The catalogue is fixed. Every command has a single payload layout, all
//! multi-byte fields little-endian.

use bitflags::bitflags;

use crate::frame::{Frame, FrameError, StartByte};
use crate::responses::LiveFields;
use crate::wire::{PayloadReader, PayloadWriter};

/// Command codes
pub mod code {
    /// Request firmware version, name and board strings
    pub const GET_VERSION_STR: u8 = 0x02;
    /// Request selected live-data fields
    pub const GET_DATA_FIELDS: u8 = 0x06;
    /// Camera trigger
    pub const DO_CAMERA: u8 = 0x0F;
    /// Set target angles in degrees
    pub const SET_ANGLES: u8 = 0x11;
    /// Set raw pitch/roll/yaw pulse values
    pub const SET_PITCH_ROLL_YAW: u8 = 0x12;
    /// Forward sixteen RC input channels
    pub const SET_INPUTS: u8 = 0x16;
    /// Set the home location
    pub const SET_HOME_LOCATION: u8 = 0x17;
    /// Set the target location
    pub const SET_TARGET_LOCATION: u8 = 0x18;
    /// High-rate flight-controller status broadcast
    pub const LINK_STATUS: u8 = 0xDA;
}

bitflags! {
    /// Status bits carried by [`LinkStatus`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkStatusFlags: u8 {
        /// Attitude estimate healthy
        const AHRS_HEALTHY = 0x01;
        /// Attitude estimate initialised
        const AHRS_INITIALISED = 0x02;
        /// GPS has at least a 3D fix
        const GPS_3D_FIX = 0x04;
        /// Horizontal velocity estimate valid
        const NAV_HORIZ_VEL = 0x08;
        /// Vehicle armed
        const ARMED = 0x40;
        /// Always set: identifies the sender as a flight stack
        const FLIGHT_STACK = 0x80;
    }
}

impl Default for LinkStatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LinkStatusFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LinkStatusFlags({=u8:#x})", self.bits())
    }
}

/// Camera command sent by the trigger
pub const CAMERA_TRIGGER_PICTURE: u8 = 1;

/// Location status value marking the coordinates as valid
pub const LOCATION_VALID: u16 = 0x0001;

/// Number of channels forwarded by `SetInputs`
pub const INPUT_CHANNELS: usize = 16;

/// Bytes taken by sixteen packed 11-bit channels
const PACKED_INPUTS_SIZE: usize = INPUT_CHANNELS * 11 / 8;

/// Largest value an 11-bit channel can carry
pub const INPUT_CHANNEL_MAX: u16 = 0x07FF;

/// Geographic location payload of the home/target commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocationPayload {
    /// Latitude in 1e-7 degrees
    pub latitude: i32,
    /// Longitude in 1e-7 degrees
    pub longitude: i32,
    /// Altitude in centimetres
    pub altitude: i32,
    /// [`LOCATION_VALID`] or 0
    pub status: u16,
}

/// Flight-controller status broadcast payload
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStatus {
    /// Wrapping sequence counter
    pub seq: u8,
    pub status: LinkStatusFlags,
    /// Yaw rate command
    pub yaw_rate: i16,
    /// Body-to-NED attitude quaternion (w, x, y, z)
    pub quaternion: [f32; 4],
    /// NED velocity in m/s
    pub velocity: [f32; 3],
}

/// A command frame from the flight controller to the gimbal
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    GetVersionStr,
    GetDataFields {
        flags: LiveFields,
    },
    DoCamera {
        camera_cmd: u8,
    },
    SetAngles {
        pitch_deg: f32,
        roll_deg: f32,
        yaw_deg: f32,
        flags: u8,
        angle_type: u8,
    },
    SetPitchRollYaw {
        pitch: u16,
        roll: u16,
        yaw: u16,
    },
    SetInputs {
        channels: [u16; INPUT_CHANNELS],
        status: u8,
    },
    SetHomeLocation(LocationPayload),
    SetTargetLocation(LocationPayload),
    LinkStatus(LinkStatus),
}

impl Command {
    /// Recenter: all-zero raw target, clears the gimbal's remote state
    pub const fn recenter() -> Self {
        Command::SetPitchRollYaw {
            pitch: 0,
            roll: 0,
            yaw: 0,
        }
    }

    /// Command code
    pub fn code(&self) -> u8 {
        match self {
            Command::GetVersionStr => code::GET_VERSION_STR,
            Command::GetDataFields { .. } => code::GET_DATA_FIELDS,
            Command::DoCamera { .. } => code::DO_CAMERA,
            Command::SetAngles { .. } => code::SET_ANGLES,
            Command::SetPitchRollYaw { .. } => code::SET_PITCH_ROLL_YAW,
            Command::SetInputs { .. } => code::SET_INPUTS,
            Command::SetHomeLocation(_) => code::SET_HOME_LOCATION,
            Command::SetTargetLocation(_) => code::SET_TARGET_LOCATION,
            Command::LinkStatus(_) => code::LINK_STATUS,
        }
    }

    /// Payload length on the wire
    pub fn payload_len(&self) -> usize {
        match self {
            Command::GetVersionStr => 0,
            Command::GetDataFields { .. } => 2,
            Command::DoCamera { .. } => 6,
            Command::SetAngles { .. } => 14,
            Command::SetPitchRollYaw { .. } => 6,
            Command::SetInputs { .. } => PACKED_INPUTS_SIZE + 1,
            Command::SetHomeLocation(_) | Command::SetTargetLocation(_) => 14,
            Command::LinkStatus(_) => 33,
        }
    }

    /// Build a frame that does not request an acknowledgment
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        self.to_frame_with(StartByte::NoAck)
    }

    /// Build a frame with an explicit start byte
    pub fn to_frame_with(&self, start: StartByte) -> Result<Frame, FrameError> {
        let mut w = PayloadWriter::new();
        match self {
            Command::GetVersionStr => {}
            Command::GetDataFields { flags } => w.put_u16(flags.bits())?,
            Command::DoCamera { camera_cmd } => {
                w.put_bytes(&[0, *camera_cmd, 0, 0, 0, 0])?;
            }
            Command::SetAngles {
                pitch_deg,
                roll_deg,
                yaw_deg,
                flags,
                angle_type,
            } => {
                w.put_f32(*pitch_deg)?;
                w.put_f32(*roll_deg)?;
                w.put_f32(*yaw_deg)?;
                w.put_u8(*flags)?;
                w.put_u8(*angle_type)?;
            }
            Command::SetPitchRollYaw { pitch, roll, yaw } => {
                w.put_u16(*pitch)?;
                w.put_u16(*roll)?;
                w.put_u16(*yaw)?;
            }
            Command::SetInputs { channels, status } => {
                w.put_bytes(&pack_channels(channels))?;
                w.put_u8(*status)?;
            }
            Command::SetHomeLocation(loc) | Command::SetTargetLocation(loc) => {
                w.put_i32(loc.latitude)?;
                w.put_i32(loc.longitude)?;
                w.put_i32(loc.altitude)?;
                w.put_u16(loc.status)?;
            }
            Command::LinkStatus(link) => {
                w.put_u8(link.seq)?;
                w.put_u8(link.status.bits())?;
                w.put_u8(0)?; // spare
                w.put_i16(link.yaw_rate)?;
                for q in link.quaternion {
                    w.put_f32(q)?;
                }
                for v in link.velocity {
                    w.put_f32(v)?;
                }
            }
        }

        Ok(Frame {
            start,
            command: self.code(),
            payload: w.finish(),
        })
    }

    /// Decode a command frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let cmd = Self::decode_payload(frame.command, &frame.payload)?;
        if frame.payload.len() != cmd.payload_len() {
            return Err(FrameError::InvalidFrame);
        }
        Ok(cmd)
    }

    fn decode_payload(command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut r = PayloadReader::new(payload);
        let cmd = match command {
            code::GET_VERSION_STR => Command::GetVersionStr,
            code::GET_DATA_FIELDS => Command::GetDataFields {
                flags: LiveFields::from_bits_retain(r.u16()?),
            },
            code::DO_CAMERA => {
                let raw: [u8; 6] = r.take()?;
                Command::DoCamera { camera_cmd: raw[1] }
            }
            code::SET_ANGLES => Command::SetAngles {
                pitch_deg: r.f32()?,
                roll_deg: r.f32()?,
                yaw_deg: r.f32()?,
                flags: r.u8()?,
                angle_type: r.u8()?,
            },
            code::SET_PITCH_ROLL_YAW => Command::SetPitchRollYaw {
                pitch: r.u16()?,
                roll: r.u16()?,
                yaw: r.u16()?,
            },
            code::SET_INPUTS => {
                let packed: [u8; PACKED_INPUTS_SIZE] = r.take()?;
                Command::SetInputs {
                    channels: unpack_channels(&packed),
                    status: r.u8()?,
                }
            }
            code::SET_HOME_LOCATION => Command::SetHomeLocation(read_location(&mut r)?),
            code::SET_TARGET_LOCATION => Command::SetTargetLocation(read_location(&mut r)?),
            code::LINK_STATUS => {
                let seq = r.u8()?;
                let status = LinkStatusFlags::from_bits_retain(r.u8()?);
                let _spare = r.u8()?;
                let yaw_rate = r.i16()?;
                let mut quaternion = [0.0; 4];
                for q in quaternion.iter_mut() {
                    *q = r.f32()?;
                }
                let mut velocity = [0.0; 3];
                for v in velocity.iter_mut() {
                    *v = r.f32()?;
                }
                Command::LinkStatus(LinkStatus {
                    seq,
                    status,
                    yaw_rate,
                    quaternion,
                    velocity,
                })
            }
            _ => return Err(FrameError::UnexpectedCommand),
        };
        Ok(cmd)
    }
}

fn read_location(r: &mut PayloadReader<'_>) -> Result<LocationPayload, FrameError> {
    Ok(LocationPayload {
        latitude: r.i32()?,
        longitude: r.i32()?,
        altitude: r.i32()?,
        status: r.u16()?,
    })
}

/// Pack sixteen channels as consecutive 11-bit fields, LSB first
///
/// Values above 2047 are clamped.
pub fn pack_channels(channels: &[u16; INPUT_CHANNELS]) -> [u8; PACKED_INPUTS_SIZE] {
    let mut out = [0u8; PACKED_INPUTS_SIZE];
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut index = 0;
    for &ch in channels {
        acc |= u32::from(ch.min(INPUT_CHANNEL_MAX)) << bits;
        bits += 11;
        while bits >= 8 {
            out[index] = acc as u8;
            index += 1;
            acc >>= 8;
            bits -= 8;
        }
    }
    out
}

/// Inverse of [`pack_channels`]
pub fn unpack_channels(packed: &[u8; PACKED_INPUTS_SIZE]) -> [u16; INPUT_CHANNELS] {
    let mut out = [0u16; INPUT_CHANNELS];
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut bytes = packed.iter();
    for ch in out.iter_mut() {
        while bits < 11 {
            let byte = bytes.next().copied().unwrap_or(0);
            acc |= u32::from(byte) << bits;
            bits += 8;
        }
        *ch = (acc & u32::from(INPUT_CHANNEL_MAX)) as u16;
        acc >>= 11;
        bits -= 11;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameParser, StartFilter};

    fn wire(cmd: &Command) -> heapless::Vec<u8, { crate::frame::MAX_FRAME_SIZE }> {
        cmd.to_frame().unwrap().encode_to_vec().unwrap()
    }

    #[test]
    fn test_live_data_request_bytes() {
        let bytes = wire(&Command::GetDataFields {
            flags: LiveFields::from_bits_retain(0x0102),
        });
        assert_eq!(&bytes[..], &[0xF9, 0x02, 0x06, 0x02, 0x01, 0xB7, 0xCE]);
    }

    #[test]
    fn test_payload_lengths_match_catalogue() {
        let cases = [
            (Command::GetVersionStr, 0x00),
            (
                Command::GetDataFields {
                    flags: LiveFields::empty(),
                },
                0x02,
            ),
            (Command::DoCamera { camera_cmd: 1 }, 0x06),
            (
                Command::SetAngles {
                    pitch_deg: 0.0,
                    roll_deg: 0.0,
                    yaw_deg: 0.0,
                    flags: 0,
                    angle_type: 0,
                },
                0x0E,
            ),
            (Command::recenter(), 0x06),
            (
                Command::SetInputs {
                    channels: [0; INPUT_CHANNELS],
                    status: 0,
                },
                0x17,
            ),
            (Command::SetHomeLocation(LocationPayload::default()), 0x0E),
            (Command::SetTargetLocation(LocationPayload::default()), 0x0E),
            (Command::LinkStatus(LinkStatus::default()), 0x21),
        ];
        for (cmd, len) in cases {
            let frame = cmd.to_frame().unwrap();
            assert_eq!(frame.payload.len(), len, "{:?}", cmd);
            assert_eq!(cmd.payload_len(), len);
            assert_eq!(wire(&cmd)[1], len as u8);
        }
    }

    #[test]
    fn test_recenter_is_zero_pitch_roll_yaw() {
        let bytes = wire(&Command::recenter());
        assert_eq!(bytes[2], code::SET_PITCH_ROLL_YAW);
        assert_eq!(&bytes[3..9], &[0; 6]);
    }

    #[test]
    fn test_do_camera_layout() {
        let frame = Command::DoCamera {
            camera_cmd: CAMERA_TRIGGER_PICTURE,
        }
        .to_frame()
        .unwrap();
        assert_eq!(&frame.payload[..], &[0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_set_angles_layout() {
        let frame = Command::SetAngles {
            pitch_deg: -10.0,
            roll_deg: 0.5,
            yaw_deg: 90.0,
            flags: 0,
            angle_type: 0,
        }
        .to_frame()
        .unwrap();
        assert_eq!(&frame.payload[0..4], &(-10.0f32).to_le_bytes());
        assert_eq!(&frame.payload[4..8], &0.5f32.to_le_bytes());
        assert_eq!(&frame.payload[8..12], &90.0f32.to_le_bytes());
        assert_eq!(&frame.payload[12..], &[0, 0]);
    }

    #[test]
    fn test_pack_channels_lsb_first() {
        let mut channels = [0u16; INPUT_CHANNELS];
        channels[0] = 0x7FF;
        channels[1] = 0x001;
        let packed = pack_channels(&channels);
        // ch0 fills byte 0 and the low 3 bits of byte 1; ch1 starts at bit 11
        assert_eq!(packed[0], 0xFF);
        assert_eq!(packed[1], 0x0F);
        assert_eq!(packed[2], 0x00);
        assert!(packed[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pack_channels_clamps() {
        let mut channels = [0u16; INPUT_CHANNELS];
        channels[15] = 5000;
        let unpacked = unpack_channels(&pack_channels(&channels));
        assert_eq!(unpacked[15], INPUT_CHANNEL_MAX);
    }

    #[test]
    fn test_link_status_roundtrip_over_wire() {
        let cmd = Command::LinkStatus(LinkStatus {
            seq: 200,
            status: LinkStatusFlags::AHRS_HEALTHY | LinkStatusFlags::FLIGHT_STACK,
            yaw_rate: -3,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            velocity: [0.5, -0.25, 1.0],
        });
        let bytes = wire(&cmd);

        let mut parser = FrameParser::with_filter(StartFilter::Any);
        parser.feed_bytes(&bytes).unwrap().unwrap();
        let frame = parser.take_frame().unwrap();
        assert_eq!(Command::from_frame(&frame), Ok(cmd));
    }

    #[test]
    fn test_from_frame_rejects_wrong_length() {
        let frame = Frame::new(StartByte::NoAck, code::SET_PITCH_ROLL_YAW, &[0; 4]).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(FrameError::InvalidFrame));

        let frame = Frame::new(StartByte::NoAck, code::GET_VERSION_STR, &[0]).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_from_frame_unknown_command() {
        let frame = Frame::empty(0x55);
        assert_eq!(
            Command::from_frame(&frame),
            Err(FrameError::UnexpectedCommand)
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::frame::{FrameParser, StartFilter};
    use proptest::prelude::*;

    fn finite() -> impl Strategy<Value = f32> {
        -1.0e6f32..1.0e6f32
    }

    fn location() -> impl Strategy<Value = LocationPayload> {
        (any::<i32>(), any::<i32>(), any::<i32>(), any::<u16>()).prop_map(
            |(latitude, longitude, altitude, status)| LocationPayload {
                latitude,
                longitude,
                altitude,
                status,
            },
        )
    }

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::GetVersionStr),
            any::<u16>().prop_map(|bits| Command::GetDataFields {
                flags: LiveFields::from_bits_retain(bits),
            }),
            any::<u8>().prop_map(|camera_cmd| Command::DoCamera { camera_cmd }),
            (finite(), finite(), finite(), any::<u8>(), any::<u8>()).prop_map(
                |(pitch_deg, roll_deg, yaw_deg, flags, angle_type)| Command::SetAngles {
                    pitch_deg,
                    roll_deg,
                    yaw_deg,
                    flags,
                    angle_type,
                }
            ),
            (any::<u16>(), any::<u16>(), any::<u16>())
                .prop_map(|(pitch, roll, yaw)| Command::SetPitchRollYaw { pitch, roll, yaw }),
            (prop::array::uniform16(0u16..=INPUT_CHANNEL_MAX), any::<u8>())
                .prop_map(|(channels, status)| Command::SetInputs { channels, status }),
            location().prop_map(Command::SetHomeLocation),
            location().prop_map(Command::SetTargetLocation),
            (
                any::<u8>(),
                any::<u8>(),
                any::<i16>(),
                prop::array::uniform4(finite()),
                prop::array::uniform3(finite()),
            )
                .prop_map(|(seq, status, yaw_rate, quaternion, velocity)| {
                    Command::LinkStatus(LinkStatus {
                        seq,
                        status: LinkStatusFlags::from_bits_retain(status),
                        yaw_rate,
                        quaternion,
                        velocity,
                    })
                }),
        ]
    }

    proptest! {
        #[test]
        fn prop_command_survives_the_wire(cmd in command()) {
            let bytes = cmd.to_frame().unwrap().encode_to_vec().unwrap();
            prop_assert_eq!(bytes[1] as usize, cmd.payload_len());
            prop_assert_eq!(bytes.len(), cmd.payload_len() + 5);

            let mut parser = FrameParser::with_filter(StartFilter::Any);
            prop_assert!(parser.feed_bytes(&bytes).unwrap().is_some());
            let frame = parser.take_frame().unwrap();
            prop_assert_eq!(Command::from_frame(&frame), Ok(cmd));
        }
    }
}
