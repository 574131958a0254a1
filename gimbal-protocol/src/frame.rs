//! Frame encoding and decoding for the STorM32 RC-command protocol.
//!
//! Frame format:
//! - START (1 byte): 0xF9 / 0xFA from the flight controller, 0xFB from the gimbal
//! - LENGTH (1 byte): payload length
//! - COMMAND (1 byte): command identifier
//! - PAYLOAD (LENGTH bytes): command-specific data
//! - CRC (2 bytes): CRC-16/MCRF4XX of LENGTH, COMMAND and PAYLOAD, little-endian

use heapless::Vec;

use crate::crc::{crc16, Crc16Digest};

/// Start byte of a command that does not request an acknowledgment
pub const START_NO_ACK: u8 = 0xF9;

/// Start byte of a command that requests an acknowledgment
pub const START_ACK: u8 = 0xFA;

/// Start byte of every frame sent by the gimbal
pub const START_DEVICE: u8 = 0xFB;

/// Receive buffer capacity: payload plus the two CRC bytes
pub const RX_BUFFER_SIZE: usize = 96;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = RX_BUFFER_SIZE - CRC_SIZE;

/// START + LENGTH + COMMAND
pub const HEADER_SIZE: usize = 3;

/// Trailing checksum size
pub const CRC_SIZE: usize = 2;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CRC_SIZE;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Announced length does not fit the receive buffer
    Overflow,
    /// Checksum mismatch
    InvalidChecksum,
    /// Invalid frame structure or payload length
    InvalidFrame,
    /// Frame carries a different command than the decoder expects
    UnexpectedCommand,
}

/// Frame start byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartByte {
    /// Flight controller command, no acknowledgment
    #[default]
    NoAck,
    /// Flight controller command, acknowledgment requested
    Ack,
    /// Gimbal response
    Device,
}

impl StartByte {
    /// Wire value
    pub const fn to_byte(self) -> u8 {
        match self {
            StartByte::NoAck => START_NO_ACK,
            StartByte::Ack => START_ACK,
            StartByte::Device => START_DEVICE,
        }
    }

    /// Parse a wire value
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            START_NO_ACK => Some(StartByte::NoAck),
            START_ACK => Some(StartByte::Ack),
            START_DEVICE => Some(StartByte::Device),
            _ => None,
        }
    }
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Start byte
    pub start: StartByte,
    /// Command identifier
    pub command: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given start byte, command and payload
    pub fn new(start: StartByte, command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            start,
            command,
            payload: payload_vec,
        })
    }

    /// Create a flight-controller frame with no payload
    pub fn empty(command: u8) -> Self {
        Self {
            start: StartByte::NoAck,
            command,
            payload: Vec::new(),
        }
    }

    /// Total encoded size of this frame
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CRC_SIZE
    }

    /// Checksum over LENGTH, COMMAND and PAYLOAD
    pub fn checksum(&self) -> u16 {
        Self::calculate_checksum(self.payload.len() as u8, self.command, &self.payload)
    }

    fn calculate_checksum(length: u8, command: u8, payload: &[u8]) -> u16 {
        let mut digest = Crc16Digest::new();
        digest.update(length);
        digest.update(command);
        digest.update_slice(payload);
        digest.finalize()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = self.payload.len();
        buffer[0] = self.start.to_byte();
        buffer[1] = length as u8;
        buffer[2] = self.command;
        buffer[HEADER_SIZE..HEADER_SIZE + length].copy_from_slice(&self.payload);

        // Header and payload are contiguous in the output
        let crc = crc16(&buffer[1..HEADER_SIZE + length]);
        buffer[HEADER_SIZE + length..frame_len].copy_from_slice(&crc.to_le_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Fail with [`FrameError::UnexpectedCommand`] unless this frame carries `command`
    pub fn expect_command(&self, command: u8) -> Result<(), FrameError> {
        if self.command == command {
            Ok(())
        } else {
            Err(FrameError::UnexpectedCommand)
        }
    }
}

/// Receive state of a [`FrameParser`]
///
/// A parser only moves forward through these states. Overflow, checksum
/// failure or an explicit [`FrameParser::reset`] send it back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveState {
    /// Waiting for a start byte
    Idle,
    /// Got START, waiting for LENGTH
    AwaitLength,
    /// Got LENGTH, waiting for COMMAND
    AwaitCommand,
    /// Reading payload and CRC bytes
    AwaitPayload,
    /// A verified frame is waiting to be taken
    MessageReady,
    /// The frame has been taken; bytes are dropped until reset
    MessageConsumed,
}

/// Which start bytes open a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartFilter {
    /// Only gimbal responses (0xFB)
    Device,
    /// Any of the three start bytes
    Any,
}

impl StartFilter {
    fn accepts(self, byte: u8) -> Option<StartByte> {
        let start = StartByte::from_byte(byte)?;
        match self {
            StartFilter::Device if start != StartByte::Device => None,
            _ => Some(start),
        }
    }
}

/// Byte-at-a-time frame receiver
///
/// Holds at most one complete frame. Once a frame is ready, further bytes
/// are discarded until the owner resets the parser, which the link does at
/// the start of every request cycle.
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ReceiveState,
    filter: StartFilter,
    start: StartByte,
    length: u8,
    command: u8,
    buffer: Vec<u8, RX_BUFFER_SIZE>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a parser for gimbal responses
    pub fn new() -> Self {
        Self::with_filter(StartFilter::Device)
    }

    /// Create a parser that accepts the given start bytes
    pub fn with_filter(filter: StartFilter) -> Self {
        Self {
            state: ReceiveState::Idle,
            filter,
            start: StartByte::Device,
            length: 0,
            command: 0,
            buffer: Vec::new(),
        }
    }

    /// Current receive state
    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// True while a verified frame is waiting in the buffer
    pub fn is_ready(&self) -> bool {
        self.state == ReceiveState::MessageReady
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ReceiveState::Idle;
        self.buffer.clear();
        self.length = 0;
        self.command = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(true)` when this byte completed a valid frame, `Ok(false)`
    /// when more bytes are needed or the byte was dropped, or `Err` when the
    /// frame in progress was discarded.
    pub fn feed(&mut self, byte: u8) -> Result<bool, FrameError> {
        match self.state {
            ReceiveState::Idle => {
                if let Some(start) = self.filter.accepts(byte) {
                    self.start = start;
                    self.state = ReceiveState::AwaitLength;
                }
                // Silently ignore anything else while idle
                Ok(false)
            }
            ReceiveState::AwaitLength => {
                if byte as usize + CRC_SIZE > RX_BUFFER_SIZE {
                    self.reset();
                    return Err(FrameError::Overflow);
                }
                self.length = byte;
                self.state = ReceiveState::AwaitCommand;
                Ok(false)
            }
            ReceiveState::AwaitCommand => {
                self.command = byte;
                self.buffer.clear();
                self.state = ReceiveState::AwaitPayload;
                Ok(false)
            }
            ReceiveState::AwaitPayload => {
                if self.buffer.push(byte).is_err() {
                    self.reset();
                    return Err(FrameError::Overflow);
                }
                if self.buffer.len() < self.length as usize + CRC_SIZE {
                    return Ok(false);
                }

                let payload_len = self.length as usize;
                let received =
                    u16::from_le_bytes([self.buffer[payload_len], self.buffer[payload_len + 1]]);
                let expected =
                    Frame::calculate_checksum(self.length, self.command, &self.buffer[..payload_len]);
                if received != expected {
                    self.reset();
                    return Err(FrameError::InvalidChecksum);
                }

                self.state = ReceiveState::MessageReady;
                Ok(true)
            }
            ReceiveState::MessageReady | ReceiveState::MessageConsumed => Ok(false),
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Stops at the first complete frame and returns how many bytes were
    /// consumed, or `None` if the slice ended first.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<usize>, FrameError> {
        for (index, &byte) in bytes.iter().enumerate() {
            if self.feed(byte)? {
                return Ok(Some(index + 1));
            }
        }
        Ok(None)
    }

    /// Take the ready frame, moving to `MessageConsumed`
    pub fn take_frame(&mut self) -> Option<Frame> {
        if self.state != ReceiveState::MessageReady {
            return None;
        }
        self.state = ReceiveState::MessageConsumed;

        let mut payload = Vec::new();
        // Length was bounded against the buffer on receipt
        payload
            .extend_from_slice(&self.buffer[..self.length as usize])
            .ok()?;
        Some(Frame {
            start: self.start,
            command: self.command,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_data_request() -> Frame {
        Frame::new(StartByte::NoAck, 0x06, &[0x02, 0x01]).unwrap()
    }

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x02);
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 5);
        assert_eq!(buffer[0], START_NO_ACK);
        assert_eq!(buffer[1], 0); // length
        assert_eq!(buffer[2], 0x02); // command
        assert_eq!(buffer[3..5], 0xD3AAu16.to_le_bytes());
    }

    #[test]
    fn test_frame_encode_golden_vector() {
        let encoded = live_data_request().encode_to_vec().unwrap();
        assert_eq!(&encoded[..], &[0xF9, 0x02, 0x06, 0x02, 0x01, 0xB7, 0xCE]);
    }

    #[test]
    fn test_frame_encode_buffer_too_small() {
        let mut buffer = [0u8; 6];
        assert_eq!(
            live_data_request().encode(&mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(StartByte::NoAck, 0x11, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_parser_accepts_device_frame() {
        let mut original = live_data_request();
        original.start = StartByte::Device;
        let encoded = original.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Ok(Some(encoded.len())));
        assert_eq!(parser.state(), ReceiveState::MessageReady);

        let parsed = parser.take_frame().unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parser.state(), ReceiveState::MessageConsumed);
        assert!(parser.take_frame().is_none());
    }

    #[test]
    fn test_parser_ignores_command_start_bytes_by_default() {
        let encoded = live_data_request().encode_to_vec().unwrap();
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded), Ok(None));
        assert_eq!(parser.state(), ReceiveState::Idle);
    }

    #[test]
    fn test_parser_any_filter_accepts_commands() {
        let encoded = live_data_request().encode_to_vec().unwrap();
        let mut parser = FrameParser::with_filter(StartFilter::Any);
        assert!(parser.feed_bytes(&encoded).unwrap().is_some());
        assert_eq!(parser.take_frame().unwrap().start, StartByte::NoAck);
    }

    #[test]
    fn test_parser_state_progression() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.state(), ReceiveState::Idle);
        parser.feed(START_DEVICE).unwrap();
        assert_eq!(parser.state(), ReceiveState::AwaitLength);
        parser.feed(0).unwrap();
        assert_eq!(parser.state(), ReceiveState::AwaitCommand);
        parser.feed(0x02).unwrap();
        assert_eq!(parser.state(), ReceiveState::AwaitPayload);
        parser.feed(0xAA).unwrap();
        assert_eq!(parser.state(), ReceiveState::AwaitPayload);
        assert_eq!(parser.feed(0xD3), Ok(true));
        assert_eq!(parser.state(), ReceiveState::MessageReady);
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let mut frame = live_data_request();
        frame.start = StartByte::Device;
        let mut encoded = frame.encode_to_vec().unwrap();
        // Corrupt the checksum
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        let mut parser = FrameParser::new();
        let result = parser.feed_bytes(&encoded);
        assert_eq!(result, Err(FrameError::InvalidChecksum));
        assert_eq!(parser.state(), ReceiveState::Idle);
    }

    #[test]
    fn test_parser_overflow_resets() {
        let mut parser = FrameParser::new();
        parser.feed(START_DEVICE).unwrap();
        assert_eq!(parser.feed(RX_BUFFER_SIZE as u8), Err(FrameError::Overflow));
        assert_eq!(parser.state(), ReceiveState::Idle);
    }

    #[test]
    fn test_parser_largest_length_fits() {
        let payload = [0x5Au8; MAX_PAYLOAD_SIZE];
        let frame = Frame::new(StartByte::Device, 0x06, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        assert!(parser.feed_bytes(&encoded).unwrap().is_some());
        assert_eq!(parser.take_frame().unwrap().payload.len(), MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let frame = Frame::new(StartByte::Device, 0x02, &[]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        // Prepend garbage bytes
        let mut data = Vec::<u8, 20>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        assert!(parser.feed_bytes(&data).unwrap().is_some());
        assert_eq!(parser.take_frame().unwrap().command, 0x02);
    }

    #[test]
    fn test_parser_drops_bytes_until_reset() {
        let frame = Frame::new(StartByte::Device, 0x02, &[]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        parser.feed_bytes(&encoded).unwrap();
        parser.take_frame().unwrap();

        // A second frame is ignored while consumed
        assert_eq!(parser.feed_bytes(&encoded), Ok(None));
        assert_eq!(parser.state(), ReceiveState::MessageConsumed);

        parser.reset();
        assert!(parser.feed_bytes(&encoded).unwrap().is_some());
    }

    #[test]
    fn test_start_byte_roundtrip() {
        for start in [StartByte::NoAck, StartByte::Ack, StartByte::Device] {
            assert_eq!(StartByte::from_byte(start.to_byte()), Some(start));
        }
        assert_eq!(StartByte::from_byte(0xAA), None);
    }
}
