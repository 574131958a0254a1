//! Frame codec bound to a transport
//!
//! Sending is all-or-nothing: a frame is written only if the transport
//! reports room for it plus two bytes of margin. Receiving drains a bounded
//! number of bytes per pass into the frame parser.

use gimbal_protocol::{Command, Frame, FrameError, FrameParser, MAX_FRAME_SIZE};

use crate::traits::{Priority, Transport};

/// Bytes drained from the transport per receive pass
pub const MAX_DRAIN_PER_PASS: usize = 128;

/// Extra transmit space required beyond the frame itself
const SEND_MARGIN: usize = 2;

/// Errors from sending a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// No usable transport
    Unavailable,
    /// Not enough transmit space; the frame was dropped
    InsufficientSpace,
    /// Frame could not be encoded
    Encode(FrameError),
}

impl From<FrameError> for SendError {
    fn from(err: FrameError) -> Self {
        SendError::Encode(err)
    }
}

/// Frame codec with receive state
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    parser: FrameParser,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            parser: FrameParser::new(),
        }
    }

    /// Current parser state
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    /// Encode and send a command
    ///
    /// Returns the number of bytes the transport accepted.
    pub fn send<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        command: &Command,
        priority: Priority,
    ) -> Result<usize, SendError> {
        let frame = command.to_frame()?;
        self.send_frame(transport, &frame, priority)
    }

    /// Send an already built frame
    pub fn send_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        frame: &Frame,
        priority: Priority,
    ) -> Result<usize, SendError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = frame.encode(&mut buf)?;

        if transport.space_remaining() < len + SEND_MARGIN {
            trace!("tx space low, dropping command {=u8:#x}", frame.command);
            return Err(SendError::InsufficientSpace);
        }

        Ok(transport.write(&buf[..len], priority))
    }

    /// Drain pending input into the parser and take a completed frame
    ///
    /// Reads at most [`MAX_DRAIN_PER_PASS`] bytes. Corrupt frames are
    /// dropped and the parser returns to idle.
    pub fn receive<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<Frame> {
        for _ in 0..MAX_DRAIN_PER_PASS {
            let Some(byte) = transport.read() else {
                break;
            };
            if let Err(err) = self.parser.feed(byte) {
                warn!("dropped incoming frame: {}", err);
            }
        }
        self.parser.take_frame()
    }

    /// Discard every buffered input byte and reset the parser
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        let pending = transport.available();
        for _ in 0..pending {
            if transport.read().is_none() {
                break;
            }
        }
        self.parser.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TransportKind;
    use gimbal_protocol::{LiveFields, ReceiveState, StartByte};
    use heapless::{Deque, Vec};

    /// In-memory transport with a configurable TX space
    struct Loopback {
        tx: Vec<u8, 256>,
        rx: Deque<u8, 512>,
        space: usize,
    }

    impl Loopback {
        fn new(space: usize) -> Self {
            Self {
                tx: Vec::new(),
                rx: Deque::new(),
                space,
            }
        }

        fn inject(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.rx.push_back(b).unwrap();
            }
        }
    }

    impl Transport for Loopback {
        fn kind(&self) -> TransportKind {
            TransportKind::Serial
        }

        fn write(&mut self, bytes: &[u8], _priority: Priority) -> usize {
            self.tx.extend_from_slice(bytes).unwrap();
            bytes.len()
        }

        fn space_remaining(&self) -> usize {
            self.space
        }

        fn available(&self) -> usize {
            self.rx.len()
        }

        fn read(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    fn version_response() -> Vec<u8, MAX_FRAME_SIZE> {
        Frame::new(StartByte::Device, 0x02, &[b'v'; 48])
            .unwrap()
            .encode_to_vec()
            .unwrap()
    }

    #[test]
    fn test_send_writes_whole_frame() {
        let mut link = Loopback::new(100);
        let mut codec = FrameCodec::new();
        let sent = codec
            .send(&mut link, &Command::GetDataFields { flags: LiveFields::from_bits_retain(0x0102) }, Priority::Normal)
            .unwrap();
        assert_eq!(sent, 7);
        assert_eq!(&link.tx[..], &[0xF9, 0x02, 0x06, 0x02, 0x01, 0xB7, 0xCE]);
    }

    #[test]
    fn test_send_requires_margin() {
        let mut codec = FrameCodec::new();
        let cmd = Command::recenter(); // 11 bytes on the wire

        let mut link = Loopback::new(12);
        assert_eq!(
            codec.send(&mut link, &cmd, Priority::Normal),
            Err(SendError::InsufficientSpace)
        );
        assert!(link.tx.is_empty());

        let mut link = Loopback::new(13);
        assert_eq!(codec.send(&mut link, &cmd, Priority::Normal), Ok(11));
    }

    #[test]
    fn test_receive_takes_frame() {
        let mut link = Loopback::new(0);
        link.inject(&version_response());

        let mut codec = FrameCodec::new();
        let frame = codec.receive(&mut link).unwrap();
        assert_eq!(frame.command, 0x02);
        assert_eq!(codec.parser().state(), ReceiveState::MessageConsumed);
    }

    #[test]
    fn test_receive_is_bounded_per_pass() {
        let mut link = Loopback::new(0);
        link.inject(&[0u8; 300]);

        let mut codec = FrameCodec::new();
        assert!(codec.receive(&mut link).is_none());
        assert_eq!(link.available(), 300 - MAX_DRAIN_PER_PASS);
        assert!(codec.receive(&mut link).is_none());
        assert_eq!(link.available(), 300 - 2 * MAX_DRAIN_PER_PASS);
    }

    #[test]
    fn test_receive_drops_corrupt_frame() {
        let mut bytes = version_response();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let mut link = Loopback::new(0);
        link.inject(&bytes);

        let mut codec = FrameCodec::new();
        assert!(codec.receive(&mut link).is_none());
        assert_eq!(codec.parser().state(), ReceiveState::Idle);
    }

    #[test]
    fn test_flush_discards_input_and_resets() {
        let mut link = Loopback::new(0);
        let bytes = version_response();
        link.inject(&bytes[..10]);

        let mut codec = FrameCodec::new();
        assert!(codec.receive(&mut link).is_none());
        assert_eq!(codec.parser().state(), ReceiveState::AwaitPayload);

        link.inject(&bytes[10..]);
        codec.flush(&mut link);
        assert_eq!(link.available(), 0);
        assert_eq!(codec.parser().state(), ReceiveState::Idle);
    }
}
