//! Byte channel to the gimbal

use crate::bus::BusStatus;

/// Which kind of channel carries the frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportKind {
    /// No usable channel; the device is disabled
    None,
    /// Point-to-point UART
    Serial,
    /// Frames tunnelled over a shared broadcast bus
    Bus,
}

/// Transmit priority hint
///
/// Serial ports ignore it; a bus transport maps it onto its own arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    #[default]
    Normal,
    /// High-rate status broadcast
    Highest,
}

/// Non-blocking byte channel
///
/// Nothing here may wait. Writes that do not fit are the caller's problem:
/// the codec checks [`Transport::space_remaining`] first and drops the frame
/// if it would not fit.
///
/// # Delivery
///
/// The value returned by [`Transport::write`] is the number of bytes the
/// channel *accepted*, not proof of delivery. A bus transport has no
/// backpressure signal and reports every write as fully accepted.
pub trait Transport {
    /// Channel kind
    fn kind(&self) -> TransportKind;

    /// Queue bytes for transmission, returning how many were accepted
    fn write(&mut self, bytes: &[u8], priority: Priority) -> usize;

    /// Free transmit space in bytes
    fn space_remaining(&self) -> usize;

    /// Received bytes waiting to be read
    fn available(&self) -> usize;

    /// Pop one received byte
    fn read(&mut self) -> Option<u8>;

    /// Whether the underlying channel is usable yet
    fn is_ready(&self) -> bool {
        true
    }

    /// Latest unsolicited status broadcast, if one arrived since the last call
    ///
    /// Only bus transports deliver these.
    fn take_status(&mut self) -> Option<BusStatus> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn write(&mut self, bytes: &[u8], priority: Priority) -> usize {
        (**self).write(bytes, priority)
    }

    fn space_remaining(&self) -> usize {
        (**self).space_remaining()
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn take_status(&mut self) -> Option<BusStatus> {
        (**self).take_status()
    }
}
