//! UART serial communication abstractions
//!
//! The gimbal engine runs inside a real-time tick and must never wait on a
//! peripheral, so the serial port is modelled as a pair of driver-owned ring
//! buffers: writes are accepted only up to the free TX space and reads return
//! whatever has already arrived.

/// Buffered, non-blocking serial port
pub trait SerialPort {
    /// Queue bytes for transmission
    ///
    /// Returns the number of bytes accepted. Never blocks; bytes that do not
    /// fit into the TX buffer are not queued.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Free space in the TX buffer, in bytes
    fn tx_space(&self) -> usize;

    /// Number of received bytes waiting in the RX buffer
    fn available(&self) -> usize;

    /// Pop one received byte, if any
    fn read_byte(&mut self) -> Option<u8>;

    /// Discard every byte waiting in the RX buffer
    fn clear_rx(&mut self) {
        while self.read_byte().is_some() {}
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    /// STorM32 RC-command port defaults: 115200 8N1
    fn default() -> Self {
        Self {
            baudrate: 115200,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Time to shift `len` bytes out at this baud rate, in microseconds
    ///
    /// Ten bit times per byte (start + 8 data + stop) for one stop bit.
    pub fn transmit_time_us(&self, len: usize) -> u32 {
        let bits_per_byte: u32 = match self.stop_bits {
            StopBits::One => 10,
            StopBits::Two => 11,
        };
        if self.baudrate == 0 {
            return 0;
        }
        let bits = bits_per_byte.saturating_mul(len as u32);
        ((bits as u64 * 1_000_000) / self.baudrate as u64) as u32
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
