//! Point-to-point serial transport
//!
//! Wraps a buffered [`SerialPort`] as a link [`Transport`]. The gimbal's RC
//! command port runs at 115200 8N1; a full status broadcast takes about
//! 3.3 ms on the wire, so the engine spreads its frames over task slots.
//!
//! ```ignore
//! let link = SerialLink::new(uart, UartConfig::default());
//! let mut gimbal = Gimbal::new(Some(link), clock, config);
//!
//! // In the fast loop:
//! gimbal.tick(&vehicle, &mut gcs);
//! ```

use gimbal_core::traits::{Priority, Transport, TransportKind};
use gimbal_hal::{SerialPort, UartConfig};

/// Serial transport
pub struct SerialLink<U: SerialPort> {
    port: U,
    config: UartConfig,
}

impl<U: SerialPort> SerialLink<U> {
    pub fn new(port: U, config: UartConfig) -> Self {
        Self { port, config }
    }

    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Time `len` bytes occupy the wire, in microseconds
    pub fn transmit_time_us(&self, len: usize) -> u32 {
        self.config.transmit_time_us(len)
    }

    /// Give the port back
    pub fn release(self) -> U {
        self.port
    }
}

impl<U: SerialPort> Transport for SerialLink<U> {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn write(&mut self, bytes: &[u8], _priority: Priority) -> usize {
        self.port.write(bytes)
    }

    fn space_remaining(&self) -> usize {
        self.port.tx_space()
    }

    fn available(&self) -> usize {
        self.port.available()
    }

    fn read(&mut self) -> Option<u8> {
        self.port.read_byte()
    }
}
