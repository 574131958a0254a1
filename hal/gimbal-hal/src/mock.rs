//! Host mocks for the HAL traits
//!
//! Always compiled so that downstream crates can use them in their own tests
//! without a feature flag. Both mocks use fixed-capacity buffers and interior
//! mutability, so they stay `no_std` and can be shared by reference between
//! the code under test and the test itself.

use core::cell::{Cell, RefCell};

use heapless::Deque;

use crate::clock::Clock;
use crate::uart::SerialPort;

/// Mock time source with controllable time advancement
///
/// # Example
///
/// ```
/// use gimbal_hal::mock::MockClock;
/// use gimbal_hal::Clock;
///
/// let clock = MockClock::new();
/// clock.advance(10);
/// assert_eq!(clock.now_ms(), 10);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: Cell<u64>,
}

impl MockClock {
    /// Create a clock starting at time 0
    pub const fn new() -> Self {
        Self { now_ms: Cell::new(0) }
    }

    /// Create a clock starting at `ms`
    pub const fn starting_at(ms: u64) -> Self {
        Self { now_ms: Cell::new(ms) }
    }

    /// Set the current time
    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }

    /// Advance the current time by `ms`
    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Capacity of each mock serial buffer
pub const MOCK_SERIAL_CAPACITY: usize = 512;

/// Mock serial port with in-memory TX and RX buffers
///
/// The reported TX space can be capped with [`MockSerial::set_tx_limit`] to
/// exercise backpressure handling.
#[derive(Debug)]
pub struct MockSerial {
    tx: RefCell<Deque<u8, MOCK_SERIAL_CAPACITY>>,
    rx: RefCell<Deque<u8, MOCK_SERIAL_CAPACITY>>,
    tx_limit: Cell<usize>,
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerial {
    /// Create an empty mock port with unlimited TX space
    pub fn new() -> Self {
        Self {
            tx: RefCell::new(Deque::new()),
            rx: RefCell::new(Deque::new()),
            tx_limit: Cell::new(MOCK_SERIAL_CAPACITY),
        }
    }

    /// Cap the TX space reported to the writer
    pub fn set_tx_limit(&self, limit: usize) {
        self.tx_limit.set(limit.min(MOCK_SERIAL_CAPACITY));
    }

    /// Inject bytes as if received from the wire
    ///
    /// Returns the number of bytes that fit into the RX buffer.
    pub fn inject_rx(&self, data: &[u8]) -> usize {
        let mut rx = self.rx.borrow_mut();
        let mut count = 0;
        for &byte in data {
            if rx.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        count
    }

    /// Remove and return everything written so far (up to `N` bytes)
    pub fn take_tx<const N: usize>(&self) -> heapless::Vec<u8, N> {
        let mut tx = self.tx.borrow_mut();
        let mut out = heapless::Vec::new();
        while let Some(byte) = tx.pop_front() {
            if out.push(byte).is_err() {
                break;
            }
        }
        out
    }

    /// Number of bytes written and not yet taken
    pub fn tx_len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Number of injected bytes not yet read
    pub fn rx_len(&self) -> usize {
        self.rx.borrow().len()
    }
}

impl SerialPort for MockSerial {
    fn write(&mut self, data: &[u8]) -> usize {
        let space = self.tx_space();
        let mut tx = self.tx.borrow_mut();
        let mut count = 0;
        for &byte in data.iter().take(space) {
            if tx.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        count
    }

    fn tx_space(&self) -> usize {
        let used = self.tx.borrow().len();
        self.tx_limit.get().saturating_sub(used)
    }

    fn available(&self) -> usize {
        self.rx.borrow().len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.borrow_mut().pop_front()
    }
}

/// Shared-reference port, so a test can keep a handle to the mock it lent out
impl SerialPort for &MockSerial {
    fn write(&mut self, data: &[u8]) -> usize {
        let space = self.tx_space();
        let mut tx = self.tx.borrow_mut();
        let mut count = 0;
        for &byte in data.iter().take(space) {
            if tx.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        count
    }

    fn tx_space(&self) -> usize {
        (**self).tx_space()
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.borrow_mut().pop_front()
    }
}
