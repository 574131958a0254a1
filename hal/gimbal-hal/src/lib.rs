//! Gimbal Link Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits the gimbal link engine
//! needs from a flight controller board. Chip-specific HALs implement them;
//! the engine itself never touches a peripheral directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  gimbal-core / gimbal-drivers           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  gimbal-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board UART   │       │ host mocks    │
//! │  + timer      │       │ (tests)       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::SerialPort`] - Buffered, non-blocking serial port
//! - [`clock::Clock`] - Monotonic millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod mock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use uart::{SerialPort, UartConfig};
