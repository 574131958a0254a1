//! Transport implementations
//!
//! Concrete [`Transport`](gimbal_core::traits::Transport)s for the gimbal
//! link engine:
//!
//! - Serial: a buffered UART port
//! - Bus: node-specific payloads on a shared bus, with status broadcasts
//!   delivered through the bus listener registry

#![no_std]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod serial;

pub use bus::{register_inbox, BusLink, BusTx, BUS_TX_SPACE};
pub use serial::SerialLink;
