//! Board-agnostic link engine for STorM32 camera gimbals
//!
//! This crate contains everything between the flight stack and the wire
//! that does not depend on a specific board:
//!
//! - Collaborator traits (transport, vehicle state, operator notices)
//! - Frame codec bound to a transport, and device discovery
//! - Task-slot scheduler
//! - Pointing target resolution
//! - Telemetry cache
//! - Bus listener registry
//! - Mount configuration
//!
//! [`Gimbal`] ties them together behind a single periodic `tick`.

#![no_std]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod config;
pub mod gimbal;
pub mod link;
pub mod scheduler;
pub mod target;
pub mod telemetry;
pub mod traits;

pub use gimbal::Gimbal;
