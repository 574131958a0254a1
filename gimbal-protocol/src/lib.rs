//! STorM32 RC-Command Protocol
//!
//! This crate defines the binary protocol spoken between the flight
//! controller and a STorM32 gimbal controller. The same frames travel over a
//! point-to-point UART or tunnelled through a shared broadcast bus.
//!
//! # Protocol Overview
//!
//! All messages use the same frame format:
//! ```text
//! ┌───────┬────────┬─────────┬─────────────┬──────────────┐
//! │ START │ LENGTH │ COMMAND │ PAYLOAD     │ CRC16 (LE)   │
//! │ 1B    │ 1B     │ 1B      │ LENGTH B    │ 2B           │
//! └───────┴────────┴─────────┴─────────────┴──────────────┘
//! ```
//!
//! The checksum is CRC-16/MCRF4XX over LENGTH, COMMAND and PAYLOAD.
//! Frames from the flight controller start with `0xF9` (no acknowledgment)
//! or `0xFA` (acknowledgment requested); frames from the gimbal start with
//! `0xFB`.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod crc;
pub mod frame;
pub mod ident;
pub mod responses;
mod wire;

pub use commands::{Command, LinkStatus, LinkStatusFlags, LocationPayload};
pub use crc::{crc16, Crc16Digest};
pub use frame::{
    Frame, FrameError, FrameParser, ReceiveState, StartByte, StartFilter, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE, RX_BUFFER_SIZE,
};
pub use ident::IdString;
pub use responses::{LiveAttitude, LiveData, LiveFields, LiveStatus, Response, VersionInfo};
