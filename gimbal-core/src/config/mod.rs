//! Configuration types
//!
//! Board-agnostic mount configuration, stored by the flight stack as
//! postcard binary data.

pub mod persist;
pub mod types;

pub use persist::{ConfigError, CONFIG_MAGIC, CONFIG_VERSION, MAX_CONFIG_SIZE};
pub use types::*;
