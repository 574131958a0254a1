//! Configuration persistence
//!
//! The flight stack owns the parameter store; this module only turns a
//! [`MountConfig`] into bytes and back. Stored data starts with a magic
//! number and a format version so stale blobs are rejected instead of
//! misread.

#[cfg(feature = "serde")]
use super::types::MountConfig;

/// Magic number for validation ("GMBL")
pub const CONFIG_MAGIC: u32 = 0x474D_424C;

/// Data format version
pub const CONFIG_VERSION: u8 = 1;

/// Upper bound of an encoded configuration
pub const MAX_CONFIG_SIZE: usize = 96;

/// Errors from loading or storing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Output buffer too small or value not encodable
    Serialize,
    /// Corrupt or truncated data
    Deserialize,
    /// Magic or version does not match this build
    VersionMismatch,
}

#[cfg(feature = "serde")]
impl MountConfig {
    /// Serialize into `buf`, returning the used prefix
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(&(CONFIG_MAGIC, CONFIG_VERSION, self), buf)
            .map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize data written by [`MountConfig::to_slice`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let ((magic, version), rest): ((u32, u8), &[u8]) =
            postcard::take_from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if magic != CONFIG_MAGIC || version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        postcard::from_bytes(rest).map_err(|_| ConfigError::Deserialize)
    }
}
