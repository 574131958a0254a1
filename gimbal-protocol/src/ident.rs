//! Fixed-width identification strings.
//!
//! The gimbal reports its firmware version, name and board as 16-byte,
//! NUL-padded fields. They are kept as bounded strings so the engine never
//! allocates.

use core::fmt;

use heapless::String;

/// Width of an identification field on the wire
pub const ID_FIELD_SIZE: usize = 16;

/// Bounded identification string of at most 16 characters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdString(String<ID_FIELD_SIZE>);

impl IdString {
    /// Empty string
    pub const fn new() -> Self {
        Self(String::new())
    }

    /// Decode a wire field
    ///
    /// Stops at the first NUL. Bytes outside printable ASCII are replaced
    /// with `?` so a corrupt field never fails the whole response.
    pub fn from_field(field: &[u8]) -> Self {
        let mut out = String::new();
        for &byte in field.iter().take(ID_FIELD_SIZE) {
            if byte == 0 {
                break;
            }
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            // Bounded by take() above
            let _ = out.push(ch);
        }
        Self(out)
    }

    /// Build from a string slice, truncating to 16 bytes
    pub fn from_str_truncated(s: &str) -> Self {
        Self::from_field(s.as_bytes())
    }

    /// Encode as a NUL-padded wire field
    pub fn to_field(&self) -> [u8; ID_FIELD_SIZE] {
        let mut field = [0u8; ID_FIELD_SIZE];
        let bytes = self.0.as_bytes();
        field[..bytes.len()].copy_from_slice(bytes);
        field
    }

    /// String contents
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
