//! CRC-16 checksum for protocol frames.
//!
//! Uses CRC-16/MCRF4XX, the X.25-style checksum MAVLink links use: reflected
//! polynomial 0x1021, initial value 0xFFFF, no final XOR.

use crc::{Crc, CRC_16_MCRF4XX};

/// CRC-16/MCRF4XX calculator with lookup table.
static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Calculate the CRC-16 of a byte slice.
#[inline]
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// CRC-16 digest for incremental calculation.
///
/// Frames are checksummed over header bytes and payload that live in
/// different places; the digest avoids copying them into one buffer.
pub struct Crc16Digest {
    digest: crc::Digest<'static, u16>,
}

impl Crc16Digest {
    /// Create a new digest.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CRC16.digest(),
        }
    }

    /// Update the digest with a single byte.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update_slice(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Finalize and return the checksum value.
    #[inline]
    #[must_use]
    pub fn finalize(self) -> u16 {
        self.digest.finalize()
    }
}

impl Default for Crc16Digest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_check_value() {
        // Catalogue check value for CRC-16/MCRF4XX
        assert_eq!(crc16(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_crc16_live_data_request_golden() {
        // length=0x02, command=0x06, flags=0x0102 (little-endian)
        assert_eq!(crc16(&[0x02, 0x06, 0x02, 0x01]), 0xCEB7);
    }

    #[test]
    fn test_crc16_empty_is_seed() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_digest_matches_batch() {
        let data = [0x0E, 0x11, 0x00, 0x00, 0x20, 0x41];
        let mut digest = Crc16Digest::new();
        digest.update(data[0]);
        digest.update(data[1]);
        digest.update_slice(&data[2..]);
        assert_eq!(digest.finalize(), crc16(&data));
    }
}
