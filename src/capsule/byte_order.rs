//! Byte order permutation for multi-byte capsule fields
//!
//! The host writes every multi-byte field in its own native layout. Instead of
//! assuming little or big endian, the bridge carries a 4-element permutation:
//! `perm[i]` is the position inside a 32-bit field that holds the byte of
//! significance `i` (0 = least significant). Little endian is `[0, 1, 2, 3]`,
//! big endian is `[3, 2, 1, 0]`, and mixed layouts are representable as well.
//!
//! A [`ByteOrder`] is built once at startup and injected into every capsule.
//! Changing it after capsules have been decoded is not supported.

use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// Marker the host writes in its native layout so the bridge can derive the permutation.
///
/// Byte `i` of the marker has the value `i`, so the byte found at buffer position `p`
/// names the significance of that position.
pub const PROBE_MARKER: u32 = 0x0302_0100;

/// Permutation describing how 32-bit field bytes are laid out in host buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 4]", into = "[u8; 4]")]
pub struct ByteOrder {
    perm: [u8; 4],
}

impl ByteOrder {
    /// Least significant byte first.
    pub const LITTLE_ENDIAN: ByteOrder = ByteOrder { perm: [0, 1, 2, 3] };

    /// Most significant byte first.
    pub const BIG_ENDIAN: ByteOrder = ByteOrder { perm: [3, 2, 1, 0] };

    /// Byte order of the machine the bridge is compiled for.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") { Self::LITTLE_ENDIAN } else { Self::BIG_ENDIAN }
    }

    /// Create a byte order from an explicit permutation.
    pub fn new(perm: [u8; 4]) -> Result<Self> {
        let mut seen = [false; 4];
        for &position in &perm {
            let slot = seen
                .get_mut(position as usize)
                .ok_or(BridgeError::InvalidByteOrder { order: perm })?;
            if *slot {
                return Err(BridgeError::InvalidByteOrder { order: perm });
            }
            *slot = true;
        }
        Ok(Self { perm })
    }

    /// Derive the byte order from [`PROBE_MARKER`] as written by the host.
    pub fn from_probe(probe: [u8; 4]) -> Result<Self> {
        let mut perm = [0u8; 4];
        let mut seen = [false; 4];
        for (position, &significance) in probe.iter().enumerate() {
            let slot = seen
                .get_mut(significance as usize)
                .ok_or(BridgeError::InvalidByteOrder { order: probe })?;
            if *slot {
                return Err(BridgeError::InvalidByteOrder { order: probe });
            }
            *slot = true;
            perm[significance as usize] = position as u8;
        }
        Ok(Self { perm })
    }

    /// The raw permutation.
    pub const fn permutation(&self) -> [u8; 4] {
        self.perm
    }

    /// Reorder host bytes into significance order (least significant first).
    pub fn permute(&self, bytes: [u8; 4]) -> [u8; 4] {
        [
            bytes[self.perm[0] as usize],
            bytes[self.perm[1] as usize],
            bytes[self.perm[2] as usize],
            bytes[self.perm[3] as usize],
        ]
    }

    /// Inverse of [`ByteOrder::permute`]: lay significance-ordered bytes out for the host.
    pub fn unpermute(&self, ordered: [u8; 4]) -> [u8; 4] {
        let mut bytes = [0u8; 4];
        for (significance, &byte) in ordered.iter().enumerate() {
            bytes[self.perm[significance] as usize] = byte;
        }
        bytes
    }

    /// Decode a 32-bit value from host bytes.
    pub fn read_u32(&self, bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(self.permute(bytes))
    }

    /// Encode a 32-bit value into host bytes.
    pub fn write_u32(&self, value: u32) -> [u8; 4] {
        self.unpermute(value.to_le_bytes())
    }

    /// Whether the low 32-bit word of a 64-bit field is stored first.
    pub fn low_word_first(&self) -> bool {
        self.perm[0] < self.perm[3]
    }

    /// Decode a 64-bit value stored as two permuted 32-bit words.
    pub fn read_u64(&self, bytes: [u8; 8]) -> u64 {
        let first = self.read_u32([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64;
        let second = self.read_u32([bytes[4], bytes[5], bytes[6], bytes[7]]) as u64;
        if self.low_word_first() { (second << 32) | first } else { (first << 32) | second }
    }

    /// Encode a 64-bit value as two permuted 32-bit words.
    pub fn write_u64(&self, value: u64) -> [u8; 8] {
        let low = self.write_u32(value as u32);
        let high = self.write_u32((value >> 32) as u32);
        let (first, second) = if self.low_word_first() { (low, high) } else { (high, low) };
        [first[0], first[1], first[2], first[3], second[0], second[1], second[2], second[3]]
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

impl TryFrom<[u8; 4]> for ByteOrder {
    type Error = BridgeError;

    fn try_from(perm: [u8; 4]) -> Result<Self> {
        Self::new(perm)
    }
}

impl From<ByteOrder> for [u8; 4] {
    fn from(order: ByteOrder) -> Self {
        order.perm
    }
}
