//! Multicast hash filter with per-bucket reference counts.
//!
//! Many addresses can land in one bucket, so the hardware bit for a bucket is
//! only cleared when the last address using it is removed. The software table
//! here is the source of truth; chip profiles copy it into hardware.

use crate::driver::error::{IoError, IoResult};
use crate::hal::chip::HashWidth;
use crate::internal::constants::{MAC_ADDR_LEN, MAX_HASH_BITS, SETUP_FRAME_LEN};

const TABLE_WORDS: usize = MAX_HASH_BITS / 32;

/// Reflected CRC-32 (IEEE 802.3 polynomial) over an address, without the
/// final complement.
#[must_use]
pub fn crc32_le(addr: &[u8; MAC_ADDR_LEN]) -> u32 {
    const CRC32_POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;

    for byte in addr {
        let mut data = *byte;
        for _ in 0..8 {
            if ((crc ^ data as u32) & 1) != 0 {
                crc = (crc >> 1) ^ CRC32_POLY;
            } else {
                crc >>= 1;
            }
            data >>= 1;
        }
    }
    crc
}

/// Hash table bitmap plus a parallel reference-count array
pub struct HashFilter {
    counts: [u16; MAX_HASH_BITS],
    table: [u32; TABLE_WORDS],
    width: HashWidth,
}

impl HashFilter {
    /// Create an empty filter. Const-compatible.
    #[must_use]
    pub const fn new(width: HashWidth) -> Self {
        Self {
            counts: [0; MAX_HASH_BITS],
            table: [0; TABLE_WORDS],
            width,
        }
    }

    /// Table width
    #[inline]
    pub const fn width(&self) -> HashWidth {
        self.width
    }

    /// Drop every reference and clear every bit.
    pub fn clear(&mut self) {
        self.counts = [0; MAX_HASH_BITS];
        self.table = [0; TABLE_WORDS];
    }

    /// Take a reference on `index`. Returns `true` when the bit turned on.
    ///
    /// # Errors
    /// `RefCountOverflow` when the bucket is already at `u16::MAX`; the count
    /// is left unchanged.
    pub fn add(&mut self, index: usize) -> IoResult<bool> {
        let index = index % self.width.bits();
        let count = &mut self.counts[index];
        *count = count.checked_add(1).ok_or(IoError::RefCountOverflow)?;
        if *count == 1 {
            self.table[index / 32] |= 1 << (index % 32);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Drop a reference on `index`. Returns `true` when the bit turned off.
    ///
    /// Removing from an empty bucket is a no-op.
    pub fn remove(&mut self, index: usize) -> bool {
        let index = index % self.width.bits();
        let count = &mut self.counts[index];
        match *count {
            0 => false,
            1 => {
                *count = 0;
                self.table[index / 32] &= !(1 << (index % 32));
                true
            }
            _ => {
                *count -= 1;
                false
            }
        }
    }

    /// References held on `index`
    #[inline]
    pub fn count(&self, index: usize) -> u16 {
        self.counts[index % self.width.bits()]
    }

    /// Whether the bit for `index` is set
    #[inline]
    pub fn is_set(&self, index: usize) -> bool {
        let index = index % self.width.bits();
        self.table[index / 32] & (1 << (index % 32)) != 0
    }

    /// Table words in use, least significant bit of word 0 first
    #[inline]
    pub fn table(&self) -> &[u32] {
        &self.table[..self.width.bits() / 32]
    }
}

/// Encode a Tulip-compatible imperfect-filtering setup frame.
///
/// The hash table occupies the low 16 bits of the first 32 longwords and the
/// station address the low 16 bits of longwords 39 to 41. The broadcast
/// bucket is always set. Returns the frame length, or `None` when `out` is
/// too short.
#[must_use]
pub fn encode_setup_frame(
    station: &[u8; MAC_ADDR_LEN],
    table: &[u32],
    out: &mut [u8],
) -> Option<usize> {
    const BROADCAST_BUCKET: usize = 255;

    let frame = out.get_mut(..SETUP_FRAME_LEN)?;
    frame.fill(0);

    let bit = |index: usize| -> bool {
        index == BROADCAST_BUCKET
            || table
                .get(index / 32)
                .is_some_and(|word| word & (1 << (index % 32)) != 0)
    };

    for longword in 0..32 {
        let mut half = 0u16;
        for b in 0..16 {
            if bit(longword * 16 + b) {
                half |= 1 << b;
            }
        }
        frame[longword * 4..longword * 4 + 2].copy_from_slice(&half.to_le_bytes());
    }

    for (i, pair) in station.chunks_exact(2).enumerate() {
        let at = (39 + i) * 4;
        frame[at..at + 2].copy_from_slice(pair);
    }

    Some(SETUP_FRAME_LEN)
}
