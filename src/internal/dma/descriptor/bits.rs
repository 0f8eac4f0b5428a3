//! DMA descriptor bit field constants.
//!
//! Normal (Tulip-compatible) descriptor format. Word 0 carries ownership and
//! status, word 1 carries buffer size and ring control. DesignWare cores
//! accept this layout when alternate descriptors are not selected.

#![allow(dead_code)]

// =============================================================================
// RDES0 (RX Descriptor Word 0) - Status
// =============================================================================

/// RX Descriptor Word 0 bit field constants
pub mod rdes0 {
    /// Zero - set by some cores for frames with a zero length/type field
    pub const ZERO: u32 = 1 << 0;
    /// CRC Error - frame has CRC error
    pub const CRC_ERR: u32 = 1 << 1;
    /// Dribbling Bit - frame contains non-integer multiple of 8 bits
    pub const DRIBBLE_ERR: u32 = 1 << 2;
    /// Receive Error - error reported by PHY (RX_ER signal)
    pub const RX_ERR: u32 = 1 << 3;
    /// Receive Watchdog - frame truncated due to watchdog
    pub const RX_WATCHDOG: u32 = 1 << 4;
    /// Frame Type - 1 = Ethernet frame (length/type > 0x600)
    pub const FRAME_TYPE: u32 = 1 << 5;
    /// Collision Seen - late collision on a half-duplex link
    pub const COLLISION_SEEN: u32 = 1 << 6;
    /// Frame Too Long - frame exceeds the maximum Ethernet length
    pub const TOO_LONG: u32 = 1 << 7;
    /// Last Descriptor - this is the last descriptor for the frame
    pub const LAST_DESC: u32 = 1 << 8;
    /// First Descriptor - this is the first descriptor for the frame
    pub const FIRST_DESC: u32 = 1 << 9;
    /// Multicast Frame - destination is a multicast address
    pub const MULTICAST: u32 = 1 << 10;
    /// Runt Frame - frame shorter than 64 bytes
    pub const RUNT: u32 = 1 << 11;
    /// Descriptor Error - frame truncated, no descriptor available
    pub const DESC_ERR: u32 = 1 << 14;
    /// Error Summary - logical OR of error bits
    pub const ERR_SUMMARY: u32 = 1 << 15;
    /// Frame Length shift (14 bits)
    pub const FRAME_LEN_SHIFT: u32 = 16;
    /// Frame Length mask
    pub const FRAME_LEN_MASK: u32 = 0x3FFF << 16;
    /// Filtering Fail - frame failed the destination address filter
    pub const FILTER_FAIL: u32 = 1 << 30;
    /// OWN - when set, descriptor owned by DMA; when clear, owned by CPU
    pub const OWN: u32 = 1 << 31;

    /// Error bits that do not map to a dedicated statistics counter
    pub const OTHER_ERRORS: u32 = DRIBBLE_ERR | RX_ERR | RX_WATCHDOG | COLLISION_SEEN | DESC_ERR;

    /// All bits that cause a frame to be discarded
    pub const ALL_ERRORS: u32 = CRC_ERR | RUNT | TOO_LONG | FILTER_FAIL | OTHER_ERRORS;
}

// =============================================================================
// RDES1 (RX Descriptor Word 1) - Control
// =============================================================================

/// RX Descriptor Word 1 bit field constants
pub mod rdes1 {
    /// RX Buffer 1 Size mask (11 bits)
    pub const BUFFER1_SIZE_MASK: u32 = 0x7FF;
    /// Second Address Chained - buffer2 contains next descriptor address
    pub const SECOND_ADDR_CHAINED: u32 = 1 << 24;
    /// Receive End of Ring - this is the last descriptor in the ring
    pub const RX_END_OF_RING: u32 = 1 << 25;
    /// Disable Interrupt on Completion
    pub const DISABLE_IRQ: u32 = 1 << 31;
}

// =============================================================================
// TDES0 (TX Descriptor Word 0) - Status
// =============================================================================

/// TX Descriptor Word 0 bit field constants
pub mod tdes0 {
    /// Deferred - frame transmission was deferred
    pub const DEFERRED: u32 = 1 << 0;
    /// Underflow Error - TX FIFO underflow during frame transmission
    pub const UNDERFLOW_ERR: u32 = 1 << 1;
    /// Link Fail - link was down when transmission started
    pub const LINK_FAIL: u32 = 1 << 2;
    /// Collision Count shift (4 bits)
    pub const COLLISION_COUNT_SHIFT: u32 = 3;
    /// Collision Count mask
    pub const COLLISION_COUNT_MASK: u32 = 0xF << 3;
    /// Excessive Collision - more than 16 collisions
    pub const EXCESSIVE_COLLISION: u32 = 1 << 8;
    /// Late Collision - collision after 64 byte times
    pub const LATE_COLLISION: u32 = 1 << 9;
    /// No Carrier - carrier sense signal not asserted
    pub const NO_CARRIER: u32 = 1 << 10;
    /// Loss of Carrier - carrier lost during transmission
    pub const LOSS_OF_CARRIER: u32 = 1 << 11;
    /// Jabber Timeout - transmission continued beyond 2048 bytes
    pub const JABBER_TIMEOUT: u32 = 1 << 14;
    /// Error Summary - logical OR of all error bits
    pub const ERR_SUMMARY: u32 = 1 << 15;
    /// OWN - when set, descriptor is owned by DMA; when clear, owned by CPU
    pub const OWN: u32 = 1 << 31;

    /// All possible TX error bits
    pub const ALL_ERRORS: u32 = UNDERFLOW_ERR
        | LINK_FAIL
        | EXCESSIVE_COLLISION
        | LATE_COLLISION
        | NO_CARRIER
        | LOSS_OF_CARRIER
        | JABBER_TIMEOUT;
}

// =============================================================================
// TDES1 (TX Descriptor Word 1) - Control
// =============================================================================

/// TX Descriptor Word 1 bit field constants
pub mod tdes1 {
    /// TX Buffer 1 Size mask (11 bits)
    pub const BUFFER1_SIZE_MASK: u32 = 0x7FF;
    /// Second Address Chained - buffer2 contains next descriptor address
    pub const SECOND_ADDR_CHAINED: u32 = 1 << 24;
    /// Transmit End of Ring - this is the last descriptor in the ring
    pub const TX_END_OF_RING: u32 = 1 << 25;
    /// Disable Padding - do not pad short frames
    pub const DISABLE_PAD: u32 = 1 << 23;
    /// Add CRC Disable - do not append CRC to frame
    pub const DISABLE_CRC: u32 = 1 << 26;
    /// Setup Packet - buffer holds an address filter setup frame
    pub const SETUP_FRAME: u32 = 1 << 27;
    /// First Segment - buffer contains first segment of frame
    pub const FIRST_SEGMENT: u32 = 1 << 29;
    /// Last Segment - buffer contains last segment of frame
    pub const LAST_SEGMENT: u32 = 1 << 30;
    /// Interrupt on Completion - generate interrupt when transmission complete
    pub const INTERRUPT_ON_COMPLETE: u32 = 1 << 31;

    /// Bits that survive a descriptor re-fill
    pub const RING_BITS: u32 = SECOND_ADDR_CHAINED | TX_END_OF_RING;
}
