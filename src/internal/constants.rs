//! Centralized Constants
//!
//! Single source of truth for the frame geometry, ring defaults, wait bounds,
//! and filter dimensions used across the engine.
//!
//! Register bit definitions stay with the chip profile that owns them
//! (`hal/dwmac.rs`), and descriptor bits live in `internal/dma/descriptor/bits.rs`.

// =============================================================================
// Frame and Buffer Sizes
// =============================================================================

/// Maximum Ethernet frame size including VLAN tag (1500 + 14 header + 4 CRC + 4 VLAN)
pub const MAX_FRAME_SIZE: usize = 1522;

/// Standard Ethernet MTU (Maximum Transmission Unit)
pub const MTU: usize = 1500;

/// CRC/FCS size at end of frame
pub const CRC_SIZE: usize = 4;

/// Minimum Ethernet frame size (excluding CRC)
pub const MIN_FRAME_SIZE: usize = 60;

/// Default pool buffer size handed to each descriptor
pub const DEFAULT_BUFFER_SIZE: usize = 1536;

/// Default buffer alignment in bytes
pub const DEFAULT_BUFFER_ALIGNMENT: usize = 4;

/// Largest length a descriptor's 11-bit buffer-size field can describe
pub const MAX_DESC_BUFFER_SIZE: usize = 2047;

// =============================================================================
// Default Ring Sizes
// =============================================================================

/// Default number of receive descriptors
pub const DEFAULT_RX_BUFFERS: usize = 10;

/// Default number of transmit descriptors
pub const DEFAULT_TX_BUFFERS: usize = 10;

/// Smallest ring the engine accepts
pub const MIN_RING_SIZE: usize = 2;

// =============================================================================
// Wait Bounds
// =============================================================================

/// Default iteration budget for every register wait loop
pub const DEFAULT_POLL_RETRIES: u32 = 0xFFFF;

// =============================================================================
// MDIO/MDC (IEEE 802.3 Clause 22)
// =============================================================================

/// Maximum MDC clock frequency per IEEE 802.3 (2.5 MHz)
pub const MDIO_MAX_FREQ_HZ: u32 = 2_500_000;

/// Number of preamble bits clocked before each management frame
pub const MDIO_PREAMBLE_BITS: u32 = 32;

/// Maximum valid PHY address (5-bit field)
pub const MAX_PHY_ADDR: u8 = 31;

/// Maximum valid register address (5-bit field)
pub const MAX_REG_ADDR: u8 = 31;

// =============================================================================
// Address Filtering
// =============================================================================

/// MAC address length in bytes
pub const MAC_ADDR_LEN: usize = 6;

/// Default locally-administered MAC address
pub const DEFAULT_MAC_ADDR: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Largest supported hash table, in bits
pub const MAX_HASH_BITS: usize = 512;

/// Length of a filter setup frame in bytes
pub const SETUP_FRAME_LEN: usize = 192;
