//! Chip capability interface.
//!
//! The descriptor-ring engine is chip-neutral. Everything that differs between
//! MAC families (register layout, how the address filter is loaded, which
//! interrupts an overrun recovery re-arms) sits behind [`MacHardware`].

use crate::driver::config::{Duplex, Speed};
use crate::driver::error::IoResult;
use crate::driver::interrupt::{InterruptStatus, Interrupts};
use crate::internal::constants::{DEFAULT_POLL_RETRIES, MAC_ADDR_LEN};
use crate::internal::hash::encode_setup_frame;

/// DMA direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Receive
    Rx,
    /// Transmit
    Tx,
}

/// Multicast hash table width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HashWidth {
    /// 64 buckets, 6-bit index
    Bits64,
    /// 512 buckets, 9-bit index
    Bits512,
}

impl HashWidth {
    /// Number of buckets
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            HashWidth::Bits64 => 64,
            HashWidth::Bits512 => 512,
        }
    }

    /// Mask reducing a CRC to a bucket index
    #[must_use]
    pub const fn index_mask(self) -> u32 {
        self.bits() as u32 - 1
    }
}

/// How the chip accepts a new multicast hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterUpdate {
    /// Hash registers written directly
    Registers,
    /// A setup frame queued on the transmit ring while both DMAs are quiesced
    SetupFrame,
}

/// Per-family MAC and DMA control.
///
/// Methods never block except through bounded waits, and the ones the
/// interrupt path calls (`interrupt_status`, `clear_interrupts`,
/// `enable_interrupts`, `disable_interrupts`, `start`, `stop`, `is_stopped`,
/// `poll_demand`, `set_descriptor_base`, `flush_tx`) must be safe to call from
/// interrupt context.
pub trait MacHardware {
    /// Width of the multicast hash table
    const HASH_WIDTH: HashWidth;

    /// How the hash table reaches hardware
    const FILTER_UPDATE: FilterUpdate;

    /// Retry budget for every register wait
    const POLL_RETRIES: u32 = DEFAULT_POLL_RETRIES;

    /// Sources re-enabled once an Rx overrun has been recovered
    const RX_RECOVERY_INTERRUPTS: Interrupts = Interrupts::RX_READY.union(Interrupts::RX_OVERRUN);

    /// Software-reset the MAC and its DMA, waiting for completion
    fn reset(&mut self) -> IoResult<()>;

    /// Program the station address
    fn set_mac_address(&mut self, addr: &[u8; MAC_ADDR_LEN]);

    /// Program a descriptor ring base address
    fn set_descriptor_base(&mut self, dir: Direction, addr: usize);

    /// Start a DMA direction (and the matching MAC datapath)
    fn start(&mut self, dir: Direction);

    /// Request a DMA direction to stop; completion is observed via `is_stopped`
    fn stop(&mut self, dir: Direction);

    /// Whether a DMA direction reports stopped or suspended
    fn is_stopped(&self, dir: Direction) -> bool;

    /// Ask the DMA to re-read its current descriptor
    fn poll_demand(&mut self, dir: Direction);

    /// Flush the transmit FIFO, waiting for completion
    fn flush_tx(&mut self) -> IoResult<()>;

    /// Unmask interrupt sources
    fn enable_interrupts(&mut self, sources: Interrupts);

    /// Mask interrupt sources
    fn disable_interrupts(&mut self, sources: Interrupts);

    /// Enabled sources currently pending
    fn interrupt_status(&self) -> InterruptStatus;

    /// Acknowledge previously read sources
    fn clear_interrupts(&mut self, status: InterruptStatus);

    /// Apply negotiated link parameters to the MAC
    fn set_link(&mut self, speed: Speed, duplex: Duplex);

    /// Load the hash table; only called when `FILTER_UPDATE` is `Registers`
    fn write_hash_filter(&mut self, table: &[u32]);

    /// Encode the filter setup frame into `out`; returns its length.
    ///
    /// Only called when `FILTER_UPDATE` is `SetupFrame`.
    fn build_setup_frame(
        &self,
        mac: &[u8; MAC_ADDR_LEN],
        table: &[u32],
        out: &mut [u8],
    ) -> Option<usize> {
        encode_setup_frame(mac, table, out)
    }

    /// Reduce an address CRC to a hash bucket
    fn hash_index(&self, crc: u32) -> usize {
        (crc & Self::HASH_WIDTH.index_mask()) as usize
    }
}
