//! RX DMA descriptor for frame reception.

use super::bits::{rdes0, rdes1};
use super::{VolatileCell, acquire_fence, publish_fence};
use crate::internal::constants::CRC_SIZE;

/// Why a completed receive descriptor was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxErrorKind {
    /// Frame check sequence mismatch
    Crc,
    /// Frame shorter than the Ethernet minimum
    Runt,
    /// Frame longer than the Ethernet maximum
    Oversize,
    /// Frame failed the destination address filter
    FilterMismatch,
    /// Any other receive error, including frames spread over several descriptors
    Other,
}

/// Decoded word 0 of a descriptor the DMA has handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxStatus {
    /// A complete, error-free frame; length includes the FCS
    Frame {
        /// Bytes written by the DMA
        len: usize,
    },
    /// A frame to discard
    Error(RxErrorKind),
}

impl RxStatus {
    /// Classify a raw RDES0 value
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        if raw & rdes0::FILTER_FAIL != 0 {
            return Self::Error(RxErrorKind::FilterMismatch);
        }
        if raw & rdes0::CRC_ERR != 0 {
            return Self::Error(RxErrorKind::Crc);
        }
        if raw & rdes0::RUNT != 0 {
            return Self::Error(RxErrorKind::Runt);
        }
        if raw & rdes0::TOO_LONG != 0 {
            return Self::Error(RxErrorKind::Oversize);
        }
        if raw & (rdes0::OTHER_ERRORS | rdes0::ERR_SUMMARY) != 0 {
            return Self::Error(RxErrorKind::Other);
        }

        let single = rdes0::FIRST_DESC | rdes0::LAST_DESC;
        if raw & single != single {
            return Self::Error(RxErrorKind::Other);
        }

        let len = ((raw & rdes0::FRAME_LEN_MASK) >> rdes0::FRAME_LEN_SHIFT) as usize;
        if len <= CRC_SIZE {
            return Self::Error(RxErrorKind::Runt);
        }
        Self::Frame { len }
    }
}

/// RX DMA descriptor.
#[repr(C, align(4))]
pub struct RxDescriptor {
    /// RDES0: Ownership and status
    rdes0: VolatileCell<u32>,
    /// RDES1: Buffer size and ring control
    rdes1: VolatileCell<u32>,
    /// RDES2: Buffer address the DMA writes to
    buffer_addr: VolatileCell<usize>,
    /// RDES3: Next descriptor address (chained mode)
    next_desc: VolatileCell<usize>,
}

#[allow(dead_code)]
impl RxDescriptor {
    /// Size of the descriptor in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Create a new zeroed, software-owned RX descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rdes0: VolatileCell::new(0),
            rdes1: VolatileCell::new(0),
            buffer_addr: VolatileCell::new(0),
            next_desc: VolatileCell::new(0),
        }
    }

    /// Bind a buffer and chain link, then hand the descriptor to the DMA.
    pub fn setup_chained(
        &self,
        buffer_addr: usize,
        size: usize,
        next_desc: *const RxDescriptor,
        end_of_ring: bool,
    ) {
        let mut ctrl = ((size as u32) & rdes1::BUFFER1_SIZE_MASK) | rdes1::SECOND_ADDR_CHAINED;
        if end_of_ring {
            ctrl |= rdes1::RX_END_OF_RING;
        }
        self.buffer_addr.set(buffer_addr);
        self.next_desc.set(next_desc as usize);
        self.rdes1.set(ctrl);
        self.give_to_dma();
    }

    /// Check if descriptor is owned by DMA.
    #[inline(always)]
    #[must_use]
    pub fn is_owned(&self) -> bool {
        (self.rdes0.get() & rdes0::OWN) != 0
    }

    /// Clear status and return the descriptor to the DMA.
    #[inline(always)]
    pub fn give_to_dma(&self) {
        publish_fence();
        self.rdes0.set(rdes0::OWN);
    }

    /// Decode the completion status. Only meaningful while software-owned.
    #[must_use]
    pub fn status(&self) -> RxStatus {
        let raw = self.rdes0.get();
        acquire_fence();
        RxStatus::from_raw(raw)
    }

    /// Point the descriptor at a different buffer. Caller must own it.
    #[inline(always)]
    pub fn set_buffer_addr(&self, addr: usize) {
        self.buffer_addr.set(addr);
    }

    /// Get buffer address.
    #[inline(always)]
    #[must_use]
    pub fn buffer_addr(&self) -> usize {
        self.buffer_addr.get()
    }

    /// Get next descriptor address in chained mode.
    #[inline(always)]
    #[must_use]
    pub fn next_desc_addr(&self) -> usize {
        self.next_desc.get()
    }

    /// Get the programmed buffer size.
    #[inline(always)]
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        (self.rdes1.get() & rdes1::BUFFER1_SIZE_MASK) as usize
    }

    /// Check whether this is the last descriptor of the ring.
    #[inline(always)]
    #[must_use]
    pub fn is_end_of_ring(&self) -> bool {
        (self.rdes1.get() & rdes1::RX_END_OF_RING) != 0
    }

    /// Take the descriptor back from the DMA and unbind its buffer.
    pub fn clear(&self) {
        self.rdes0.set(0);
        self.buffer_addr.set(0);
    }

    /// Get raw RDES0 value for debugging.
    #[inline(always)]
    #[must_use]
    pub fn raw_rdes0(&self) -> u32 {
        self.rdes0.get()
    }

    /// Overwrite RDES0, as the DMA does on completion.
    #[cfg(test)]
    pub fn set_raw_rdes0(&self, value: u32) {
        self.rdes0.set(value);
    }
}

impl Default for RxDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: RxDescriptor uses volatile cells for all DMA-accessed fields
unsafe impl Sync for RxDescriptor {}
unsafe impl Send for RxDescriptor {}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(len: usize, extra: u32) -> u32 {
        ((len as u32) << rdes0::FRAME_LEN_SHIFT) | rdes0::FIRST_DESC | rdes0::LAST_DESC | extra
    }

    #[test]
    fn rx_descriptor_const_size() {
        assert_eq!(RxDescriptor::SIZE, core::mem::size_of::<RxDescriptor>());
        assert_eq!(RxDescriptor::SIZE, 2 * 4 + 2 * core::mem::size_of::<usize>());
    }

    #[test]
    fn new_descriptor_is_software_owned() {
        let desc = RxDescriptor::new();
        assert!(!desc.is_owned());
        assert_eq!(desc.buffer_addr(), 0);
    }

    #[test]
    fn setup_chained_hands_to_dma() {
        let desc = RxDescriptor::new();
        let next = RxDescriptor::new();
        desc.setup_chained(0x1000, 1536, &next, false);

        assert!(desc.is_owned());
        assert_eq!(desc.buffer_addr(), 0x1000);
        assert_eq!(desc.next_desc_addr(), &next as *const _ as usize);
        assert_eq!(desc.buffer_size(), 1536);
        assert!(!desc.is_end_of_ring());
    }

    #[test]
    fn setup_chained_marks_ring_end() {
        let desc = RxDescriptor::new();
        desc.setup_chained(0x2000, 1536, &desc, true);
        assert!(desc.is_end_of_ring());
    }

    #[test]
    fn give_to_dma_clears_status() {
        let desc = RxDescriptor::new();
        desc.set_raw_rdes0(completed(64, rdes0::CRC_ERR));
        desc.give_to_dma();
        assert_eq!(desc.raw_rdes0(), rdes0::OWN);
    }

    #[test]
    fn clear_unbinds_buffer() {
        let desc = RxDescriptor::new();
        desc.setup_chained(0x1000, 1536, &desc, true);
        desc.clear();
        assert!(!desc.is_owned());
        assert_eq!(desc.buffer_addr(), 0);
    }

    #[test]
    fn status_good_frame() {
        assert_eq!(
            RxStatus::from_raw(completed(64, 0)),
            RxStatus::Frame { len: 64 }
        );
    }

    #[test]
    fn status_error_kinds() {
        assert_eq!(
            RxStatus::from_raw(completed(64, rdes0::CRC_ERR | rdes0::ERR_SUMMARY)),
            RxStatus::Error(RxErrorKind::Crc)
        );
        assert_eq!(
            RxStatus::from_raw(completed(20, rdes0::RUNT | rdes0::ERR_SUMMARY)),
            RxStatus::Error(RxErrorKind::Runt)
        );
        assert_eq!(
            RxStatus::from_raw(completed(1600, rdes0::TOO_LONG)),
            RxStatus::Error(RxErrorKind::Oversize)
        );
        assert_eq!(
            RxStatus::from_raw(completed(64, rdes0::FILTER_FAIL)),
            RxStatus::Error(RxErrorKind::FilterMismatch)
        );
        assert_eq!(
            RxStatus::from_raw(completed(64, rdes0::DESC_ERR | rdes0::ERR_SUMMARY)),
            RxStatus::Error(RxErrorKind::Other)
        );
    }

    #[test]
    fn status_multi_descriptor_frame_is_discarded() {
        let raw = (64 << rdes0::FRAME_LEN_SHIFT) | rdes0::FIRST_DESC;
        assert_eq!(RxStatus::from_raw(raw), RxStatus::Error(RxErrorKind::Other));
    }

    #[test]
    fn status_length_not_above_fcs_is_runt() {
        assert_eq!(
            RxStatus::from_raw(completed(CRC_SIZE, 0)),
            RxStatus::Error(RxErrorKind::Runt)
        );
    }
}
