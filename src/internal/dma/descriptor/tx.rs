//! TX DMA descriptor for frame transmission.

use super::bits::{tdes0, tdes1};
use super::{VolatileCell, acquire_fence, publish_fence};

/// TX DMA descriptor.
#[repr(C, align(4))]
pub struct TxDescriptor {
    /// TDES0: Ownership and completion status
    tdes0: VolatileCell<u32>,
    /// TDES1: Buffer size, segment flags, and ring control
    tdes1: VolatileCell<u32>,
    /// TDES2: Buffer address the DMA reads from
    buffer_addr: VolatileCell<usize>,
    /// TDES3: Next descriptor address (chained mode)
    next_desc: VolatileCell<usize>,
}

#[allow(dead_code)]
impl TxDescriptor {
    /// Size of the descriptor in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Create a new zeroed TX descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tdes0: VolatileCell::new(0),
            tdes1: VolatileCell::new(0),
            buffer_addr: VolatileCell::new(0),
            next_desc: VolatileCell::new(0),
        }
    }

    /// Initialize an empty, software-owned descriptor for chained mode.
    pub fn setup_chained(&self, next_desc: *const TxDescriptor, end_of_ring: bool) {
        let mut ctrl = tdes1::SECOND_ADDR_CHAINED;
        if end_of_ring {
            ctrl |= tdes1::TX_END_OF_RING;
        }
        self.tdes0.set(0);
        self.buffer_addr.set(0);
        self.next_desc.set(next_desc as usize);
        self.tdes1.set(ctrl);
    }

    /// Check if descriptor is owned by DMA.
    #[inline(always)]
    #[must_use]
    pub fn is_owned(&self) -> bool {
        (self.tdes0.get() & tdes0::OWN) != 0
    }

    /// Fill with a single-segment frame and hand it to the DMA.
    pub fn submit(&self, buffer_addr: usize, len: usize) {
        self.fill(
            buffer_addr,
            len,
            tdes1::FIRST_SEGMENT | tdes1::LAST_SEGMENT | tdes1::INTERRUPT_ON_COMPLETE,
        );
    }

    /// Fill with an address filter setup frame and hand it to the DMA.
    pub fn submit_setup(&self, buffer_addr: usize, len: usize) {
        self.fill(
            buffer_addr,
            len,
            tdes1::SETUP_FRAME | tdes1::INTERRUPT_ON_COMPLETE,
        );
    }

    fn fill(&self, buffer_addr: usize, len: usize, flags: u32) {
        let ring = self.tdes1.get() & tdes1::RING_BITS;
        self.buffer_addr.set(buffer_addr);
        self.tdes1
            .set(ring | flags | ((len as u32) & tdes1::BUFFER1_SIZE_MASK));
        publish_fence();
        self.tdes0.set(tdes0::OWN);
    }

    /// Take the descriptor back (completed or abandoned) and unbind its buffer.
    pub fn release(&self) {
        acquire_fence();
        self.tdes0.set(0);
        self.buffer_addr.set(0);
        self.tdes1.update(|v| v & tdes1::RING_BITS);
    }

    /// Check if transmission had errors.
    #[inline(always)]
    #[must_use]
    pub fn has_error(&self) -> bool {
        (self.tdes0.get() & tdes0::ERR_SUMMARY) != 0
    }

    /// Get all error flags from TDES0.
    #[inline(always)]
    #[must_use]
    pub fn error_flags(&self) -> u32 {
        self.tdes0.get() & tdes0::ALL_ERRORS
    }

    /// Check if the frame hit a FIFO underflow.
    #[inline(always)]
    #[must_use]
    pub fn is_underflow(&self) -> bool {
        (self.tdes0.get() & tdes0::UNDERFLOW_ERR) != 0
    }

    /// Check whether the descriptor carries a setup frame.
    #[inline(always)]
    #[must_use]
    pub fn is_setup_frame(&self) -> bool {
        (self.tdes1.get() & tdes1::SETUP_FRAME) != 0
    }

    /// Get the programmed frame length.
    #[inline(always)]
    #[must_use]
    pub fn frame_len(&self) -> usize {
        (self.tdes1.get() & tdes1::BUFFER1_SIZE_MASK) as usize
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

    /// Check whether this is the last descriptor of the ring.
    #[inline(always)]
    #[must_use]
    pub fn is_end_of_ring(&self) -> bool {
        (self.tdes1.get() & tdes1::TX_END_OF_RING) != 0
    }

    /// Get raw TDES0 value for debugging.
    #[inline(always)]
    #[must_use]
    pub fn raw_tdes0(&self) -> u32 {
        self.tdes0.get()
    }

    /// Get raw TDES1 value for debugging.
    #[inline(always)]
    #[must_use]
    pub fn raw_tdes1(&self) -> u32 {
        self.tdes1.get()
    }

    /// Overwrite TDES0, as the DMA does on completion.
    #[cfg(test)]
    pub fn set_raw_tdes0(&self, value: u32) {
        self.tdes0.set(value);
    }
}

impl Default for TxDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: TxDescriptor uses volatile cells for all DMA-accessed fields
unsafe impl Sync for TxDescriptor {}
unsafe impl Send for TxDescriptor {}
