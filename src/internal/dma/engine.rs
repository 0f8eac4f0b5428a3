//! DMA engine managing the TX/RX descriptor rings and the buffers bound to them.
//!
//! The engine owns descriptor memory only. Frame buffers are borrowed from the
//! host stack's pool: every RX descriptor holds one pool buffer for as long as
//! the ring is allocated, and every in-flight TX descriptor holds a buffer the
//! stack submitted until completion hands it to the deallocation queue.

use super::descriptor::{RxDescriptor, RxErrorKind, RxStatus, TxDescriptor};
use super::ring::{DescriptorRing, wrap_next};
use crate::driver::error::{DmaError, DmaResult};
use crate::internal::constants::CRC_SIZE;
use crate::stack::{BufferPool, BufferPtr, Frame};

#[cfg(feature = "log")]
use log::warn;

#[cfg(feature = "log")]
fn log_rx_error(desc: &RxDescriptor, kind: RxErrorKind) {
    warn!(
        "RX frame discarded: rdes0=0x{:08x} kind={:?}",
        desc.raw_rdes0(),
        kind
    );
}

/// Result of examining the RX descriptor at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxPoll {
    /// The DMA still owns the descriptor
    Empty,
    /// A good frame; its buffer now belongs to the caller
    Frame(Frame),
    /// An errored frame was discarded and its descriptor re-armed
    Discarded(RxErrorKind),
    /// A good frame was dropped because the pool had no replacement buffer
    Dropped,
}

/// What the receive path must do after consuming a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxFollowup {
    /// No frame is pending: re-enable the RX-ready interrupt
    EnableInterrupt,
    /// A frame is pending that nobody has been told about: signal now
    Signal,
    /// Pending frames are already covered by earlier signals
    Nothing,
}

/// A TX descriptor taken back from the DMA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxCompletion {
    /// Buffer the descriptor carried
    pub buffer: Option<BufferPtr>,
    /// TDES0 error bits; zero for a clean completion or an abandoned frame
    pub error_flags: u32,
    /// The descriptor carried a filter setup frame
    pub setup: bool,
}

/// DMA Engine with const-generic ring sizes.
///
/// # Type Parameters
/// * `RX_BUFS` - Number of receive descriptors
/// * `TX_BUFS` - Number of transmit descriptors
pub struct DmaEngine<const RX_BUFS: usize, const TX_BUFS: usize> {
    /// RX descriptor ring; `current` is the next descriptor the DMA completes
    rx_ring: DescriptorRing<RxDescriptor, RX_BUFS>,
    /// TX descriptor ring; `current` is the producer cursor
    tx_ring: DescriptorRing<TxDescriptor, TX_BUFS>,
    /// Pool buffer bound to each RX descriptor
    rx_slots: [Option<BufferPtr>; RX_BUFS],
    /// Buffer carried by each in-flight TX descriptor
    tx_slots: [Option<BufferPtr>; TX_BUFS],
    /// Oldest TX descriptor not yet reclaimed
    tx_completion: usize,
    /// Descriptors between `tx_completion` and the producer
    tx_in_flight: usize,
    /// Completed RX descriptors the task has already been signalled for
    rx_signaled: usize,
    /// Size requested from the pool for each RX buffer
    buffer_size: usize,
    /// Bytes between a pool buffer's start and the DMA write address
    rx_offset: usize,
    /// Whether the rings currently hold pool buffers
    allocated: bool,
}

impl<const RX_BUFS: usize, const TX_BUFS: usize> DmaEngine<RX_BUFS, TX_BUFS> {
    /// Create an unallocated engine. Const-compatible.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx_ring: DescriptorRing {
                descriptors: [const { RxDescriptor::new() }; RX_BUFS],
                current: 0,
            },
            tx_ring: DescriptorRing {
                descriptors: [const { TxDescriptor::new() }; TX_BUFS],
                current: 0,
            },
            rx_slots: [None; RX_BUFS],
            tx_slots: [None; TX_BUFS],
            tx_completion: 0,
            tx_in_flight: 0,
            rx_signaled: 0,
            buffer_size: 0,
            rx_offset: 0,
            allocated: false,
        }
    }

    /// Descriptor memory in bytes (buffers live in the stack's pool).
    #[must_use]
    pub const fn memory_usage() -> usize {
        RX_BUFS * RxDescriptor::SIZE + TX_BUFS * TxDescriptor::SIZE
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Bind a pool buffer to every RX descriptor and link both rings.
    ///
    /// RX descriptors end up DMA-owned, TX descriptors software-owned and
    /// empty. On pool exhaustion every buffer taken so far is returned and
    /// the engine stays unallocated.
    pub fn allocate<P: BufferPool + ?Sized>(
        &mut self,
        pool: &P,
        buffer_size: usize,
        rx_offset: usize,
    ) -> DmaResult<()> {
        if self.allocated {
            return Ok(());
        }

        for i in 0..RX_BUFS {
            match pool.get_buffer(buffer_size) {
                Some(buffer) => self.rx_slots[i] = Some(buffer),
                None => {
                    for slot in self.rx_slots.iter_mut() {
                        if let Some(buffer) = slot.take() {
                            pool.free_buffer(buffer);
                        }
                    }
                    return Err(DmaError::OutOfMemory);
                }
            }
        }

        self.buffer_size = buffer_size;
        self.rx_offset = rx_offset;
        let dma_len = buffer_size.saturating_sub(rx_offset);

        for i in 0..RX_BUFS {
            let next = self.rx_ring.addr_of(wrap_next(i, RX_BUFS));
            let addr = self.rx_slots[i].map_or(0, |b| b.addr() + rx_offset);
            self.rx_ring.descriptors[i].setup_chained(addr, dma_len, next, i == RX_BUFS - 1);
        }

        for i in 0..TX_BUFS {
            let next = self.tx_ring.addr_of(wrap_next(i, TX_BUFS));
            self.tx_ring.descriptors[i].setup_chained(next, i == TX_BUFS - 1);
            self.tx_slots[i] = None;
        }

        self.rx_ring.reset();
        self.tx_ring.reset();
        self.tx_completion = 0;
        self.tx_in_flight = 0;
        self.rx_signaled = 0;
        self.allocated = true;
        Ok(())
    }

    /// Return every RX buffer to the pool and unbind the descriptors.
    ///
    /// Buffers already handed to the stack inside a [`Frame`] are not
    /// referenced by any slot, so they are never freed twice.
    pub fn free_rx<P: BufferPool + ?Sized>(&mut self, pool: &P) {
        for (slot, desc) in self.rx_slots.iter_mut().zip(self.rx_ring.iter()) {
            desc.clear();
            if let Some(buffer) = slot.take() {
                pool.free_buffer(buffer);
            }
        }
        self.rx_ring.reset();
        self.rx_signaled = 0;
        self.allocated = false;
    }

    /// Re-arm every RX descriptor with the buffer it already holds.
    ///
    /// Used after an overrun, when the DMA may have left descriptors in an
    /// inconsistent state. The cursor restarts at the ring base.
    pub fn reset_rx(&mut self) {
        for (slot, desc) in self.rx_slots.iter().zip(self.rx_ring.iter()) {
            if let Some(buffer) = slot {
                desc.set_buffer_addr(buffer.addr() + self.rx_offset);
                desc.give_to_dma();
            }
        }
        self.rx_ring.reset();
        self.rx_signaled = 0;
    }

    /// Whether the rings currently hold pool buffers
    #[inline(always)]
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// RX ring base address for the DMA
    #[inline(always)]
    pub fn rx_base(&self) -> usize {
        self.rx_ring.base_addr()
    }

    /// TX ring base address for the DMA
    #[inline(always)]
    pub fn tx_base(&self) -> usize {
        self.tx_ring.base_addr()
    }

    // =========================================================================
    // Receive
    // =========================================================================

    /// Check if the descriptor at the cursor has been completed by the DMA.
    pub fn rx_pending(&self) -> bool {
        self.allocated && !self.rx_ring.current().is_owned()
    }

    /// Count completed descriptors from the cursor up to the first DMA-owned one.
    pub fn rx_ready_count(&self) -> usize {
        if !self.allocated {
            return 0;
        }
        (0..RX_BUFS)
            .take_while(|&i| !self.rx_ring.at_offset(i).is_owned())
            .count()
    }

    /// Examine the descriptor at the cursor and consume it if completed.
    ///
    /// A good frame only leaves the ring once a replacement buffer has been
    /// bound, so no DMA-owned descriptor ever points at a buffer the stack holds.
    pub fn poll_rx<P: BufferPool + ?Sized>(&mut self, pool: &P) -> RxPoll {
        if !self.rx_pending() {
            return RxPoll::Empty;
        }

        let index = self.rx_ring.current_index();
        let desc = self.rx_ring.current();

        let outcome = match desc.status() {
            RxStatus::Error(kind) => {
                #[cfg(feature = "log")]
                log_rx_error(desc, kind);
                desc.give_to_dma();
                RxPoll::Discarded(kind)
            }
            RxStatus::Frame { len } => match pool.get_buffer(self.buffer_size) {
                None => {
                    desc.give_to_dma();
                    RxPoll::Dropped
                }
                Some(fresh) => match self.rx_slots[index].replace(fresh) {
                    Some(buffer) => {
                        desc.set_buffer_addr(fresh.addr() + self.rx_offset);
                        desc.give_to_dma();
                        RxPoll::Frame(Frame {
                            buffer,
                            offset: self.rx_offset,
                            len: len - CRC_SIZE,
                        })
                    }
                    None => {
                        desc.set_buffer_addr(fresh.addr() + self.rx_offset);
                        desc.give_to_dma();
                        RxPoll::Dropped
                    }
                },
            },
        };

        self.rx_ring.advance();
        self.rx_signaled = self.rx_signaled.saturating_sub(1);
        outcome
    }

    /// Decide how to keep the receive task informed after consuming a descriptor.
    pub fn rx_followup(&mut self) -> RxFollowup {
        if !self.rx_pending() {
            self.rx_signaled = 0;
            RxFollowup::EnableInterrupt
        } else if self.rx_signaled == 0 {
            self.rx_signaled = 1;
            RxFollowup::Signal
        } else {
            RxFollowup::Nothing
        }
    }

    /// Number of newly completed descriptors nobody has signalled yet.
    ///
    /// The returned count is recorded as signalled.
    pub fn take_rx_signal_delta(&mut self) -> usize {
        let ready = self.rx_ready_count();
        let delta = ready.saturating_sub(self.rx_signaled);
        self.rx_signaled += delta;
        delta
    }

    /// Completed descriptors already signalled but not yet consumed
    #[inline(always)]
    pub fn rx_signaled(&self) -> usize {
        self.rx_signaled
    }

    /// RX cursor
    #[inline(always)]
    pub fn rx_current(&self) -> usize {
        self.rx_ring.current_index()
    }

    // =========================================================================
    // Transmit
    // =========================================================================

    /// Check whether the producer descriptor can take a frame.
    pub fn tx_ready(&self) -> bool {
        self.allocated && self.tx_in_flight < TX_BUFS && !self.tx_ring.current().is_owned()
    }

    /// Free TX descriptors
    pub fn tx_available(&self) -> usize {
        if self.allocated {
            TX_BUFS - self.tx_in_flight
        } else {
            0
        }
    }

    /// Queue one single-segment frame. Returns the descriptor index used.
    ///
    /// Ring state is untouched on error.
    pub fn transmit(&mut self, buffer: BufferPtr, len: usize) -> DmaResult<usize> {
        if len == 0 || len > self.buffer_size {
            return Err(DmaError::InvalidLength);
        }
        self.push(buffer, len, false)
    }

    /// Queue an address-filter setup frame. Returns the descriptor index used.
    pub fn submit_setup(&mut self, buffer: BufferPtr, len: usize) -> DmaResult<usize> {
        self.push(buffer, len, true)
    }

    fn push(&mut self, buffer: BufferPtr, len: usize, setup: bool) -> DmaResult<usize> {
        if !self.tx_ready() {
            return Err(DmaError::TxBusy);
        }

        let index = self.tx_ring.current_index();
        let desc = self.tx_ring.current();
        self.tx_slots[index] = Some(buffer);
        if setup {
            desc.submit_setup(buffer.addr(), len);
        } else {
            desc.submit(buffer.addr(), len);
        }

        self.tx_ring.advance();
        self.tx_in_flight += 1;
        Ok(index)
    }

    /// Check if the DMA still owns the TX descriptor at `index`.
    pub fn tx_owned(&self, index: usize) -> bool {
        self.tx_ring.get(index).is_owned()
    }

    /// Reclaim descriptors the DMA has finished with, oldest first.
    ///
    /// Stops at the first DMA-owned descriptor or once nothing is in flight.
    /// Returns the number reclaimed.
    pub fn reclaim_tx<F>(&mut self, mut on_complete: F) -> usize
    where
        F: FnMut(TxCompletion),
    {
        let mut reclaimed = 0;
        while self.tx_in_flight > 0 {
            let desc = self.tx_ring.get(self.tx_completion);
            if desc.is_owned() {
                break;
            }

            let completion = TxCompletion {
                buffer: self.tx_slots[self.tx_completion].take(),
                error_flags: if desc.has_error() { desc.error_flags() } else { 0 },
                setup: desc.is_setup_frame(),
            };
            desc.release();

            self.tx_completion = wrap_next(self.tx_completion, TX_BUFS);
            self.tx_in_flight -= 1;
            reclaimed += 1;
            on_complete(completion);
        }
        reclaimed
    }

    /// Take back every in-flight descriptor regardless of ownership.
    ///
    /// Only valid while the TX DMA is stopped. Both cursors restart at the
    /// ring base, matching a DMA restarted from its base address.
    pub fn drain_tx<F>(&mut self, mut on_drained: F) -> usize
    where
        F: FnMut(TxCompletion),
    {
        let mut drained = 0;
        while self.tx_in_flight > 0 {
            let desc = self.tx_ring.get(self.tx_completion);
            let completion = TxCompletion {
                buffer: self.tx_slots[self.tx_completion].take(),
                error_flags: 0,
                setup: desc.is_setup_frame(),
            };
            desc.release();

            self.tx_completion = wrap_next(self.tx_completion, TX_BUFS);
            self.tx_in_flight -= 1;
            drained += 1;
            on_drained(completion);
        }

        for desc in self.tx_ring.iter() {
            desc.release();
        }
        self.tx_ring.reset();
        self.tx_completion = 0;
        drained
    }

    /// TX producer cursor
    #[inline(always)]
    pub fn tx_producer(&self) -> usize {
        self.tx_ring.current_index()
    }

    /// TX completion cursor
    #[inline(always)]
    pub fn tx_completion(&self) -> usize {
        self.tx_completion
    }

    /// Descriptors submitted but not yet reclaimed
    #[inline(always)]
    pub fn tx_in_flight(&self) -> usize {
        self.tx_in_flight
    }

    /// RX descriptor at `index`, for inspection
    #[cfg(test)]
    pub fn rx_descriptor(&self, index: usize) -> &RxDescriptor {
        self.rx_ring.get(index)
    }

    /// TX descriptor at `index`, for inspection
    #[cfg(test)]
    pub fn tx_descriptor(&self, index: usize) -> &TxDescriptor {
        self.tx_ring.get(index)
    }

    /// Pool buffer bound to RX slot `index`
    #[cfg(test)]
    pub fn rx_slot(&self, index: usize) -> Option<BufferPtr> {
        self.rx_slots[index % RX_BUFS]
    }
}

impl<const RX_BUFS: usize, const TX_BUFS: usize> Default for DmaEngine<RX_BUFS, TX_BUFS> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
