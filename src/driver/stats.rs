//! Per-interface counters.
//!
//! Every counter wraps on overflow. Transient errors only ever show up here;
//! they never fail the interface.

use crate::internal::dma::RxErrorKind;

/// Driver statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics {
    /// Frames handed to the stack
    pub rx_frames: u32,
    /// Frames queued for transmission
    pub tx_frames: u32,
    /// Frames discarded with a CRC error
    pub rx_crc_errors: u32,
    /// Runt frames discarded
    pub rx_runt_frames: u32,
    /// Oversize frames discarded
    pub rx_oversize_frames: u32,
    /// Frames discarded by the address filter
    pub rx_filter_mismatch: u32,
    /// Frames discarded for any other receive error
    pub rx_other_errors: u32,
    /// Good frames dropped because the pool had no replacement buffer
    pub rx_dropped_no_buffer: u32,
    /// Receive overruns recovered
    pub rx_overruns: u32,
    /// Transmit underruns recovered
    pub tx_underruns: u32,
    /// Fatal bus errors recovered
    pub bus_errors: u32,
    /// Recoveries skipped because a DMA did not stop
    pub recovery_timeouts: u32,
    /// Transmit attempts refused with back-pressure
    pub tx_busy: u32,
    /// Transmit descriptors completed with error bits set
    pub tx_errors: u32,
    /// Multicast filter reloads
    pub filter_updates: u32,
}

impl Statistics {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            rx_frames: 0,
            tx_frames: 0,
            rx_crc_errors: 0,
            rx_runt_frames: 0,
            rx_oversize_frames: 0,
            rx_filter_mismatch: 0,
            rx_other_errors: 0,
            rx_dropped_no_buffer: 0,
            rx_overruns: 0,
            tx_underruns: 0,
            bus_errors: 0,
            recovery_timeouts: 0,
            tx_busy: 0,
            tx_errors: 0,
            filter_updates: 0,
        }
    }

    /// Sum of the per-kind receive error counters
    pub const fn rx_errors(&self) -> u32 {
        self.rx_crc_errors
            .wrapping_add(self.rx_runt_frames)
            .wrapping_add(self.rx_oversize_frames)
            .wrapping_add(self.rx_filter_mismatch)
            .wrapping_add(self.rx_other_errors)
    }

    pub(crate) fn record_rx_error(&mut self, kind: RxErrorKind) {
        let counter = match kind {
            RxErrorKind::Crc => &mut self.rx_crc_errors,
            RxErrorKind::Runt => &mut self.rx_runt_frames,
            RxErrorKind::Oversize => &mut self.rx_oversize_frames,
            RxErrorKind::FilterMismatch => &mut self.rx_filter_mismatch,
            RxErrorKind::Other => &mut self.rx_other_errors,
        };
        bump(counter);
    }
}

#[inline]
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}
