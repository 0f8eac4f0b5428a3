//! Multicast hash filtering.
//!
//! This module extends [`Emac`] with reference-counted multicast membership.
//! Each group address hashes to one bucket of the chip's hash table; the
//! hardware is only reprogrammed when a bucket goes from unused to used or
//! back, so colliding groups share a bit without disturbing each other.
//!
//! # Filter Loading
//!
//! Chips with hash registers take the new table directly. Chips without them
//! only accept a setup frame sent down the transmit ring, which needs both
//! DMAs quiesced so no ordinary frame can interleave with it.

use super::config::State;
use super::emac::Emac;
use super::error::{DmaError, Error, IoError, Result};
use super::stats::bump;
use crate::hal::chip::{Direction, FilterUpdate, MacHardware};
use crate::hal::mdio::MdioBus;
use crate::hal::wait::poll_until;
use crate::internal::hash::crc32_le;
use crate::stack::{BufferPtr, NetStack};

impl<H, S, M, const RX_BUFS: usize, const TX_BUFS: usize> Emac<H, S, M, RX_BUFS, TX_BUFS>
where
    H: MacHardware,
    S: NetStack,
    M: MdioBus,
{
    /// Join a multicast group.
    ///
    /// # Errors
    /// - `InvalidState` - not running
    /// - `OutOfMemory` - no buffer for the setup frame
    /// - `Timeout` - the DMAs did not quiesce or the setup frame never completed
    /// - `RefCountOverflow` - the bucket is already referenced `u16::MAX` times
    ///
    /// On error the membership is not recorded, with one exception: if a
    /// setup frame timed out and the transmit DMA then refused to stop, the
    /// frame stays queued and the membership is kept to match what the
    /// hardware will eventually load.
    ///
    /// # Example
    /// ```ignore
    /// // mDNS
    /// emac.multicast_add(&[0x01, 0x00, 0x5E, 0x00, 0x00, 0xFB])?;
    /// ```
    pub fn multicast_add(&mut self, addr: &[u8; 6]) -> Result<()> {
        if self.state() != State::Running {
            return Err(IoError::InvalidState.into());
        }

        let index = self.hw.hash_index(crc32_le(addr));
        if self.filter.add(index)? {
            match self.program_filter() {
                Ok(()) => {}
                Err(LoadFailure::Abandoned(err)) => {
                    self.filter.remove(index);
                    return Err(err);
                }
                Err(LoadFailure::Queued(err)) => return Err(err),
            }
        }
        Ok(())
    }

    /// Leave a multicast group.
    ///
    /// Removing a group that was never joined does nothing.
    ///
    /// # Errors
    /// Same as [`multicast_add`](Self::multicast_add); on error the membership
    /// is kept, except when the setup frame is left queued.
    pub fn multicast_remove(&mut self, addr: &[u8; 6]) -> Result<()> {
        if self.state() != State::Running {
            return Err(IoError::InvalidState.into());
        }

        let index = self.hw.hash_index(crc32_le(addr));
        if self.filter.remove(index) {
            match self.program_filter() {
                Ok(()) => {}
                Err(LoadFailure::Abandoned(err)) => {
                    // The count was just lowered, so this cannot overflow.
                    let _ = self.filter.add(index);
                    return Err(err);
                }
                Err(LoadFailure::Queued(err)) => return Err(err),
            }
        }
        Ok(())
    }

    /// References held on the bucket `addr` hashes to
    pub fn multicast_refcount(&self, addr: &[u8; 6]) -> u16 {
        self.filter.count(self.hw.hash_index(crc32_le(addr)))
    }

    /// Hash table as last computed, one bit per bucket
    pub fn hash_table(&self) -> &[u32] {
        self.filter.table()
    }

    /// Push the current hash table to the hardware.
    pub(super) fn program_filter(&mut self) -> core::result::Result<(), LoadFailure> {
        match H::FILTER_UPDATE {
            FilterUpdate::Registers => {
                critical_section::with(|_| self.hw.write_hash_filter(self.filter.table()));
            }
            FilterUpdate::SetupFrame => self.load_setup_frame()?,
        }
        bump(&mut self.stats.filter_updates);
        Ok(())
    }

    fn load_setup_frame(&mut self) -> core::result::Result<(), LoadFailure> {
        let size = self.config.buffer_size;
        let buffer = self
            .stack
            .get_buffer(size)
            .ok_or(LoadFailure::Abandoned(DmaError::OutOfMemory.into()))?;

        // SAFETY: the buffer was just taken from the pool, holds at least
        // `size` bytes and is not yet visible to the DMA.
        let out = unsafe { core::slice::from_raw_parts_mut(buffer.as_ptr(), size) };
        let Some(len) = self
            .hw
            .build_setup_frame(&self.config.mac_address, self.filter.table(), out)
        else {
            self.stack.free_buffer(buffer);
            return Err(LoadFailure::Abandoned(DmaError::InvalidLength.into()));
        };

        critical_section::with(|_| self.send_setup_frame(buffer, len))
    }

    /// Quiesce both DMAs, run the setup frame through the transmit ring and
    /// restart reception.
    fn send_setup_frame(
        &mut self,
        buffer: BufferPtr,
        len: usize,
    ) -> core::result::Result<(), LoadFailure> {
        self.hw.stop(Direction::Tx);
        self.hw.stop(Direction::Rx);
        let hw = &self.hw;
        if let Err(err) = poll_until(H::POLL_RETRIES, || {
            hw.is_stopped(Direction::Tx) && hw.is_stopped(Direction::Rx)
        }) {
            self.stack.free_buffer(buffer);
            self.resume_dma();
            return Err(LoadFailure::Abandoned(err.into()));
        }

        self.reclaim_tx();
        let index = match self.dma.submit_setup(buffer, len) {
            Ok(index) => index,
            Err(err) => {
                self.stack.free_buffer(buffer);
                self.resume_dma();
                return Err(LoadFailure::Abandoned(err.into()));
            }
        };

        self.hw.start(Direction::Tx);
        self.hw.poll_demand(Direction::Tx);

        let dma = &self.dma;
        if let Err(err) = poll_until(H::POLL_RETRIES, || !dma.tx_owned(index)) {
            #[cfg(feature = "defmt")]
            defmt::warn!("setup frame did not complete, withdrawing it");
            #[cfg(feature = "log")]
            log::warn!("setup frame did not complete, withdrawing it");

            // The setup buffer goes back to the pool with the rest of the ring.
            let withdrawn = self.recover_tx();
            self.hw.start(Direction::Rx);
            return Err(if withdrawn {
                LoadFailure::Abandoned(err.into())
            } else {
                LoadFailure::Queued(err.into())
            });
        }

        // Frames queued ahead of the setup frame completed with it.
        self.reclaim_tx();
        self.hw.start(Direction::Rx);
        Ok(())
    }

    fn resume_dma(&mut self) {
        self.hw.start(Direction::Tx);
        self.hw.start(Direction::Rx);
    }
}

/// A filter load that did not complete
pub(super) enum LoadFailure {
    /// The hardware keeps the table it had before
    Abandoned(Error),
    /// A setup frame is still queued and may load the new table later
    Queued(Error),
}

impl LoadFailure {
    pub(super) fn into_error(self) -> Error {
        match self {
            LoadFailure::Abandoned(err) | LoadFailure::Queued(err) => err,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use crate::driver::config::{DriverConfig, State};
    use crate::driver::error::{DmaError, Error, IoError};
    use crate::hal::chip::{Direction, MacHardware};
    use crate::internal::hash::crc32_le;
    use crate::stack::BufferPool;
    use crate::testing::{MockStack, TestEmac, test_emac};

    const GROUP_A: [u8; 6] = [0x01, 0x00, 0x5E, 0x00, 0x00, 0x01];
    const GROUP_B: [u8; 6] = [0x01, 0x00, 0x5E, 0x00, 0x00, 0xFB];

    fn initialized<const SETUP: bool>(stack: &MockStack) -> TestEmac<'_, SETUP> {
        let mut emac = test_emac(stack);
        emac.init(DriverConfig::new()).expect("init");
        emac
    }

    fn bucket<const SETUP: bool>(emac: &TestEmac<'_, SETUP>, addr: &[u8; 6]) -> usize {
        emac.hw().hash_index(crc32_le(addr))
    }

    fn frame_bit(frame: &[u8], index: usize) -> bool {
        let at = (index / 16) * 4;
        let half = u16::from_le_bytes([frame[at], frame[at + 1]]);
        half & (1 << (index % 16)) != 0
    }

    // =========================================================================
    // Register-Loaded Filter
    // =========================================================================

    #[test]
    fn add_sets_hardware_bit() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<false>(&stack);
        emac.start().expect("start");
        let index = bucket(&emac, &GROUP_A);

        emac.multicast_add(&GROUP_A).expect("add");
        let table = emac.hw().hash_table();
        assert_ne!(table[index / 32] & (1 << (index % 32)), 0);
        assert_eq!(emac.multicast_refcount(&GROUP_A), 1);
    }

    #[test]
    fn repeated_add_reprograms_once() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<false>(&stack);
        emac.start().expect("start");
        let before = emac.statistics().filter_updates;

        emac.multicast_add(&GROUP_A).expect("add");
        emac.multicast_add(&GROUP_A).expect("add again");
        assert_eq!(emac.statistics().filter_updates, before + 1);
        assert_eq!(emac.multicast_refcount(&GROUP_A), 2);

        emac.multicast_remove(&GROUP_A).expect("remove");
        let index = bucket(&emac, &GROUP_A);
        assert_ne!(
            emac.hw().hash_table()[index / 32] & (1 << (index % 32)),
            0,
            "bit kept while a reference remains"
        );

        emac.multicast_remove(&GROUP_A).expect("remove last");
        assert_eq!(emac.hw().hash_table()[index / 32] & (1 << (index % 32)), 0);
        assert_eq!(emac.statistics().filter_updates, before + 2);
    }

    #[test]
    fn remove_unknown_group_is_noop() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<false>(&stack);
        emac.start().expect("start");
        let before = emac.statistics().filter_updates;

        emac.multicast_remove(&GROUP_B).expect("remove");
        assert_eq!(emac.multicast_refcount(&GROUP_B), 0);
        assert_eq!(emac.statistics().filter_updates, before);
    }

    #[test]
    fn filter_requires_running() {
        let stack = MockStack::new(32);
        let mut emac = test_emac::<false>(&stack);
        emac.init(DriverConfig::new()).expect("init");
        assert_eq!(
            emac.multicast_add(&GROUP_A),
            Err(Error::Io(IoError::InvalidState))
        );
    }

    #[test]
    fn restart_clears_memberships() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<false>(&stack);
        emac.start().expect("start");
        emac.multicast_add(&GROUP_A).expect("add");
        emac.stop().expect("stop");
        emac.start().expect("start");

        assert_eq!(emac.multicast_refcount(&GROUP_A), 0);
        assert!(emac.hash_table().iter().all(|&word| word == 0));
    }

    // =========================================================================
    // Setup-Frame Filter
    // =========================================================================

    #[test]
    fn setup_frame_carries_new_bucket() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");
        let index = bucket(&emac, &GROUP_A);

        emac.multicast_add(&GROUP_A).expect("add");

        let frame = emac.hw().last_setup_frame().expect("setup frame sent");
        assert!(frame_bit(&frame, index));
        assert!(frame_bit(&frame, 255), "broadcast always accepted");
        assert_eq!(emac.state(), State::Running);
        assert!(emac.hw().is_running(Direction::Rx));
        assert!(emac.hw().is_running(Direction::Tx));
        assert_eq!(emac.tx_in_flight(), 0);
        assert_eq!(stack.pool().outstanding(), 4, "setup buffer back in the pool");
        assert!(stack.dealloc_posts().is_empty());
    }

    #[test]
    fn setup_frame_completes_queued_frames_first() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");

        let signals_before = stack.tx_signals();
        let sent: Vec<_> = (0..2)
            .map(|_| {
                let buffer = stack.pool().get_buffer(64).expect("buffer");
                emac.transmit(buffer, 64).expect("transmit");
                buffer
            })
            .collect();
        emac.multicast_add(&GROUP_B).expect("add");

        assert_eq!(stack.dealloc_posts(), sent);
        assert_eq!(emac.tx_in_flight(), 0);
        assert_eq!(
            stack.tx_signals(),
            signals_before + 3,
            "two frames plus the setup frame"
        );
    }

    #[test]
    fn setup_frame_quiesce_timeout_rolls_back() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");
        let sent_before = emac.hw().setup_frames();
        emac.hw_mut().stall_stop(true);

        assert_eq!(
            emac.multicast_add(&GROUP_A),
            Err(Error::Io(IoError::Timeout))
        );
        assert_eq!(emac.multicast_refcount(&GROUP_A), 0);
        assert_eq!(emac.hw().setup_frames(), sent_before);
        assert_eq!(stack.pool().outstanding(), 4, "setup buffer returned");
        assert!(emac.hw().is_running(Direction::Rx));
        assert!(emac.hw().is_running(Direction::Tx));
    }

    #[test]
    fn setup_frame_timeout_withdraws_frame_before_rollback() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");
        let index = bucket(&emac, &GROUP_A);
        let sent_before = emac.hw().setup_frames();

        let queued = stack.pool().get_buffer(64).expect("buffer");
        emac.transmit(queued, 64).expect("transmit");
        emac.hw_mut().hold_setup(true);

        assert_eq!(
            emac.multicast_add(&GROUP_A),
            Err(Error::Io(IoError::Timeout))
        );
        assert_eq!(emac.multicast_refcount(&GROUP_A), 0);
        assert_eq!(emac.tx_in_flight(), 0);
        assert_eq!(stack.dealloc_posts(), [queued]);
        assert_eq!(stack.pool().outstanding(), 5, "setup buffer back in the pool");
        assert!(emac.hw().is_running(Direction::Rx));
        assert!(emac.hw().is_running(Direction::Tx));

        // Nothing is left for the DMA to load late.
        assert_eq!(emac.hw_mut().complete_tx(1), 0);
        assert_eq!(emac.hw().setup_frames(), sent_before);

        emac.hw_mut().hold_setup(false);
        emac.multicast_add(&GROUP_A).expect("add");
        let frame = emac.hw().last_setup_frame().expect("setup frame sent");
        assert!(frame_bit(&frame, index));
        assert_eq!(emac.multicast_refcount(&GROUP_A), 1);
    }

    #[test]
    fn setup_frame_timeout_on_remove_keeps_membership() {
        let stack = MockStack::new(32);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");
        let index = bucket(&emac, &GROUP_B);
        emac.multicast_add(&GROUP_B).expect("add");

        emac.hw_mut().hold_setup(true);
        assert_eq!(
            emac.multicast_remove(&GROUP_B),
            Err(Error::Io(IoError::Timeout))
        );
        assert_eq!(emac.multicast_refcount(&GROUP_B), 1);
        assert_eq!(emac.hw_mut().complete_tx(1), 0);
        let frame = emac.hw().last_setup_frame().expect("earlier frame");
        assert!(frame_bit(&frame, index), "hardware still holds the bucket");
    }

    #[test]
    fn setup_frame_without_pool_buffer() {
        let stack = MockStack::new(5);
        let mut emac = initialized::<true>(&stack);
        emac.start().expect("start");
        let _hold = stack.pool().get_buffer(64).expect("last buffer");

        assert_eq!(
            emac.multicast_add(&GROUP_A),
            Err(Error::Dma(DmaError::OutOfMemory))
        );
        assert_eq!(emac.multicast_refcount(&GROUP_A), 0);
    }
}
