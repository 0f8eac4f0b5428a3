//! Core EMAC driver implementation.
//!
//! This module contains the main [`Emac`] structure and core operations:
//!
//! - Initialization and start/stop control
//! - Frame reception and transmission through the descriptor rings
//! - Interrupt servicing and datapath error recovery
//! - Link-state control and PHY register access
//!
//! For multicast filtering, see the [`filtering`](super::filtering) module.

use super::config::{DriverConfig, LinkState, State};
use super::error::{ConfigError, ConfigResult, DmaError, IoError, Result};
use super::interrupt::{InterruptKind, InterruptStatus, Interrupts};
use super::stats::{Statistics, bump};
use crate::hal::chip::{Direction, MacHardware};
use crate::hal::mdio::{MdioBus, read_phy_status};
use crate::hal::wait::poll_until;
use crate::internal::dma::{DmaEngine, RxFollowup, RxPoll, TxCompletion};
use crate::internal::hash::HashFilter;
use crate::stack::{BufferPtr, Frame, NetStack};

// =============================================================================
// Control Requests
// =============================================================================

/// Link-state requests accepted by [`Emac::io_control`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoControl {
    /// Report the link state last applied
    GetLinkState,
    /// Apply a link state reported by the caller
    SetLinkState(LinkState),
    /// Read the PHY and apply what it reports
    RefreshLinkState,
}

/// Give a completed transmit buffer back to whoever owns it.
///
/// Setup frames use buffers the driver took from the pool itself; every
/// other buffer belongs to the stack and goes through the dealloc queue.
pub(super) fn dispose_tx<S: NetStack>(stack: &S, completion: TxCompletion) {
    if let Some(buffer) = completion.buffer {
        if completion.setup {
            stack.free_buffer(buffer);
        } else {
            stack.post_for_dealloc(buffer);
        }
    }
}

// =============================================================================
// EMAC Driver
// =============================================================================

/// EMAC driver instance.
///
/// Owns one interface's descriptor rings, filter state and counters, and
/// reaches the hardware and host stack only through its type parameters.
///
/// # Type Parameters
/// * `H` - Chip profile
/// * `S` - Host stack services (buffer pool, task signals, dealloc queue)
/// * `M` - Management bus to the PHY
/// * `RX_BUFS` - Number of receive descriptors
/// * `TX_BUFS` - Number of transmit descriptors
///
/// The rings are linked by address when the interface starts, so the value
/// must stay in place from [`start`](Self::start) until [`stop`](Self::stop).
/// Keep it in a `static` (see [`SharedEmac`](crate::sync::SharedEmac)) or
/// another fixed location.
///
/// # Example
/// ```ignore
/// static EMAC: SharedEmac<Dwmac<Mmio>, &Stack, Mdio, 10, 10> =
///     SharedEmac::new(Emac::new(hw, &STACK, mdio));
///
/// EMAC.with(|emac| {
///     emac.init(DriverConfig::new().with_mac_address(mac))?;
///     emac.start()
/// })?;
/// ```
pub struct Emac<H, S, M, const RX_BUFS: usize, const TX_BUFS: usize>
where
    H: MacHardware,
    S: NetStack,
    M: MdioBus,
{
    /// Chip profile
    pub(super) hw: H,
    /// Host stack services
    pub(super) stack: S,
    /// PHY management bus
    mdio: M,
    /// Descriptor rings
    pub(super) dma: DmaEngine<RX_BUFS, TX_BUFS>,
    /// Multicast hash references
    pub(super) filter: HashFilter,
    /// Active configuration
    pub(super) config: DriverConfig,
    /// Lifecycle state
    state: State,
    /// Link state last applied to the MAC
    link: LinkState,
    /// Counters
    pub(super) stats: Statistics,
}

impl<H, S, M, const RX_BUFS: usize, const TX_BUFS: usize> Emac<H, S, M, RX_BUFS, TX_BUFS>
where
    H: MacHardware,
    S: NetStack,
    M: MdioBus,
{
    /// Create an uninitialized driver (const, suitable for static initialization).
    pub const fn new(hw: H, stack: S, mdio: M) -> Self {
        Self {
            hw,
            stack,
            mdio,
            dma: DmaEngine::new(),
            filter: HashFilter::new(H::HASH_WIDTH),
            config: DriverConfig::new(),
            state: State::Uninitialized,
            link: LinkState::down(),
            stats: Statistics::new(),
        }
    }

    /// Descriptor memory in bytes
    pub const fn memory_usage() -> usize {
        DmaEngine::<RX_BUFS, TX_BUFS>::memory_usage()
    }

    // =========================================================================
    // State Accessors
    // =========================================================================

    /// Get the current state
    #[inline(always)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Active configuration
    #[inline(always)]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Link state last applied
    #[inline(always)]
    pub fn link_state(&self) -> LinkState {
        self.link
    }

    /// Counters
    #[inline(always)]
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Zero every counter
    pub fn reset_statistics(&mut self) {
        self.stats = Statistics::new();
    }

    /// Host stack services
    #[inline(always)]
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Chip profile
    #[inline(always)]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Chip profile, mutably
    #[inline(always)]
    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// PHY management bus
    #[inline(always)]
    pub fn mdio_mut(&mut self) -> &mut M {
        &mut self.mdio
    }

    /// A completed frame is waiting at the receive cursor
    pub fn rx_available(&self) -> bool {
        self.dma.rx_pending()
    }

    /// Completed receive descriptors from the cursor on
    pub fn rx_ready_count(&self) -> usize {
        self.dma.rx_ready_count()
    }

    /// The transmit producer descriptor is free
    pub fn tx_ready(&self) -> bool {
        self.dma.tx_ready()
    }

    /// Free transmit descriptors
    pub fn tx_available(&self) -> usize {
        self.dma.tx_available()
    }

    /// Receive cursor
    pub fn rx_cursor(&self) -> usize {
        self.dma.rx_current()
    }

    /// Transmit producer cursor
    pub fn tx_producer(&self) -> usize {
        self.dma.tx_producer()
    }

    /// Transmit completion cursor
    pub fn tx_completion(&self) -> usize {
        self.dma.tx_completion()
    }

    /// Transmit descriptors submitted but not yet reclaimed
    pub fn tx_in_flight(&self) -> usize {
        self.dma.tx_in_flight()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Validate `config`, reset the chip and program the station address.
    ///
    /// # Errors
    /// - `AlreadyInitialized` - called twice
    /// - any validation error from [`DriverConfig::validate`]
    /// - `ResetFailed` - the chip reset did not complete
    pub fn init(&mut self, config: DriverConfig) -> ConfigResult<()> {
        if self.state != State::Uninitialized {
            return Err(ConfigError::AlreadyInitialized);
        }
        config.validate(RX_BUFS, TX_BUFS)?;

        self.hw.reset().map_err(|_| ConfigError::ResetFailed)?;
        self.hw.set_mac_address(&config.mac_address);

        self.config = config;
        self.state = State::Initialized;
        Ok(())
    }

    /// Bind receive buffers, program the rings and start both DMAs.
    ///
    /// The multicast filter starts empty.
    ///
    /// # Errors
    /// - `InvalidState` - not initialized
    /// - `OutOfMemory` - the pool could not fill the receive ring
    /// - `Timeout` - the initial filter load did not complete, or it failed
    ///   and the DMAs then did not stop; the state tells the two apart
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Initialized | State::Stopped => {}
            State::Running => return Ok(()),
            State::Uninitialized => return Err(IoError::InvalidState.into()),
        }

        self.dma.allocate(
            &self.stack,
            self.config.buffer_size,
            self.config.rx_buffer_offset,
        )?;
        self.filter.clear();

        self.hw.set_descriptor_base(Direction::Rx, self.dma.rx_base());
        self.hw.set_descriptor_base(Direction::Tx, self.dma.tx_base());
        self.hw
            .clear_interrupts(InterruptStatus::new(Interrupts::ALL, u32::MAX));
        self.hw.enable_interrupts(Interrupts::ALL);
        self.hw.start(Direction::Tx);
        self.hw.start(Direction::Rx);
        self.state = State::Running;

        if let Err(failure) = self.program_filter() {
            if let Err(stop_err) = self.stop() {
                #[cfg(feature = "defmt")]
                defmt::warn!("filter load failed and DMA did not stop, interface left running");
                #[cfg(feature = "log")]
                log::warn!("filter load failed and DMA did not stop, interface left running");
                return Err(stop_err);
            }
            return Err(failure.into_error());
        }
        Ok(())
    }

    /// Stop both DMAs and give every buffer back.
    ///
    /// In-flight transmit buffers are posted to the dealloc queue and receive
    /// buffers are returned to the pool. When the DMAs do not report stopped
    /// within the retry budget the interface is left running and `Timeout`
    /// is returned.
    ///
    /// # Errors
    /// - `InvalidState` - not running
    /// - `Timeout` - the DMAs never stopped
    pub fn stop(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Err(IoError::InvalidState.into());
        }

        self.hw.disable_interrupts(Interrupts::ALL);
        self.hw.stop(Direction::Tx);
        self.hw.stop(Direction::Rx);

        let hw = &self.hw;
        if let Err(err) = poll_until(H::POLL_RETRIES, || {
            hw.is_stopped(Direction::Tx) && hw.is_stopped(Direction::Rx)
        }) {
            #[cfg(feature = "defmt")]
            defmt::warn!("DMA did not stop, interface left running");
            #[cfg(feature = "log")]
            log::warn!("DMA did not stop, interface left running");

            self.hw.start(Direction::Tx);
            self.hw.start(Direction::Rx);
            self.hw.enable_interrupts(Interrupts::ALL);
            return Err(err.into());
        }

        let stack = &self.stack;
        self.dma.drain_tx(|completion| dispose_tx(stack, completion));
        self.dma.free_rx(&self.stack);

        self.state = State::Stopped;
        Ok(())
    }

    // =========================================================================
    // Data Path
    // =========================================================================

    /// Take the next completed frame from the receive ring.
    ///
    /// Errored frames are counted and skipped. The returned frame's buffer
    /// belongs to the stack from now on.
    ///
    /// # Errors
    /// - `NoFrame` - nothing is waiting
    /// - `OutOfMemory` - a good frame was dropped because the pool was empty
    /// - `InvalidState` - not running
    pub fn receive(&mut self) -> Result<Frame> {
        if self.state != State::Running {
            return Err(IoError::InvalidState.into());
        }

        let result = loop {
            match self.dma.poll_rx(&self.stack) {
                RxPoll::Frame(frame) => {
                    bump(&mut self.stats.rx_frames);
                    break Ok(frame);
                }
                RxPoll::Discarded(kind) => self.stats.record_rx_error(kind),
                RxPoll::Dropped => {
                    bump(&mut self.stats.rx_dropped_no_buffer);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RX frame dropped: buffer pool empty");
                    #[cfg(feature = "log")]
                    log::warn!("RX frame dropped: buffer pool empty");
                    break Err(DmaError::OutOfMemory.into());
                }
                RxPoll::Empty => break Err(IoError::NoFrame.into()),
            }
        };

        critical_section::with(|_| self.rx_followup());
        result
    }

    fn rx_followup(&mut self) {
        match self.dma.rx_followup() {
            RxFollowup::EnableInterrupt => self.hw.enable_interrupts(Interrupts::RX_READY),
            RxFollowup::Signal => self.stack.signal_rx_ready(self.config.interface_id),
            RxFollowup::Nothing => {}
        }
    }

    /// Queue one frame for transmission.
    ///
    /// On success the buffer belongs to the driver until it is posted to the
    /// dealloc queue; on error it stays with the caller.
    ///
    /// # Errors
    /// - `TxBusy` - no free descriptor; retry after `signal_tx_ready`
    /// - `InvalidLength` - zero or larger than the buffer size
    /// - `InvalidState` - not running
    pub fn transmit(&mut self, buffer: BufferPtr, len: usize) -> Result<()> {
        if self.state != State::Running {
            return Err(IoError::InvalidState.into());
        }

        critical_section::with(|_| match self.dma.transmit(buffer, len) {
            Ok(_) => {
                self.hw.poll_demand(Direction::Tx);
                bump(&mut self.stats.tx_frames);
                Ok(())
            }
            Err(DmaError::TxBusy) => {
                bump(&mut self.stats.tx_busy);
                Err(DmaError::TxBusy.into())
            }
            Err(err) => Err(err.into()),
        })
    }

    /// Reclaim finished transmit descriptors, returning each buffer and
    /// signalling the stack once per descriptor.
    pub(super) fn reclaim_tx(&mut self) -> usize {
        let stack = &self.stack;
        let stats = &mut self.stats;
        let if_id = self.config.interface_id;
        self.dma.reclaim_tx(|completion| {
            if completion.error_flags != 0 {
                bump(&mut stats.tx_errors);
            }
            dispose_tx(stack, completion);
            stack.signal_tx_ready(if_id);
        })
    }

    // =========================================================================
    // Interrupt Handling
    // =========================================================================

    /// Read, acknowledge and service every pending interrupt source.
    ///
    /// Call from the EMAC interrupt handler. Sources are acknowledged before
    /// servicing so a completion racing the handler re-raises the interrupt.
    pub fn handle_interrupt(&mut self) -> InterruptStatus {
        let status = self.hw.interrupt_status();
        self.hw.clear_interrupts(status);
        for kind in status.kinds() {
            self.interrupt_handler(kind);
        }
        status
    }

    /// Service one interrupt source. Never blocks or allocates.
    pub fn interrupt_handler(&mut self, kind: InterruptKind) {
        if self.state != State::Running {
            return;
        }

        match kind {
            InterruptKind::RxReady => {
                // Stays enabled when nothing is waiting; the receive task
                // re-enables it once the ring is drained otherwise.
                if self.dma.rx_pending() {
                    self.hw.disable_interrupts(Interrupts::RX_READY);
                }
                let delta = self.dma.take_rx_signal_delta();
                for _ in 0..delta {
                    self.stack.signal_rx_ready(self.config.interface_id);
                }
            }
            InterruptKind::TxDone => {
                self.reclaim_tx();
            }
            InterruptKind::RxOverrun => {
                bump(&mut self.stats.rx_overruns);
                #[cfg(feature = "defmt")]
                defmt::warn!("RX overrun, reinitialising receive ring");
                #[cfg(feature = "log")]
                log::warn!("RX overrun, reinitialising receive ring");
                self.recover_rx();
            }
            InterruptKind::TxUnderrun => {
                bump(&mut self.stats.tx_underruns);
                #[cfg(feature = "defmt")]
                defmt::warn!("TX underrun, resetting transmit datapath");
                #[cfg(feature = "log")]
                log::warn!("TX underrun, resetting transmit datapath");
                self.recover_tx();
            }
            InterruptKind::BusError => {
                bump(&mut self.stats.bus_errors);
                #[cfg(feature = "defmt")]
                defmt::error!("fatal DMA bus error, resetting both datapaths");
                #[cfg(feature = "log")]
                log::error!("fatal DMA bus error, resetting both datapaths");
                self.recover_tx();
                self.recover_rx();
            }
        }
    }

    /// Re-arm the whole receive ring with the buffers it already holds and
    /// restart the receive DMA from the ring base.
    ///
    /// A DMA that does not stop keeps its descriptors; the sources stay
    /// armed so the next overrun retries.
    fn recover_rx(&mut self) {
        self.hw.stop(Direction::Rx);
        let hw = &self.hw;
        if poll_until(H::POLL_RETRIES, || hw.is_stopped(Direction::Rx)).is_ok() {
            self.dma.reset_rx();
            self.hw.set_descriptor_base(Direction::Rx, self.dma.rx_base());
        } else {
            self.recovery_timed_out(Direction::Rx);
        }
        self.hw.start(Direction::Rx);
        self.hw.enable_interrupts(H::RX_RECOVERY_INTERRUPTS);
    }

    /// Drain every in-flight transmit buffer, flush the FIFO and restart the
    /// transmit DMA from the ring base.
    ///
    /// Returns `false` when the DMA does not stop; the ring is then left as
    /// it was and the DMA keeps running.
    pub(super) fn recover_tx(&mut self) -> bool {
        self.hw.stop(Direction::Tx);
        let hw = &self.hw;
        if poll_until(H::POLL_RETRIES, || hw.is_stopped(Direction::Tx)).is_err() {
            self.recovery_timed_out(Direction::Tx);
            self.hw.start(Direction::Tx);
            return false;
        }

        let stack = &self.stack;
        self.dma.drain_tx(|completion| dispose_tx(stack, completion));
        if self.hw.flush_tx().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("TX FIFO flush timed out during recovery");
            #[cfg(feature = "log")]
            log::warn!("TX FIFO flush timed out during recovery");
        }

        self.hw.set_descriptor_base(Direction::Tx, self.dma.tx_base());
        self.hw.start(Direction::Tx);
        self.stack.signal_tx_ready(self.config.interface_id);
        true
    }

    #[cfg_attr(not(any(feature = "defmt", feature = "log")), allow(unused_variables))]
    fn recovery_timed_out(&mut self, dir: Direction) {
        bump(&mut self.stats.recovery_timeouts);
        #[cfg(feature = "defmt")]
        defmt::warn!("{} DMA did not stop, recovery skipped", dir);
        #[cfg(feature = "log")]
        log::warn!("{:?} DMA did not stop, recovery skipped", dir);
    }

    // =========================================================================
    // Link and PHY
    // =========================================================================

    /// Get or update the link state.
    ///
    /// Applying an up link programs its speed and duplex into the MAC.
    ///
    /// # Errors
    /// - `InvalidState` - not initialized
    /// - any management-bus error while refreshing
    pub fn io_control(&mut self, request: IoControl) -> Result<LinkState> {
        match request {
            IoControl::GetLinkState => Ok(self.link),
            IoControl::SetLinkState(link) => {
                self.apply_link(link)?;
                Ok(link)
            }
            IoControl::RefreshLinkState => {
                if self.state == State::Uninitialized {
                    return Err(IoError::InvalidState.into());
                }
                let link = read_phy_status(&mut self.mdio, self.config.phy_address)?;
                self.apply_link(link)?;
                Ok(link)
            }
        }
    }

    fn apply_link(&mut self, link: LinkState) -> Result<()> {
        if self.state == State::Uninitialized {
            return Err(IoError::InvalidState.into());
        }
        if link.up {
            self.hw.set_link(link.speed, link.duplex);
        }
        self.link = link;
        Ok(())
    }

    /// Read a PHY register over the management bus
    pub fn phy_read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        self.mdio.read(phy_addr, reg_addr)
    }

    /// Write a PHY register over the management bus
    pub fn phy_write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        self.mdio.write(phy_addr, reg_addr, value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
