//! Embedded Ethernet MAC DMA Engine
//!
//! A `no_std`, `no_alloc` descriptor-ring engine for Ethernet MACs whose DMA
//! walks chained descriptors in system memory: the Synopsys DesignWare MAC
//! and the Tulip-style controllers derived from it.
//!
//! The driver moves frames between a host network stack and the MAC. Frame
//! buffers come from the stack's pool; descriptor memory lives inside the
//! driver and is sized by const generics.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! 1. **Driver Layer** ([`driver`]): lifecycle, receive and transmit paths,
//!    interrupt dispatch, error recovery, multicast filtering
//! 2. **Host Interface** ([`stack`]): the buffer pool, task signals and
//!    deferred deallocation the driver expects from the network stack
//! 3. **HAL Layer** ([`hal`]): chip capability trait, DWMAC implementation,
//!    MDIO buses and bounded waits
//!
//! [`sync`] adds an interrupt-safe wrapper and, with the `async` feature,
//! waker-based signalling.
//!
//! ## Ownership Protocol
//!
//! Each descriptor carries an OWN bit. While it is set the DMA may touch the
//! descriptor and its buffer; while clear only the driver may. The driver
//! completes every other write to a descriptor before setting OWN, and reads
//! nothing but OWN until it sees the bit clear.
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting and recovery-path diagnostics
//! - `log`: Emit recovery-path diagnostics through the `log` facade
//! - `async`: Enable async/await support with wakers
//!
//! # Example
//!
//! ```ignore
//! use ph_emac_engine::hal::{Dwmac, Mmio};
//! use ph_emac_engine::{DriverConfig, Emac, SharedEmac};
//!
//! // SAFETY: the EMAC register blocks of this SoC
//! const HW: Dwmac<Mmio> = Dwmac::new(unsafe { Mmio::new(MAC_BASE) }, unsafe { Mmio::new(DMA_BASE) });
//!
//! static EMAC: SharedEmac<Dwmac<Mmio>, &'static Stack, Mdio, 10, 10> =
//!     SharedEmac::new(Emac::new(HW, &STACK, MDIO));
//!
//! EMAC.with(|emac| {
//!     emac.init(DriverConfig::new().with_mac_address([0x02, 0, 0, 0x12, 0x34, 0x56]))?;
//!     emac.start()
//! })?;
//!
//! // Network task
//! loop {
//!     match EMAC.with(|emac| emac.receive()) {
//!         Ok(frame) => stack.input(frame),
//!         Err(Error::Io(IoError::NoFrame)) => wait_for_rx_signal(),
//!         Err(err) => return Err(err),
//!     }
//! }
//! ```
//!
//! # Memory Requirements
//!
//! [`Emac::memory_usage`] reports the descriptor memory for a configuration;
//! frame buffers are not included since they belong to the pool.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod stack;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{DriverConfig, Duplex, LinkState, Speed, State};
pub use driver::emac::{Emac, IoControl};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result,
};
pub use driver::interrupt::{InterruptKind, InterruptStatus, Interrupts};
pub use driver::stats::Statistics;
pub use stack::{BufferPool, BufferPtr, DeallocQueue, Frame, NetStack, TaskSignal};
pub use sync::SharedEmac;

#[cfg(feature = "async")]
pub use sync::{AsyncSignals, SignalFuture};

/// Shared driver constants.
pub mod constants {
    pub use crate::internal::constants::{
        // Frame/buffer sizes
        CRC_SIZE,
        DEFAULT_BUFFER_SIZE,
        // Buffer counts
        DEFAULT_RX_BUFFERS,
        DEFAULT_TX_BUFFERS,
        // MAC address
        DEFAULT_MAC_ADDR,
        MAC_ADDR_LEN,
        MAX_DESC_BUFFER_SIZE,
        MAX_FRAME_SIZE,
        // Management bus
        MAX_PHY_ADDR,
        MAX_REG_ADDR,
        MDIO_MAX_FREQ_HZ,
        MIN_FRAME_SIZE,
        MIN_RING_SIZE,
        MTU,
        SETUP_FRAME_LEN,
    };
}
