//! Synchronization and Concurrency Support
//!
//! This module provides the synchronization primitives the driver is built
//! on and the wrappers that share it with interrupt handlers:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`PhyLock`] - non-blocking boolean lock for the management bus
//!   - [`AtomicWaker`] - Async waker storage for interrupts
//!
//! - **Shared Wrapper** (`shared`): [`SharedEmac`], a critical-section
//!   protected driver instance for `static` storage
//!
//! - **Async Support** (`asynch`): [`AsyncSignals`], task signals delivered
//!   as async wakeups
//!
//! # Feature Flags
//!
//! - `async`: Enables `AtomicWaker` and the `asynch` module
//!
//! # Example
//!
//! ```ignore
//! use ph_emac_engine::sync::SharedEmac;
//!
//! static EMAC: SharedEmac<Dwmac<Mmio>, &Stack, Mdio, 10, 10> =
//!     SharedEmac::new(Emac::new(HW, &STACK, MDIO));
//!
//! fn main() {
//!     EMAC.with(|emac| {
//!         emac.init(DriverConfig::default())?;
//!         emac.start()
//!     })?;
//! }
//!
//! #[interrupt]
//! fn EMAC_IRQ() {
//!     EMAC.handle_interrupt();
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::{CriticalSectionCell, PhyLock, PhyLockGuard};

mod shared;

pub use shared::SharedEmac;

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::{AsyncSignals, SignalFuture};
