//! Core driver components.
//!
//! - [`config`] - Configuration types and the driver lifecycle state
//! - [`error`] - Error types and result aliases
//! - [`emac`] - The descriptor-ring driver: lifecycle, data path, interrupts
//! - [`interrupt`] - Chip-neutral interrupt sources
//! - [`stats`] - Error and event counters
//!
//! Multicast filtering lives in `filtering` as further methods on [`Emac`].
//!
//! # Example
//!
//! ```ignore
//! use ph_emac_engine::driver::{DriverConfig, Emac};
//!
//! let config = DriverConfig::new()
//!     .with_mac_address([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
//! emac.init(config)?;
//! emac.start()?;
//! ```

// Submodules
pub mod config;
pub mod emac;
pub mod error;
mod filtering;
pub mod interrupt;
pub mod stats;

// Re-exports for convenience
pub use config::{DriverConfig, Duplex, LinkState, Speed, State};
pub use emac::{Emac, IoControl};
pub use error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result};
pub use interrupt::{InterruptKind, InterruptStatus, Interrupts};
pub use stats::Statistics;
