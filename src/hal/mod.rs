//! Hardware Abstraction Layer
//!
//! Everything the driver needs from the chip and the board, expressed as
//! traits so the descriptor-ring engine stays chip-neutral.
//!
//! # Modules
//!
//! - [`chip`]: Per-family MAC and DMA control ([`MacHardware`])
//! - [`dwmac`]: Synopsys DesignWare MAC implementation and its MII controller
//! - [`mmio`]: Register access seam for memory-mapped peripherals
//! - [`mdio`]: PHY management bus trait and Clause-22 helpers
//! - [`bitbang`]: Software MDIO over two GPIO pins
//! - [`wait`]: Bounded waits and tick-based timing
//!
//! # Delay Integration
//!
//! Types that need delays use `embedded_hal::delay::DelayNs` directly; the
//! bit-banged bus times itself from a free-running [`TickSource`].

pub mod bitbang;
pub mod chip;
pub mod dwmac;
pub mod mdio;
pub mod mmio;
pub mod wait;

// Re-export commonly used types
pub use bitbang::{BitBangMdio, GpioMdioPins, MdioPins};
pub use chip::{Direction, FilterUpdate, HashWidth, MacHardware};
pub use dwmac::{Dwmac, DwmacMdio, MdcClockDivider};
pub use mdio::{MdioBus, read_phy_id, read_phy_status};
pub use mmio::{Mmio, RegisterAccess};
pub use wait::{TickSource, poll_until};
