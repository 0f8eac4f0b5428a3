//! MDIO bus seam and Clause-22 PHY registers.
//!
//! Two backends implement [`MdioBus`]: the hardware MII controller of the
//! DesignWare core ([`DwmacMdio`](super::dwmac::DwmacMdio)) and the software
//! engine for chips without one ([`BitBangMdio`](super::bitbang::BitBangMdio)).

use crate::driver::config::{Duplex, LinkState, Speed};
use crate::driver::error::{ConfigError, Result};
use crate::internal::constants::{MAX_PHY_ADDR, MAX_REG_ADDR};

// =============================================================================
// MDIO Bus Trait
// =============================================================================

/// Trait for MDIO bus operations
pub trait MdioBus {
    /// Read a PHY register
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16>;

    /// Write a PHY register
    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()>;

    /// Check if a transaction is in progress
    fn is_busy(&self) -> bool;
}

impl<M: MdioBus + ?Sized> MdioBus for &mut M {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        (**self).read(phy_addr, reg_addr)
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        (**self).write(phy_addr, reg_addr, value)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }
}

/// Reject PHY or register addresses outside the 5-bit Clause-22 range
pub(crate) fn check_addresses(phy_addr: u8, reg_addr: u8) -> Result<()> {
    if phy_addr > MAX_PHY_ADDR {
        return Err(ConfigError::InvalidPhyAddress.into());
    }
    if reg_addr > MAX_REG_ADDR {
        return Err(ConfigError::InvalidRegisterAddress.into());
    }
    Ok(())
}

// =============================================================================
// PHY Register Definitions (IEEE 802.3 Clause 22)
// =============================================================================

/// Standard PHY register addresses
pub mod phy_reg {
    /// Basic Mode Control Register
    pub const BMCR: u8 = 0;
    /// Basic Mode Status Register
    pub const BMSR: u8 = 1;
    /// PHY Identifier 1
    pub const PHYIDR1: u8 = 2;
    /// PHY Identifier 2
    pub const PHYIDR2: u8 = 3;
    /// Auto-Negotiation Advertisement Register
    pub const ANAR: u8 = 4;
    /// Auto-Negotiation Link Partner Ability Register
    pub const ANLPAR: u8 = 5;
}

/// BMCR bits
pub mod bmcr {
    /// Soft reset
    pub const RESET: u16 = 1 << 15;
    /// Speed select (100 Mbps if set)
    pub const SPEED_100: u16 = 1 << 13;
    /// Auto-negotiation enable
    pub const AN_ENABLE: u16 = 1 << 12;
    /// Restart auto-negotiation
    pub const AN_RESTART: u16 = 1 << 9;
    /// Duplex mode (full duplex if set)
    pub const DUPLEX_FULL: u16 = 1 << 8;
}

/// BMSR bits
pub mod bmsr {
    /// Auto-negotiation complete
    pub const AN_COMPLETE: u16 = 1 << 5;
    /// Link status, latched low
    pub const LINK_STATUS: u16 = 1 << 2;
}

/// ANAR / ANLPAR technology ability bits
pub mod ability {
    /// 100BASE-TX full duplex
    pub const TX_FD: u16 = 1 << 8;
    /// 100BASE-TX half duplex
    pub const TX_HD: u16 = 1 << 7;
    /// 10BASE-T full duplex
    pub const T10_FD: u16 = 1 << 6;
    /// 10BASE-T half duplex
    pub const T10_HD: u16 = 1 << 5;
}

// =============================================================================
// PHY Helper Functions
// =============================================================================

/// Read link state from the standard registers.
///
/// BMSR is read twice because the link bit latches low. With
/// auto-negotiation complete, the best mode common to ANAR and ANLPAR wins;
/// otherwise the forced BMCR settings apply.
pub fn read_phy_status<M: MdioBus + ?Sized>(mdio: &mut M, phy_addr: u8) -> Result<LinkState> {
    let _ = mdio.read(phy_addr, phy_reg::BMSR)?;
    let status = mdio.read(phy_addr, phy_reg::BMSR)?;
    if status & bmsr::LINK_STATUS == 0 {
        return Ok(LinkState::down());
    }

    if status & bmsr::AN_COMPLETE != 0 {
        let common = mdio.read(phy_addr, phy_reg::ANAR)? & mdio.read(phy_addr, phy_reg::ANLPAR)?;
        let (speed, duplex) = if common & ability::TX_FD != 0 {
            (Speed::Mbps100, Duplex::Full)
        } else if common & ability::TX_HD != 0 {
            (Speed::Mbps100, Duplex::Half)
        } else if common & ability::T10_FD != 0 {
            (Speed::Mbps10, Duplex::Full)
        } else {
            (Speed::Mbps10, Duplex::Half)
        };
        return Ok(LinkState::up(speed, duplex));
    }

    let control = mdio.read(phy_addr, phy_reg::BMCR)?;
    let speed = if control & bmcr::SPEED_100 != 0 {
        Speed::Mbps100
    } else {
        Speed::Mbps10
    };
    let duplex = if control & bmcr::DUPLEX_FULL != 0 {
        Duplex::Full
    } else {
        Duplex::Half
    };
    Ok(LinkState::up(speed, duplex))
}

/// Read the 32-bit PHY identifier
pub fn read_phy_id<M: MdioBus + ?Sized>(mdio: &mut M, phy_addr: u8) -> Result<u32> {
    let id1 = u32::from(mdio.read(phy_addr, phy_reg::PHYIDR1)?);
    let id2 = u32::from(mdio.read(phy_addr, phy_reg::PHYIDR2)?);
    Ok((id1 << 16) | id2)
}

// =============================================================================
// Unit Tests
// =============================================================================
