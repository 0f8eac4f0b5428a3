//! Configuration types for the EMAC driver

use super::error::{ConfigError, ConfigResult};
use crate::internal::constants::{
    DEFAULT_BUFFER_ALIGNMENT, DEFAULT_BUFFER_SIZE, DEFAULT_MAC_ADDR, MAX_DESC_BUFFER_SIZE,
    MAX_FRAME_SIZE, MAX_PHY_ADDR, MIN_RING_SIZE,
};

/// Ethernet link speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 10 Mbps
    Mbps10,
    /// 100 Mbps
    #[default]
    Mbps100,
}

/// Ethernet duplex mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    /// Half duplex
    Half,
    /// Full duplex
    #[default]
    Full,
}

/// Link state as seen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkState {
    /// Carrier present
    pub up: bool,
    /// Negotiated or forced speed
    pub speed: Speed,
    /// Negotiated or forced duplex
    pub duplex: Duplex,
}

impl LinkState {
    /// No carrier
    #[must_use]
    pub const fn down() -> Self {
        Self {
            up: false,
            speed: Speed::Mbps10,
            duplex: Duplex::Half,
        }
    }

    /// Carrier present at the given speed and duplex
    #[must_use]
    pub const fn up(speed: Speed, duplex: Duplex) -> Self {
        Self {
            up: true,
            speed,
            duplex,
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::down()
    }
}

/// Per-interface driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverConfig {
    /// Station MAC address
    pub mac_address: [u8; 6],
    /// Identifier passed to the stack's task signals
    pub interface_id: u8,
    /// Size requested from the pool for every receive buffer
    pub buffer_size: usize,
    /// Alignment the pool guarantees for its buffers
    pub buffer_alignment: usize,
    /// Bytes between a pool buffer's start and the DMA write address
    pub rx_buffer_offset: usize,
    /// PHY address on the management bus
    pub phy_address: u8,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mac_address: DEFAULT_MAC_ADDR,
            interface_id: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            buffer_alignment: DEFAULT_BUFFER_ALIGNMENT,
            rx_buffer_offset: 0,
            phy_address: 0,
        }
    }

    /// Set the station MAC address
    #[must_use]
    pub const fn with_mac_address(mut self, addr: [u8; 6]) -> Self {
        self.mac_address = addr;
        self
    }

    /// Set the interface identifier used for task signals
    #[must_use]
    pub const fn with_interface_id(mut self, id: u8) -> Self {
        self.interface_id = id;
        self
    }

    /// Set the pool buffer size
    #[must_use]
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the pool buffer alignment
    #[must_use]
    pub const fn with_buffer_alignment(mut self, alignment: usize) -> Self {
        self.buffer_alignment = alignment;
        self
    }

    /// Set the receive buffer offset
    #[must_use]
    pub const fn with_rx_buffer_offset(mut self, offset: usize) -> Self {
        self.rx_buffer_offset = offset;
        self
    }

    /// Set the PHY address
    #[must_use]
    pub const fn with_phy_address(mut self, addr: u8) -> Self {
        self.phy_address = addr;
        self
    }

    /// Check the configuration against the ring sizes it will drive.
    pub const fn validate(&self, rx_ring: usize, tx_ring: usize) -> ConfigResult<()> {
        if rx_ring < MIN_RING_SIZE || tx_ring < MIN_RING_SIZE {
            return Err(ConfigError::InvalidRingSize);
        }
        if self.buffer_alignment < 4 || !self.buffer_alignment.is_power_of_two() {
            return Err(ConfigError::InvalidBufferAlignment);
        }
        if self.buffer_size < MAX_FRAME_SIZE || self.buffer_size > MAX_DESC_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize);
        }
        if self.buffer_size % self.buffer_alignment != 0 {
            return Err(ConfigError::InvalidBufferAlignment);
        }
        if self.rx_buffer_offset % 4 != 0
            || self.rx_buffer_offset + MAX_FRAME_SIZE > self.buffer_size
        {
            return Err(ConfigError::InvalidBufferOffset);
        }
        if self.phy_address > MAX_PHY_ADDR {
            return Err(ConfigError::InvalidPhyAddress);
        }
        Ok(())
    }
}

/// EMAC driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Not initialized
    #[default]
    Uninitialized,
    /// Initialized but not started
    Initialized,
    /// Running (TX/RX enabled)
    Running,
    /// Stopped (TX/RX disabled but still initialized)
    Stopped,
}

// =============================================================================
// Unit Tests
// =============================================================================
