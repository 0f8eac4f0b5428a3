//! Synopsys DesignWare MAC profile.
//!
//! The DMA and MAC register blocks are reached through [`RegisterAccess`], so
//! the profile works for any SoC that integrates this core at any base
//! address. The hash filter is 64 bits wide and loaded through the hash
//! registers; the management bus is the core's own MII controller
//! ([`DwmacMdio`]).

use embedded_hal::delay::DelayNs;

use super::chip::{Direction, FilterUpdate, HashWidth, MacHardware};
use super::mdio::{MdioBus, check_addresses};
use super::mmio::RegisterAccess;
use crate::driver::config::{Duplex, Speed};
use crate::driver::error::{IoError, IoResult, Result};
use crate::driver::interrupt::{InterruptStatus, Interrupts};
use crate::internal::constants::MAC_ADDR_LEN;

// =============================================================================
// Register Map
// =============================================================================

/// DMA register block
pub mod dma {
    /// Bus Mode
    pub const BUSMODE: usize = 0x00;
    /// Transmit Poll Demand
    pub const TXPOLL: usize = 0x04;
    /// Receive Poll Demand
    pub const RXPOLL: usize = 0x08;
    /// Receive Descriptor List Address
    pub const RXBASE: usize = 0x0C;
    /// Transmit Descriptor List Address
    pub const TXBASE: usize = 0x10;
    /// Status
    pub const STATUS: usize = 0x14;
    /// Operation Mode
    pub const OPERATION: usize = 0x18;
    /// Interrupt Enable
    pub const INTENABLE: usize = 0x1C;

    /// Software reset, self-clearing
    pub const BUSMODE_SW_RST: u32 = 1 << 0;

    /// Transmit complete
    pub const STATUS_TI: u32 = 1 << 0;
    /// Transmit process stopped
    pub const STATUS_TPS: u32 = 1 << 1;
    /// Transmit buffer unavailable
    pub const STATUS_TU: u32 = 1 << 2;
    /// Receive overflow
    pub const STATUS_OVF: u32 = 1 << 4;
    /// Transmit underflow
    pub const STATUS_UNF: u32 = 1 << 5;
    /// Receive complete
    pub const STATUS_RI: u32 = 1 << 6;
    /// Receive buffer unavailable
    pub const STATUS_RU: u32 = 1 << 7;
    /// Receive process stopped
    pub const STATUS_RPS: u32 = 1 << 8;
    /// Fatal bus error
    pub const STATUS_FBI: u32 = 1 << 13;
    /// Abnormal interrupt summary
    pub const STATUS_AIS: u32 = 1 << 15;
    /// Normal interrupt summary
    pub const STATUS_NIS: u32 = 1 << 16;
    /// Receive process state
    pub const STATUS_RS_SHIFT: u32 = 17;
    /// Transmit process state
    pub const STATUS_TS_SHIFT: u32 = 20;
    /// Process state field width
    pub const STATUS_PROCESS_MASK: u32 = 0x7;
    /// Receive process suspended (descriptor unavailable)
    pub const RS_SUSPENDED: u32 = 4;
    /// Transmit process suspended (descriptor unavailable)
    pub const TS_SUSPENDED: u32 = 6;

    /// Write-one-to-clear status bits
    pub const STATUS_CLEARABLE: u32 = STATUS_TI
        | STATUS_TPS
        | STATUS_TU
        | STATUS_OVF
        | STATUS_UNF
        | STATUS_RI
        | STATUS_RU
        | STATUS_RPS
        | STATUS_FBI
        | STATUS_AIS
        | STATUS_NIS;

    /// Start receive
    pub const OPERATION_SR: u32 = 1 << 1;
    /// Start transmit
    pub const OPERATION_ST: u32 = 1 << 13;
    /// Flush transmit FIFO, self-clearing
    pub const OPERATION_FTF: u32 = 1 << 20;
    /// Transmit store and forward
    pub const OPERATION_TSF: u32 = 1 << 21;
    /// Receive store and forward
    pub const OPERATION_RSF: u32 = 1 << 25;

    /// Transmit interrupt enable
    pub const INTEN_TIE: u32 = 1 << 0;
    /// Overflow interrupt enable
    pub const INTEN_OVE: u32 = 1 << 4;
    /// Underflow interrupt enable
    pub const INTEN_UNE: u32 = 1 << 5;
    /// Receive interrupt enable
    pub const INTEN_RIE: u32 = 1 << 6;
    /// Fatal bus error enable
    pub const INTEN_FBE: u32 = 1 << 13;
    /// Abnormal summary enable
    pub const INTEN_AIE: u32 = 1 << 15;
    /// Normal summary enable
    pub const INTEN_NIE: u32 = 1 << 16;
}

/// MAC register block
pub mod mac {
    /// MAC Configuration
    pub const CONFIG: usize = 0x00;
    /// Frame Filter
    pub const FF: usize = 0x04;
    /// Hash Table High
    pub const HASHH: usize = 0x08;
    /// Hash Table Low
    pub const HASHL: usize = 0x0C;
    /// MII Address
    pub const MIIADDR: usize = 0x10;
    /// MII Data
    pub const MIIDATA: usize = 0x14;
    /// Station address high half
    pub const ADDR0H: usize = 0x40;
    /// Station address low word
    pub const ADDR0L: usize = 0x44;

    /// Receiver enable
    pub const CONFIG_RE: u32 = 1 << 2;
    /// Transmitter enable
    pub const CONFIG_TE: u32 = 1 << 3;
    /// Full duplex
    pub const CONFIG_DM: u32 = 1 << 11;
    /// 100 Mbps
    pub const CONFIG_FES: u32 = 1 << 14;
    /// MII port select
    pub const CONFIG_PS: u32 = 1 << 15;

    /// Hash multicast filtering
    pub const FF_HMC: u32 = 1 << 2;

    /// Address enable, always set for address 0
    pub const ADDRH_AE: u32 = 1 << 31;

    /// MII busy
    pub const MIIADDR_GB: u32 = 1 << 0;
    /// MII write
    pub const MIIADDR_GW: u32 = 1 << 1;
    /// Clock range shift
    pub const MIIADDR_CR_SHIFT: u32 = 2;
    /// Clock range mask
    pub const MIIADDR_CR_MASK: u32 = 0xF << 2;
    /// Register address shift
    pub const MIIADDR_GR_SHIFT: u32 = 6;
    /// Register address mask
    pub const MIIADDR_GR_MASK: u32 = 0x1F << 6;
    /// PHY address shift
    pub const MIIADDR_PA_SHIFT: u32 = 11;
    /// PHY address mask
    pub const MIIADDR_PA_MASK: u32 = 0x1F << 11;
}

const fn inten_bits(sources: Interrupts) -> u32 {
    let mut bits = 0;
    if sources.contains(Interrupts::TX_DONE) {
        bits |= dma::INTEN_TIE;
    }
    if sources.contains(Interrupts::RX_READY) {
        bits |= dma::INTEN_RIE;
    }
    if sources.contains(Interrupts::RX_OVERRUN) {
        bits |= dma::INTEN_OVE;
    }
    if sources.contains(Interrupts::TX_UNDERRUN) {
        bits |= dma::INTEN_UNE;
    }
    if sources.contains(Interrupts::BUS_ERROR) {
        bits |= dma::INTEN_FBE;
    }
    bits
}

// =============================================================================
// MAC/DMA Profile
// =============================================================================

/// DesignWare MAC and DMA register blocks
#[derive(Debug)]
pub struct Dwmac<R: RegisterAccess> {
    mac: R,
    dma: R,
}

impl<R: RegisterAccess> Dwmac<R> {
    /// Wrap the MAC and DMA register blocks
    pub const fn new(mac: R, dma: R) -> Self {
        Self { mac, dma }
    }

    /// MAC register block
    pub fn mac_regs(&self) -> &R {
        &self.mac
    }

    /// DMA register block
    pub fn dma_regs(&self) -> &R {
        &self.dma
    }

    fn process_state(&self, dir: Direction) -> u32 {
        let shift = match dir {
            Direction::Rx => dma::STATUS_RS_SHIFT,
            Direction::Tx => dma::STATUS_TS_SHIFT,
        };
        (self.dma.read(dma::STATUS) >> shift) & dma::STATUS_PROCESS_MASK
    }
}

impl<R: RegisterAccess> MacHardware for Dwmac<R> {
    const HASH_WIDTH: HashWidth = HashWidth::Bits64;
    const FILTER_UPDATE: FilterUpdate = FilterUpdate::Registers;

    fn reset(&mut self) -> IoResult<()> {
        self.dma.set_bits(dma::BUSMODE, dma::BUSMODE_SW_RST);
        self.dma
            .poll(dma::BUSMODE, dma::BUSMODE_SW_RST, 0, Self::POLL_RETRIES)?;

        self.mac.write(
            mac::CONFIG,
            mac::CONFIG_PS | mac::CONFIG_FES | mac::CONFIG_DM,
        );
        self.mac.write(mac::FF, mac::FF_HMC);
        self.mac.write(mac::HASHH, 0);
        self.mac.write(mac::HASHL, 0);
        self.dma
            .write(dma::OPERATION, dma::OPERATION_TSF | dma::OPERATION_RSF);
        self.dma.write(dma::INTENABLE, 0);
        self.dma.write(dma::STATUS, dma::STATUS_CLEARABLE);
        Ok(())
    }

    fn set_mac_address(&mut self, addr: &[u8; MAC_ADDR_LEN]) {
        let low = u32::from_le_bytes([addr[0], addr[1], addr[2], addr[3]]);
        let high = u32::from(addr[4]) | (u32::from(addr[5]) << 8) | mac::ADDRH_AE;
        // The low word is latched on the high-word write.
        self.mac.write(mac::ADDR0L, low);
        self.mac.write(mac::ADDR0H, high);
    }

    fn set_descriptor_base(&mut self, dir: Direction, addr: usize) {
        let offset = match dir {
            Direction::Rx => dma::RXBASE,
            Direction::Tx => dma::TXBASE,
        };
        self.dma.write(offset, addr as u32);
    }

    fn start(&mut self, dir: Direction) {
        match dir {
            Direction::Rx => {
                self.dma.set_bits(dma::OPERATION, dma::OPERATION_SR);
                self.mac.set_bits(mac::CONFIG, mac::CONFIG_RE);
            }
            Direction::Tx => {
                self.mac.set_bits(mac::CONFIG, mac::CONFIG_TE);
                self.dma.set_bits(dma::OPERATION, dma::OPERATION_ST);
            }
        }
    }

    fn stop(&mut self, dir: Direction) {
        match dir {
            Direction::Rx => {
                self.mac.clear_bits(mac::CONFIG, mac::CONFIG_RE);
                self.dma.clear_bits(dma::OPERATION, dma::OPERATION_SR);
            }
            Direction::Tx => {
                self.dma.clear_bits(dma::OPERATION, dma::OPERATION_ST);
                self.mac.clear_bits(mac::CONFIG, mac::CONFIG_TE);
            }
        }
    }

    fn is_stopped(&self, dir: Direction) -> bool {
        let state = self.process_state(dir);
        let suspended = match dir {
            Direction::Rx => dma::RS_SUSPENDED,
            Direction::Tx => dma::TS_SUSPENDED,
        };
        state == 0 || state == suspended
    }

    fn poll_demand(&mut self, dir: Direction) {
        let offset = match dir {
            Direction::Rx => dma::RXPOLL,
            Direction::Tx => dma::TXPOLL,
        };
        self.dma.write(offset, 0);
    }

    fn flush_tx(&mut self) -> IoResult<()> {
        self.dma.set_bits(dma::OPERATION, dma::OPERATION_FTF);
        self.dma
            .poll(dma::OPERATION, dma::OPERATION_FTF, 0, Self::POLL_RETRIES)
    }

    fn enable_interrupts(&mut self, sources: Interrupts) {
        self.dma.set_bits(
            dma::INTENABLE,
            inten_bits(sources) | dma::INTEN_NIE | dma::INTEN_AIE,
        );
    }

    fn disable_interrupts(&mut self, sources: Interrupts) {
        self.dma.clear_bits(dma::INTENABLE, inten_bits(sources));
    }

    fn interrupt_status(&self) -> InterruptStatus {
        let raw = self.dma.read(dma::STATUS);
        let enabled = self.dma.read(dma::INTENABLE);

        let mut pending = Interrupts::empty();
        let sources = [
            (dma::STATUS_TI, dma::INTEN_TIE, Interrupts::TX_DONE),
            (dma::STATUS_RI, dma::INTEN_RIE, Interrupts::RX_READY),
            (dma::STATUS_OVF, dma::INTEN_OVE, Interrupts::RX_OVERRUN),
            (dma::STATUS_UNF, dma::INTEN_UNE, Interrupts::TX_UNDERRUN),
            (dma::STATUS_FBI, dma::INTEN_FBE, Interrupts::BUS_ERROR),
        ];
        for (status_bit, enable_bit, source) in sources {
            if raw & status_bit != 0 && enabled & enable_bit != 0 {
                pending |= source;
            }
        }
        InterruptStatus::new(pending, raw & dma::STATUS_CLEARABLE)
    }

    fn clear_interrupts(&mut self, status: InterruptStatus) {
        self.dma.write(dma::STATUS, status.raw & dma::STATUS_CLEARABLE);
    }

    fn set_link(&mut self, speed: Speed, duplex: Duplex) {
        self.mac.modify(mac::CONFIG, |mut cfg| {
            match speed {
                Speed::Mbps100 => cfg |= mac::CONFIG_FES,
                Speed::Mbps10 => cfg &= !mac::CONFIG_FES,
            }
            match duplex {
                Duplex::Full => cfg |= mac::CONFIG_DM,
                Duplex::Half => cfg &= !mac::CONFIG_DM,
            }
            cfg
        });
    }

    fn write_hash_filter(&mut self, table: &[u32]) {
        self.mac.write(mac::HASHL, table.first().copied().unwrap_or(0));
        self.mac.write(mac::HASHH, table.get(1).copied().unwrap_or(0));
    }
}

// =============================================================================
// Hardware MII Controller
// =============================================================================

/// Default MDIO operation timeout in microseconds
pub const MDIO_TIMEOUT_US: u32 = 1_000;

/// MDC clock divider values based on system clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MdcClockDivider {
    /// Clock/42 (60-100 MHz system clock)
    Div42 = 0,
    /// Clock/62 (100-150 MHz system clock)
    Div62 = 1,
    /// Clock/16 (20-35 MHz system clock)
    Div16 = 2,
    /// Clock/26 (35-60 MHz system clock)
    Div26 = 3,
    /// Clock/102 (150-250 MHz system clock)
    #[default]
    Div102 = 4,
    /// Clock/124 (250-300 MHz system clock)
    Div124 = 5,
}

impl MdcClockDivider {
    /// Pick the divider keeping MDC at or below 2.5 MHz
    pub const fn from_sys_clock_hz(sys_clk_hz: u32) -> Self {
        if sys_clk_hz < 35_000_000 {
            Self::Div16
        } else if sys_clk_hz < 60_000_000 {
            Self::Div26
        } else if sys_clk_hz < 100_000_000 {
            Self::Div42
        } else if sys_clk_hz < 150_000_000 {
            Self::Div62
        } else if sys_clk_hz < 250_000_000 {
            Self::Div102
        } else {
            Self::Div124
        }
    }

    /// Field value for the clock range bits
    pub const fn to_reg_value(self) -> u32 {
        self as u32
    }
}

/// MDIO through the core's MII address/data registers
#[derive(Debug)]
pub struct DwmacMdio<R: RegisterAccess, D: DelayNs> {
    regs: R,
    clock_divider: MdcClockDivider,
    delay: D,
    timeout_us: u32,
}

impl<R: RegisterAccess, D: DelayNs> DwmacMdio<R, D> {
    /// Create a controller over the MAC register block
    pub fn new(regs: R, delay: D) -> Self {
        Self {
            regs,
            clock_divider: MdcClockDivider::default(),
            delay,
            timeout_us: MDIO_TIMEOUT_US,
        }
    }

    /// Pick the clock divider for the given system clock
    pub fn configure_for_sys_clock(&mut self, sys_clk_hz: u32) {
        self.clock_divider = MdcClockDivider::from_sys_clock_hz(sys_clk_hz);
    }

    /// Set the operation timeout
    pub fn set_timeout_us(&mut self, timeout_us: u32) {
        self.timeout_us = timeout_us;
    }

    fn wait_not_busy(&mut self) -> IoResult<()> {
        let mut elapsed = 0u32;
        while self.regs.read(mac::MIIADDR) & mac::MIIADDR_GB != 0 {
            if elapsed >= self.timeout_us {
                return Err(IoError::Timeout);
            }
            self.delay.delay_us(10);
            elapsed += 10;
        }
        Ok(())
    }

    fn build_mii_addr(&self, phy_addr: u8, reg_addr: u8, is_write: bool) -> u32 {
        let mut addr = ((phy_addr as u32) << mac::MIIADDR_PA_SHIFT) & mac::MIIADDR_PA_MASK;
        addr |= ((reg_addr as u32) << mac::MIIADDR_GR_SHIFT) & mac::MIIADDR_GR_MASK;
        addr |= (self.clock_divider.to_reg_value() << mac::MIIADDR_CR_SHIFT) & mac::MIIADDR_CR_MASK;
        if is_write {
            addr |= mac::MIIADDR_GW;
        }
        addr | mac::MIIADDR_GB
    }
}

impl<R: RegisterAccess, D: DelayNs> MdioBus for DwmacMdio<R, D> {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        check_addresses(phy_addr, reg_addr)?;
        self.wait_not_busy()?;

        let addr = self.build_mii_addr(phy_addr, reg_addr, false);
        self.regs.write(mac::MIIADDR, addr);
        self.wait_not_busy()?;

        Ok((self.regs.read(mac::MIIDATA) & 0xFFFF) as u16)
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        check_addresses(phy_addr, reg_addr)?;
        self.wait_not_busy()?;

        self.regs.write(mac::MIIDATA, u32::from(value));
        let addr = self.build_mii_addr(phy_addr, reg_addr, true);
        self.regs.write(mac::MIIADDR, addr);
        Ok(self.wait_not_busy()?)
    }

    fn is_busy(&self) -> bool {
        self.regs.read(mac::MIIADDR) & mac::MIIADDR_GB != 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
