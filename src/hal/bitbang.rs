//! Software-clocked MDIO for chips without a hardware MII controller.
//!
//! Every frame is a 32-bit preamble of ones followed by the Clause-22 frame:
//!
//! ```text
//! | ST | OP | PHYAD | REGAD | TA | DATA    |
//! | 01 | 10 | 5     | 5     | Z0 | 16 bits |   read
//! | 01 | 01 | 5     | 5     | 10 | 16 bits |   write
//! ```
//!
//! Each MDC half-period is timed against a [`TickSource`] and every wait is
//! bounded, so a dead counter or an absent PHY ends in
//! [`IoError::Timeout`] rather than a hang. One [`PhyLock`] guards the pins,
//! so concurrent callers never interleave their clock pulses.

use embedded_hal::digital::{InputPin, OutputPin};

use super::mdio::{MdioBus, check_addresses};
use super::wait::{TickSource, mdio_half_period_ticks, wait_ticks};
use crate::driver::error::{IoError, IoResult, Result};
use crate::internal::constants::DEFAULT_POLL_RETRIES;
use crate::sync::PhyLock;

/// Start-of-frame pattern
const START: u32 = 0b01;
/// Read opcode
const OP_READ: u32 = 0b10;
/// Write opcode
const OP_WRITE: u32 = 0b01;
/// Preamble length in clocks
const PREAMBLE_BITS: usize = 32;

// =============================================================================
// Pin Seam
// =============================================================================

/// The two management-bus lines
pub trait MdioPins {
    /// Drive MDC
    fn set_mdc(&mut self, high: bool) -> IoResult<()>;

    /// Drive MDIO
    fn set_mdio(&mut self, high: bool) -> IoResult<()>;

    /// Stop driving MDIO so the PHY can
    fn release_mdio(&mut self) -> IoResult<()>;

    /// Sample MDIO
    fn read_mdio(&mut self) -> IoResult<bool>;
}

/// [`MdioPins`] over embedded-hal GPIO.
///
/// MDIO must be an open-drain pin with a pull-up, so releasing the line is
/// driving it high.
pub struct GpioMdioPins<MDC, MDIO> {
    mdc: MDC,
    mdio: MDIO,
}

impl<MDC, MDIO> GpioMdioPins<MDC, MDIO>
where
    MDC: OutputPin,
    MDIO: OutputPin + InputPin,
{
    /// Wrap the clock and open-drain data pins
    pub const fn new(mdc: MDC, mdio: MDIO) -> Self {
        Self { mdc, mdio }
    }

    /// Give the pins back
    pub fn release(self) -> (MDC, MDIO) {
        (self.mdc, self.mdio)
    }
}

impl<MDC, MDIO> MdioPins for GpioMdioPins<MDC, MDIO>
where
    MDC: OutputPin,
    MDIO: OutputPin + InputPin,
{
    fn set_mdc(&mut self, high: bool) -> IoResult<()> {
        self.mdc
            .set_state(high.into())
            .map_err(|_| IoError::PinFault)
    }

    fn set_mdio(&mut self, high: bool) -> IoResult<()> {
        self.mdio
            .set_state(high.into())
            .map_err(|_| IoError::PinFault)
    }

    fn release_mdio(&mut self) -> IoResult<()> {
        self.mdio.set_high().map_err(|_| IoError::PinFault)
    }

    fn read_mdio(&mut self) -> IoResult<bool> {
        self.mdio.is_high().map_err(|_| IoError::PinFault)
    }
}

// =============================================================================
// Bit-Bang Engine
// =============================================================================

/// Software MDIO engine
///
/// Implements [`MdioBus`] for both the engine and a shared reference to it,
/// so one bus can serve several PHY users.
pub struct BitBangMdio<P, T> {
    pins: PhyLock<P>,
    ticks: T,
    half_period: u32,
    retries: u32,
}

impl<P: MdioPins, T: TickSource> BitBangMdio<P, T> {
    /// Create an engine clocked at no more than 2.5 MHz
    pub fn new(pins: P, ticks: T) -> Self {
        let half_period = mdio_half_period_ticks(ticks.tick_frequency());
        Self {
            pins: PhyLock::new(pins),
            ticks,
            half_period,
            retries: DEFAULT_POLL_RETRIES,
        }
    }

    /// Bound every half-period wait to `retries` counter samples
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Counter ticks per MDC half-period
    pub fn half_period_ticks(&self) -> u32 {
        self.half_period
    }

    /// Direct access to the pins; the exclusive borrow rules out a
    /// transaction in progress.
    pub fn pins_mut(&mut self) -> &mut P {
        self.pins.get_mut()
    }

    /// Read a PHY register.
    ///
    /// # Errors
    /// - `InvalidPhyAddress` / `InvalidRegisterAddress` - outside 0..=31
    /// - `Timeout` - bus in use, counter stalled, or no PHY drove the turnaround
    /// - `PinFault` - a GPIO reported an error
    pub fn read_register(&self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        check_addresses(phy_addr, reg_addr)?;
        let mut pins = self.pins.try_lock().ok_or(IoError::Timeout)?;
        let mut bus = Clocked {
            pins: &mut *pins,
            ticks: &self.ticks,
            half_period: self.half_period,
            retries: self.retries,
        };
        Ok(bus.read_frame(phy_addr, reg_addr)?)
    }

    /// Write a PHY register.
    ///
    /// # Errors
    /// Same as [`read_register`](Self::read_register), except that a write is
    /// never acknowledged, so an absent PHY goes unnoticed.
    pub fn write_register(&self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        check_addresses(phy_addr, reg_addr)?;
        let mut pins = self.pins.try_lock().ok_or(IoError::Timeout)?;
        let mut bus = Clocked {
            pins: &mut *pins,
            ticks: &self.ticks,
            half_period: self.half_period,
            retries: self.retries,
        };
        Ok(bus.write_frame(phy_addr, reg_addr, value)?)
    }
}

/// One transaction's view of the locked pins
struct Clocked<'a, P, T> {
    pins: &'a mut P,
    ticks: &'a T,
    half_period: u32,
    retries: u32,
}

impl<P: MdioPins, T: TickSource> Clocked<'_, P, T> {
    fn half(&self) -> IoResult<()> {
        wait_ticks(self.ticks, self.half_period, self.retries)
    }

    /// Present `bit` and clock it into the PHY on the rising edge
    fn clock_out(&mut self, bit: bool) -> IoResult<()> {
        self.pins.set_mdio(bit)?;
        self.half()?;
        self.pins.set_mdc(true)?;
        self.half()?;
        self.pins.set_mdc(false)
    }

    /// Clock one bit out of the PHY and sample it once it has settled
    fn clock_in(&mut self) -> IoResult<bool> {
        self.pins.set_mdc(true)?;
        self.half()?;
        self.pins.set_mdc(false)?;
        self.half()?;
        self.pins.read_mdio()
    }

    /// Shift out the low `count` bits of `value`, MSB first
    fn shift_out(&mut self, value: u32, count: u32) -> IoResult<()> {
        for bit in (0..count).rev() {
            self.clock_out(value & (1 << bit) != 0)?;
        }
        Ok(())
    }

    fn header(&mut self, op: u32, phy_addr: u8, reg_addr: u8) -> IoResult<()> {
        for _ in 0..PREAMBLE_BITS {
            self.clock_out(true)?;
        }
        self.shift_out(START, 2)?;
        self.shift_out(op, 2)?;
        self.shift_out(u32::from(phy_addr), 5)?;
        self.shift_out(u32::from(reg_addr), 5)
    }

    fn read_frame(&mut self, phy_addr: u8, reg_addr: u8) -> IoResult<u16> {
        self.header(OP_READ, phy_addr, reg_addr)?;
        self.pins.release_mdio()?;
        self.clock_in()?;

        // The PHY drives the second turnaround bit low; a line left high by
        // the pull-up means nobody answered.
        if self.clock_in()? {
            return Err(IoError::Timeout);
        }

        let mut value = 0u16;
        for _ in 0..16 {
            value = (value << 1) | u16::from(self.clock_in()?);
        }
        self.clock_in()?;
        Ok(value)
    }

    fn write_frame(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> IoResult<()> {
        self.header(OP_WRITE, phy_addr, reg_addr)?;
        self.shift_out(0b10, 2)?;
        self.shift_out(u32::from(value), 16)?;
        self.pins.release_mdio()?;
        self.clock_in()?;
        Ok(())
    }
}

impl<P: MdioPins, T: TickSource> MdioBus for BitBangMdio<P, T> {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        self.read_register(phy_addr, reg_addr)
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        self.write_register(phy_addr, reg_addr, value)
    }

    fn is_busy(&self) -> bool {
        self.pins.is_locked()
    }
}

impl<P: MdioPins, T: TickSource> MdioBus for &BitBangMdio<P, T> {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        self.read_register(phy_addr, reg_addr)
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        self.write_register(phy_addr, reg_addr, value)
    }

    fn is_busy(&self) -> bool {
        self.pins.is_locked()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
