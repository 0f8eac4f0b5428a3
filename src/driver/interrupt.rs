//! Interrupt sources in chip-neutral form.
//!
//! Chip profiles translate their status and enable registers to and from
//! [`Interrupts`], so the completion logic in the driver never sees raw bits.

use core::ops::{BitOr, BitOrAssign};

// =============================================================================
// Interrupt Source Mask
// =============================================================================

/// Set of interrupt sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Interrupts(u8);

impl Interrupts {
    /// A receive descriptor was completed
    pub const RX_READY: Self = Self(1 << 0);
    /// A transmit descriptor was completed
    pub const TX_DONE: Self = Self(1 << 1);
    /// The receive FIFO or ring overflowed
    pub const RX_OVERRUN: Self = Self(1 << 2);
    /// The transmit FIFO ran dry mid-frame
    pub const TX_UNDERRUN: Self = Self(1 << 3);
    /// The DMA hit a fatal bus error
    pub const BUS_ERROR: Self = Self(1 << 4);

    /// Every source the driver services
    pub const ALL: Self = Self(0x1F);

    /// No sources
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit representation
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// `true` when no source is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every source in `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when any source in `other` is set
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of two sets
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Sources in `self` but not in `other`
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Sources in both sets
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl BitOr for Interrupts {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Interrupts {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

// =============================================================================
// Interrupt Kind
// =============================================================================

/// A single interrupt source, as dispatched to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptKind {
    /// Receive completion
    RxReady,
    /// Transmit completion
    TxDone,
    /// Receive overrun
    RxOverrun,
    /// Transmit underrun
    TxUnderrun,
    /// Fatal bus error
    BusError,
}

impl InterruptKind {
    /// Every kind, in servicing order
    pub const ALL: [InterruptKind; 5] = [
        InterruptKind::BusError,
        InterruptKind::RxOverrun,
        InterruptKind::TxUnderrun,
        InterruptKind::TxDone,
        InterruptKind::RxReady,
    ];

    /// The source this kind corresponds to
    #[must_use]
    pub const fn source(self) -> Interrupts {
        match self {
            InterruptKind::RxReady => Interrupts::RX_READY,
            InterruptKind::TxDone => Interrupts::TX_DONE,
            InterruptKind::RxOverrun => Interrupts::RX_OVERRUN,
            InterruptKind::TxUnderrun => Interrupts::TX_UNDERRUN,
            InterruptKind::BusError => Interrupts::BUS_ERROR,
        }
    }
}

// =============================================================================
// Interrupt Status
// =============================================================================

/// Pending interrupt state read from the chip.
///
/// `pending` holds the enabled sources that fired. `raw` keeps the chip's own
/// status bits so the exact same set can be acknowledged afterwards.
///
/// # Example
///
/// ```ignore
/// let status = emac.interrupt_status();
/// if status.rx_ready() {
///     // frames are waiting
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptStatus {
    /// Enabled sources that are pending
    pub pending: Interrupts,
    /// Chip-specific status bits to acknowledge
    pub raw: u32,
}

impl InterruptStatus {
    /// Build from decoded sources and the raw status word
    #[inline]
    #[must_use]
    pub const fn new(pending: Interrupts, raw: u32) -> Self {
        Self { pending, raw }
    }

    /// Receive completion pending
    #[inline]
    #[must_use]
    pub const fn rx_ready(&self) -> bool {
        self.pending.contains(Interrupts::RX_READY)
    }

    /// Transmit completion pending
    #[inline]
    #[must_use]
    pub const fn tx_done(&self) -> bool {
        self.pending.contains(Interrupts::TX_DONE)
    }

    /// Receive overrun pending
    #[inline]
    #[must_use]
    pub const fn rx_overrun(&self) -> bool {
        self.pending.contains(Interrupts::RX_OVERRUN)
    }

    /// Transmit underrun pending
    #[inline]
    #[must_use]
    pub const fn tx_underrun(&self) -> bool {
        self.pending.contains(Interrupts::TX_UNDERRUN)
    }

    /// Fatal bus error pending
    #[inline]
    #[must_use]
    pub const fn bus_error(&self) -> bool {
        self.pending.contains(Interrupts::BUS_ERROR)
    }

    /// Check if any source is pending
    #[inline]
    #[must_use]
    pub const fn any(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Check if any error source is pending
    #[inline]
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.pending.intersects(
            Interrupts::RX_OVERRUN
                .union(Interrupts::TX_UNDERRUN)
                .union(Interrupts::BUS_ERROR),
        )
    }

    /// Pending kinds, in servicing order
    pub fn kinds(&self) -> impl Iterator<Item = InterruptKind> + '_ {
        InterruptKind::ALL
            .into_iter()
            .filter(|kind| self.pending.contains(kind.source()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
