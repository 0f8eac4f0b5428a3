//! Register access seam.
//!
//! Chip profiles talk to hardware only through [`RegisterAccess`], so the same
//! profile code runs against real memory-mapped registers ([`Mmio`]) or a
//! register file in host tests.

use super::wait::poll_until;
use crate::driver::error::IoResult;

/// 32-bit register block addressed by byte offset
pub trait RegisterAccess {
    /// Read the register at `offset`
    fn read(&self, offset: usize) -> u32;

    /// Write the register at `offset`
    fn write(&self, offset: usize, value: u32);

    /// Read-modify-write
    #[inline]
    fn modify<F>(&self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        self.write(offset, f(self.read(offset)));
    }

    /// Set the bits in `mask`
    #[inline]
    fn set_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |v| v | mask);
    }

    /// Clear the bits in `mask`
    #[inline]
    fn clear_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |v| v & !mask);
    }

    /// Wait until `read(offset) & mask == expected`, bounded by `retries`
    fn poll(&self, offset: usize, mask: u32, expected: u32, retries: u32) -> IoResult<()> {
        poll_until(retries, || self.read(offset) & mask == expected)
    }
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &R {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }
}

/// Memory-mapped register block at a fixed base address
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create a register block.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block that stays
    /// mapped for the lifetime of the value, and nothing else may assume
    /// exclusive access to it.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address
    #[inline(always)]
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` requires `base` to be a mapped register block.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        // SAFETY: `new` requires `base` to be a mapped register block.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}
