//! TX and RX DMA descriptor structures.
//!
//! Each descriptor is four words: ownership/status, control, buffer address,
//! and the address of the next descriptor in the chain. Whichever side holds
//! the OWN bit is the only side allowed to touch the other three words.

pub mod bits;
pub mod rx;
pub mod tx;

pub use rx::{RxDescriptor, RxErrorKind, RxStatus};
pub use tx::TxDescriptor;

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile to prevent compiler optimization
/// from reordering or caching descriptor field accesses.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: every access is a single volatile load or store of a word-sized value.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        // SAFETY: the pointer comes from our own UnsafeCell and is always valid.
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        // SAFETY: the pointer comes from our own UnsafeCell and is always valid.
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Update the value using a function (read-modify-write)
    #[inline(always)]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let old = self.get();
        self.set(f(old));
    }
}

impl<T: Copy + Default> Default for VolatileCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Orders descriptor field writes before the ownership flip that publishes them.
#[inline(always)]
pub(crate) fn publish_fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::Release);
}

/// Orders the ownership read before the reads of fields the DMA wrote.
#[inline(always)]
pub(crate) fn acquire_fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::Acquire);
}
