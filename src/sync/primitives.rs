//! Synchronization primitives for ISR-safe access.

use core::cell::{Cell, RefCell, UnsafeCell};
use core::ops::{Deref, DerefMut};
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` for safe mutable access
/// from both normal code and interrupt handlers.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: CriticalSectionCell uses critical sections to protect all access.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}

// =============================================================================
// PHY Access Lock
// =============================================================================

/// Non-blocking lock around a single-instance resource.
///
/// The flag is tested and set inside a critical section, but the protected
/// value is used outside it, so long transactions such as a bit-banged MDIO
/// frame do not hold interrupts off. A contended [`try_lock`](Self::try_lock)
/// fails immediately instead of waiting.
pub struct PhyLock<T> {
    locked: Mutex<Cell<bool>>,
    value: UnsafeCell<T>,
}

impl<T> PhyLock<T> {
    /// Create an unlocked lock (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            locked: Mutex::new(Cell::new(false)),
            value: UnsafeCell::new(value),
        }
    }

    /// Take the lock, or `None` when another holder has it.
    pub fn try_lock(&self) -> Option<PhyLockGuard<'_, T>> {
        let acquired = critical_section::with(|cs| {
            let flag = self.locked.borrow(cs);
            if flag.get() {
                false
            } else {
                flag.set(true);
                true
            }
        });
        acquired.then_some(PhyLockGuard { lock: self })
    }

    /// Whether a guard is currently alive
    pub fn is_locked(&self) -> bool {
        critical_section::with(|cs| self.locked.borrow(cs).get())
    }

    /// Direct access through an exclusive borrow; no locking needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

// SAFETY: the value is only reachable through a guard, and the flag admits
// at most one guard at a time.
unsafe impl<T: Send> Sync for PhyLock<T> {}

/// Scoped access to a [`PhyLock`]; the lock is released on drop.
pub struct PhyLockGuard<'a, T> {
    lock: &'a PhyLock<T>,
}

impl<T> Deref for PhyLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this guard is the only live access path to the value.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for PhyLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this guard is the only live access path to the value.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for PhyLockGuard<'_, T> {
    fn drop(&mut self) {
        critical_section::with(|cs| self.lock.locked.borrow(cs).set(false));
    }
}

// =============================================================================
// Waker Storage
// =============================================================================

/// Thread-safe, interrupt-safe waker storage for async I/O.
///
/// Register a waker from async poll, wake from interrupt handler.
#[cfg(feature = "async")]
pub struct AtomicWaker {
    waker: CriticalSectionCell<Option<Waker>>,
}

#[cfg(feature = "async")]
impl AtomicWaker {
    /// Create a new empty waker (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionCell::new(None),
        }
    }

    /// Register a waker to be woken later.
    pub fn register(&self, waker: &Waker) {
        self.waker.with(|slot| match slot {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        });
    }

    /// Wake the registered waker, if any (clears the stored waker).
    #[inline]
    pub fn wake(&self) {
        if let Some(waker) = self.waker.with(Option::take) {
            waker.wake();
        }
    }

    /// Check if a waker is currently registered.
    pub fn is_registered(&self) -> bool {
        self.waker.with(|slot| slot.is_some())
    }
}

#[cfg(feature = "async")]
impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}
