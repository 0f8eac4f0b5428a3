//! Host network-stack services consumed by the driver.
//!
//! The engine never owns frame memory. Buffers come from the stack's pool,
//! completed receive buffers go back to the stack inside a [`Frame`], and
//! transmitted buffers are returned through a deferred-deallocation queue.
//!
//! All service methods take `&self` because they are called from interrupt
//! context as well as task context. Implementations use their own interior
//! mutability and must never block.

use core::ptr::NonNull;

// =============================================================================
// Buffer Handle
// =============================================================================

/// Address of a buffer owned by the stack's pool
///
/// The handle is only an address. Whoever currently holds it (the stack, a
/// software-owned descriptor, or a DMA-owned descriptor) is the only party
/// allowed to touch the memory behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferPtr(NonNull<u8>);

impl BufferPtr {
    /// Wrap a non-null buffer address
    #[inline]
    #[must_use]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr)
    }

    /// Wrap a raw address, rejecting null
    #[inline]
    #[must_use]
    pub fn from_ptr(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Raw pointer to the start of the buffer
    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Numeric address, as programmed into a descriptor
    #[inline]
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

// SAFETY: a BufferPtr is a plain address; exclusive access to the memory is
// arbitrated by descriptor ownership, not by the handle.
unsafe impl Send for BufferPtr {}

#[cfg(feature = "defmt")]
impl defmt::Format for BufferPtr {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "BufferPtr({=usize:#x})", self.addr());
    }
}

// =============================================================================
// Received Frame
// =============================================================================

/// A received frame handed to the stack
///
/// The stack now owns `buffer` and returns it to its pool when done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Pool buffer holding the frame
    pub buffer: BufferPtr,
    /// Offset of the first frame byte within `buffer`
    pub offset: usize,
    /// Frame length in bytes, excluding the FCS
    pub len: usize,
}

impl Frame {
    /// Pointer to the first byte of the frame
    #[inline]
    #[must_use]
    pub fn data_ptr(&self) -> *const u8 {
        self.buffer.as_ptr().wrapping_add(self.offset)
    }

    /// View the frame contents.
    ///
    /// # Safety
    ///
    /// `buffer` must still be live and at least `offset + len` bytes long.
    #[inline]
    #[must_use]
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: upheld by the caller.
        unsafe { core::slice::from_raw_parts(self.data_ptr(), self.len) }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Fixed-size buffer pool
pub trait BufferPool {
    /// Take a buffer of at least `size` bytes, or `None` when exhausted
    fn get_buffer(&self, size: usize) -> Option<BufferPtr>;

    /// Return a buffer previously obtained from [`get_buffer`](Self::get_buffer)
    fn free_buffer(&self, buffer: BufferPtr);
}

/// Wake-up primitive for the stack's network task
pub trait TaskSignal {
    /// A received frame is waiting on interface `if_id`
    fn signal_rx_ready(&self, if_id: u8);

    /// Transmit resources became available on interface `if_id`
    fn signal_tx_ready(&self, if_id: u8);
}

/// Deferred release of transmitted buffers
///
/// Posting is fire-and-forget. Consumers must silently ignore buffers they do
/// not recognise and buffers posted more than once.
pub trait DeallocQueue {
    /// Queue `buffer` for release by the stack
    fn post_for_dealloc(&self, buffer: BufferPtr);
}

/// Everything the driver needs from its host stack
pub trait NetStack: BufferPool + TaskSignal + DeallocQueue {}

impl<T: BufferPool + TaskSignal + DeallocQueue + ?Sized> NetStack for T {}

impl<T: BufferPool + ?Sized> BufferPool for &T {
    fn get_buffer(&self, size: usize) -> Option<BufferPtr> {
        (**self).get_buffer(size)
    }

    fn free_buffer(&self, buffer: BufferPtr) {
        (**self).free_buffer(buffer);
    }
}

impl<T: TaskSignal + ?Sized> TaskSignal for &T {
    fn signal_rx_ready(&self, if_id: u8) {
        (**self).signal_rx_ready(if_id);
    }

    fn signal_tx_ready(&self, if_id: u8) {
        (**self).signal_tx_ready(if_id);
    }
}

impl<T: DeallocQueue + ?Sized> DeallocQueue for &T {
    fn post_for_dealloc(&self, buffer: BufferPtr) {
        (**self).post_for_dealloc(buffer);
    }
}
