//! Bounded waiting.
//!
//! Every hardware wait in the crate goes through [`poll_until`], so a device
//! that never answers turns into [`IoError::Timeout`] instead of a hang.

use crate::driver::error::{IoError, IoResult};
use crate::internal::constants::MDIO_MAX_FREQ_HZ;

/// Free-running hardware timestamp counter
pub trait TickSource {
    /// Current counter value; wraps freely
    fn now_ticks(&self) -> u32;

    /// Counter frequency in Hz
    fn tick_frequency(&self) -> u32;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ticks(&self) -> u32 {
        (**self).now_ticks()
    }

    fn tick_frequency(&self) -> u32 {
        (**self).tick_frequency()
    }
}

/// Evaluate `done` until it returns `true`, at most `retries + 1` times.
pub fn poll_until<F>(retries: u32, mut done: F) -> IoResult<()>
where
    F: FnMut() -> bool,
{
    for _ in 0..retries {
        if done() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    if done() { Ok(()) } else { Err(IoError::Timeout) }
}

/// Busy-wait until `ticks` counter ticks have elapsed.
///
/// The counter is sampled at most `retries + 1` times, so a stalled counter
/// yields [`IoError::Timeout`].
pub fn wait_ticks<T: TickSource + ?Sized>(source: &T, ticks: u32, retries: u32) -> IoResult<()> {
    let start = source.now_ticks();
    poll_until(retries, || source.now_ticks().wrapping_sub(start) >= ticks)
}

/// Ticks in one MDC half-period at the fastest clock the bus allows.
#[must_use]
pub const fn mdio_half_period_ticks(tick_frequency: u32) -> u32 {
    let per_half = 2 * MDIO_MAX_FREQ_HZ;
    let ticks = tick_frequency.div_ceil(per_half);
    if ticks == 0 { 1 } else { ticks }
}
