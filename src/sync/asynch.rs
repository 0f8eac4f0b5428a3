//! Async/await support for the receive and transmit paths.
//!
//! [`AsyncSignals`] is a [`TaskSignal`] that turns the driver's task signals
//! into wakeups, so an async network task can wait for frames and for room
//! in the transmit ring instead of polling.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use super::primitives::{AtomicWaker, CriticalSectionCell};
use crate::stack::TaskSignal;

/// One wakeup channel: a sticky flag plus the waker to call when it is set.
struct Channel {
    waker: AtomicWaker,
    pending: CriticalSectionCell<bool>,
}

impl Channel {
    const fn new() -> Self {
        Self {
            waker: AtomicWaker::new(),
            pending: CriticalSectionCell::new(false),
        }
    }

    fn signal(&self) {
        self.pending.with(|pending| *pending = true);
        self.waker.wake();
    }

    fn take(&self) -> bool {
        self.pending.with(core::mem::take)
    }
}

/// Task signals delivered as async wakeups.
///
/// Signals are sticky: one raised while nobody waits completes the next
/// wait immediately. Several signals before a wait collapse into one.
///
/// # Example
///
/// ```ignore
/// static SIGNALS: AsyncSignals = AsyncSignals::new();
///
/// impl TaskSignal for Stack {
///     fn signal_rx_ready(&self, if_id: u8) { SIGNALS.signal_rx_ready(if_id) }
///     fn signal_tx_ready(&self, if_id: u8) { SIGNALS.signal_tx_ready(if_id) }
/// }
///
/// let frame = EMAC.receive_async(&SIGNALS).await?;
/// ```
pub struct AsyncSignals {
    rx: Channel,
    tx: Channel,
}

impl AsyncSignals {
    /// Create with nothing signalled (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            rx: Channel::new(),
            tx: Channel::new(),
        }
    }

    /// Wait for the next receive signal
    pub fn wait_rx(&self) -> SignalFuture<'_> {
        SignalFuture { channel: &self.rx }
    }

    /// Wait for the next transmit signal
    pub fn wait_tx(&self) -> SignalFuture<'_> {
        SignalFuture { channel: &self.tx }
    }

    /// Drop any pending signals
    pub fn reset(&self) {
        self.rx.take();
        self.tx.take();
    }
}

impl Default for AsyncSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSignal for AsyncSignals {
    fn signal_rx_ready(&self, _if_id: u8) {
        self.rx.signal();
    }

    fn signal_tx_ready(&self, _if_id: u8) {
        self.tx.signal();
    }
}

/// Future returned by [`AsyncSignals::wait_rx`] and [`AsyncSignals::wait_tx`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct SignalFuture<'a> {
    channel: &'a Channel,
}

impl Future for SignalFuture<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.channel.take() {
            return Poll::Ready(());
        }

        self.channel.waker.register(cx.waker());

        // Double-check after registering to avoid missing a signal raised in
        // between.
        if self.channel.take() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
mod tests {
    extern crate std;

    use core::pin::pin;

    use super::*;
    use crate::sync::primitives::tests::{WakeCounter, test_waker};

    fn poll_once<F: Future>(
        future: Pin<&mut F>,
        counter: &std::sync::Arc<WakeCounter>,
    ) -> Poll<F::Output> {
        let waker = test_waker(counter.clone());
        let mut cx = Context::from_waker(&waker);
        future.poll(&mut cx)
    }

    #[test]
    fn wait_pends_until_signalled() {
        let signals = AsyncSignals::new();
        let counter = WakeCounter::new();
        let mut wait = pin!(signals.wait_rx());

        assert_eq!(poll_once(wait.as_mut(), &counter), Poll::Pending);
        signals.signal_rx_ready(0);
        assert_eq!(counter.count(), 1);
        assert_eq!(poll_once(wait.as_mut(), &counter), Poll::Ready(()));
    }

    #[test]
    fn signal_before_wait_is_not_lost() {
        let signals = AsyncSignals::new();
        let counter = WakeCounter::new();
        signals.signal_tx_ready(0);
        signals.signal_tx_ready(0);

        assert_eq!(poll_once(pin!(signals.wait_tx()), &counter), Poll::Ready(()));
        assert_eq!(
            poll_once(pin!(signals.wait_tx()), &counter),
            Poll::Pending,
            "repeated signals collapse into one"
        );
    }

    #[test]
    fn channels_are_independent() {
        let signals = AsyncSignals::default();
        let counter = WakeCounter::new();
        signals.signal_rx_ready(0);

        assert_eq!(poll_once(pin!(signals.wait_tx()), &counter), Poll::Pending);
        signals.reset();
        assert_eq!(poll_once(pin!(signals.wait_rx()), &counter), Poll::Pending);
    }
}
