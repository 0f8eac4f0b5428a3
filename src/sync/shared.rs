//! ISR-safe EMAC wrapper using critical sections.
//!
//! Provides [`SharedEmac`], which lets task code and the EMAC interrupt
//! handler share one driver instance.

use super::primitives::CriticalSectionCell;
use crate::driver::emac::Emac;
use crate::driver::interrupt::InterruptStatus;
use crate::hal::chip::MacHardware;
use crate::hal::mdio::MdioBus;
use crate::stack::NetStack;

/// ISR-safe EMAC wrapper using critical sections.
///
/// All access goes through `critical_section::with()`, disabling interrupts
/// for the duration of the closure. Because the wrapper is meant to live in
/// a `static`, the driver inside never moves once started.
///
/// # Example
///
/// ```ignore
/// static EMAC: SharedEmac<Dwmac<Mmio>, &Stack, Mdio, 10, 10> =
///     SharedEmac::new(Emac::new(hw, &STACK, mdio));
///
/// #[interrupt]
/// fn ETH() {
///     EMAC.handle_interrupt();
/// }
///
/// EMAC.with(|emac| emac.transmit(buffer, len))?;
/// ```
pub struct SharedEmac<H, S, M, const RX_BUFS: usize, const TX_BUFS: usize>
where
    H: MacHardware,
    S: NetStack,
    M: MdioBus,
{
    inner: CriticalSectionCell<Emac<H, S, M, RX_BUFS, TX_BUFS>>,
}

impl<H, S, M, const RX_BUFS: usize, const TX_BUFS: usize> SharedEmac<H, S, M, RX_BUFS, TX_BUFS>
where
    H: MacHardware,
    S: NetStack,
    M: MdioBus,
{
    /// Wrap a driver (const, suitable for static initialization).
    pub const fn new(emac: Emac<H, S, M, RX_BUFS, TX_BUFS>) -> Self {
        Self {
            inner: CriticalSectionCell::new(emac),
        }
    }

    /// Execute a closure with exclusive access to the EMAC.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Emac<H, S, M, RX_BUFS, TX_BUFS>) -> R,
    {
        self.inner.with(f)
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Emac<H, S, M, RX_BUFS, TX_BUFS>) -> R,
    {
        self.inner.try_with(f)
    }

    /// Service the EMAC interrupt.
    ///
    /// Returns `None` when the interrupt fired while task code held the
    /// driver; the sources stay latched and fire again once released.
    #[inline]
    pub fn handle_interrupt(&self) -> Option<InterruptStatus> {
        self.inner.try_with(|emac| emac.handle_interrupt())
    }

    /// Check if the EMAC has received frames waiting.
    pub fn rx_available(&self) -> bool {
        self.inner.with(|emac| emac.rx_available())
    }

    /// Check if the EMAC can accept a frame for transmission.
    pub fn tx_ready(&self) -> bool {
        self.inner.with(|emac| emac.tx_ready())
    }

    /// Receive a frame, yielding until one arrives.
    ///
    /// `signals` must be the [`TaskSignal`](crate::stack::TaskSignal) the
    /// driver's stack forwards to.
    #[cfg(feature = "async")]
    pub async fn receive_async(
        &self,
        signals: &super::asynch::AsyncSignals,
    ) -> crate::driver::error::Result<crate::stack::Frame> {
        use crate::driver::error::{Error, IoError};

        loop {
            match self.with(|emac| emac.receive()) {
                Err(Error::Io(IoError::NoFrame)) => signals.wait_rx().await,
                other => return other,
            }
        }
    }

    /// Queue a frame, yielding while the transmit ring is full.
    #[cfg(feature = "async")]
    pub async fn transmit_async(
        &self,
        signals: &super::asynch::AsyncSignals,
        buffer: crate::stack::BufferPtr,
        len: usize,
    ) -> crate::driver::error::Result<()> {
        loop {
            match self.with(|emac| emac.transmit(buffer, len)) {
                Err(err) if err.is_tx_busy() => signals.wait_tx().await,
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::config::{DriverConfig, State};
    use crate::driver::interrupt::Interrupts;
    use crate::testing::{MockStack, TestEmac, test_emac};

    type Shared<'a> = SharedEmac<
        crate::testing::SimMac<false>,
        &'a MockStack,
        crate::testing::TestMdio,
        4,
        4,
    >;

    fn shared(stack: &MockStack) -> Shared<'_> {
        let emac: TestEmac<'_, false> = test_emac(stack);
        SharedEmac::new(emac)
    }

    #[test]
    fn with_returns_value() {
        let stack = MockStack::new(16);
        let shared = shared(&stack);
        assert_eq!(shared.with(|emac| emac.state()), State::Uninitialized);
        assert_eq!(shared.try_with(|_| 123), Some(123));
    }

    #[test]
    fn try_with_refused_while_held() {
        let stack = MockStack::new(16);
        let shared = shared(&stack);
        let nested = shared.with(|_| shared.try_with(|_| ()));
        assert_eq!(nested, None);
    }

    #[test]
    fn interrupt_deferred_while_task_holds_driver() {
        let stack = MockStack::new(16);
        let shared = shared(&stack);
        shared.with(|emac| {
            emac.init(DriverConfig::new()).expect("init");
            emac.start().expect("start");
            emac.hw_mut().receive_frame(60);
        });

        assert_eq!(shared.with(|_| shared.handle_interrupt()), None);
        assert_eq!(stack.rx_signals(), 0);

        let status = shared.handle_interrupt().expect("serviced");
        assert!(status.pending.contains(Interrupts::RX_READY));
        assert_eq!(stack.rx_signals(), 1);
        assert!(shared.rx_available());
        assert!(shared.tx_ready());
    }
}
