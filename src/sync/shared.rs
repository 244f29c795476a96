//! ISR-safe link wrapper using critical sections.

use embedded_hal::delay::DelayNs;

use super::primitives::CriticalSectionCell;
use crate::driver::error::{ConfigError, DmaError, Result};
use crate::driver::link::Ftl;
use crate::hal::{MailboxRx, UartDma, UartPort};

/// ISR-safe slot for the owning-core [`Ftl`].
///
/// Lets `poll` run from a DMA or timer interrupt while the main loop sends
/// and receives. All access goes through `critical_section::with()`.
///
/// [`Ftl`] is `!Send`, so nothing makes this slot `Sync` on its own. Creating
/// one is `unsafe` instead: the caller promises that only the owning core
/// ever touches it, which is what lets it live in a `static`.
///
/// # Example
///
/// ```ignore
/// static STATE: FtlState = FtlState::new();
/// // SAFETY: LINK is only used by core 0 and its interrupt handlers
/// static LINK: SharedFtl<'static, Uart, Dma, Sio> = unsafe { SharedFtl::new() };
///
/// LINK.install(Ftl::new(&STATE, uart, dma, sio)?)?;
///
/// #[interrupt]
/// fn TIMER_IRQ_0() {
///     let _ = LINK.poll(&mut delay);
/// }
///
/// LINK.with(|ftl| ftl.send_text("hello"));
/// ```
pub struct SharedFtl<'a, U: UartPort, D: UartDma, M: MailboxRx> {
    inner: CriticalSectionCell<Option<Ftl<'a, U, D, M>>>,
}

impl<'a, U: UartPort, D: UartDma, M: MailboxRx> SharedFtl<'a, U, D, M> {
    /// Create an empty slot (const, suitable for static initialization).
    ///
    /// # Safety
    ///
    /// The slot and every link installed in it must only be accessed from
    /// the owning core, in thread or interrupt context.
    pub const unsafe fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Move a link into the slot.
    ///
    /// Fails with [`ConfigError::AlreadyInitialized`] if one is already
    /// installed; the new link is dropped in that case.
    pub fn install(&self, ftl: Ftl<'a, U, D, M>) -> core::result::Result<(), ConfigError> {
        self.inner.with(|slot| {
            if slot.is_some() {
                return Err(ConfigError::AlreadyInitialized);
            }
            *slot = Some(ftl);
            Ok(())
        })
    }

    /// Take the link back out
    pub fn take(&self) -> Option<Ftl<'a, U, D, M>> {
        self.inner.with(Option::take)
    }

    /// Whether a link is installed
    pub fn is_installed(&self) -> bool {
        self.inner.with(|slot| slot.is_some())
    }

    /// Execute a closure with exclusive access to the link.
    ///
    /// Returns `None` if nothing is installed.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Ftl<'a, U, D, M>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Like [`with`](Self::with), but also `None` if the link is already
    /// borrowed (an interrupt landed inside another `with`).
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Ftl<'a, U, D, M>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }

    /// Run one service pass on the installed link.
    ///
    /// Returns [`DmaError::Busy`] instead of waiting if the link is already
    /// borrowed, and [`ConfigError::NotInitialized`] if nothing is installed.
    pub fn poll(&self, delay: &mut impl DelayNs) -> Result<()> {
        match self.inner.try_with(|slot| slot.as_mut().map(|ftl| ftl.poll(delay))) {
            Some(Some(result)) => result,
            Some(None) => Err(ConfigError::NotInitialized.into()),
            None => Err(DmaError::Busy.into()),
        }
    }
}

// SAFETY: critical sections serialize thread and interrupt access on the
// owning core, and `new` obliges the caller to keep other cores away.
unsafe impl<U: UartPort, D: UartDma, M: MailboxRx> Sync for SharedFtl<'_, U, D, M> {}
