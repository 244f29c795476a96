//! DMA channel control for the UART.

use crate::driver::error::ConfigResult;

/// One of the two ping-pong RX channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxChannel {
    /// First buffer
    A,
    /// Second buffer
    B,
}

impl RxChannel {
    /// The partner this channel chains to on completion
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            RxChannel::A => RxChannel::B,
            RxChannel::B => RxChannel::A,
        }
    }
}

/// Three DMA channels wired to one UART: RX A, RX B and TX.
///
/// RX channels move bytes from the UART data register into memory, paced by
/// the RX DREQ, and each is chained so that finishing one triggers the other.
/// The TX channel moves bytes from memory into the UART data register.
///
/// Only the owning core may call these methods.
pub trait UartDma {
    /// Claim the three channels.
    ///
    /// Returns [`ConfigError::HardwareUnavailable`](crate::ConfigError::HardwareUnavailable)
    /// if they are not free.
    fn claim(&mut self) -> ConfigResult<()>;

    /// Point an RX channel at `len` bytes starting at `dst`, chained to
    /// [`RxChannel::other`]. Does not start the channel.
    ///
    /// # Safety
    ///
    /// `dst..dst + len` must stay valid for writes, and must not be moved or
    /// reused, until the channel is re-armed or the link is torn down.
    unsafe fn arm_rx(&mut self, channel: RxChannel, dst: *mut u8, len: usize);

    /// Start an armed RX channel
    fn start_rx(&mut self, channel: RxChannel);

    /// Whether the RX channel has a transfer in progress
    fn rx_busy(&self, channel: RxChannel) -> bool;

    /// Bytes the RX channel has yet to transfer
    fn rx_remaining(&self, channel: RxChannel) -> usize;

    /// Start sending `len` bytes from `src`.
    ///
    /// # Safety
    ///
    /// `src..src + len` must stay valid and unmodified until [`UartDma::tx_busy`]
    /// reports `false`.
    unsafe fn start_tx(&mut self, src: *const u8, len: usize);

    /// Whether the TX channel has a transfer in progress
    fn tx_busy(&self) -> bool;
}
