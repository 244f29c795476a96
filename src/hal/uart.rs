//! UART line control.

use crate::driver::config::UartConfig;
use crate::driver::error::ConfigResult;

/// UART peripheral setup, implemented by the board support code.
///
/// Data moves through [`UartDma`](super::UartDma); this trait only configures
/// the line.
pub trait UartPort {
    /// Apply baud rate, pin routing and frame format, and enable the FIFOs.
    ///
    /// Returns [`ConfigError::HardwareUnavailable`](crate::ConfigError::HardwareUnavailable)
    /// if the instance or pins cannot be used.
    fn configure(&mut self, config: &UartConfig) -> ConfigResult<()>;

    /// Discard anything already sitting in the RX FIFO
    fn drain_rx(&mut self);
}
