//! Hardware Abstraction Layer
//!
//! Capability traits the board support code implements. This crate never
//! touches registers itself; it drives the UART, the DMA channels and the
//! inter-core mailbox only through these traits.
//!
//! # Traits
//!
//! - [`UartPort`]: line setup and RX FIFO flush
//! - [`UartDma`]: two chained RX channels and one TX channel
//! - [`MailboxTx`] / [`MailboxRx`]: the two ends of the inter-core FIFO
//!
//! # Delay Integration
//!
//! Bounded waits use `embedded_hal::delay::DelayNs` directly. Pass any delay
//! implementation from your HAL.

mod dma;
mod mailbox;
mod uart;

pub use dma::{RxChannel, UartDma};
pub use mailbox::{MailboxRx, MailboxTx};
pub use uart::UartPort;
