//! Framed transport over the UART DMA engine.
//!
//! - [`frame`] - wire codec and envelope accessors
//! - [`queue`] - SPSC handle queue
//! - [`rx`] - byte-at-a-time framing state machine
//! - [`tx`] - TX queue and serializer
//! - [`bridge`] - handoff from the non-owning core

pub mod bridge;
pub mod frame;
pub mod queue;
pub mod rx;
pub mod tx;

pub use bridge::{Bridge, BridgeStatistics};
pub use queue::HandleQueue;
pub use rx::{RxParser, RxState, RxStatistics};
pub use tx::{TxHandle, TxScheduler, TxStatistics, acquire_and_encode, acquire_and_fill_message};
