//! FTL: framed telemetry link
//!
//! A `no_std`, `no_alloc` message transport for a UART link between two
//! boards (or a board and a ground station), built for dual-core
//! microcontrollers where one core owns the UART and both cores send.
//!
//! # Architecture
//!
//! 1. **Pool** ([`pool`]): fixed arena of reference-counted message slots,
//!    addressed by 8-bit handles and shared lock-free between cores
//! 2. **Transport** ([`transport`]): wire codec, RX framing state machine,
//!    TX queue and the cross-core mailbox bridge
//! 3. **DMA engine**: two chained RX chunks feeding a circular byte buffer,
//!    plus one TX buffer, with stall detection and recovery
//! 4. **Facade** ([`driver`]): [`Ftl`] on the owning core, [`RemoteSender`]
//!    on the other, both implementing [`MessageSink`]
//! 5. **HAL** ([`hal`]): traits the board support code implements for the
//!    UART, its DMA channels and the inter-core FIFO
//!
//! # Wire format
//!
//! ```text
//! +------+------+-----+--------+-----------+--------+--------+------+------+
//! | 0xAA | 0xCC | len | source | payload.. | crc hi | crc lo | 0xDE | 0xFA |
//! +------+------+-----+--------+-----------+--------+--------+------+------+
//! ```
//!
//! `len` is 1..=248. The CRC is CRC-16/CCITT-FALSE over the payload only.
//!
//! # Features
//!
//! - `defmt`: Log through defmt and derive `defmt::Format` on public types
//! - `log`: Log through the `log` facade
//! - `critical-section`: Enable the ISR-safe [`sync::SharedFtl`] slot
//!
//! # Example
//!
//! ```ignore
//! use ftl_link::{Ftl, FtlConfig, FtlState, MessageSink};
//!
//! static LINK: FtlState = FtlState::new();
//!
//! let mut ftl = Ftl::new(&LINK, uart, dma, sio_fifo_rx)?;
//! ftl.initialize(FtlConfig::new().with_board_id(&unique_id), &mut delay)?;
//!
//! loop {
//!     ftl.poll(&mut delay)?;
//!     while let Some(msg) = ftl.get_msg() {
//!         if let Some(text) = msg.view() {
//!             info!("{}: {}", msg.source_id(), text);
//!         }
//!     }
//!     ftl.send_text("PING");
//! }
//! ```
//!
//! # Memory Requirements
//!
//! With the default constants: 8 KB of pool slots, 1 KB circular buffer,
//! 384 bytes of DMA buffers.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod messages;
pub mod pool;
pub mod transport;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(any(feature = "critical-section", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{
    DataBits, DmaTimeouts, FtlConfig, Parity, State, StopBits, UartConfig,
    source_id_from_board_id,
};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, FrameError, LinkError, LinkResult,
    Result,
};
pub use driver::link::{Ftl, FtlState, LinkDmaBuffers, LinkDmaEngine, MessageSink, RemoteSender};
pub use internal::dma::{DmaBuffers, DmaEngine, DmaStatistics};
pub use messages::{Message, MessageError, MessageType};
pub use pool::{Handle, LinkPool, MessagePool, OwnedMessage, PoolHandle};
pub use transport::{BridgeStatistics, RxStatistics, TxStatistics};

/// Link-wide constants: frame layout, pool and queue sizes, defaults.
pub mod constants {
    pub use crate::internal::constants::*;
}

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::{CriticalSectionCell, SharedFtl};
