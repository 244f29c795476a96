//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Sizes, delimiters and timing defaults
//! - [`crc`]: CRC16 over frame payloads
//! - [`dma`]: Double-buffered UART DMA engine
//! - [`fmt`]: Logging shims over `defmt` / `log`
//!
//! # Stability
//!
//! **WARNING:** This module is `pub(crate)` only. Do not depend on any types
//! or functions in this module from external code. They are subject to change
//! without notice.

pub(crate) mod constants;
pub(crate) mod crc;
pub(crate) mod dma;
pub(crate) mod fmt;
