//! Core driver components for the FTL link.
//!
//! - [`config`] - Configuration types and builder patterns
//! - [`error`] - Error types and result aliases
//! - [`link`] - The owning-core facade, the remote sender and the shared context
//!
//! # Example
//!
//! ```ignore
//! use ftl_link::driver::{FtlConfig, FtlState, Ftl};
//!
//! static LINK: FtlState = FtlState::new();
//!
//! let config = FtlConfig::new()
//!     .with_baud_rate(921_600)
//!     .with_pins(4, 5);
//! ```

// Submodules
pub mod config;
pub mod error;
pub mod link;

// Re-exports for convenience
pub use config::{
    DataBits, DmaTimeouts, FtlConfig, Parity, State, StopBits, UartConfig,
    source_id_from_board_id,
};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, FrameError, LinkError, LinkResult,
    Result,
};
pub use link::{Ftl, FtlState, LinkDmaBuffers, LinkDmaEngine, MessageSink, RemoteSender};
