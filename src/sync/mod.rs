//! Synchronization Support
//!
//! ISR-safe access to the owning-core link, for boards that run `poll` from
//! an interrupt handler.
//!
//! - [`CriticalSectionCell`] - ISR-safe interior mutability
//! - [`SharedFtl`] - critical-section protected slot holding an [`Ftl`](crate::Ftl)
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module
//!
//! # Example
//!
//! ```ignore
//! use ftl_link::sync::SharedFtl;
//!
//! static STATE: FtlState = FtlState::new();
//! // SAFETY: LINK is only used by core 0 and its interrupt handlers
//! static LINK: SharedFtl<'static, Uart, Dma, Sio> = unsafe { SharedFtl::new() };
//!
//! #[interrupt]
//! fn DMA_IRQ_0() {
//!     let _ = LINK.poll(&mut delay);
//! }
//! ```

mod primitives;
mod shared;

pub use primitives::CriticalSectionCell;
pub use shared::SharedFtl;
