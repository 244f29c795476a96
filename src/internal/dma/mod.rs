//! DMA Engine
//!
//! Double-buffered UART DMA. Two fixed RX chunks alternate under hardware
//! control (each chained to re-arm the other) and are copied by
//! [`DmaEngine::process_rx_dma`] into a larger circular byte buffer that the
//! frame parser reads. TX uses a single buffer.
//!
//! # Example
//!
//! ```ignore
//! static BUFFERS: DmaBuffers<64, 256> = DmaBuffers::new();
//!
//! let mut engine = DmaEngine::<_, 64, 1024, 256>::new(dma, &BUFFERS, DmaTimeouts::new());
//! engine.init(&mut delay)?;
//! loop {
//!     engine.process_rx_dma(&mut delay)?;
//!     let n = engine.read(&mut chunk);
//! }
//! ```

mod engine;
mod ring;

pub use engine::{DmaBuffers, DmaEngine, DmaStatistics};
