//! Centralized Constants
//!
//! This module provides a single source of truth for the sizes, delimiters and
//! timing defaults used throughout the transport.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Wire format**: delimiters and per-frame overhead
//! - **Pool and queues**: slot size, slot count, queue depths
//! - **DMA**: ping-pong chunk size, circular buffer size, TX buffer size
//! - **Bridge**: mailbox tag
//! - **Defaults**: UART line settings and timeouts

// =============================================================================
// Wire Format
// =============================================================================

/// Start-of-frame delimiter, transmitted big-endian (`0xAA`, `0xCC`)
pub const START_DELIMITER: u16 = 0xAACC;

/// End-of-frame delimiter, transmitted big-endian (`0xDE`, `0xFA`)
pub const END_DELIMITER: u16 = 0xDEFA;

/// Bytes a frame adds around the payload: START(2) + LENGTH(1) + SOURCE(1) + CRC(2) + END(2)
pub const FRAME_OVERHEAD: usize = 8;

/// Bytes an envelope adds around the payload: LENGTH(1) + SOURCE(1) + CRC(2)
pub const ENVELOPE_OVERHEAD: usize = 4;

/// Largest frame the transport will build or accept
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = 248;

// =============================================================================
// Pool and Queues
// =============================================================================

/// Number of slots in the message pool (at most 255, `0xFF` is the invalid handle)
pub const MESSAGE_POOL_SIZE: usize = 32;

/// Upper bound on a slot's reference count
pub const MAX_REF_COUNT: u8 = 8;

/// Depth of the RX delivery queue (power of two)
pub const MESSAGE_QUEUE_DEPTH: usize = 16;

/// Depth of the TX scheduling queue (power of two)
pub const TX_QUEUE_DEPTH: usize = 16;

// =============================================================================
// DMA
// =============================================================================

/// Size of each of the two RX ping-pong buffers
pub const RX_DMA_CHUNK_SIZE: usize = 64;

/// Size of the RX circular byte buffer (power of two)
pub const RX_CIRCULAR_BUFFER_SIZE: usize = 1024;

/// Bytes pulled from the circular buffer per parser pass
pub const RX_READ_CHUNK_SIZE: usize = 64;

/// Size of the single TX DMA buffer
pub const TX_BUFFER_SIZE: usize = MAX_MESSAGE_SIZE;

// =============================================================================
// Bridge
// =============================================================================

/// Tag carried in the upper 24 bits of every mailbox word (ASCII "FTL")
pub const BRIDGE_MAGIC: u32 = 0x0046_544C;

// =============================================================================
// Defaults
// =============================================================================

/// Default UART baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default UART TX pin
pub const DEFAULT_TX_PIN: u8 = 0;

/// Default UART RX pin
pub const DEFAULT_RX_PIN: u8 = 1;

/// Default deadline for a previous TX transfer to finish, in microseconds
pub const DEFAULT_TX_BUSY_TIMEOUT_US: u32 = 1_000;

/// Default deadline for an armed RX channel to report active, in microseconds
pub const DEFAULT_RX_READY_TIMEOUT_US: u32 = 500;

/// Default sleep between polls of a bounded wait, in microseconds
pub const DEFAULT_POLL_INTERVAL_US: u32 = 1;

// =============================================================================
// Compile-time Checks
// =============================================================================

const _: () = assert!(MAX_MESSAGE_SIZE >= MAX_PAYLOAD_SIZE + FRAME_OVERHEAD);
const _: () = assert!(MAX_PAYLOAD_SIZE <= u8::MAX as usize);
const _: () = assert!(MAX_MESSAGE_SIZE % 4 == 0);
const _: () = assert!(MESSAGE_POOL_SIZE <= 255);
const _: () = assert!(MESSAGE_QUEUE_DEPTH.is_power_of_two());
const _: () = assert!(TX_QUEUE_DEPTH.is_power_of_two());
const _: () = assert!(RX_CIRCULAR_BUFFER_SIZE.is_power_of_two());
const _: () = assert!(RX_CIRCULAR_BUFFER_SIZE > RX_DMA_CHUNK_SIZE);
const _: () = assert!(BRIDGE_MAGIC <= 0x00FF_FFFF);
