//! RX framing state machine.
//!
//! Consumes bytes one at a time, claims a pool slot when a start delimiter is
//! seen, fills the envelope in place and hands validated messages to the RX
//! delivery queue. Every malformed frame is counted and dropped; the machine
//! resynchronizes on the next start delimiter.

use crate::driver::error::FrameError;
use crate::internal::constants::{
    END_DELIMITER, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE, MESSAGE_POOL_SIZE, MESSAGE_QUEUE_DEPTH,
    START_DELIMITER,
};
use crate::internal::crc::crc16;
use crate::internal::fmt::{debug, warning};
use crate::pool::{LinkPool, OwnedMessage, PoolHandle};
use crate::transport::frame::{self, LENGTH_OFFSET, PAYLOAD_OFFSET, SOURCE_OFFSET};
use crate::transport::queue::HandleQueue;

const START_HI: u8 = START_DELIMITER.to_be_bytes()[0];
const START_LO: u8 = START_DELIMITER.to_be_bytes()[1];
const END_HI: u8 = END_DELIMITER.to_be_bytes()[0];
const END_LO: u8 = END_DELIMITER.to_be_bytes()[1];

/// Parser position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Looking for `0xAA`
    #[default]
    WaitStart1,
    /// Looking for `0xCC`
    WaitStart2,
    /// Next byte is the payload length
    ReadLength,
    /// Next byte is the source id
    ReadSource,
    /// Collecting payload bytes
    ReadPayload,
    /// Next byte is the CRC high byte
    ReadCrcHigh,
    /// Next byte is the CRC low byte
    ReadCrcLow,
    /// Looking for `0xDE`
    WaitEnd1,
    /// Looking for `0xFA`
    WaitEnd2,
}

/// RX counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatistics {
    /// Bytes fed to the parser
    pub total_bytes_received: u32,
    /// Frames validated and queued for delivery
    pub total_messages_received: u32,
    /// Frames dropped for a CRC mismatch
    pub crc_errors: u32,
    /// Frames dropped for a bad length or end delimiter
    pub framing_errors: u32,
    /// Start delimiters ignored because the pool was empty
    pub pool_exhausted: u32,
    /// Undelivered messages released to make room for newer ones
    pub queue_evictions: u32,
}

type RxHandle<'p> = PoolHandle<'p, MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE>;

/// Byte-at-a-time frame parser with its delivery queue
pub struct RxParser<'p> {
    pool: &'p LinkPool,
    queue: HandleQueue<MESSAGE_QUEUE_DEPTH>,
    state: RxState,
    current: Option<RxHandle<'p>>,
    expected_len: usize,
    received: usize,
    received_crc: u16,
    stats: RxStatistics,
}

impl<'p> RxParser<'p> {
    /// Create an idle parser drawing slots from `pool`
    pub fn new(pool: &'p LinkPool) -> Self {
        Self {
            pool,
            queue: HandleQueue::new(),
            state: RxState::WaitStart1,
            current: None,
            expected_len: 0,
            received: 0,
            received_crc: 0,
            stats: RxStatistics::default(),
        }
    }

    /// Drop any partial frame and queued messages, and zero the counters
    pub fn reset(&mut self) {
        self.abort();
        let pool = self.pool;
        self.queue.clear(|handle| {
            pool.release(handle);
        });
        self.stats = RxStatistics::default();
    }

    /// Feed a run of bytes
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        self.stats.total_bytes_received = self
            .stats
            .total_bytes_received
            .wrapping_add(bytes.len() as u32);
        for &byte in bytes {
            // Rejections are already counted
            let _ = self.process_byte(byte);
        }
    }

    /// Advance the state machine by one byte.
    ///
    /// Returns `Ok(true)` when this byte completed a valid frame, and the
    /// [`FrameError`] when it caused a frame to be dropped.
    pub fn process_byte(&mut self, byte: u8) -> Result<bool, FrameError> {
        match self.state {
            RxState::WaitStart1 => {
                if byte == START_HI {
                    self.state = RxState::WaitStart2;
                }
            }
            RxState::WaitStart2 => {
                if byte == START_LO {
                    self.begin_frame();
                } else if byte != START_HI {
                    self.state = RxState::WaitStart1;
                }
            }
            RxState::ReadLength => {
                if byte == 0 || byte as usize > MAX_PAYLOAD_SIZE {
                    warning!("RX invalid length {}", byte);
                    return Err(self.reject(FrameError::InvalidLength));
                }
                self.expected_len = byte as usize;
                if !self.store(LENGTH_OFFSET, byte) {
                    return Err(self.reject(FrameError::FramingError));
                }
                self.state = RxState::ReadSource;
            }
            RxState::ReadSource => {
                if !self.store(SOURCE_OFFSET, byte) {
                    return Err(self.reject(FrameError::FramingError));
                }
                self.received = 0;
                self.state = RxState::ReadPayload;
            }
            RxState::ReadPayload => {
                if !self.store(PAYLOAD_OFFSET + self.received, byte) {
                    return Err(self.reject(FrameError::FramingError));
                }
                self.received += 1;
                if self.received >= self.expected_len {
                    self.state = RxState::ReadCrcHigh;
                }
            }
            RxState::ReadCrcHigh => {
                self.received_crc = u16::from(byte) << 8;
                self.state = RxState::ReadCrcLow;
            }
            RxState::ReadCrcLow => {
                self.received_crc |= u16::from(byte);
                self.state = RxState::WaitEnd1;
            }
            RxState::WaitEnd1 => {
                if byte != END_HI {
                    warning!("RX expected 0xDE, got {:#x}", byte);
                    return Err(self.reject(FrameError::FramingError));
                }
                self.state = RxState::WaitEnd2;
            }
            RxState::WaitEnd2 => {
                if byte != END_LO {
                    warning!("RX expected 0xFA, got {:#x}", byte);
                    return Err(self.reject(FrameError::FramingError));
                }
                return self.complete_frame().map(|()| true);
            }
        }
        Ok(false)
    }

    /// Whether a validated message is waiting
    pub fn has_message(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Take the oldest validated message
    pub fn take_message(&mut self) -> Option<OwnedMessage<'p>> {
        let handle = self.queue.dequeue()?;
        // SAFETY: the queue conveys the unit taken over from the parser
        unsafe { PoolHandle::adopt(self.pool, handle) }.map(OwnedMessage::new)
    }

    /// Messages waiting for delivery
    pub fn queue_count(&self) -> usize {
        self.queue.count()
    }

    /// Current parser state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Counter snapshot
    pub fn statistics(&self) -> RxStatistics {
        self.stats
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_frame(&mut self) {
        match PoolHandle::acquire(self.pool) {
            Some(handle) => {
                self.current = Some(handle);
                self.state = RxState::ReadLength;
            }
            None => {
                warning!("RX pool exhausted, frame skipped");
                self.stats.pool_exhausted = self.stats.pool_exhausted.wrapping_add(1);
                self.state = RxState::WaitStart1;
            }
        }
    }

    /// Write one envelope byte; `false` if the in-flight slot is unusable
    fn store(&mut self, offset: usize, byte: u8) -> bool {
        let slot = self.current.as_mut().and_then(|h| h.bytes_mut());
        match slot.and_then(|bytes| bytes.get_mut(offset)) {
            Some(dst) => {
                *dst = byte;
                true
            }
            None => false,
        }
    }

    /// Release the in-flight slot and go back to hunting for a start delimiter
    fn abort(&mut self) {
        self.current = None;
        self.state = RxState::WaitStart1;
        self.expected_len = 0;
        self.received = 0;
        self.received_crc = 0;
    }

    fn reject(&mut self, err: FrameError) -> FrameError {
        match err {
            FrameError::CrcMismatch => self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1),
            FrameError::FramingError | FrameError::InvalidLength => {
                self.stats.framing_errors = self.stats.framing_errors.wrapping_add(1);
            }
        }
        self.abort();
        err
    }

    fn complete_frame(&mut self) -> Result<(), FrameError> {
        let received_crc = self.received_crc;
        let Some(mut handle) = self.current.take() else {
            self.abort();
            return Ok(());
        };

        let calculated = crc16(frame::payload(handle.bytes()));
        if calculated != received_crc {
            warning!("RX CRC mismatch: calculated {:#x}, received {:#x}", calculated, received_crc);
            drop(handle);
            return Err(self.reject(FrameError::CrcMismatch));
        }

        if let Some(bytes) = handle.bytes_mut() {
            frame::store_crc(bytes, received_crc);
        }
        self.deliver(handle);
        self.abort();
        Ok(())
    }

    /// Queue a validated message, evicting the oldest one when full
    fn deliver(&mut self, handle: RxHandle<'p>) {
        let raw = handle.detach();
        if !self.queue.enqueue(raw) {
            if let Some(oldest) = self.queue.dequeue() {
                self.pool.release(oldest);
                self.stats.queue_evictions = self.stats.queue_evictions.wrapping_add(1);
                debug!("RX queue full, evicted oldest message");
            }
            if !self.queue.enqueue(raw) {
                self.pool.release(raw);
                return;
            }
        }
        self.stats.total_messages_received = self.stats.total_messages_received.wrapping_add(1);
    }
}

impl Drop for RxParser<'_> {
    fn drop(&mut self) {
        let pool = self.pool;
        self.queue.clear(|handle| {
            pool.release(handle);
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
