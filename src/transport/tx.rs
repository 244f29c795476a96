//! TX serializer and scheduling queue.
//!
//! Senders fill a pool slot with an envelope and push its handle onto the TX
//! queue. [`TxScheduler::process_tx_queue`] rebuilds the wire frame from the
//! envelope, hands it to the DMA engine and releases the slot.

use embedded_hal::delay::DelayNs;

use crate::driver::error::{LinkError, LinkResult};
use crate::hal::UartDma;
use crate::internal::constants::{
    MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE, MESSAGE_POOL_SIZE, TX_QUEUE_DEPTH,
};
use crate::internal::crc::crc16;
use crate::internal::dma::DmaEngine;
use crate::internal::fmt::{trace, warning};
use crate::messages::{self, Message};
use crate::pool::{LinkPool, PoolHandle};
use crate::transport::frame::{self, LENGTH_OFFSET, PAYLOAD_OFFSET, SOURCE_OFFSET};
use crate::transport::queue::HandleQueue;

/// Owning handle to a link-sized pool slot
pub type TxHandle<'p> = PoolHandle<'p, MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE>;

/// TX counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxStatistics {
    /// Messages accepted onto the TX queue
    pub total_messages_queued: u32,
    /// Frames handed to the DMA engine
    pub total_messages_sent: u32,
    /// Messages rejected because the TX queue was full
    pub queue_full_drops: u32,
    /// Messages waiting right now
    pub current_queue_depth: u32,
    /// Highest queue depth seen
    pub peak_queue_depth: u32,
    /// Frames dropped because the DMA engine refused them
    pub dma_start_failures: u32,
}

// =============================================================================
// Filling slots
// =============================================================================

/// Validate `data`, claim a slot and write the envelope into it.
///
/// The length is checked before the pool is touched, so an oversized or empty
/// payload never costs a slot.
pub fn acquire_and_fill_message<'p>(
    pool: &'p LinkPool,
    source: u8,
    data: &[u8],
) -> LinkResult<TxHandle<'p>> {
    frame::check_payload_len(data.len())?;
    let mut handle = PoolHandle::acquire(pool).ok_or(LinkError::AllocationExhausted)?;
    let envelope = handle.bytes_mut().ok_or(LinkError::InvalidHandle)?;
    frame::write_envelope(envelope, source, data)?;
    Ok(handle)
}

/// Claim a slot and encode a typed message straight into its payload area
pub fn acquire_and_encode<'p, 'm, M: Message<'m>>(
    pool: &'p LinkPool,
    source: u8,
    msg: &M,
) -> LinkResult<TxHandle<'p>> {
    let mut handle = PoolHandle::acquire(pool).ok_or(LinkError::AllocationExhausted)?;
    let envelope = handle.bytes_mut().ok_or(LinkError::InvalidHandle)?;

    let area = &mut envelope[PAYLOAD_OFFSET..PAYLOAD_OFFSET + MAX_PAYLOAD_SIZE];
    // Every encode failure means the fields do not fit one payload
    let len = messages::encode_message(msg, area).map_err(|_| LinkError::PayloadTooLarge)?;
    frame::check_payload_len(len)?;

    envelope[LENGTH_OFFSET] = len as u8;
    envelope[SOURCE_OFFSET] = source;
    let crc = crc16(&envelope[PAYLOAD_OFFSET..PAYLOAD_OFFSET + len]);
    frame::store_crc(envelope, crc);
    Ok(handle)
}

// =============================================================================
// Scheduler
// =============================================================================

/// TX queue plus the logic that drains it into the DMA engine.
///
/// Lives on the owning core. Both producers (direct sends and the bridge
/// drain) run there too.
pub struct TxScheduler<'p> {
    pool: &'p LinkPool,
    queue: HandleQueue<TX_QUEUE_DEPTH>,
    stats: TxStatistics,
}

impl<'p> TxScheduler<'p> {
    /// Empty scheduler over `pool`
    pub fn new(pool: &'p LinkPool) -> Self {
        Self {
            pool,
            queue: HandleQueue::new(),
            stats: TxStatistics::default(),
        }
    }

    /// Release everything queued and zero the counters
    pub fn reset(&mut self) {
        let pool = self.pool;
        self.queue.clear(|handle| {
            pool.release(handle);
        });
        self.stats = TxStatistics::default();
    }

    /// Queue a filled message for transmission.
    ///
    /// On a full queue the handle is dropped here, which releases its slot
    /// exactly once, and [`LinkError::QueueFull`] is returned.
    pub fn enqueue(&mut self, handle: TxHandle<'p>) -> LinkResult<()> {
        let raw = handle.detach();
        if !self.queue.enqueue(raw) {
            self.pool.release(raw);
            self.stats.queue_full_drops = self.stats.queue_full_drops.wrapping_add(1);
            return Err(LinkError::QueueFull);
        }

        self.stats.total_messages_queued = self.stats.total_messages_queued.wrapping_add(1);
        let depth = self.queue.count() as u32;
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(depth);
        Ok(())
    }

    /// Whether another message would be accepted
    pub fn is_ready(&self) -> bool {
        !self.queue.is_full()
    }

    /// Messages waiting
    pub fn queue_count(&self) -> usize {
        self.queue.count()
    }

    /// Send queued frames while the DMA engine is free.
    ///
    /// Each frame is rebuilt from its envelope with a freshly computed CRC,
    /// copied into the TX buffer and its slot released.
    pub fn process_tx_queue<D, const CHUNK: usize, const CIRC: usize, const TX: usize>(
        &mut self,
        engine: &mut DmaEngine<'_, D, CHUNK, CIRC, TX>,
        delay: &mut impl DelayNs,
    ) where
        D: UartDma,
    {
        while !engine.is_write_busy() {
            let Some(raw) = self.queue.dequeue() else {
                break;
            };
            // SAFETY: the queue conveys the unit handed over in `enqueue`
            let Some(handle) = (unsafe { PoolHandle::adopt(self.pool, raw) }) else {
                continue;
            };

            let mut out = [0u8; MAX_MESSAGE_SIZE];
            let sent = frame::encode_envelope(handle.bytes(), &mut out)
                .and_then(|len| engine.write_data(&out[..len], delay));
            drop(handle);

            match sent {
                Ok(()) => {
                    self.stats.total_messages_sent = self.stats.total_messages_sent.wrapping_add(1);
                    trace!("TX frame started");
                }
                Err(e) => {
                    self.stats.dma_start_failures = self.stats.dma_start_failures.wrapping_add(1);
                    warning!("TX frame dropped: {}", e.as_str());
                    break;
                }
            }
        }
    }

    /// Counter snapshot
    pub fn statistics(&self) -> TxStatistics {
        TxStatistics {
            current_queue_depth: self.queue.count() as u32,
            ..self.stats
        }
    }
}

impl Drop for TxScheduler<'_> {
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

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::driver::config::DmaTimeouts;
    use crate::internal::dma::DmaBuffers;
    use crate::messages::SystemState;
    use crate::testing::{MockDelay, MockDma};

    type Engine<'a> = DmaEngine<'a, MockDma, 64, 1024, MAX_MESSAGE_SIZE>;

    fn engine(buffers: &DmaBuffers<64, MAX_MESSAGE_SIZE>) -> Engine<'_> {
        let mut engine = Engine::new(MockDma::new(), buffers, DmaTimeouts::new());
        engine.init(&mut MockDelay::new()).unwrap();
        engine
    }

    #[test]
    fn fill_writes_envelope() {
        let pool = LinkPool::new();
        let handle = acquire_and_fill_message(&pool, 9, b"PING").unwrap();
        let bytes = handle.bytes();
        assert_eq!(frame::payload_len(bytes), 4);
        assert_eq!(frame::source_id(bytes), 9);
        assert_eq!(frame::payload(bytes), b"PING");
    }

    #[test]
    fn fill_boundary_and_rejection_before_allocation() {
        let pool = LinkPool::new();
        let max = [0x11u8; MAX_PAYLOAD_SIZE];
        let ok = acquire_and_fill_message(&pool, 1, &max).unwrap();
        assert_eq!(frame::payload(ok.bytes()).len(), MAX_PAYLOAD_SIZE);
        drop(ok);

        let too_big = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            acquire_and_fill_message(&pool, 1, &too_big).unwrap_err(),
            LinkError::PayloadTooLarge
        );
        assert_eq!(acquire_and_fill_message(&pool, 1, &[]).unwrap_err(), LinkError::EmptyPayload);
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn fill_reports_exhausted_pool() {
        let pool = LinkPool::new();
        let held: Vec<_> = (0..MESSAGE_POOL_SIZE).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(
            acquire_and_fill_message(&pool, 1, b"x").unwrap_err(),
            LinkError::AllocationExhausted
        );
        assert_eq!(held.len(), MESSAGE_POOL_SIZE);
    }

    #[test]
    fn typed_encode_fills_payload_with_tag() {
        let pool = LinkPool::new();
        let state = SystemState { state_id: 4, is_active: true, uptime_ms: 10 };
        let handle = acquire_and_encode(&pool, 2, &state).unwrap();
        let bytes = handle.bytes();
        assert_eq!(frame::payload(bytes), [1, 4, 1, 10, 0, 0, 0]);
        assert_eq!(frame::stored_crc(bytes), crc16(frame::payload(bytes)));
    }

    #[test]
    fn typed_encode_too_large_frees_slot() {
        let pool = LinkPool::new();
        let text = "x".repeat(MAX_PAYLOAD_SIZE);
        let log = crate::messages::RemoteLog { timestamp: 1, message: &text };
        assert_eq!(
            acquire_and_encode(&pool, 2, &log).unwrap_err(),
            LinkError::PayloadTooLarge
        );
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn enqueue_full_releases_exactly_once() {
        let pool = LinkPool::new();
        let mut tx = TxScheduler::new(&pool);
        for _ in 0..TX_QUEUE_DEPTH {
            tx.enqueue(acquire_and_fill_message(&pool, 1, b"q").unwrap()).unwrap();
        }
        assert!(!tx.is_ready());

        let extra = acquire_and_fill_message(&pool, 1, b"x").unwrap();
        let extra_raw = extra.handle();
        assert_eq!(tx.enqueue(extra), Err(LinkError::QueueFull));
        assert!(!pool.is_valid(extra_raw));
        assert_eq!(pool.allocated_count(), TX_QUEUE_DEPTH);

        let stats = tx.statistics();
        assert_eq!(stats.queue_full_drops, 1);
        assert_eq!(stats.total_messages_queued, TX_QUEUE_DEPTH as u32);
        assert_eq!(stats.peak_queue_depth, TX_QUEUE_DEPTH as u32);
        assert_eq!(stats.current_queue_depth, TX_QUEUE_DEPTH as u32);
    }

    #[test]
    fn process_sends_one_frame_per_free_dma_and_releases_slot() {
        let pool = LinkPool::new();
        let buffers = DmaBuffers::new();
        let mut dma = engine(&buffers);
        let mut delay = MockDelay::new();
        let mut tx = TxScheduler::new(&pool);

        tx.enqueue(acquire_and_fill_message(&pool, 3, b"one").unwrap()).unwrap();
        tx.enqueue(acquire_and_fill_message(&pool, 3, b"two").unwrap()).unwrap();

        tx.process_tx_queue(&mut dma, &mut delay);
        assert_eq!(tx.queue_count(), 1);
        assert_eq!(pool.allocated_count(), 1);

        let mut expected = [0u8; 16];
        let n = frame::encode_frame(3, b"one", &mut expected).unwrap();
        assert_eq!(dma.dma_mut().complete_tx(), &expected[..n]);

        tx.process_tx_queue(&mut dma, &mut delay);
        assert_eq!(tx.queue_count(), 0);
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(tx.statistics().total_messages_sent, 2);
    }

    #[test]
    fn process_waits_while_dma_busy() {
        let pool = LinkPool::new();
        let buffers = DmaBuffers::new();
        let mut dma = engine(&buffers);
        let mut delay = MockDelay::new();
        let mut tx = TxScheduler::new(&pool);

        dma.write_data(b"busy", &mut delay).unwrap();
        tx.enqueue(acquire_and_fill_message(&pool, 3, b"later").unwrap()).unwrap();
        tx.process_tx_queue(&mut dma, &mut delay);
        assert_eq!(tx.queue_count(), 1);
        assert_eq!(delay.total_us(), 0);
    }

    #[test]
    fn reset_releases_queued() {
        let pool = LinkPool::new();
        let mut tx = TxScheduler::new(&pool);
        tx.enqueue(acquire_and_fill_message(&pool, 1, b"a").unwrap()).unwrap();
        tx.reset();
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(tx.statistics(), TxStatistics::default());
    }
}
