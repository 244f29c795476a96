//! Double-buffered UART DMA engine.

use core::cell::UnsafeCell;
use core::sync::atomic::{Ordering, fence};

use embedded_hal::delay::DelayNs;

use super::ring::ByteRing;
use crate::driver::config::DmaTimeouts;
use crate::driver::error::{DmaError, DmaResult, Result};
use crate::hal::{RxChannel, UartDma};
use crate::internal::fmt::{debug, error, warning};

// =============================================================================
// Buffers
// =============================================================================

/// DMA-visible memory: two RX chunks and one TX buffer.
///
/// Lives in a `static` so the addresses handed to the DMA channels never move.
/// Place it in DMA-capable RAM on targets that have such a restriction.
#[repr(C, align(4))]
pub struct DmaBuffers<const CHUNK: usize, const TX: usize> {
    rx: [UnsafeCell<[u8; CHUNK]>; 2],
    tx: UnsafeCell<[u8; TX]>,
}

// SAFETY: the buffers are only touched by the DMA hardware and by the single
// `DmaEngine` that borrows them, on the owning core.
unsafe impl<const CHUNK: usize, const TX: usize> Sync for DmaBuffers<CHUNK, TX> {}

impl<const CHUNK: usize, const TX: usize> DmaBuffers<CHUNK, TX> {
    /// Zeroed buffers. Const-compatible.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx: [const { UnsafeCell::new([0; CHUNK]) }; 2],
            tx: UnsafeCell::new([0; TX]),
        }
    }

    /// Total memory usage in bytes.
    #[must_use]
    pub const fn memory_usage() -> usize {
        2 * CHUNK + TX
    }

    #[inline(always)]
    fn rx_ptr(&self, channel: RxChannel) -> *mut u8 {
        self.rx[channel as usize].get().cast()
    }

    #[inline(always)]
    fn tx_ptr(&self) -> *mut u8 {
        self.tx.get().cast()
    }
}

impl<const CHUNK: usize, const TX: usize> Default for DmaBuffers<CHUNK, TX> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// DMA engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaStatistics {
    /// Completed RX ping-pong swaps
    pub buffer_swaps: u32,
    /// Times both RX channels were found idle and restarted
    pub stall_recoveries: u32,
    /// Bytes dropped from the circular buffer because the parser fell behind
    pub overflow_bytes: u32,
}

// =============================================================================
// Engine
// =============================================================================

/// Ping-pong RX into a circular byte buffer, single-buffer TX.
///
/// # Type Parameters
/// * `D` - DMA channel driver
/// * `CHUNK` - Size of each RX ping-pong buffer
/// * `CIRC` - Size of the circular byte buffer (power of two)
/// * `TX` - Size of the TX buffer
pub struct DmaEngine<'a, D, const CHUNK: usize, const CIRC: usize, const TX: usize> {
    dma: D,
    buffers: &'a DmaBuffers<CHUNK, TX>,
    ring: ByteRing<CIRC>,
    /// Bytes already copied out of each RX chunk
    read_pos: [usize; 2],
    active: RxChannel,
    tx_busy: bool,
    /// Channels stay claimed for the engine's lifetime
    claimed: bool,
    timeouts: DmaTimeouts,
    stats: DmaStatistics,
}

impl<'a, D: UartDma, const CHUNK: usize, const CIRC: usize, const TX: usize>
    DmaEngine<'a, D, CHUNK, CIRC, TX>
{
    /// Wrap the DMA driver and its buffers. Nothing is armed until [`init`](Self::init).
    pub fn new(dma: D, buffers: &'a DmaBuffers<CHUNK, TX>, timeouts: DmaTimeouts) -> Self {
        Self {
            dma,
            buffers,
            ring: ByteRing::new(),
            read_pos: [0; 2],
            active: RxChannel::A,
            tx_busy: false,
            claimed: false,
            timeouts,
            stats: DmaStatistics::default(),
        }
    }

    /// Claim the channels, arm both RX chunks (chained to each other) and start A.
    ///
    /// The channels are claimed on the first call only; later calls re-arm
    /// them. Fails with [`DmaError::Stall`] if channel A does not go active
    /// within the RX ready deadline.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        if !self.claimed {
            self.dma.claim()?;
            self.claimed = true;
        }
        self.ring.reset();
        self.tx_busy = false;
        self.restart_rx(delay)?;
        Ok(())
    }

    /// Move newly received bytes into the circular buffer, handle ping-pong
    /// swaps and recover from a stalled engine.
    ///
    /// Returns [`DmaError::Stall`] only when the restart after a stall failed.
    pub fn process_rx_dma(&mut self, delay: &mut impl DelayNs) -> DmaResult<()> {
        self.check_active_buffer();
        self.check_for_swap();
        self.check_for_stall(delay)
    }

    /// Bytes waiting in the circular buffer
    pub fn bytes_available(&self) -> usize {
        self.ring.available()
    }

    /// Copy bytes out of the circular buffer
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        self.ring.read(dst)
    }

    /// Copy `data` into the TX buffer and start sending it.
    ///
    /// Waits at most the TX busy deadline for the previous transfer to finish.
    pub fn write_data(&mut self, data: &[u8], delay: &mut impl DelayNs) -> DmaResult<()> {
        if data.len() > TX {
            return Err(DmaError::FrameTooLarge);
        }
        self.wait_tx_idle(delay)?;

        let dst = self.buffers.tx_ptr();
        // SAFETY: TX channel idle, so the buffer is ours; length checked above
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) };
        fence(Ordering::Release);

        self.tx_busy = true;
        // SAFETY: buffer lives in `'a` storage and is not written again until tx is idle
        unsafe { self.dma.start_tx(dst, data.len()) };
        Ok(())
    }

    /// Whether a TX transfer is still in flight
    pub fn is_write_busy(&mut self) -> bool {
        if !self.tx_busy {
            return false;
        }
        if !self.dma.tx_busy() {
            self.tx_busy = false;
            return false;
        }
        true
    }

    /// Replace the bounded-wait deadlines
    pub fn set_timeouts(&mut self, timeouts: DmaTimeouts) {
        self.timeouts = timeouts;
    }

    /// Counter snapshot
    pub fn statistics(&self) -> DmaStatistics {
        self.stats
    }

    /// Channel currently expected to receive
    pub fn active_channel(&self) -> RxChannel {
        self.active
    }

    /// Underlying DMA driver
    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Underlying DMA driver, mutably
    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    // =========================================================================
    // RX internals
    // =========================================================================

    fn transferred(&self, channel: RxChannel) -> usize {
        CHUNK.saturating_sub(self.dma.rx_remaining(channel))
    }

    /// Copy bytes `[read_pos, transferred)` of a chunk into the ring
    fn drain(&mut self, channel: RxChannel) {
        let end = self.transferred(channel);
        let start = self.read_pos[channel as usize];
        if end <= start {
            return;
        }

        // Order the byte reads after the transfer-count read
        fence(Ordering::Acquire);
        let src = self.buffers.rx_ptr(channel);
        let mut dropped = 0u32;
        for i in start..end {
            // SAFETY: i < CHUNK; the DMA has finished writing these bytes
            let byte = unsafe { core::ptr::read_volatile(src.add(i)) };
            if self.ring.push(byte) {
                dropped += 1;
            }
        }
        self.read_pos[channel as usize] = end;

        if dropped > 0 {
            self.stats.overflow_bytes = self.stats.overflow_bytes.wrapping_add(dropped);
            warning!("RX circular buffer overflow, dropped {} oldest bytes", dropped);
        }
    }

    fn arm(&mut self, channel: RxChannel) {
        self.read_pos[channel as usize] = 0;
        // SAFETY: chunk lives in `'a` storage for as long as the engine exists
        unsafe { self.dma.arm_rx(channel, self.buffers.rx_ptr(channel), CHUNK) };
    }

    fn check_active_buffer(&mut self) {
        self.drain(self.active);
    }

    fn check_for_swap(&mut self) {
        let active = self.active;
        let inactive = active.other();
        if self.dma.rx_busy(inactive) && !self.dma.rx_busy(active) {
            self.drain(active);
            self.arm(active);
            self.active = inactive;
            self.stats.buffer_swaps = self.stats.buffer_swaps.wrapping_add(1);
            self.drain(inactive);
        }
    }

    fn check_for_stall(&mut self, delay: &mut impl DelayNs) -> DmaResult<()> {
        if self.dma.rx_busy(RxChannel::A) || self.dma.rx_busy(RxChannel::B) {
            return Ok(());
        }

        warning!("DMA stall detected, recovering");
        let active = self.active;
        self.drain(active);
        self.drain(active.other());
        self.stats.stall_recoveries = self.stats.stall_recoveries.wrapping_add(1);
        self.restart_rx(delay)
    }

    fn restart_rx(&mut self, delay: &mut impl DelayNs) -> DmaResult<()> {
        self.arm(RxChannel::A);
        self.arm(RxChannel::B);
        self.active = RxChannel::A;
        self.dma.start_rx(RxChannel::A);

        let mut elapsed = 0u32;
        while !self.dma.rx_busy(RxChannel::A) {
            if elapsed >= self.timeouts.rx_ready_us {
                error!("RX DMA did not start within {} us", self.timeouts.rx_ready_us);
                return Err(DmaError::Stall);
            }
            delay.delay_us(self.timeouts.poll_interval_us);
            elapsed = elapsed.saturating_add(self.timeouts.poll_interval_us);
        }
        debug!("RX DMA armed, chunk {} bytes", CHUNK);
        Ok(())
    }

    // =========================================================================
    // TX internals
    // =========================================================================

    fn wait_tx_idle(&mut self, delay: &mut impl DelayNs) -> DmaResult<()> {
        let mut elapsed = 0u32;
        while self.is_write_busy() {
            if elapsed >= self.timeouts.tx_busy_us {
                warning!("TX DMA busy timeout");
                return Err(DmaError::Timeout);
            }
            delay.delay_us(self.timeouts.poll_interval_us);
            elapsed = elapsed.saturating_add(self.timeouts.poll_interval_us);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
