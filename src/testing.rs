//! Testing utilities and mock implementations
//!
//! Host-side stand-ins for the UART, its DMA channels and the inter-core
//! mailbox, so the link can be driven end to end without hardware.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::driver::config::UartConfig;
use crate::driver::error::{ConfigError, ConfigResult};
use crate::hal::{MailboxRx, MailboxTx, RxChannel, UartDma, UartPort};

// =============================================================================
// Mock UART
// =============================================================================

/// Mock UART that records every configuration applied to it
#[derive(Debug, Default)]
pub struct MockUart {
    configs: Vec<UartConfig>,
    drains: usize,
    fail: bool,
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `configure` calls fail with `HardwareUnavailable`
    pub fn set_fail(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Configurations applied so far
    pub fn configs(&self) -> &[UartConfig] {
        &self.configs
    }

    /// Number of RX FIFO drains
    pub fn drains(&self) -> usize {
        self.drains
    }
}

impl UartPort for MockUart {
    fn configure(&mut self, config: &UartConfig) -> ConfigResult<()> {
        if self.fail {
            return Err(ConfigError::HardwareUnavailable);
        }
        self.configs.push(*config);
        Ok(())
    }

    fn drain_rx(&mut self) {
        self.drains += 1;
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

// =============================================================================
// Mock DMA
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct MockRxChannel {
    dst: *mut u8,
    len: usize,
    written: usize,
    armed: bool,
    busy: bool,
}

impl MockRxChannel {
    const IDLE: Self = Self {
        dst: core::ptr::null_mut(),
        len: 0,
        written: 0,
        armed: false,
        busy: false,
    };
}

/// Mock of the three UART DMA channels.
///
/// [`receive`](Self::receive) plays the role of the wire: bytes land in the
/// busy RX channel's buffer, and a full channel hands over to its armed
/// partner the way the hardware chain does. Bytes arriving while no channel
/// is busy are lost.
#[derive(Debug)]
pub struct MockDma {
    rx: [MockRxChannel; 2],
    tx_pending: Vec<u8>,
    tx_busy: bool,
    tx_frames: usize,
    loopback: bool,
    claim_fails: bool,
    claimed: bool,
    rx_start_fails: bool,
    dropped: usize,
}

impl Default for MockDma {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDma {
    pub fn new() -> Self {
        Self {
            rx: [MockRxChannel::IDLE; 2],
            tx_pending: Vec::new(),
            tx_busy: false,
            tx_frames: 0,
            loopback: false,
            claim_fails: false,
            claimed: false,
            rx_start_fails: false,
            dropped: 0,
        }
    }

    pub fn set_claim_fails(&mut self, fails: bool) {
        self.claim_fails = fails;
    }

    /// Make `start_rx` leave the channel idle
    pub fn set_rx_start_fails(&mut self, fails: bool) {
        self.rx_start_fails = fails;
    }

    /// Feed completed TX frames back into RX
    pub fn set_loopback(&mut self, loopback: bool) {
        self.loopback = loopback;
    }

    /// Bytes lost because no RX channel was running
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Frames handed to `start_tx` so far
    pub fn tx_frames(&self) -> usize {
        self.tx_frames
    }

    /// Deliver bytes from the wire
    pub fn receive(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let Some(idx) = self.rx.iter().position(|ch| ch.busy) else {
                self.dropped += 1;
                continue;
            };

            let ch = &mut self.rx[idx];
            // SAFETY: `arm_rx` callers guarantee dst..dst+len stays valid
            unsafe { ch.dst.add(ch.written).write_volatile(byte) };
            ch.written += 1;

            if ch.written == ch.len {
                ch.busy = false;
                ch.armed = false;
                let other = &mut self.rx[1 - idx];
                if other.armed && !other.busy {
                    other.busy = true;
                }
            }
        }
    }

    /// Stop both RX channels as if the chain had broken
    pub fn force_idle(&mut self) {
        for ch in &mut self.rx {
            ch.busy = false;
        }
    }

    /// Finish the TX transfer in flight and return what it sent
    pub fn complete_tx(&mut self) -> Vec<u8> {
        self.tx_busy = false;
        let sent = core::mem::take(&mut self.tx_pending);
        if self.loopback {
            self.receive(&sent);
        }
        sent
    }
}

impl UartDma for MockDma {
    fn claim(&mut self) -> ConfigResult<()> {
        if self.claim_fails || self.claimed {
            return Err(ConfigError::HardwareUnavailable);
        }
        self.claimed = true;
        Ok(())
    }

    unsafe fn arm_rx(&mut self, channel: RxChannel, dst: *mut u8, len: usize) {
        self.rx[channel as usize] = MockRxChannel {
            dst,
            len,
            written: 0,
            armed: true,
            busy: false,
        };
    }

    fn start_rx(&mut self, channel: RxChannel) {
        let ch = &mut self.rx[channel as usize];
        if ch.armed && !self.rx_start_fails {
            ch.busy = true;
        }
    }

    fn rx_busy(&self, channel: RxChannel) -> bool {
        self.rx[channel as usize].busy
    }

    fn rx_remaining(&self, channel: RxChannel) -> usize {
        let ch = &self.rx[channel as usize];
        ch.len - ch.written
    }

    unsafe fn start_tx(&mut self, src: *const u8, len: usize) {
        // SAFETY: caller keeps src..src+len valid until tx_busy() is false
        let bytes = unsafe { core::slice::from_raw_parts(src, len) };
        self.tx_pending.clear();
        self.tx_pending.extend_from_slice(bytes);
        self.tx_busy = true;
        self.tx_frames += 1;
    }

    fn tx_busy(&self) -> bool {
        self.tx_busy
    }
}

// =============================================================================
// Mock Mailbox
// =============================================================================

/// Bounded FIFO shared by a [`MockMailboxTx`] / [`MockMailboxRx`] pair
#[derive(Debug)]
struct MailboxFifo {
    words: VecDeque<u32>,
    depth: usize,
}

/// Create a connected mailbox pair holding at most `depth` words
pub fn mock_mailbox(depth: usize) -> (MockMailboxTx, MockMailboxRx) {
    let fifo = Rc::new(RefCell::new(MailboxFifo {
        words: VecDeque::with_capacity(depth),
        depth,
    }));
    (MockMailboxTx { fifo: fifo.clone() }, MockMailboxRx { fifo })
}

/// Sending end of the mock mailbox
#[derive(Debug, Clone)]
pub struct MockMailboxTx {
    fifo: Rc<RefCell<MailboxFifo>>,
}

impl MockMailboxTx {
    /// Words waiting in the FIFO
    pub fn len(&self) -> usize {
        self.fifo.borrow().words.len()
    }
}

impl MailboxTx for MockMailboxTx {
    fn is_writable(&self) -> bool {
        let fifo = self.fifo.borrow();
        fifo.words.len() < fifo.depth
    }

    fn try_write(&mut self, word: u32) -> bool {
        let mut fifo = self.fifo.borrow_mut();
        if fifo.words.len() >= fifo.depth {
            return false;
        }
        fifo.words.push_back(word);
        true
    }
}

/// Receiving end of the mock mailbox
#[derive(Debug)]
pub struct MockMailboxRx {
    fifo: Rc<RefCell<MailboxFifo>>,
}

impl MailboxRx for MockMailboxRx {
    fn try_read(&mut self) -> Option<u32> {
        self.fifo.borrow_mut().words.pop_front()
    }
}

// =============================================================================
// Tests for the mocks themselves
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_dma_chains_full_channel_to_partner() {
        let mut a = [0u8; 2];
        let mut b = [0u8; 2];
        let mut dma = MockDma::new();
        unsafe {
            dma.arm_rx(RxChannel::A, a.as_mut_ptr(), 2);
            dma.arm_rx(RxChannel::B, b.as_mut_ptr(), 2);
        }
        dma.start_rx(RxChannel::A);
        dma.receive(&[1, 2, 3]);

        assert!(!dma.rx_busy(RxChannel::A));
        assert!(dma.rx_busy(RxChannel::B));
        assert_eq!(dma.rx_remaining(RxChannel::B), 1);

        dma.receive(&[4, 5]);
        assert_eq!(dma.dropped(), 1);
        assert_eq!(a, [1, 2]);
        assert_eq!(b, [3, 4]);
    }

    #[test]
    fn mock_mailbox_is_bounded_fifo() {
        let (mut tx, mut rx) = mock_mailbox(2);
        assert!(tx.try_write(1));
        assert!(tx.try_write(2));
        assert!(!tx.is_writable());
        assert!(!tx.try_write(3));
        assert_eq!(rx.try_read(), Some(1));
        assert_eq!(rx.try_read(), Some(2));
        assert_eq!(rx.try_read(), None);
    }
}
