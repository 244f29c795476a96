//! Circular byte buffer between the RX DMA chunks and the frame parser.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Power-of-two byte ring with free-running write/read indices.
///
/// The writer publishes bytes with a release store of the write index; the
/// reader observes them with an acquire load. When the ring is full the writer
/// drops the oldest byte by advancing the read index, so the newest data
/// always wins.
pub struct ByteRing<const N: usize> {
    data: UnsafeCell<[u8; N]>,
    write: AtomicUsize,
    read: AtomicUsize,
}

// SAFETY: bytes are published through the write index with release/acquire
// ordering; both ends run on the owning core.
unsafe impl<const N: usize> Sync for ByteRing<N> {}

impl<const N: usize> ByteRing<N> {
    const CAPACITY_OK: () = assert!(N.is_power_of_two(), "ring size must be a power of two");
    const MASK: usize = N - 1;

    /// Create an empty ring. Const-compatible.
    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            data: UnsafeCell::new([0; N]),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Ring capacity
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append one byte. Returns `true` if the oldest byte was dropped to make room.
    pub fn push(&self, byte: u8) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let overflow = write.wrapping_sub(read) >= N;
        if overflow {
            self.read.store(read.wrapping_add(1), Ordering::Release);
        }

        // SAFETY: the slot at `write` is not readable until the store below
        unsafe { (*self.data.get())[write & Self::MASK] = byte };
        self.write.store(write.wrapping_add(1), Ordering::Release);
        overflow
    }

    /// Bytes waiting to be read
    pub fn available(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Relaxed);
        write.wrapping_sub(read).min(N)
    }

    /// Copy up to `dst.len()` bytes out, returning how many were copied
    pub fn read(&self, dst: &mut [u8]) -> usize {
        let mut read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        let count = write.wrapping_sub(read).min(N).min(dst.len());

        for slot in dst.iter_mut().take(count) {
            // SAFETY: index published by the writer's release store
            *slot = unsafe { (*self.data.get())[read & Self::MASK] };
            read = read.wrapping_add(1);
        }

        self.read.store(read, Ordering::Release);
        count
    }

    /// Discard everything
    pub fn reset(&self) {
        self.read.store(self.write.load(Ordering::Acquire), Ordering::Release);
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
