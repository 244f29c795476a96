//! Bounded handle queue
//!
//! A fixed-capacity, single-producer/single-consumer ring of pool handles.
//! Head and tail are free-running counters; their difference is the fill
//! level, so all `N` slots are usable.
//!
//! The queue never owns the slots it conveys. Whoever dequeues a handle
//! inherits its reference unit. A rejected `enqueue` leaves the unit with the
//! caller.
//!
//! # Concurrency
//!
//! One context may call `enqueue`, one (possibly different) context may call
//! `dequeue`/`peek`. `clear` is a consumer operation. The RX parser's
//! evict-oldest path dequeues from the producer side, which holds only because
//! RX production and delivery both run on the owning core.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::pool::Handle;

/// SPSC ring of [`Handle`]s with power-of-two capacity `N`
pub struct HandleQueue<const N: usize> {
    buffer: [UnsafeCell<u8>; N],
    /// Next slot to read (consumer-owned)
    head: AtomicUsize,
    /// Next slot to write (producer-owned)
    tail: AtomicUsize,
}

// SAFETY: a cell is written by the producer only before the tail store that
// publishes it, and read by the consumer only after the matching acquire load.
unsafe impl<const N: usize> Sync for HandleQueue<N> {}

impl<const N: usize> Default for HandleQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HandleQueue<N> {
    const CAPACITY_OK: () = assert!(N.is_power_of_two(), "queue capacity must be a power of two");
    const MASK: usize = N - 1;

    /// Create an empty queue
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            buffer: [const { UnsafeCell::new(Handle::INVALID.raw()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Push a handle; returns `false` when full (the caller keeps the handle)
    pub fn enqueue(&self, handle: Handle) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= N {
            return false;
        }

        // SAFETY: slot between head and tail+N is producer-owned until published
        unsafe { *self.buffer[tail & Self::MASK].get() = handle.raw() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop the oldest handle
    pub fn dequeue(&self) -> Option<Handle> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        // SAFETY: published by the producer's release store of tail
        let raw = unsafe { *self.buffer[head & Self::MASK].get() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(Handle::from_raw(raw))
    }

    /// Look at the oldest handle without removing it
    pub fn peek(&self) -> Option<Handle> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: as in `dequeue`
        Some(Handle::from_raw(unsafe { *self.buffer[head & Self::MASK].get() }))
    }

    /// Whether the queue holds no handles
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the queue holds `N` handles
    pub fn is_full(&self) -> bool {
        self.count() >= N
    }

    /// Number of queued handles.
    ///
    /// Either side may call this while the other is active; the result is
    /// the depth at one instant between the call's start and end.
    pub fn count(&self) -> usize {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let again = self.head.load(Ordering::Acquire);
            if again == head {
                // tail only moves forward, so it is never behind a head read before it
                return tail.wrapping_sub(head).min(N);
            }
            head = again;
        }
    }

    /// Capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop every queued handle, passing each to `release`
    pub fn clear(&self, mut release: impl FnMut(Handle)) {
        while let Some(handle) = self.dequeue() {
            release(handle);
        }
    }
}
