//! Message Pool
//!
//! A fixed-capacity arena of same-size byte slots, addressed by 8-bit
//! [`Handle`]s and reference counted with atomic compare-and-swap. No locks,
//! no heap.
//!
//! # Slot states
//!
//! | State byte           | Meaning                                |
//! |----------------------|----------------------------------------|
//! | `0`                  | Free                                   |
//! | `1..=MAX_REF_COUNT`  | Live, value is the reference count     |
//! | `0xFF`               | Being claimed by [`MessagePool::acquire`] |
//!
//! A handle is valid iff its slot holds a live reference count. Owning a
//! handle means owning one unit of that count. The pool itself never tracks
//! who owns what; [`PoolHandle`] does it for you by releasing on drop.
//!
//! # Target requirements
//!
//! The pool uses `AtomicU8::compare_exchange`, so the target must provide
//! byte-sized CAS (Cortex-M3 and up, Xtensa, RISC-V with the A extension).

mod handle;
mod message;

pub use handle::PoolHandle;
pub use message::OwnedMessage;

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::internal::constants::{MAX_MESSAGE_SIZE, MAX_REF_COUNT, MESSAGE_POOL_SIZE};

/// State byte of a free slot
const STATE_FREE: u8 = 0;

/// State byte of a slot between claim and first reference
const STATE_ALLOCATING: u8 = 0xFF;

// =============================================================================
// Handle
// =============================================================================

/// Index of a pool slot.
///
/// A bare handle carries no ownership; it is just a number that can travel
/// through queues and mailbox words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handle(u8);

impl Handle {
    /// The "no slot" handle
    pub const INVALID: Handle = Handle(0xFF);

    /// Wrap a raw slot index
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Handle(raw)
    }

    /// Raw slot index
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Whether this is [`Handle::INVALID`]
    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// Pool
// =============================================================================

#[repr(C, align(4))]
struct Slot<const OBJECT_SIZE: usize>(UnsafeCell<[u8; OBJECT_SIZE]>);

impl<const OBJECT_SIZE: usize> Slot<OBJECT_SIZE> {
    const fn new() -> Self {
        Slot(UnsafeCell::new([0; OBJECT_SIZE]))
    }
}

/// Lock-free, reference-counted slot arena.
///
/// # Type Parameters
///
/// * `OBJECT_SIZE` - Bytes per slot (multiple of 4)
/// * `MAX_OBJECTS` - Number of slots (at most 255)
pub struct MessagePool<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> {
    slots: [Slot<OBJECT_SIZE>; MAX_OBJECTS],
    states: [AtomicU8; MAX_OBJECTS],
    hint: AtomicU8,
}

// SAFETY: slot bytes are only reached through `slot`/`slot_mut`, whose
// contracts require the caller to own a reference unit; all bookkeeping is atomic.
unsafe impl<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> Sync
    for MessagePool<OBJECT_SIZE, MAX_OBJECTS>
{
}

/// Pool sized for link messages
pub type LinkPool = MessagePool<MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE>;

impl<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> Default
    for MessagePool<OBJECT_SIZE, MAX_OBJECTS>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> MessagePool<OBJECT_SIZE, MAX_OBJECTS> {
    const SIZE_OK: () = assert!(
        MAX_OBJECTS > 0 && MAX_OBJECTS < 0xFF && OBJECT_SIZE % 4 == 0,
        "pool needs 1..=254 slots of a multiple of 4 bytes"
    );

    /// Create an empty pool. Usable in `static` initializers.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SIZE_OK;
        Self {
            slots: [const { Slot::new() }; MAX_OBJECTS],
            states: [const { AtomicU8::new(STATE_FREE) }; MAX_OBJECTS],
            hint: AtomicU8::new(0),
        }
    }

    /// Number of slots
    #[inline]
    pub const fn capacity(&self) -> usize {
        MAX_OBJECTS
    }

    /// Bytes per slot
    #[inline]
    pub const fn object_size(&self) -> usize {
        OBJECT_SIZE
    }

    /// Claim a free slot, zero it and return it with a reference count of 1.
    ///
    /// Scans every slot once starting from a rotating hint. Returns `None`
    /// when all slots are in use. Never blocks.
    pub fn acquire(&self) -> Option<Handle> {
        let start = self.hint.load(Ordering::Relaxed) as usize % MAX_OBJECTS;

        for offset in 0..MAX_OBJECTS {
            let index = (start + offset) % MAX_OBJECTS;
            let state = &self.states[index];

            if state
                .compare_exchange(STATE_FREE, STATE_ALLOCATING, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: the ALLOCATING sentinel makes this slot ours alone
                unsafe { (*self.slots[index].0.get()).fill(0) };
                state.store(1, Ordering::Release);
                self.hint.store(((index + 1) % MAX_OBJECTS) as u8, Ordering::Relaxed);
                return Some(Handle(index as u8));
            }
        }

        None
    }

    /// Add one reference to a live slot.
    ///
    /// Fails if the handle is not live or the count is already at
    /// [`MAX_REF_COUNT`].
    pub fn add_ref(&self, handle: Handle) -> bool {
        let Some(state) = self.state(handle) else {
            return false;
        };

        let mut current = state.load(Ordering::Relaxed);
        loop {
            if !Self::is_live(current) || current >= MAX_REF_COUNT {
                return false;
            }
            match state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop one reference.
    ///
    /// Returns `true` only when this call released the last reference and the
    /// slot went back to free. Releasing a free slot returns `false` and
    /// changes nothing.
    pub fn release(&self, handle: Handle) -> bool {
        let Some(state) = self.state(handle) else {
            return false;
        };

        let mut current = state.load(Ordering::Relaxed);
        loop {
            if !Self::is_live(current) {
                return false;
            }
            match state.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current == 1,
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether the handle refers to a live slot
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.state(handle)
            .is_some_and(|state| Self::is_live(state.load(Ordering::Acquire)))
    }

    /// Current reference count (0 for free or invalid handles)
    pub fn ref_count(&self, handle: Handle) -> u8 {
        match self.state(handle).map(|state| state.load(Ordering::Acquire)) {
            Some(count) if Self::is_live(count) => count,
            _ => 0,
        }
    }

    /// Number of live slots
    pub fn allocated_count(&self) -> usize {
        self.states
            .iter()
            .filter(|state| Self::is_live(state.load(Ordering::Relaxed)))
            .count()
    }

    /// Shared view of a live slot's bytes.
    ///
    /// # Safety
    ///
    /// The caller must own a reference unit of `handle` for as long as the
    /// returned slice lives, and no one may hold a mutable view of the same slot.
    pub unsafe fn slot(&self, handle: Handle) -> Option<&[u8; OBJECT_SIZE]> {
        if !self.is_valid(handle) {
            return None;
        }
        // SAFETY: live slot, no writer per the caller's contract
        Some(unsafe { &*self.slots[handle.index()].0.get() })
    }

    /// Exclusive view of a live slot's bytes.
    ///
    /// # Safety
    ///
    /// The caller must own the only reference unit of `handle` and must not
    /// publish the handle (queue, mailbox, `add_ref`) while the view lives.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_mut(&self, handle: Handle) -> Option<&mut [u8; OBJECT_SIZE]> {
        if !self.is_valid(handle) {
            return None;
        }
        // SAFETY: sole owner per the caller's contract
        Some(unsafe { &mut *self.slots[handle.index()].0.get() })
    }

    #[inline]
    fn state(&self, handle: Handle) -> Option<&AtomicU8> {
        self.states.get(handle.index())
    }

    #[inline]
    const fn is_live(state: u8) -> bool {
        state != STATE_FREE && state != STATE_ALLOCATING
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    type SmallPool = MessagePool<16, 4>;

    #[test]
    fn acquire_returns_zeroed_slot_with_one_ref() {
        let pool = SmallPool::new();
        let h = pool.acquire().unwrap();
        unsafe { pool.slot_mut(h).unwrap().fill(0xAB) };
        assert!(pool.release(h));

        // Rotating hint moves on, so cycle until the dirty slot comes back
        let mut seen = Vec::new();
        for _ in 0..4 {
            let h = pool.acquire().unwrap();
            assert_eq!(pool.ref_count(h), 1);
            assert!(unsafe { pool.slot(h).unwrap() }.iter().all(|b| *b == 0));
            seen.push(h);
        }
        assert!(seen.contains(&h));
    }

    #[test]
    fn acquire_fails_when_exhausted() {
        let pool = SmallPool::new();
        let handles: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.allocated_count(), 4);
        assert!(pool.acquire().is_none());

        assert!(pool.release(handles[2]));
        assert_eq!(pool.acquire(), Some(handles[2]));
    }

    #[test]
    fn acquire_never_hands_out_a_live_slot() {
        let pool = SmallPool::new();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert!(pool.release(a));
        let c = pool.acquire().unwrap();
        assert_ne!(c, b);
    }

    #[test]
    fn add_ref_bounded_by_max_ref_count() {
        let pool = SmallPool::new();
        let h = pool.acquire().unwrap();
        for expected in 2..=MAX_REF_COUNT {
            assert!(pool.add_ref(h));
            assert_eq!(pool.ref_count(h), expected);
        }
        assert!(!pool.add_ref(h));
        assert_eq!(pool.ref_count(h), MAX_REF_COUNT);
    }

    #[test]
    fn add_ref_rejects_free_and_invalid_handles() {
        let pool = SmallPool::new();
        assert!(!pool.add_ref(Handle::from_raw(0)));
        assert!(!pool.add_ref(Handle::INVALID));
        assert!(!pool.add_ref(Handle::from_raw(200)));
    }

    #[test]
    fn release_reports_final_reference_only() {
        let pool = SmallPool::new();
        let h = pool.acquire().unwrap();
        assert!(pool.add_ref(h));
        assert!(!pool.release(h));
        assert!(pool.is_valid(h));
        assert!(pool.release(h));
        assert!(!pool.is_valid(h));
    }

    #[test]
    fn release_is_idempotent_on_free_slot() {
        let pool = SmallPool::new();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.add_ref(b));

        assert!(pool.release(a));
        assert!(!pool.release(a));
        assert!(!pool.release(a));

        // Neighbour untouched
        assert_eq!(pool.ref_count(b), 2);
        assert_eq!(pool.ref_count(a), 0);
        assert_eq!(pool.allocated_count(), 1);
    }

    #[test]
    fn release_rejects_out_of_range_handles() {
        let pool = SmallPool::new();
        assert!(!pool.release(Handle::INVALID));
        assert!(!pool.release(Handle::from_raw(4)));
    }

    #[test]
    fn conservation_under_mixed_operations() {
        let pool = SmallPool::new();
        let mut counts = [0u8; 4];
        // Deterministic pseudo-random op sequence
        let mut seed = 0x1234_5678u32;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let slot = (seed % 4) as u8;
            let h = Handle::from_raw(slot);
            match (seed >> 8) % 3 {
                0 => {
                    if let Some(h) = pool.acquire() {
                        assert_eq!(counts[h.raw() as usize], 0);
                        counts[h.raw() as usize] = 1;
                    } else {
                        assert!(counts.iter().all(|c| *c > 0));
                    }
                }
                1 => {
                    let ok = pool.add_ref(h);
                    let model = counts[slot as usize];
                    assert_eq!(ok, model > 0 && model < MAX_REF_COUNT);
                    if ok {
                        counts[slot as usize] += 1;
                    }
                }
                _ => {
                    let freed = pool.release(h);
                    let model = counts[slot as usize];
                    assert_eq!(freed, model == 1);
                    counts[slot as usize] = model.saturating_sub(1);
                }
            }

            let live = counts.iter().filter(|c| **c > 0).count();
            assert_eq!(pool.allocated_count(), live);
            assert!(live <= pool.capacity());
            for (i, c) in counts.iter().enumerate() {
                assert_eq!(pool.ref_count(Handle::from_raw(i as u8)), *c);
                assert!(*c <= MAX_REF_COUNT);
            }
        }
    }

    #[test]
    fn concurrent_acquire_release_conserves_slots() {
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(MessagePool::<8, 8>::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        if let Some(h) = pool.acquire() {
                            assert_eq!(pool.ref_count(h), 1);
                            assert!(pool.release(h));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn handle_invalid_sentinel() {
        assert!(Handle::INVALID.is_invalid());
        assert_eq!(Handle::INVALID.raw(), 0xFF);
        assert!(!Handle::from_raw(0).is_invalid());
    }
}
