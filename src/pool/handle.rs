//! Scoped, owning wrapper around a pool handle.

use core::mem::ManuallyDrop;

use super::{Handle, MessagePool};

/// Owns exactly one reference unit of a pool slot and releases it on drop.
///
/// Movable but not `Clone`. Sharing a slot is an explicit act through
/// [`PoolHandle::try_clone`], which takes another reference and fails once the
/// slot is at `MAX_REF_COUNT`.
pub struct PoolHandle<'a, const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> {
    pool: &'a MessagePool<OBJECT_SIZE, MAX_OBJECTS>,
    handle: Handle,
}

impl<'a, const OBJECT_SIZE: usize, const MAX_OBJECTS: usize>
    PoolHandle<'a, OBJECT_SIZE, MAX_OBJECTS>
{
    /// Acquire a fresh slot from `pool`
    pub fn acquire(pool: &'a MessagePool<OBJECT_SIZE, MAX_OBJECTS>) -> Option<Self> {
        pool.acquire().map(|handle| Self { pool, handle })
    }

    /// Take over a reference unit the caller already owns.
    ///
    /// Returns `None` if `handle` is not live.
    ///
    /// # Safety
    ///
    /// The caller must own one reference unit of `handle` (typically obtained
    /// from `acquire`, `add_ref`, a queue or a mailbox word) and must not
    /// release that unit through any other path afterwards.
    pub unsafe fn adopt(pool: &'a MessagePool<OBJECT_SIZE, MAX_OBJECTS>, handle: Handle) -> Option<Self> {
        pool.is_valid(handle).then_some(Self { pool, handle })
    }

    /// The bare handle
    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The pool that issued this handle
    #[inline]
    pub fn pool(&self) -> &'a MessagePool<OBJECT_SIZE, MAX_OBJECTS> {
        self.pool
    }

    /// Current reference count of the slot
    pub fn ref_count(&self) -> u8 {
        self.pool.ref_count(self.handle)
    }

    /// Take a second reference to the same slot
    pub fn try_clone(&self) -> Option<Self> {
        self.pool.add_ref(self.handle).then_some(Self {
            pool: self.pool,
            handle: self.handle,
        })
    }

    /// Give up ownership without releasing; the caller now owns the unit
    #[must_use = "the detached handle still holds a reference"]
    pub fn detach(self) -> Handle {
        let this = ManuallyDrop::new(self);
        this.handle
    }

    /// Slot bytes
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: we own a unit; `bytes_mut` needs `&mut self` and sole ownership,
        // so no writer exists while this borrow lives.
        match unsafe { self.pool.slot(self.handle) } {
            Some(bytes) => bytes.as_slice(),
            None => &[],
        }
    }

    /// Mutable slot bytes, available only while this is the sole reference
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        if self.ref_count() != 1 {
            return None;
        }
        // SAFETY: ref_count 1 and we own it; `&mut self` blocks try_clone
        unsafe { self.pool.slot_mut(self.handle) }.map(|bytes| bytes.as_mut_slice())
    }
}

impl<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> Drop
    for PoolHandle<'_, OBJECT_SIZE, MAX_OBJECTS>
{
    fn drop(&mut self) {
        self.pool.release(self.handle);
    }
}

impl<const OBJECT_SIZE: usize, const MAX_OBJECTS: usize> core::fmt::Debug
    for PoolHandle<'_, OBJECT_SIZE, MAX_OBJECTS>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("handle", &self.handle)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type SmallPool = MessagePool<8, 2>;

    #[test]
    fn drop_releases_slot() {
        let pool = SmallPool::new();
        {
            let _h = PoolHandle::acquire(&pool).unwrap();
            assert_eq!(pool.allocated_count(), 1);
        }
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn try_clone_shares_and_last_drop_frees() {
        let pool = SmallPool::new();
        let a = PoolHandle::acquire(&pool).unwrap();
        let b = a.try_clone().unwrap();
        assert_eq!(a.handle(), b.handle());
        assert_eq!(a.ref_count(), 2);

        drop(a);
        assert_eq!(b.ref_count(), 1);
        drop(b);
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn detach_and_adopt_keep_single_unit() {
        let pool = SmallPool::new();
        let raw = PoolHandle::acquire(&pool).unwrap().detach();
        assert_eq!(pool.ref_count(raw), 1);

        let adopted = unsafe { PoolHandle::adopt(&pool, raw) }.unwrap();
        assert_eq!(adopted.ref_count(), 1);
        drop(adopted);
        assert!(!pool.is_valid(raw));
    }

    #[test]
    fn adopt_rejects_free_slot() {
        let pool = SmallPool::new();
        assert!(unsafe { PoolHandle::adopt(&pool, Handle::from_raw(0)) }.is_none());
        assert!(unsafe { PoolHandle::adopt(&pool, Handle::INVALID) }.is_none());
    }

    #[test]
    fn bytes_mut_requires_sole_ownership() {
        let pool = SmallPool::new();
        let mut a = PoolHandle::acquire(&pool).unwrap();
        a.bytes_mut().unwrap()[0] = 7;

        let b = a.try_clone().unwrap();
        assert!(a.bytes_mut().is_none());
        assert_eq!(b.bytes()[0], 7);
        drop(b);
        assert!(a.bytes_mut().is_some());
    }
}
