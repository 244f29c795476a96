//! Cross-core bridge.
//!
//! The non-owning core cannot touch the TX queue, so it fills a slot, packs
//! the handle into a single mailbox word and leaves the rest to the owning
//! core, which validates the word and moves the handle onto the TX queue
//! during `poll`.
//!
//! Word layout: `handle | BRIDGE_MAGIC << 8`. A word whose upper 24 bits do
//! not carry the tag is discarded without touching the pool.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::driver::error::{LinkError, LinkResult};
use crate::hal::{MailboxRx, MailboxTx};
use crate::internal::constants::BRIDGE_MAGIC;
use crate::internal::fmt::{debug, trace, warning};
use crate::pool::{Handle, LinkPool, PoolHandle};
use crate::transport::tx::{TxHandle, TxScheduler};

/// Pack a handle into a mailbox word
#[inline]
pub const fn pack(handle: Handle) -> u32 {
    handle.raw() as u32 | (BRIDGE_MAGIC << 8)
}

/// Recover the handle from a mailbox word, or `None` if the tag is wrong
#[inline]
pub const fn unpack(word: u32) -> Option<Handle> {
    if word >> 8 == BRIDGE_MAGIC {
        Some(Handle::from_raw(word as u8))
    } else {
        None
    }
}

/// Bridge counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeStatistics {
    /// Words pushed into the mailbox by the non-owning core
    pub remote_messages_sent: u32,
    /// Sends refused because the mailbox was full
    pub mailbox_full_drops: u32,
    /// Valid handles taken out of the mailbox by the owning core
    pub owner_messages_received: u32,
    /// Handles released because the TX queue was full
    pub owner_queue_drops: u32,
    /// Words with a bad tag or a dead handle
    pub invalid_words: u32,
}

/// Bridge state shared by both cores.
///
/// The first two counters are written only by the sending core, the rest only
/// by the owning core.
pub struct Bridge {
    remote_messages_sent: AtomicU32,
    mailbox_full_drops: AtomicU32,
    owner_messages_received: AtomicU32,
    owner_queue_drops: AtomicU32,
    invalid_words: AtomicU32,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    /// Zeroed counters
    pub const fn new() -> Self {
        Self {
            remote_messages_sent: AtomicU32::new(0),
            mailbox_full_drops: AtomicU32::new(0),
            owner_messages_received: AtomicU32::new(0),
            owner_queue_drops: AtomicU32::new(0),
            invalid_words: AtomicU32::new(0),
        }
    }

    /// Hand a filled slot to the owning core.
    ///
    /// Never blocks. On a full mailbox the handle is dropped here, which
    /// releases the slot exactly once, and [`LinkError::MailboxFull`] is
    /// returned.
    pub fn send_from_remote(&self, mailbox: &mut impl MailboxTx, handle: TxHandle<'_>) -> LinkResult<()> {
        if !mailbox.try_write(pack(handle.handle())) {
            self.mailbox_full_drops.fetch_add(1, Ordering::Relaxed);
            return Err(LinkError::MailboxFull);
        }

        // The owning core now holds the unit
        let _ = handle.detach();
        self.remote_messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Drain every word waiting in the mailbox onto the TX queue.
    ///
    /// Owning core only. Returns how many handles were forwarded.
    pub fn process_fifo_messages<'p>(
        &self,
        mailbox: &mut impl MailboxRx,
        pool: &'p LinkPool,
        tx: &mut TxScheduler<'p>,
    ) -> usize {
        let mut forwarded = 0;
        while let Some(word) = mailbox.try_read() {
            let Some(raw) = unpack(word) else {
                self.invalid_words.fetch_add(1, Ordering::Relaxed);
                warning!("Bridge word {:#x} has no tag, dropped", word);
                continue;
            };

            // SAFETY: a tagged word carries the unit detached in `send_from_remote`
            let Some(handle) = (unsafe { PoolHandle::adopt(pool, raw) }) else {
                self.invalid_words.fetch_add(1, Ordering::Relaxed);
                warning!("Bridge handle {} is not live", raw.raw());
                continue;
            };
            self.owner_messages_received.fetch_add(1, Ordering::Relaxed);

            if tx.enqueue(handle).is_err() {
                self.owner_queue_drops.fetch_add(1, Ordering::Relaxed);
                warning!("TX queue full, bridged message dropped");
                continue;
            }
            forwarded += 1;
        }

        if forwarded > 0 {
            trace!("Bridge forwarded {} messages", forwarded);
        }
        forwarded
    }

    /// Release every handle still waiting in the mailbox.
    ///
    /// Owning core only, used on teardown. Returns how many slots were freed.
    pub fn discard_pending(&self, mailbox: &mut impl MailboxRx, pool: &LinkPool) -> usize {
        let mut discarded = 0;
        while let Some(word) = mailbox.try_read() {
            let Some(raw) = unpack(word) else {
                self.invalid_words.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            // SAFETY: a tagged word carries the unit detached in `send_from_remote`
            if let Some(handle) = unsafe { PoolHandle::adopt(pool, raw) } {
                drop(handle);
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!("Bridge discarded {} pending messages", discarded);
        }
        discarded
    }

    /// Counter snapshot
    pub fn statistics(&self) -> BridgeStatistics {
        BridgeStatistics {
            remote_messages_sent: self.remote_messages_sent.load(Ordering::Relaxed),
            mailbox_full_drops: self.mailbox_full_drops.load(Ordering::Relaxed),
            owner_messages_received: self.owner_messages_received.load(Ordering::Relaxed),
            owner_queue_drops: self.owner_queue_drops.load(Ordering::Relaxed),
            invalid_words: self.invalid_words.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
