//! Inter-core mailbox (hardware FIFO).

/// Sending end, used by the non-owning core
pub trait MailboxTx {
    /// Whether a word can be pushed without blocking
    fn is_writable(&self) -> bool;

    /// Push one word; returns `false` without blocking if the FIFO is full
    fn try_write(&mut self, word: u32) -> bool;
}

/// Receiving end, drained by the owning core during `poll`
pub trait MailboxRx {
    /// Pop one word if available
    fn try_read(&mut self) -> Option<u32>;
}
