//! Received message delivered to the application.

use crate::internal::constants::{MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE};
use crate::messages::{Message, MessageError, MessageType, PayloadReader};
use crate::transport::frame;

use super::{Handle, PoolHandle};

/// A validated message, owning one reference to its pool slot.
///
/// Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct OwnedMessage<'a> {
    inner: PoolHandle<'a, MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE>,
}

impl<'a> OwnedMessage<'a> {
    pub(crate) fn new(inner: PoolHandle<'a, MAX_MESSAGE_SIZE, MESSAGE_POOL_SIZE>) -> Self {
        Self { inner }
    }

    /// Payload bytes
    pub fn data(&self) -> &[u8] {
        frame::payload(self.inner.bytes())
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        frame::payload_len(self.inner.bytes())
    }

    /// Whether the payload is empty (never true for a delivered message)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source id of the sender
    pub fn source_id(&self) -> u8 {
        frame::source_id(self.inner.bytes())
    }

    /// CRC16 carried by the frame
    pub fn crc16(&self) -> u16 {
        frame::stored_crc(self.inner.bytes())
    }

    /// Payload as text, if it is valid UTF-8
    pub fn view(&self) -> Option<&str> {
        core::str::from_utf8(self.data()).ok()
    }

    /// Whether the slot is still live
    pub fn is_valid(&self) -> bool {
        self.inner.ref_count() > 0
    }

    /// Pool handle backing this message
    pub fn handle(&self) -> Handle {
        self.inner.handle()
    }

    /// Share this message; fails once the slot's reference count is saturated
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(Self::new)
    }

    /// Type tag in the first payload byte
    pub fn message_type(&self) -> Result<MessageType, MessageError> {
        match self.data().first() {
            Some(&tag) => MessageType::try_from(tag),
            None => Err(MessageError::BufferTooSmall),
        }
    }

    /// Decode the payload as a typed message
    pub fn decode<M: Message<'a>>(&'a self) -> Result<M, MessageError> {
        M::decode(&mut PayloadReader::new(self.data()))
    }
}
