//! Typed message payloads
//!
//! Every typed payload starts with a one-byte [`MessageType`] tag, followed by
//! fixed-offset little-endian fields. Strings are encoded as
//! `len(u8) | bytes | 0x00`.
//!
//! Fields are read and written explicitly through [`PayloadReader`] and
//! [`PayloadWriter`]; payload bytes are never reinterpreted as Rust structs.
//!
//! # Example
//!
//! ```ignore
//! use ftl_link::messages::SystemState;
//!
//! link.send_typed(&SystemState { state_id: 2, is_active: true, uptime_ms: 1200 })?;
//!
//! if let Some(msg) = link.get_msg() {
//!     if let Ok(state) = msg.decode::<SystemState>() {
//!         // ...
//!     }
//! }
//! ```

mod types;

pub use types::{RemoteLog, SensorAds1115, SensorHx711, SystemState};

// =============================================================================
// Message Type
// =============================================================================

/// Payload type tag (first payload byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    /// Log line forwarded from a remote node
    RemoteLog = 0,
    /// System state report
    SystemState = 1,
    /// HX711 load-cell sample batch
    SensorHx711 = 2,
    /// ADS1115 ADC readings
    SensorAds1115 = 3,
}

impl MessageType {
    /// Short name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageType::RemoteLog => "REMOTE_LOG",
            MessageType::SystemState => "SYSTEM_STATE",
            MessageType::SensorHx711 => "SENSOR_HX711",
            MessageType::SensorAds1115 => "SENSOR_ADS1115",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = MessageError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageType::RemoteLog),
            1 => Ok(MessageType::SystemState),
            2 => Ok(MessageType::SensorHx711),
            3 => Ok(MessageType::SensorAds1115),
            _ => Err(MessageError::UnknownType),
        }
    }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Typed payload encode/decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Tag does not match the requested message type
    WrongType,
    /// Payload too short to decode, or too small to encode into
    BufferTooSmall,
    /// String too long or not valid UTF-8
    InvalidString,
    /// Tag is not a known message type
    UnknownType,
}

impl MessageError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageError::WrongType => "wrong message type",
            MessageError::BufferTooSmall => "buffer too small",
            MessageError::InvalidString => "invalid string",
            MessageError::UnknownType => "unknown message type",
        }
    }
}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Message Trait
// =============================================================================

/// A payload with a fixed type tag and explicit field layout.
///
/// `encode` writes the fields only; the tag is handled by [`encode_message`].
/// `decode` receives a reader already positioned after the tag.
pub trait Message<'a>: Sized {
    /// Tag written in the first payload byte
    const TYPE: MessageType;

    /// Write the fields after the tag
    fn encode_fields(&self, w: &mut PayloadWriter<'_>) -> Result<(), MessageError>;

    /// Read the fields after the tag
    fn decode_fields(r: &mut PayloadReader<'a>) -> Result<Self, MessageError>;

    /// Read a full payload, tag included
    fn decode(r: &mut PayloadReader<'a>) -> Result<Self, MessageError> {
        if MessageType::try_from(r.read_u8()?)? != Self::TYPE {
            return Err(MessageError::WrongType);
        }
        Self::decode_fields(r)
    }
}

/// Encode a typed message (tag + fields) into `buf`, returning the payload length
pub fn encode_message<'a, M: Message<'a>>(msg: &M, buf: &mut [u8]) -> Result<usize, MessageError> {
    let mut w = PayloadWriter::new(buf);
    w.write_u8(M::TYPE as u8)?;
    msg.encode_fields(&mut w)?;
    Ok(w.position())
}

// =============================================================================
// Writer
// =============================================================================

/// Bounds-checked little-endian field writer
#[derive(Debug)]
pub struct PayloadWriter<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> PayloadWriter<'b> {
    /// Start writing at offset 0
    pub fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), MessageError> {
        let end = self.pos + bytes.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(MessageError::BufferTooSmall)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Write a `u8`
    pub fn write_u8(&mut self, value: u8) -> Result<(), MessageError> {
        self.write_bytes(&[value])
    }

    /// Write a `bool` as `0`/`1`
    pub fn write_bool(&mut self, value: bool) -> Result<(), MessageError> {
        self.write_u8(u8::from(value))
    }

    /// Write a little-endian `u32`
    pub fn write_u32(&mut self, value: u32) -> Result<(), MessageError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a little-endian `f32`
    pub fn write_f32(&mut self, value: f32) -> Result<(), MessageError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write `len(u8) | bytes | 0x00`
    pub fn write_str(&mut self, value: &str) -> Result<(), MessageError> {
        // Length byte plus terminator must fit in a u8 count
        if value.len() >= u8::MAX as usize {
            return Err(MessageError::InvalidString);
        }
        if self.pos + value.len() + 2 > self.buf.len() {
            return Err(MessageError::BufferTooSmall);
        }
        self.write_u8(value.len() as u8)?;
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Bounds-checked little-endian field reader
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Start reading at offset 0
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], MessageError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + len)
            .ok_or(MessageError::BufferTooSmall)?;
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MessageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> Result<u8, MessageError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a `bool` (any nonzero byte is `true`)
    pub fn read_bool(&mut self) -> Result<bool, MessageError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32, MessageError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `f32`
    pub fn read_f32(&mut self) -> Result<f32, MessageError> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read `len(u8) | bytes` and skip the terminator if present
    pub fn read_str(&mut self) -> Result<&'a str, MessageError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        if self.buf.get(self.pos) == Some(&0) {
            self.pos += 1;
        }
        core::str::from_utf8(bytes).map_err(|_| MessageError::InvalidString)
    }
}
