//! Wire frame and envelope layout.
//!
//! # Envelope (contents of a pool slot)
//!
//! ```text
//! +--------+--------+---------------------+-----------+
//! | LEN(1) | SRC(1) | PAYLOAD(LEN)        | CRC16(2)  |
//! +--------+--------+---------------------+-----------+
//!   [0]      [1]      [2 .. 2+LEN]          big-endian
//! ```
//!
//! # Frame (on the wire)
//!
//! ```text
//! +----------+--------+--------+--------------+----------+----------+
//! | 0xAA 0xCC| LEN(1) | SRC(1) | PAYLOAD(LEN) | CRC16(2) | 0xDE 0xFA|
//! +----------+--------+--------+--------------+----------+----------+
//! ```
//!
//! The CRC covers the payload only and is always recomputed when a frame is
//! built, so a stale CRC in the envelope never reaches the wire.

use crate::driver::error::{DmaError, DmaResult, LinkError, LinkResult};
use crate::internal::constants::{
    END_DELIMITER, ENVELOPE_OVERHEAD, FRAME_OVERHEAD, MAX_PAYLOAD_SIZE, START_DELIMITER,
};
use crate::internal::crc::crc16;

/// Envelope offset of the length byte
pub const LENGTH_OFFSET: usize = 0;
/// Envelope offset of the source id
pub const SOURCE_OFFSET: usize = 1;
/// Envelope offset of the first payload byte
pub const PAYLOAD_OFFSET: usize = 2;

// =============================================================================
// Envelope Accessors
// =============================================================================

/// Payload length stored in an envelope, clamped to what the slot can hold
#[inline]
pub fn payload_len(envelope: &[u8]) -> usize {
    let len = envelope.get(LENGTH_OFFSET).copied().unwrap_or(0) as usize;
    len.min(envelope.len().saturating_sub(ENVELOPE_OVERHEAD))
}

/// Source id stored in an envelope
#[inline]
pub fn source_id(envelope: &[u8]) -> u8 {
    envelope.get(SOURCE_OFFSET).copied().unwrap_or(0)
}

/// Payload bytes of an envelope
#[inline]
pub fn payload(envelope: &[u8]) -> &[u8] {
    let len = payload_len(envelope);
    envelope.get(PAYLOAD_OFFSET..PAYLOAD_OFFSET + len).unwrap_or(&[])
}

/// CRC16 stored after the payload (big-endian)
#[inline]
pub fn stored_crc(envelope: &[u8]) -> u16 {
    let at = PAYLOAD_OFFSET + payload_len(envelope);
    match envelope.get(at..at + 2) {
        Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]),
        _ => 0,
    }
}

/// Check a payload length against the link limits
pub fn check_payload_len(len: usize) -> LinkResult<()> {
    if len == 0 {
        Err(LinkError::EmptyPayload)
    } else if len > MAX_PAYLOAD_SIZE {
        Err(LinkError::PayloadTooLarge)
    } else {
        Ok(())
    }
}

/// Fill an envelope with length, source id and payload.
///
/// The CRC bytes are written too, so the slot is self-consistent.
pub fn write_envelope(envelope: &mut [u8], source: u8, data: &[u8]) -> LinkResult<()> {
    check_payload_len(data.len())?;
    if data.len() + ENVELOPE_OVERHEAD > envelope.len() {
        return Err(LinkError::PayloadTooLarge);
    }

    envelope[LENGTH_OFFSET] = data.len() as u8;
    envelope[SOURCE_OFFSET] = source;
    envelope[PAYLOAD_OFFSET..PAYLOAD_OFFSET + data.len()].copy_from_slice(data);
    store_crc(envelope, crc16(data));
    Ok(())
}

/// Write `crc` big-endian right after the stored payload
pub fn store_crc(envelope: &mut [u8], crc: u16) {
    let at = PAYLOAD_OFFSET + payload_len(envelope);
    if let Some(dst) = envelope.get_mut(at..at + 2) {
        dst.copy_from_slice(&crc.to_be_bytes());
    }
}

// =============================================================================
// Frame Encoding
// =============================================================================

/// Size on the wire of a frame carrying `payload_len` bytes
#[inline]
pub const fn frame_len(payload_len: usize) -> usize {
    payload_len + FRAME_OVERHEAD
}

/// Serialize a frame into `out`, returning the number of bytes written
pub fn encode_frame(source: u8, data: &[u8], out: &mut [u8]) -> DmaResult<usize> {
    let total = frame_len(data.len());
    if data.len() > MAX_PAYLOAD_SIZE || total > out.len() {
        return Err(DmaError::FrameTooLarge);
    }

    let crc = crc16(data);
    let end = PAYLOAD_START + data.len();
    out[..2].copy_from_slice(&START_DELIMITER.to_be_bytes());
    out[2] = data.len() as u8;
    out[3] = source;
    out[PAYLOAD_START..end].copy_from_slice(data);
    out[end..end + 2].copy_from_slice(&crc.to_be_bytes());
    out[end + 2..end + 4].copy_from_slice(&END_DELIMITER.to_be_bytes());
    Ok(total)
}

/// Rebuild the wire frame for a filled envelope
pub fn encode_envelope(envelope: &[u8], out: &mut [u8]) -> DmaResult<usize> {
    encode_frame(source_id(envelope), payload(envelope), out)
}

/// Frame offset of the first payload byte
const PAYLOAD_START: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::constants::MAX_MESSAGE_SIZE;

    #[test]
    fn encode_frame_layout_is_bit_exact() {
        let mut out = [0u8; 16];
        let n = encode_frame(0x42, b"PING", &mut out).unwrap();
        let crc = crc16(b"PING").to_be_bytes();

        assert_eq!(n, 12);
        assert_eq!(
            out[..n],
            [0xAA, 0xCC, 4, 0x42, b'P', b'I', b'N', b'G', crc[0], crc[1], 0xDE, 0xFA]
        );
    }

    #[test]
    fn encode_frame_rejects_small_buffer() {
        let mut out = [0u8; 11];
        assert_eq!(encode_frame(1, b"PING", &mut out), Err(DmaError::FrameTooLarge));
    }

    #[test]
    fn largest_payload_fits_max_message() {
        let data = [0x5Au8; MAX_PAYLOAD_SIZE];
        let mut out = [0u8; MAX_MESSAGE_SIZE];
        assert_eq!(encode_frame(1, &data, &mut out), Ok(MAX_MESSAGE_SIZE));
    }

    #[test]
    fn envelope_round_trip() {
        let mut slot = [0u8; 32];
        write_envelope(&mut slot, 9, b"hello").unwrap();

        assert_eq!(payload_len(&slot), 5);
        assert_eq!(source_id(&slot), 9);
        assert_eq!(payload(&slot), b"hello");
        assert_eq!(stored_crc(&slot), crc16(b"hello"));
    }

    #[test]
    fn envelope_rejects_bad_lengths() {
        let mut slot = [0u8; 16];
        assert_eq!(write_envelope(&mut slot, 1, &[]), Err(LinkError::EmptyPayload));
        assert_eq!(write_envelope(&mut slot, 1, &[0; 13]), Err(LinkError::PayloadTooLarge));
        assert_eq!(write_envelope(&mut slot, 1, &[0; 12]), Ok(()));
    }

    #[test]
    fn check_payload_len_boundaries() {
        assert_eq!(check_payload_len(0), Err(LinkError::EmptyPayload));
        assert_eq!(check_payload_len(1), Ok(()));
        assert_eq!(check_payload_len(MAX_PAYLOAD_SIZE), Ok(()));
        assert_eq!(check_payload_len(MAX_PAYLOAD_SIZE + 1), Err(LinkError::PayloadTooLarge));
    }

    #[test]
    fn encode_envelope_recomputes_crc() {
        let mut slot = [0u8; 16];
        write_envelope(&mut slot, 3, b"abc").unwrap();
        store_crc(&mut slot, 0x0000);

        let mut out = [0u8; 16];
        let n = encode_envelope(&slot, &mut out).unwrap();
        assert_eq!(out[n - 4..n - 2], crc16(b"abc").to_be_bytes());
    }

    #[test]
    fn corrupt_length_byte_is_clamped() {
        let mut slot = [0u8; 8];
        slot[LENGTH_OFFSET] = 200;
        assert_eq!(payload_len(&slot), 4);
        assert_eq!(payload(&slot).len(), 4);
    }
}
